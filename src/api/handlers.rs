use crate::api::AppState;
use crate::error::{ChainError, ImportError};
use crate::export::write_chains_csv;
use crate::import::{self, ParsedSheet, RowRejection, SheetFormat};
use crate::models::{InvoiceChain, InvoiceRelation, MatchStats};
use crate::service::build_chains;
use axum::{
    body::Bytes,
    extract::{Json, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// 上传参数: format 优先, 其次按 file_name 扩展名, 默认 xlsx
#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub format: Option<String>,
    pub file_name: Option<String>,
}

impl UploadQuery {
    fn sheet_format(&self) -> Result<SheetFormat, ImportError> {
        match (&self.format, &self.file_name) {
            (Some(format), _) => format.parse(),
            (None, Some(name)) => SheetFormat::from_file_name(name),
            (None, None) => Ok(SheetFormat::default()),
        }
    }
}

/// 请求体: 修订关系列表
#[derive(Debug, Deserialize)]
pub struct ChainsRequest {
    pub relations: Vec<InvoiceRelation>,
}

/// 对账响应体
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub success: bool,
    pub message: String,
    pub stats: MatchStats,
    pub rejected_rows: Vec<RowRejection>,
}

/// 修订链响应体
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainsResponse {
    pub success: bool,
    pub message: String,
    pub chains: Vec<InvoiceChain>,
    pub rejected_rows: Vec<RowRejection>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

/// 接口错误
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Import(_) => StatusCode::BAD_REQUEST,
            ApiError::Chain(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!("request failed ({}): {}", status, self);
        let body = ErrorResponse {
            success: false,
            message: format!("Error: {}", self),
        };
        (status, Json(body)).into_response()
    }
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 解析在阻塞线程池中执行
async fn parse_upload(body: Bytes, format: SheetFormat) -> Result<ParsedSheet, ApiError> {
    let parsed = tokio::task::spawn_blocking(move || import::read_coretax(&body, format))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(parsed)
}

/// 上传 Coretax 导出并回写正式发票号
pub async fn reconcile_upload(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let format = query.sheet_format()?;
    let parsed = parse_upload(body, format).await?;

    let stats = state.matcher.reconcile(parsed.records).await;
    let response = ReconcileResponse {
        success: true,
        message: format!(
            "Matched {} of {} records with invoice number, {} updated",
            stats.matched_records, stats.records_with_invoice_number, stats.updated_records
        ),
        stats,
        rejected_rows: parsed.rejected,
    };
    Ok(Json(response))
}

/// 上传 Coretax 导出并构建修订链
pub async fn chains_upload(
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<ChainsResponse>, ApiError> {
    let format = query.sheet_format()?;
    let parsed = parse_upload(body, format).await?;

    let relations = import::relations_from_records(&parsed.records);
    let chains = build_chains(&relations)?;
    Ok(Json(chains_response(chains, parsed.rejected)))
}

/// 由 JSON 修订关系构建修订链
pub async fn chains_from_relations(
    Json(req): Json<ChainsRequest>,
) -> Result<Json<ChainsResponse>, ApiError> {
    let chains = build_chains(&req.relations)?;
    Ok(Json(chains_response(chains, Vec::new())))
}

/// 导出修订链 CSV
pub async fn export_chains(Json(req): Json<ChainsRequest>) -> Result<Response, ApiError> {
    let chains = build_chains(&req.relations)?;

    let mut buffer = Vec::new();
    write_chains_csv(&chains, &mut buffer).map_err(|e| ApiError::Internal(e.to_string()))?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
        (
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"faktur-chains.csv\"",
        ),
    ];
    Ok((StatusCode::OK, headers, buffer).into_response())
}

fn chains_response(chains: Vec<InvoiceChain>, rejected_rows: Vec<RowRejection>) -> ChainsResponse {
    let invoices: usize = chains.iter().map(InvoiceChain::len).sum();
    ChainsResponse {
        success: true,
        message: format!("Built {} chains covering {} invoices", chains.len(), invoices),
        chains,
        rejected_rows,
    }
}
