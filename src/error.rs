use thiserror::Error;

/// 上传文件解析错误 (整批失败)
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("unsupported file format: {0} (expected xlsx or csv)")]
    UnsupportedFormat(String),

    #[error("xlsx parse failed: {0}")]
    Xlsx(String),

    #[error("csv parse failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook has no worksheet")]
    EmptyWorkbook,

    #[error("sheet has no header row")]
    MissingHeader,

    #[error("required column missing: {0}")]
    MissingColumn(&'static str),
}

/// 存储层错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invoice {id} not found")]
    NotFound { id: i64 },
}

/// 修订链结构错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChainError {
    #[error("amendment cycle in reference {reference:?} at invoice {invoice_number}")]
    Cycle {
        reference: String,
        invoice_number: String,
    },
}
