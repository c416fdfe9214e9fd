use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::CoretaxStatus;

/// 本地发票状态 (faktur.status)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "faktur_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FakturStatus {
    Draft,
    Approved,
    Amended,
    Cancelled,
}

impl FakturStatus {
    /// Coretax 状态映射: APPROVED→APPROVED, AMENDED→AMENDED, CANCELED→CANCELLED, 其余→DRAFT
    pub fn from_coretax(status: Option<&CoretaxStatus>) -> Self {
        match status {
            Some(CoretaxStatus::Approved) => Self::Approved,
            Some(CoretaxStatus::Amended) => Self::Amended,
            Some(CoretaxStatus::Canceled) => Self::Cancelled,
            Some(CoretaxStatus::Other(_)) | None => Self::Draft,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Approved => "APPROVED",
            Self::Amended => "AMENDED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// 本地发票主表 (faktur)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredInvoice {
    pub id: i64,
    pub reference: String,
    pub buyer_tax_id: String,
    /// 只有日期部分参与匹配
    pub invoice_date: NaiveDateTime,
    pub official_invoice_number: Option<String>,
    pub status: FakturStatus,
}

impl StoredInvoice {
    /// 已回写的正式发票号 (空串视为未回写)
    pub fn official_number(&self) -> Option<&str> {
        self.official_invoice_number
            .as_deref()
            .filter(|n| !n.is_empty())
    }
}

/// 回写命令
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceUpdate {
    pub official_invoice_number: String,
    pub status: FakturStatus,
}
