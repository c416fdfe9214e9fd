use chrono::NaiveDate;
use std::fmt;

/// Coretax 导出中的发票状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoretaxStatus {
    Approved,
    Amended,
    Canceled,
    Other(String),
}

impl CoretaxStatus {
    /// 解析状态列, 空值返回 None; CANCELED / CANCELLED 两种拼写都接受
    pub fn parse(raw: &str) -> Option<Self> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }
        let status = match value.to_ascii_uppercase().as_str() {
            "APPROVED" => Self::Approved,
            "AMENDED" => Self::Amended,
            "CANCELED" | "CANCELLED" => Self::Canceled,
            _ => Self::Other(value.to_string()),
        };
        Some(status)
    }
}

impl fmt::Display for CoretaxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => f.write_str("APPROVED"),
            Self::Amended => f.write_str("AMENDED"),
            Self::Canceled => f.write_str("CANCELED"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Coretax 导出行 (已校验)
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalRecord {
    /// 源表行号 (从1开始, 含表头)
    pub row: usize,
    pub reference: String,
    pub buyer_tax_id: String,
    pub invoice_date: NaiveDate,
    pub official_invoice_number: Option<String>,
    pub status: Option<CoretaxStatus>,
    /// 替代本发票的新发票号 (AmendedByTaxInvoiceNumber 列, 可选)
    pub amended_by: Option<String>,
}

impl ExternalRecord {
    pub fn official_number(&self) -> Option<&str> {
        self.official_invoice_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}
