use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::FakturStatus;

/// 发票修订关系 (扁平记录)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRelation {
    pub invoice_number: String,
    /// 替代本发票的发票号
    #[serde(default)]
    pub amended_invoice_number: Option<String>,
    pub status: FakturStatus,
    pub reference: String,
    pub date: NaiveDate,
}

impl InvoiceRelation {
    pub fn amended_by(&self) -> Option<&str> {
        self.amended_invoice_number
            .as_deref()
            .filter(|n| !n.is_empty())
    }
}

/// 修订链中的一张发票
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEntry {
    pub invoice_number: String,
    /// 被引用但本组内没有自身记录的发票为 None
    pub status: Option<FakturStatus>,
    pub date: Option<NaiveDate>,
    pub is_latest: bool,
}

/// 修订链: invoices 按从新到旧排列, invoices[0] 为最新
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceChain {
    pub reference: String,
    pub invoices: Vec<ChainEntry>,
}

impl InvoiceChain {
    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }

    pub fn latest(&self) -> Option<&ChainEntry> {
        self.invoices.first()
    }
}
