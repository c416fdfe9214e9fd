use serde::{Deserialize, Serialize};

/// 一次对账的统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStats {
    pub total_records: usize,
    pub records_with_invoice_number: usize,
    pub matched_records: usize,
    pub updated_records: usize,
    pub not_found_records: usize,
}
