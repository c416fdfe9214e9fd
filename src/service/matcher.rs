use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::db::InvoiceStore;
use crate::models::{ExternalRecord, FakturStatus, InvoiceUpdate, MatchStats, StoredInvoice};

/// 单条记录的匹配结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    /// 无候选, 或多候选且无法唯一确定
    NotFound,
    Matched { updated: bool },
}

/// 候选发票筛选结果
#[derive(Debug, PartialEq)]
enum Resolution<'a> {
    Unique(&'a StoredInvoice),
    None,
    Ambiguous(usize),
}

/// Coretax 对账服务: 将正式发票号回写到本地发票
pub struct Matcher {
    store: Arc<dyn InvoiceStore>,
    concurrency: usize,
}

impl Matcher {
    pub fn new(store: Arc<dyn InvoiceStore>) -> Self {
        Self {
            store,
            concurrency: 1,
        }
    }

    /// 单批次内同时处理的记录数 (最小为1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// 批量对账入口
    ///
    /// 单条记录的失败 (无匹配、多匹配、存储错误) 只计入统计, 不中断批次
    pub async fn reconcile(&self, records: Vec<ExternalRecord>) -> MatchStats {
        let total_records = records.len();
        let with_number: Vec<ExternalRecord> = records
            .into_iter()
            .filter(|r| r.official_number().is_some())
            .collect();

        let mut stats = MatchStats {
            total_records,
            records_with_invoice_number: with_number.len(),
            ..MatchStats::default()
        };

        tracing::info!(
            "Coretax reconcile started: {} records, {} with invoice number",
            total_records,
            stats.records_with_invoice_number
        );

        let outcomes: Vec<RecordOutcome> = stream::iter(with_number)
            .map(|record| async move { self.reconcile_record(&record).await })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                RecordOutcome::NotFound => stats.not_found_records += 1,
                RecordOutcome::Matched { updated } => {
                    stats.matched_records += 1;
                    if updated {
                        stats.updated_records += 1;
                    }
                }
            }
        }

        tracing::info!(
            "Coretax reconcile finished: matched {}, updated {}, not found {}",
            stats.matched_records,
            stats.updated_records,
            stats.not_found_records
        );
        stats
    }

    async fn reconcile_record(&self, record: &ExternalRecord) -> RecordOutcome {
        let Some(official_number) = record.official_number() else {
            return RecordOutcome::NotFound;
        };

        let candidates = match self
            .store
            .find_invoices_by_reference_and_buyer(&record.reference, &record.buyer_tax_id)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(
                    "Row {}: lookup failed for reference {}: {}",
                    record.row,
                    record.reference,
                    e
                );
                return RecordOutcome::NotFound;
            }
        };

        let invoice = match resolve_candidate(record, &candidates) {
            Resolution::Unique(invoice) => invoice,
            Resolution::None => {
                tracing::debug!(
                    "Row {}: no faktur for reference {} / buyer {}",
                    record.row,
                    record.reference,
                    record.buyer_tax_id
                );
                return RecordOutcome::NotFound;
            }
            Resolution::Ambiguous(count) => {
                tracing::warn!(
                    "Row {}: {} faktur share reference {} / buyer {} / date {}, skipped",
                    record.row,
                    count,
                    record.reference,
                    record.buyer_tax_id,
                    record.invoice_date
                );
                return RecordOutcome::NotFound;
            }
        };

        if invoice.official_number() == Some(official_number) {
            return RecordOutcome::Matched { updated: false };
        }

        let update = InvoiceUpdate {
            official_invoice_number: official_number.to_string(),
            status: FakturStatus::from_coretax(record.status.as_ref()),
        };
        match self.store.update_invoice(invoice.id, update).await {
            Ok(()) => {
                tracing::debug!(
                    "Row {}: faktur {} set to {}",
                    record.row,
                    invoice.id,
                    official_number
                );
                RecordOutcome::Matched { updated: true }
            }
            Err(e) => {
                tracing::error!("Row {}: update of faktur {} failed: {}", record.row, invoice.id, e);
                RecordOutcome::Matched { updated: false }
            }
        }
    }
}

/// 逐级缩小候选范围, 剩余一条即停止
///
/// 1. reference + 买方税号 (由存储查询完成)
/// 2. 发票日期 (只比较日期部分)
/// 3. 金额比对尚未实现, 仍有多条时视为无法唯一匹配
fn resolve_candidate<'a>(record: &ExternalRecord, candidates: &'a [StoredInvoice]) -> Resolution<'a> {
    match candidates {
        [] => return Resolution::None,
        [only] => return Resolution::Unique(only),
        _ => {}
    }

    let same_date: Vec<&StoredInvoice> = candidates
        .iter()
        .filter(|c| c.invoice_date.date() == record.invoice_date)
        .collect();

    match same_date.as_slice() {
        [] => Resolution::None,
        [only] => Resolution::Unique(*only),
        many => Resolution::Ambiguous(many.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryInvoiceStore;
    use crate::error::StoreError;
    use crate::models::CoretaxStatus;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stored(id: i64, reference: &str, buyer: &str, day: NaiveDate) -> StoredInvoice {
        StoredInvoice {
            id,
            reference: reference.to_string(),
            buyer_tax_id: buyer.to_string(),
            invoice_date: day.and_hms_opt(14, 5, 0).unwrap(),
            official_invoice_number: None,
            status: FakturStatus::Draft,
        }
    }

    fn record(reference: &str, buyer: &str, day: NaiveDate, number: Option<&str>) -> ExternalRecord {
        ExternalRecord {
            row: 2,
            reference: reference.to_string(),
            buyer_tax_id: buyer.to_string(),
            invoice_date: day,
            official_invoice_number: number.map(str::to_string),
            status: Some(CoretaxStatus::Approved),
            amended_by: None,
        }
    }

    fn assert_invariants(stats: &MatchStats) {
        assert!(stats.records_with_invoice_number <= stats.total_records);
        assert!(stats.matched_records <= stats.records_with_invoice_number);
        assert!(stats.updated_records <= stats.matched_records);
        assert_eq!(
            stats.not_found_records,
            stats.records_with_invoice_number - stats.matched_records
        );
    }

    #[tokio::test]
    async fn test_single_candidate_is_matched_and_updated() {
        let store = Arc::new(MemoryInvoiceStore::with_invoices([stored(
            1,
            "REF-1",
            "0101",
            date(2024, 3, 1),
        )]));
        let matcher = Matcher::new(store.clone());

        // 唯一候选时不比较日期
        let stats = matcher
            .reconcile(vec![record("REF-1", "0101", date(2024, 3, 9), Some("04002400000001"))])
            .await;

        assert_eq!(stats.matched_records, 1);
        assert_eq!(stats.updated_records, 1);
        assert_invariants(&stats);
        let invoice = store.get(1).unwrap();
        assert_eq!(invoice.official_number(), Some("04002400000001"));
        assert_eq!(invoice.status, FakturStatus::Approved);
    }

    #[tokio::test]
    async fn test_records_without_number_only_count_in_total() {
        let store = Arc::new(MemoryInvoiceStore::with_invoices([stored(
            1,
            "REF-1",
            "0101",
            date(2024, 3, 1),
        )]));
        let matcher = Matcher::new(store.clone());

        let stats = matcher
            .reconcile(vec![
                record("REF-1", "0101", date(2024, 3, 1), None),
                record("REF-1", "0101", date(2024, 3, 1), Some("  ")),
            ])
            .await;

        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.records_with_invoice_number, 0);
        assert_eq!(stats.not_found_records, 0);
        assert_eq!(store.get(1).unwrap().official_invoice_number, None);
    }

    #[tokio::test]
    async fn test_date_narrows_between_candidates() {
        let store = Arc::new(MemoryInvoiceStore::with_invoices([
            stored(1, "REF-1", "0101", date(2024, 3, 1)),
            stored(2, "REF-1", "0101", date(2024, 3, 2)),
        ]));
        let matcher = Matcher::new(store.clone());

        let stats = matcher
            .reconcile(vec![
                record("REF-1", "0101", date(2024, 3, 2), Some("NSFP-2")),
                record("REF-1", "0101", date(2024, 3, 5), Some("NSFP-X")),
            ])
            .await;

        assert_eq!(stats.matched_records, 1);
        assert_eq!(stats.not_found_records, 1);
        assert_invariants(&stats);
        assert_eq!(store.get(1).unwrap().official_invoice_number, None);
        assert_eq!(store.get(2).unwrap().official_number(), Some("NSFP-2"));
    }

    #[tokio::test]
    async fn test_same_day_duplicates_are_not_guessed() {
        let store = Arc::new(MemoryInvoiceStore::with_invoices([
            stored(1, "REF-1", "0101", date(2024, 3, 1)),
            stored(2, "REF-1", "0101", date(2024, 3, 1)),
        ]));
        let matcher = Matcher::new(store.clone());

        let stats = matcher
            .reconcile(vec![record("REF-1", "0101", date(2024, 3, 1), Some("NSFP-1"))])
            .await;

        assert_eq!(stats.matched_records, 0);
        assert_eq!(stats.not_found_records, 1);
        assert_eq!(store.get(1).unwrap().official_invoice_number, None);
        assert_eq!(store.get(2).unwrap().official_invoice_number, None);
    }

    #[tokio::test]
    async fn test_second_run_updates_nothing() {
        let store = Arc::new(MemoryInvoiceStore::with_invoices([
            stored(1, "REF-1", "0101", date(2024, 3, 1)),
            stored(2, "REF-2", "0101", date(2024, 3, 1)),
        ]));
        let matcher = Matcher::new(store.clone()).with_concurrency(4);
        let batch = vec![
            record("REF-1", "0101", date(2024, 3, 1), Some("NSFP-1")),
            record("REF-2", "0101", date(2024, 3, 1), Some("NSFP-2")),
            record("REF-3", "0101", date(2024, 3, 1), Some("NSFP-3")),
        ];

        let first = matcher.reconcile(batch.clone()).await;
        let second = matcher.reconcile(batch).await;

        assert_eq!(first.updated_records, 2);
        assert_eq!(second.updated_records, 0);
        assert_eq!(first.matched_records, second.matched_records);
        assert_invariants(&first);
        assert_invariants(&second);
    }

    #[tokio::test]
    async fn test_status_mapping_on_update() {
        let store = Arc::new(MemoryInvoiceStore::with_invoices([
            stored(1, "REF-1", "0101", date(2024, 3, 1)),
            stored(2, "REF-2", "0101", date(2024, 3, 1)),
            stored(3, "REF-3", "0101", date(2024, 3, 1)),
        ]));
        let matcher = Matcher::new(store.clone());

        let mut canceled = record("REF-1", "0101", date(2024, 3, 1), Some("N-1"));
        canceled.status = CoretaxStatus::parse("CANCELED");
        let mut unknown = record("REF-2", "0101", date(2024, 3, 1), Some("N-2"));
        unknown.status = CoretaxStatus::parse("CREATED");
        let mut missing = record("REF-3", "0101", date(2024, 3, 1), Some("N-3"));
        missing.status = None;

        matcher.reconcile(vec![canceled, unknown, missing]).await;

        assert_eq!(store.get(1).unwrap().status, FakturStatus::Cancelled);
        assert_eq!(store.get(2).unwrap().status, FakturStatus::Draft);
        assert_eq!(store.get(3).unwrap().status, FakturStatus::Draft);
    }

    /// 读取 REF-BROKEN 时失败, 所有写入失败
    struct FlakyStore {
        inner: MemoryInvoiceStore,
    }

    #[async_trait]
    impl InvoiceStore for FlakyStore {
        async fn find_invoices_by_reference_and_buyer(
            &self,
            reference: &str,
            buyer_tax_id: &str,
        ) -> Result<Vec<StoredInvoice>, StoreError> {
            if reference == "REF-BROKEN" {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            self.inner
                .find_invoices_by_reference_and_buyer(reference, buyer_tax_id)
                .await
        }

        async fn update_invoice(&self, _id: i64, _update: InvoiceUpdate) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
    }

    #[tokio::test]
    async fn test_storage_failures_do_not_abort_batch() {
        let store = Arc::new(FlakyStore {
            inner: MemoryInvoiceStore::with_invoices([stored(1, "REF-1", "0101", date(2024, 3, 1))]),
        });
        let matcher = Matcher::new(store);

        let stats = matcher
            .reconcile(vec![
                record("REF-BROKEN", "0101", date(2024, 3, 1), Some("N-0")),
                record("REF-1", "0101", date(2024, 3, 1), Some("N-1")),
            ])
            .await;

        assert_eq!(stats.records_with_invoice_number, 2);
        assert_eq!(stats.matched_records, 1);
        assert_eq!(stats.updated_records, 0);
        assert_eq!(stats.not_found_records, 1);
        assert_invariants(&stats);
    }

    #[test]
    fn test_resolve_ignores_time_of_day() {
        let mut late = stored(2, "REF-1", "0101", date(2024, 3, 1));
        late.invoice_date = date(2024, 3, 1).and_hms_opt(23, 59, 59).unwrap();
        let candidates = vec![stored(1, "REF-1", "0101", date(2024, 2, 29)), late];
        let rec = record("REF-1", "0101", date(2024, 3, 1), Some("N"));

        match resolve_candidate(&rec, &candidates) {
            Resolution::Unique(invoice) => assert_eq!(invoice.id, 2),
            other => panic!("unexpected resolution: {:?}", other),
        }
    }
}
