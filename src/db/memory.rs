use async_trait::async_trait;
use dashmap::DashMap;

use crate::db::InvoiceStore;
use crate::error::StoreError;
use crate::models::{InvoiceUpdate, StoredInvoice};

/// 内存实现 (测试 / storage.backend = "memory")
#[derive(Debug, Default)]
pub struct MemoryInvoiceStore {
    invoices: DashMap<i64, StoredInvoice>,
}

impl MemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_invoices(invoices: impl IntoIterator<Item = StoredInvoice>) -> Self {
        let store = Self::new();
        for invoice in invoices {
            store.insert(invoice);
        }
        store
    }

    pub fn insert(&self, invoice: StoredInvoice) {
        self.invoices.insert(invoice.id, invoice);
    }

    pub fn get(&self, id: i64) -> Option<StoredInvoice> {
        self.invoices.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }
}

#[async_trait]
impl InvoiceStore for MemoryInvoiceStore {
    async fn find_invoices_by_reference_and_buyer(
        &self,
        reference: &str,
        buyer_tax_id: &str,
    ) -> Result<Vec<StoredInvoice>, StoreError> {
        let mut found: Vec<StoredInvoice> = self
            .invoices
            .iter()
            .filter(|entry| entry.reference == reference && entry.buyer_tax_id == buyer_tax_id)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|invoice| invoice.id);
        Ok(found)
    }

    async fn update_invoice(&self, id: i64, update: InvoiceUpdate) -> Result<(), StoreError> {
        let mut invoice = self
            .invoices
            .get_mut(&id)
            .ok_or(StoreError::NotFound { id })?;
        invoice.official_invoice_number = Some(update.official_invoice_number);
        invoice.status = update.status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FakturStatus;
    use chrono::NaiveDate;

    fn invoice(id: i64, reference: &str, buyer: &str) -> StoredInvoice {
        StoredInvoice {
            id,
            reference: reference.to_string(),
            buyer_tax_id: buyer.to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            official_invoice_number: None,
            status: FakturStatus::Draft,
        }
    }

    #[tokio::test]
    async fn test_find_filters_by_reference_and_buyer() {
        let store = MemoryInvoiceStore::with_invoices([
            invoice(3, "REF-1", "0101"),
            invoice(1, "REF-1", "0101"),
            invoice(2, "REF-1", "0202"),
            invoice(4, "REF-2", "0101"),
        ]);

        let found = store
            .find_invoices_by_reference_and_buyer("REF-1", "0101")
            .await
            .unwrap();
        let ids: Vec<i64> = found.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_update_missing_invoice_is_not_found() {
        let store = MemoryInvoiceStore::new();
        let err = store
            .update_invoice(
                42,
                InvoiceUpdate {
                    official_invoice_number: "010.000-24.00000001".to_string(),
                    status: FakturStatus::Approved,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 42 }));
    }
}
