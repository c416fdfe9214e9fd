use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::queries;
use crate::error::StoreError;
use crate::models::{InvoiceUpdate, StoredInvoice};

/// 发票存储接口, 匹配服务只通过它读写本地发票
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn find_invoices_by_reference_and_buyer(
        &self,
        reference: &str,
        buyer_tax_id: &str,
    ) -> Result<Vec<StoredInvoice>, StoreError>;

    async fn update_invoice(&self, id: i64, update: InvoiceUpdate) -> Result<(), StoreError>;
}

/// PostgreSQL 实现
pub struct PgInvoiceStore {
    pool: PgPool,
}

impl PgInvoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceStore for PgInvoiceStore {
    async fn find_invoices_by_reference_and_buyer(
        &self,
        reference: &str,
        buyer_tax_id: &str,
    ) -> Result<Vec<StoredInvoice>, StoreError> {
        Ok(queries::find_by_reference_and_buyer(&self.pool, reference, buyer_tax_id).await?)
    }

    async fn update_invoice(&self, id: i64, update: InvoiceUpdate) -> Result<(), StoreError> {
        let rows = queries::update_official_number(&self.pool, id, &update).await?;
        if rows == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }
}
