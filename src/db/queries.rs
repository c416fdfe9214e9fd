use crate::models::{InvoiceUpdate, StoredInvoice};
use sqlx::PgPool;

/// 按 reference + 买方税号查询候选发票
pub async fn find_by_reference_and_buyer(
    pool: &PgPool,
    reference: &str,
    buyer_tax_id: &str,
) -> Result<Vec<StoredInvoice>, sqlx::Error> {
    sqlx::query_as::<_, StoredInvoice>(
        r#"
        SELECT id, reference, buyer_tax_id, invoice_date,
               official_invoice_number, status
        FROM faktur
        WHERE reference = $1
          AND buyer_tax_id = $2
        ORDER BY id
        "#,
    )
    .bind(reference)
    .bind(buyer_tax_id)
    .fetch_all(pool)
    .await
}

/// 回写正式发票号和状态, 返回影响行数
pub async fn update_official_number(
    pool: &PgPool,
    id: i64,
    update: &InvoiceUpdate,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE faktur
        SET official_invoice_number = $1,
            status = $2
        WHERE id = $3
        "#,
    )
    .bind(&update.official_invoice_number)
    .bind(update.status)
    .bind(id)
    .execute(pool)
    .await?;

    tracing::debug!("faktur {} updated, {} row(s)", id, result.rows_affected());
    Ok(result.rows_affected())
}
