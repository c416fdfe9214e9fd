use chrono::NaiveDate;
use serde::Serialize;

use crate::error::ImportError;
use crate::import::sheet::{read_sheet, RawRow, Sheet, SheetFormat};
use crate::models::{CoretaxStatus, ExternalRecord, FakturStatus, InvoiceRelation};

pub const COL_REFERENCE: &str = "Reference";
pub const COL_BUYER_TIN: &str = "BuyerTIN";
pub const COL_INVOICE_NUMBER: &str = "TaxInvoiceNumber";
pub const COL_INVOICE_DATE: &str = "TaxInvoiceDate";
pub const COL_STATUS: &str = "TaxInvoiceStatus";
/// 可选列: 替代本发票的新发票号
pub const COL_AMENDED_BY: &str = "AmendedByTaxInvoiceNumber";

/// 前导零有意义的编号列, 不能以数字单元格读取
const ID_COLUMNS: [&str; 3] = [COL_BUYER_TIN, COL_INVOICE_NUMBER, COL_AMENDED_BY];

const REQUIRED_COLUMNS: [&str; 5] = [
    COL_REFERENCE,
    COL_BUYER_TIN,
    COL_INVOICE_NUMBER,
    COL_INVOICE_DATE,
    COL_STATUS,
];

/// 被隔离的行及原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowRejection {
    pub row: usize,
    pub reason: String,
}

/// Coretax 导出解析结果
#[derive(Debug, Clone, Default)]
pub struct ParsedSheet {
    pub records: Vec<ExternalRecord>,
    pub rejected: Vec<RowRejection>,
}

/// 读取上传文件并校验为 Coretax 记录
pub fn read_coretax(bytes: &[u8], format: SheetFormat) -> Result<ParsedSheet, ImportError> {
    let sheet = read_sheet(bytes, format)?;
    parse_records(&sheet)
}

/// 缺少必需列时整批失败; 单行字段不合法时隔离该行
pub fn parse_records(sheet: &Sheet) -> Result<ParsedSheet, ImportError> {
    if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !sheet.has_column(c)) {
        return Err(ImportError::MissingColumn(*missing));
    }

    let mut parsed = ParsedSheet::default();
    for raw in &sheet.rows {
        match parse_row(raw) {
            Ok(record) => parsed.records.push(record),
            Err(reason) => {
                tracing::warn!("Coretax row {} rejected: {}", raw.row, reason);
                parsed.rejected.push(RowRejection {
                    row: raw.row,
                    reason,
                });
            }
        }
    }

    tracing::info!(
        "Coretax sheet parsed: {} records, {} rejected",
        parsed.records.len(),
        parsed.rejected.len()
    );
    Ok(parsed)
}

fn parse_row(raw: &RawRow) -> Result<ExternalRecord, String> {
    if let Some(column) = ID_COLUMNS.iter().find(|c| raw.is_numeric(c)) {
        return Err(format!(
            "{} is stored as a number, leading zeros may be lost; format the column as text",
            column
        ));
    }
    let reference = raw.get(COL_REFERENCE);
    if reference.is_empty() {
        return Err(format!("{} is empty", COL_REFERENCE));
    }
    let buyer_tax_id = raw.get(COL_BUYER_TIN);
    if buyer_tax_id.is_empty() {
        return Err(format!("{} is empty", COL_BUYER_TIN));
    }
    let date_raw = raw.get(COL_INVOICE_DATE);
    let invoice_date = parse_invoice_date(date_raw)
        .ok_or_else(|| format!("{} {:?} is not a date", COL_INVOICE_DATE, date_raw))?;

    Ok(ExternalRecord {
        row: raw.row,
        reference: reference.to_string(),
        buyer_tax_id: buyer_tax_id.to_string(),
        invoice_date,
        official_invoice_number: non_empty(raw.get(COL_INVOICE_NUMBER)),
        status: CoretaxStatus::parse(raw.get(COL_STATUS)),
        amended_by: non_empty(raw.get(COL_AMENDED_BY)),
    })
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// ISO 日期时间字符串截取日期部分: `2024-01-31T10:00:00+07:00` → 2024-01-31
pub fn parse_invoice_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// 有正式发票号的记录转为修订关系
pub fn relations_from_records(records: &[ExternalRecord]) -> Vec<InvoiceRelation> {
    records
        .iter()
        .filter_map(|record| {
            let number = record.official_number()?;
            Some(InvoiceRelation {
                invoice_number: number.to_string(),
                amended_invoice_number: record.amended_by.clone(),
                status: FakturStatus::from_coretax(record.status.as_ref()),
                reference: record.reference.clone(),
                date: record.invoice_date,
            })
        })
        .collect()
}
