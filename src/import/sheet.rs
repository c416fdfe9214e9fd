use calamine::{open_workbook_from_rs, Data, DataType, Reader, Xlsx};
use csv::{ReaderBuilder, Trim};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::str::FromStr;

use crate::error::ImportError;

/// 上传文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetFormat {
    #[default]
    Xlsx,
    Csv,
}

impl SheetFormat {
    /// 根据文件名扩展名判断格式
    pub fn from_file_name(name: &str) -> Result<Self, ImportError> {
        let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        ext.parse()
    }
}

impl FromStr for SheetFormat {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// 按表头取值的原始行
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    /// 源表行号 (表头为第1行)
    pub row: usize,
    pub cells: HashMap<String, String>,
    /// 以数字类型存储的单元格 (仅 xlsx), 前导零已丢失
    pub numeric: HashSet<String>,
}

impl RawRow {
    /// 缺失列返回空串
    pub fn get(&self, header: &str) -> &str {
        self.cells.get(header).map(String::as_str).unwrap_or("")
    }

    pub fn is_numeric(&self, header: &str) -> bool {
        self.numeric.contains(header)
    }
}

/// 解析后的工作表 (第一个 sheet)
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl Sheet {
    pub fn has_column(&self, header: &str) -> bool {
        self.headers.iter().any(|h| h == header)
    }
}

pub fn read_sheet(bytes: &[u8], format: SheetFormat) -> Result<Sheet, ImportError> {
    let sheet = match format {
        SheetFormat::Xlsx => read_xlsx(bytes)?,
        SheetFormat::Csv => read_csv(bytes)?,
    };
    tracing::debug!(
        "{:?} sheet read: {} columns, {} rows",
        format,
        sheet.headers.len(),
        sheet.rows.len()
    );
    Ok(sheet)
}

fn read_xlsx(bytes: &[u8]) -> Result<Sheet, ImportError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e: calamine::XlsxError| ImportError::Xlsx(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ImportError::EmptyWorkbook)?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ImportError::Xlsx(e.to_string()))?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or(ImportError::MissingHeader)?;
    let headers: Vec<String> = header_row.iter().map(cell_text).collect();

    let mut sheet = Sheet {
        headers,
        rows: Vec::new(),
    };
    for (idx, data_row) in rows.enumerate() {
        let values = data_row
            .iter()
            .map(|cell| (cell_text(cell), matches!(cell, Data::Int(_) | Data::Float(_))));
        push_row(&mut sheet, idx + 2, values);
    }
    Ok(sheet)
}

fn read_csv(bytes: &[u8]) -> Result<Sheet, ImportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ImportError::MissingHeader);
    }

    let mut sheet = Sheet {
        headers,
        rows: Vec::new(),
    };
    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let values = record.iter().map(|value| (value.to_string(), false));
        push_row(&mut sheet, idx + 2, values);
    }
    Ok(sheet)
}

/// 跳过完全空白的行; values 为 (文本, 是否数字单元格)
fn push_row(sheet: &mut Sheet, row: usize, values: impl Iterator<Item = (String, bool)>) {
    let mut cells = HashMap::new();
    let mut numeric = HashSet::new();
    for (header, (value, is_number)) in sheet.headers.iter().zip(values) {
        if header.is_empty() {
            continue;
        }
        if is_number {
            numeric.insert(header.clone());
        }
        cells.insert(header.clone(), value);
    }

    if cells.values().all(|v| v.is_empty()) {
        return;
    }
    sheet.rows.push(RawRow { row, cells, numeric });
}

/// Excel 日期单元格输出为 ISO 日期时间字符串
fn cell_text(cell: &Data) -> String {
    let text = match cell {
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            .unwrap_or_else(|| cell.to_string()),
        _ => cell.to_string(),
    };
    text.trim().to_string()
}
