pub mod coretax;
pub mod sheet;

pub use coretax::{read_coretax, relations_from_records, ParsedSheet, RowRejection};
pub use sheet::{read_sheet, RawRow, Sheet, SheetFormat};
