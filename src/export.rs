use std::io::Write;

use crate::models::InvoiceChain;

const CHAIN_CSV_HEADER: [&str; 7] = [
    "reference",
    "chain_index",
    "position",
    "invoice_number",
    "status",
    "date",
    "is_latest",
];

/// 导出修订链到 CSV, 每张发票一行 (position 0 为最新)
pub fn write_chains_csv<W: Write>(chains: &[InvoiceChain], writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(CHAIN_CSV_HEADER)?;

    for (chain_index, chain) in chains.iter().enumerate() {
        for (position, entry) in chain.invoices.iter().enumerate() {
            writer.write_record(&[
                chain.reference.clone(),
                chain_index.to_string(),
                position.to_string(),
                entry.invoice_number.clone(),
                entry.status.map(|s| s.as_str().to_string()).unwrap_or_default(),
                entry.date.map(|d| d.to_string()).unwrap_or_default(),
                entry.is_latest.to_string(),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}
