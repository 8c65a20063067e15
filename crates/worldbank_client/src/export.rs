//! CSV export of the raw data sheet.

use std::io::Write;

use common::{Error, Result};
use tracing::info;

use crate::parser::select_data_sheet;
use crate::workbook::{Cell, Workbook};

/// Write the data sheet row-for-row as CSV. Returns the sheet name and row count.
///
/// Rows are padded to the widest row so the output is rectangular.
pub fn export_data_sheet_csv<W: Write>(
    workbook: &Workbook,
    writer: W,
) -> Result<(String, usize)> {
    let (sheet, _) = select_data_sheet(workbook)?;
    let width = sheet.rows.iter().map(Vec::len).max().unwrap_or(0);

    let mut csv_writer = csv::WriterBuilder::new()
        .flexible(false)
        .from_writer(writer);

    for row in &sheet.rows {
        let record: Vec<String> = (0..width)
            .map(|idx| row.get(idx).map(Cell::to_text).unwrap_or_default())
            .collect();
        csv_writer
            .write_record(&record)
            .map_err(|e| Error::Csv(e.to_string()))?;
    }
    csv_writer.flush()?;

    info!("Exported sheet {:?} ({} rows) to CSV", sheet.name, sheet.rows.len());
    Ok((sheet.name.clone(), sheet.rows.len()))
}
