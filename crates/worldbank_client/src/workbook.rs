//! In-memory workbook model.
//!
//! The downloaded file is decoded once with calamine into plain grids so the
//! parser never touches format-specific types.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Reader};
use chrono::NaiveTime;
use common::{Error, Result};
use tracing::debug;

/// A single decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Numeric payload, if this is a number cell.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Text rendering used for headers, labels, and CSV output.
    ///
    /// Integral numbers render without a fractional part so a year header
    /// stored as `1991.0` reads as `"1991"`.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", *v as i64),
            Cell::Number(v) => v.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }

}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

/// A named worksheet as a row-major grid anchored at A1.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// All sheets of a workbook, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    /// Decode xls/xlsx/xlsb/ods bytes. The format is sniffed from the content.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut reader = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| Error::Workbook(e.to_string()))?;

        let mut sheets = Vec::new();
        for name in reader.sheet_names() {
            let range = reader
                .worksheet_range(&name)
                .map_err(|e| Error::Workbook(format!("sheet {name:?}: {e}")))?;

            // calamine ranges start at the first used cell, not A1.
            let (row_offset, col_offset) = range
                .start()
                .map(|(r, c)| (r as usize, c as usize))
                .unwrap_or((0, 0));

            let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
            for raw in range.rows() {
                let mut row = vec![Cell::Empty; col_offset];
                row.extend(raw.iter().map(convert_cell));
                rows.push(row);
            }

            debug!("Decoded sheet {:?}: {} rows", name, rows.len());
            sheets.push(Sheet { name, rows });
        }

        Ok(Self { sheets })
    }
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(v) => Cell::Number(*v),
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(v) => convert_datetime(v),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}

/// Date-formatted cells keep their calendar form; durations stay numeric.
fn convert_datetime(v: &ExcelDateTime) -> Cell {
    if v.is_duration() {
        return Cell::Number(v.as_f64());
    }
    match v.as_datetime() {
        Some(dt) if dt.time() == NaiveTime::MIN => Cell::Text(dt.format("%Y-%m-%d").to_string()),
        Some(dt) => Cell::Text(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
        None => Cell::Number(v.as_f64()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::ExcelDateTimeType;

    #[test]
    fn test_cell_text_rendering() {
        assert_eq!(Cell::Number(1991.0).to_text(), "1991");
        assert_eq!(Cell::Number(0.25).to_text(), "0.25");
        assert_eq!(Cell::Empty.to_text(), "");
        assert_eq!(Cell::from("..").to_text(), "..");
    }

    #[test]
    fn test_convert_cell_variants() {
        assert_eq!(convert_cell(&Data::Int(7)), Cell::Number(7.0));
        assert_eq!(convert_cell(&Data::String(String::new())), Cell::Empty);
        assert_eq!(convert_cell(&Data::String("USA".into())), Cell::Text("USA".into()));
        assert_eq!(convert_cell(&Data::Bool(true)), Cell::Bool(true));
    }

    #[test]
    fn test_date_cells_render_as_iso_text() {
        let date = Data::DateTime(ExcelDateTime::new(45471.0, ExcelDateTimeType::DateTime, false));
        assert_eq!(convert_cell(&date), Cell::Text("2024-06-28".into()));

        let stamped = Data::DateTime(ExcelDateTime::new(45471.5, ExcelDateTimeType::DateTime, false));
        assert_eq!(convert_cell(&stamped), Cell::Text("2024-06-28T12:00:00".into()));

        let span = Data::DateTime(ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false));
        assert_eq!(convert_cell(&span), Cell::Number(1.5));
    }

    #[test]
    fn test_garbage_bytes_are_a_workbook_error() {
        let err = Workbook::from_bytes(b"definitely not a spreadsheet".to_vec())
            .expect_err("garbage should not decode");
        assert!(matches!(err, Error::Workbook(_)));
    }
}
