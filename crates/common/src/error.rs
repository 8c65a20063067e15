//! Unified error type for PPP data ingestion.

use thiserror::Error;

/// Reasons a downloaded workbook could not be turned into PPP tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("workbook contains no sheets")]
    NoDataSheet,

    #[error("no \"Country Name\" header row within the first {0} rows")]
    NoHeaderRow(usize),

    #[error("header row is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Source returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Workbook decode error: {0}")]
    Workbook(String),

    #[error("Source produced no valid country rows")]
    EmptyResult,

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for failures of the transport or the remote endpoint.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Http(_) | Error::HttpStatus { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_names() {
        let err = Error::from(ParseError::MissingColumns(vec![
            "Country Name".into(),
            "Country Code".into(),
        ]));
        assert_eq!(
            err.to_string(),
            "Parse error: header row is missing required columns: Country Name, Country Code"
        );
    }

    #[test]
    fn test_is_network() {
        assert!(Error::Http("dns".into()).is_network());
        assert!(Error::HttpStatus { status: 503, message: String::new() }.is_network());
        assert!(!Error::EmptyResult.is_network());
    }
}
