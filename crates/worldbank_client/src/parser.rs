//! PPP workbook parser.
//!
//! Locates the data sheet and its header row, then turns every accepted
//! country row into metadata plus year-indexed factors.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use common::config::ParserConfig;
use common::{
    is_valid_factor, CountryRecord, HistoricalSeries, ParseError, YearPoint, YearTable,
};
use regex::Regex;
use tracing::{debug, info};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::workbook::{Cell, Sheet, Workbook};

pub const COUNTRY_NAME_HEADER: &str = "Country Name";
pub const COUNTRY_CODE_HEADER: &str = "Country Code";
pub const LAST_UPDATED_LABEL: &str = "Last Updated Date";

/// Output of a successful parse. `year_table` and `historical` hold exactly
/// the same (country, year, factor) triples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTables {
    /// Sorted by name, collation-style.
    pub countries: Vec<CountryRecord>,
    pub year_table: YearTable,
    pub historical: HistoricalSeries,
    pub latest_year: Option<i32>,
    /// "Last Updated Date" from the sheet preamble, when present.
    pub source_timestamp: Option<String>,
}

impl ParsedTables {
    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

// ── Sheet selection ───────────────────────────────────────────────────

/// One named rule for picking the data sheet.
#[derive(Debug, Clone, Copy)]
pub struct SheetStrategy {
    pub name: &'static str,
    pub select: fn(&[Sheet]) -> Option<usize>,
}

/// Tried in order; the first match wins.
pub const SHEET_STRATEGIES: &[SheetStrategy] = &[
    SheetStrategy {
        name: "named-data",
        select: select_named_data,
    },
    SheetStrategy {
        name: "first-non-metadata",
        select: select_first_non_metadata,
    },
    SheetStrategy {
        name: "first-sheet",
        select: select_first,
    },
];

fn select_named_data(sheets: &[Sheet]) -> Option<usize> {
    sheets.iter().position(|s| s.name == "Data")
}

fn select_first_non_metadata(sheets: &[Sheet]) -> Option<usize> {
    sheets
        .iter()
        .position(|s| !s.name.to_lowercase().contains("metadata"))
}

fn select_first(sheets: &[Sheet]) -> Option<usize> {
    if sheets.is_empty() {
        None
    } else {
        Some(0)
    }
}

/// Pick the data sheet, returning it with the name of the strategy that matched.
pub fn select_data_sheet(workbook: &Workbook) -> Result<(&Sheet, &'static str), ParseError> {
    SHEET_STRATEGIES
        .iter()
        .find_map(|strategy| {
            (strategy.select)(&workbook.sheets).map(|idx| (&workbook.sheets[idx], strategy.name))
        })
        .ok_or(ParseError::NoDataSheet)
}

// ── Header discovery ──────────────────────────────────────────────────

/// Index of the first row (within `scan_rows`) whose first cell is "Country Name".
pub fn find_header_row(rows: &[Vec<Cell>], scan_rows: usize) -> Option<usize> {
    rows.iter().take(scan_rows).position(|row| {
        row.first()
            .map(|cell| cell.to_text().trim() == COUNTRY_NAME_HEADER)
            .unwrap_or(false)
    })
}

/// Column layout derived from the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub name_col: usize,
    pub code_col: usize,
    /// (column index, year), in column order. Each year appears once.
    pub year_cols: Vec<(usize, i32)>,
}

impl ColumnMap {
    /// Rows shorter than this cannot carry name and code.
    pub fn min_row_len(&self) -> usize {
        self.name_col.max(self.code_col) + 1
    }
}

fn year_pattern() -> &'static Regex {
    static YEAR: OnceLock<Regex> = OnceLock::new();
    YEAR.get_or_init(|| Regex::new(r"^\d{4}$").expect("static regex is valid"))
}

pub fn map_columns(header: &[Cell], min_year: Option<i32>) -> Result<ColumnMap, ParseError> {
    let labels: Vec<String> = header.iter().map(|c| c.to_text().trim().to_string()).collect();

    let name_col = labels.iter().position(|l| l == COUNTRY_NAME_HEADER);
    let code_col = labels.iter().position(|l| l == COUNTRY_CODE_HEADER);

    let (name_col, code_col) = match (name_col, code_col) {
        (Some(n), Some(c)) => (n, c),
        (n, c) => {
            let mut missing = Vec::new();
            if n.is_none() {
                missing.push(COUNTRY_NAME_HEADER.to_string());
            }
            if c.is_none() {
                missing.push(COUNTRY_CODE_HEADER.to_string());
            }
            return Err(ParseError::MissingColumns(missing));
        }
    };

    let mut seen = HashSet::new();
    let year_cols = labels
        .iter()
        .enumerate()
        .filter(|(_, label)| year_pattern().is_match(label))
        .filter_map(|(idx, label)| label.parse::<i32>().ok().map(|year| (idx, year)))
        .filter(|(_, year)| min_year.map_or(true, |min| *year >= min))
        .filter(|(_, year)| seen.insert(*year))
        .collect();

    Ok(ColumnMap {
        name_col,
        code_col,
        year_cols,
    })
}

// ── Preamble ──────────────────────────────────────────────────────────

/// Value next to "Last Updated Date" in the first `scan_rows` rows.
pub fn find_last_updated(rows: &[Vec<Cell>], scan_rows: usize) -> Option<String> {
    rows.iter().take(scan_rows).find_map(|row| {
        let label = row.first()?.to_text();
        if label.trim() != LAST_UPDATED_LABEL {
            return None;
        }
        let value = row.get(1)?.to_text().trim().to_string();
        (!value.is_empty()).then_some(value)
    })
}

// ── Ordering ──────────────────────────────────────────────────────────

/// Accent- and case-insensitive sort key, so "Côte d'Ivoire" sorts with "C".
pub fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

// ── Extraction ────────────────────────────────────────────────────────

pub fn parse_workbook(workbook: &Workbook, cfg: &ParserConfig) -> Result<ParsedTables, ParseError> {
    let (sheet, strategy) = select_data_sheet(workbook)?;
    debug!("Using sheet {:?} (strategy: {})", sheet.name, strategy);
    parse_sheet(sheet, cfg)
}

pub fn parse_sheet(sheet: &Sheet, cfg: &ParserConfig) -> Result<ParsedTables, ParseError> {
    let header_idx = find_header_row(&sheet.rows, cfg.header_scan_rows)
        .ok_or(ParseError::NoHeaderRow(cfg.header_scan_rows))?;
    let columns = map_columns(&sheet.rows[header_idx], cfg.min_year)?;

    let mut countries: Vec<CountryRecord> = Vec::new();
    let mut seen_codes: HashSet<String> = HashSet::new();
    let mut year_table = YearTable::new();
    let mut historical: HistoricalSeries = HashMap::new();
    let mut skipped = 0usize;

    for row in sheet.rows.iter().skip(header_idx + 1) {
        if row.len() < columns.min_row_len() {
            skipped += 1;
            continue;
        }

        let name = row[columns.name_col].to_text().trim().to_string();
        let code = row[columns.code_col].to_text().trim().to_string();
        if name.is_empty() || code.chars().count() != 3 {
            skipped += 1;
            continue;
        }
        // First occurrence of a code is authoritative; later rows are dropped whole.
        if !seen_codes.insert(code.clone()) {
            skipped += 1;
            continue;
        }

        let mut points = Vec::new();
        for &(col, year) in &columns.year_cols {
            let Some(value) = row.get(col).and_then(Cell::as_number) else {
                continue;
            };
            if !is_valid_factor(value) {
                continue;
            }
            year_table.entry(year).or_default().insert(code.clone(), value);
            points.push(YearPoint { year, factor: value });
        }

        if !points.is_empty() {
            points.sort_by_key(|p| p.year);
            historical.insert(code.clone(), points);
        }

        countries.push(CountryRecord {
            code,
            name,
            currency_symbol: None,
        });
    }

    countries.sort_by(|a, b| compare_names(&a.name, &b.name));
    let latest_year = year_table.keys().next_back().copied();

    info!(
        "Parsed {} countries across {} years (latest: {:?}, skipped rows: {})",
        countries.len(),
        year_table.len(),
        latest_year,
        skipped
    );

    Ok(ParsedTables {
        countries,
        year_table,
        historical,
        latest_year,
        source_timestamp: find_last_updated(&sheet.rows, cfg.timestamp_scan_rows),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: Vec<Cell>) -> Vec<Cell> {
        cells
    }

    fn header(extra_years: &[&str]) -> Vec<Cell> {
        let mut cells = vec![
            Cell::from("Country Name"),
            Cell::from("Country Code"),
            Cell::from("Indicator Name"),
            Cell::from("Indicator Code"),
        ];
        cells.extend(extra_years.iter().map(|y| Cell::from(*y)));
        cells
    }

    fn cfg() -> ParserConfig {
        ParserConfig::default()
    }

    fn world_bank_sheet() -> Sheet {
        Sheet::new(
            "Data",
            vec![
                row(vec![Cell::from("Data Source"), Cell::from("World Development Indicators")]),
                row(vec![Cell::from("Last Updated Date"), Cell::from("2024-06-28")]),
                row(vec![]),
                header(&["1989", "1990", "1991", "1992"]),
                row(vec![
                    Cell::from("Zimbabwe"),
                    Cell::from("ZWE"),
                    Cell::from("PPP"),
                    Cell::from("PA.NUS.PPP"),
                    Cell::from(9.0),
                    Cell::from(0.5),
                    Cell::from(0.6),
                    Cell::from(".."),
                ]),
                row(vec![
                    Cell::from("Albania"),
                    Cell::from("ALB"),
                    Cell::from("PPP"),
                    Cell::from("PA.NUS.PPP"),
                    Cell::Empty,
                    Cell::from(0.0),
                    Cell::from(12.5),
                    Cell::from(20.0),
                ]),
                row(vec![
                    Cell::from("Côte d'Ivoire"),
                    Cell::from("CIV"),
                ]),
            ],
        )
    }

    #[test]
    fn test_sheet_strategy_prefers_named_data() {
        let wb = Workbook::new(vec![
            Sheet::new("Metadata - Countries", vec![]),
            Sheet::new("Other", vec![]),
            Sheet::new("Data", vec![]),
        ]);
        let (sheet, strategy) = select_data_sheet(&wb).expect("sheet");
        assert_eq!(sheet.name, "Data");
        assert_eq!(strategy, "named-data");
    }

    #[test]
    fn test_sheet_strategy_skips_metadata() {
        let wb = Workbook::new(vec![
            Sheet::new("METADATA", vec![]),
            Sheet::new("Sheet2", vec![]),
        ]);
        let (sheet, strategy) = select_data_sheet(&wb).expect("sheet");
        assert_eq!(sheet.name, "Sheet2");
        assert_eq!(strategy, "first-non-metadata");
    }

    #[test]
    fn test_sheet_strategy_falls_back_to_first() {
        let wb = Workbook::new(vec![
            Sheet::new("Metadata - Indicators", vec![]),
            Sheet::new("metadata - countries", vec![]),
        ]);
        let (sheet, strategy) = select_data_sheet(&wb).expect("sheet");
        assert_eq!(sheet.name, "Metadata - Indicators");
        assert_eq!(strategy, "first-sheet");
    }

    #[test]
    fn test_no_sheets() {
        let wb = Workbook::default();
        assert_eq!(select_data_sheet(&wb).unwrap_err(), ParseError::NoDataSheet);
        assert_eq!(parse_workbook(&wb, &cfg()).unwrap_err(), ParseError::NoDataSheet);
    }

    #[test]
    fn test_header_must_be_within_scan_bound() {
        let mut rows = vec![vec![Cell::from("noise")]; 10];
        rows.push(header(&["1991"]));
        let sheet = Sheet::new("Data", rows);
        assert_eq!(parse_sheet(&sheet, &cfg()).unwrap_err(), ParseError::NoHeaderRow(10));
    }

    #[test]
    fn test_header_first_cell_is_trimmed() {
        let rows = vec![vec![Cell::from("  Country Name ")]];
        assert_eq!(find_header_row(&rows, 10), Some(0));
    }

    #[test]
    fn test_missing_code_column() {
        let sheet = Sheet::new(
            "Data",
            vec![vec![Cell::from("Country Name"), Cell::from("country code")]],
        );
        assert_eq!(
            parse_sheet(&sheet, &cfg()).unwrap_err(),
            ParseError::MissingColumns(vec!["Country Code".into()])
        );
    }

    #[test]
    fn test_year_columns_respect_min_year_and_numeric_headers() {
        let header = vec![
            Cell::from("Country Name"),
            Cell::from("Country Code"),
            Cell::from("1985"),
            Cell::from(1995.0),
            Cell::from("2000 "),
            Cell::from("20001"),
            Cell::from("FY2001"),
        ];
        let map = map_columns(&header, Some(1990)).expect("columns");
        assert_eq!(map.year_cols, vec![(3, 1995), (4, 2000)]);

        let unbounded = map_columns(&header, None).expect("columns");
        assert_eq!(unbounded.year_cols, vec![(2, 1985), (3, 1995), (4, 2000)]);
    }

    #[test]
    fn test_single_country_row() {
        let sheet = Sheet::new(
            "Data",
            vec![
                vec![
                    Cell::from("Country Name"),
                    Cell::from("Country Code"),
                    Cell::from("1991"),
                    Cell::from("1992"),
                ],
                vec![Cell::from("Testland"), Cell::from("TST"), Cell::from(50.0), Cell::from("")],
            ],
        );
        let parsed = parse_sheet(&sheet, &cfg()).expect("parse");

        assert_eq!(parsed.year_table[&1991]["TST"], 50.0);
        assert!(!parsed.year_table.contains_key(&1992));
        assert_eq!(parsed.historical["TST"], vec![YearPoint { year: 1991, factor: 50.0 }]);
        assert_eq!(parsed.latest_year, Some(1991));
        assert_eq!(parsed.source_timestamp, None);
    }

    #[test]
    fn test_world_bank_layout() {
        let parsed = parse_sheet(&world_bank_sheet(), &cfg()).expect("parse");

        let names: Vec<&str> = parsed.countries.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Albania", "Côte d'Ivoire", "Zimbabwe"]);

        // 1989 is below the minimum year, "..", 0 and blanks are no-data.
        assert!(!parsed.year_table.contains_key(&1989));
        assert_eq!(parsed.year_table[&1990].len(), 1);
        assert_eq!(parsed.year_table[&1990]["ZWE"], 0.5);
        assert_eq!(parsed.year_table[&1992].get("ZWE"), None);
        assert_eq!(parsed.year_table[&1992]["ALB"], 20.0);

        assert_eq!(
            parsed.historical["ALB"],
            vec![
                YearPoint { year: 1991, factor: 12.5 },
                YearPoint { year: 1992, factor: 20.0 },
            ]
        );
        assert!(!parsed.historical.contains_key("CIV"));
        assert_eq!(parsed.latest_year, Some(1992));
        assert_eq!(parsed.source_timestamp.as_deref(), Some("2024-06-28"));
    }

    #[test]
    fn test_rejects_bad_codes_and_blank_names() {
        let sheet = Sheet::new(
            "Data",
            vec![
                vec![Cell::from("Country Name"), Cell::from("Country Code"), Cell::from("2000")],
                vec![Cell::from("Too Long"), Cell::from("ABCD"), Cell::from(1.0)],
                vec![Cell::from("Too Short"), Cell::from("AB"), Cell::from(1.0)],
                vec![Cell::from("   "), Cell::from("BLK"), Cell::from(1.0)],
                vec![Cell::from("Short row")],
                vec![Cell::from(" Padded "), Cell::from(" PAD "), Cell::from(2.0)],
            ],
        );
        let parsed = parse_sheet(&sheet, &cfg()).expect("parse");
        assert_eq!(parsed.countries.len(), 1);
        assert_eq!(parsed.countries[0].code, "PAD");
        assert_eq!(parsed.countries[0].name, "Padded");
        assert_eq!(parsed.year_table[&2000].len(), 1);
    }

    #[test]
    fn test_duplicate_code_first_row_wins_entirely() {
        let sheet = Sheet::new(
            "Data",
            vec![
                vec![
                    Cell::from("Country Name"),
                    Cell::from("Country Code"),
                    Cell::from("2000"),
                    Cell::from("2001"),
                ],
                vec![Cell::from("First"), Cell::from("DUP"), Cell::from(1.0), Cell::Empty],
                vec![Cell::from("Second"), Cell::from("DUP"), Cell::from(9.0), Cell::from(9.0)],
            ],
        );
        let parsed = parse_sheet(&sheet, &cfg()).expect("parse");
        assert_eq!(parsed.countries.len(), 1);
        assert_eq!(parsed.countries[0].name, "First");
        assert_eq!(parsed.year_table[&2000]["DUP"], 1.0);
        assert!(!parsed.year_table.contains_key(&2001));
        assert_eq!(parsed.historical["DUP"].len(), 1);
    }

    #[test]
    fn test_nan_and_text_numbers_are_excluded() {
        let sheet = Sheet::new(
            "Data",
            vec![
                vec![
                    Cell::from("Country Name"),
                    Cell::from("Country Code"),
                    Cell::from("2000"),
                    Cell::from("2001"),
                    Cell::from("2002"),
                ],
                vec![
                    Cell::from("Nowhere"),
                    Cell::from("NOW"),
                    Cell::from(f64::NAN),
                    Cell::from("42"),
                    Cell::from(-1.0),
                ],
            ],
        );
        let parsed = parse_sheet(&sheet, &cfg()).expect("parse");
        assert_eq!(parsed.countries.len(), 1);
        assert!(parsed.year_table.is_empty());
        assert!(parsed.historical.is_empty());
        assert_eq!(parsed.latest_year, None);
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let sheet = Sheet::new(
            "Data",
            vec![vec![Cell::from("Country Name"), Cell::from("Country Code")]],
        );
        let parsed = parse_sheet(&sheet, &cfg()).expect("parse");
        assert!(parsed.is_empty());
        assert_eq!(parsed.latest_year, None);
    }

    #[test]
    fn test_collation_ignores_case_and_accents() {
        assert_eq!(collation_key("Côte d'Ivoire"), "cote d'ivoire");
        assert_eq!(compare_names("åland", "Bhutan"), Ordering::Less);
        assert_eq!(compare_names("Curaçao", "Cuba"), Ordering::Greater);
    }
}
