use log::{debug, info, warn};
use snafu::{prelude::*, Snafu};

use std::collections::BTreeMap;
use std::fs;

use serde::Serialize;
use serde_json::json;
use serde_json::Value as JSValue;
use tabsniff::*;
use text_diff::print_diff;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;

pub use crate::study::io_common::{SourceFile, SourceKind, TextEncoding};

#[derive(Debug, Snafu)]
pub enum StudyError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening the configuration file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Invalid option {option}: {message}"))]
    InvalidConfig { option: String, message: String },

    #[snafu(display("{name} cannot be decoded as {encoding}"))]
    Decode {
        name: String,
        encoding: TextEncoding,
    },
    #[snafu(display(
        "No delimiter splits the header line {lineno} of {name} into several columns: {line:?}"
    ))]
    DelimiterAmbiguity {
        name: String,
        lineno: usize,
        line: String,
    },
    #[snafu(display("No data rows left in {name} after the header row {header_row}"))]
    EmptyResult { name: String, header_row: usize },
    #[snafu(display("{name} is not readable: {message}"))]
    Unparsable { name: String, message: String },

    #[snafu(display("Difference detected between the loaded table and the reference summary"))]
    ReferenceMismatch {},
}

pub type StudyResult<T> = Result<T, StudyError>;

impl StudyError {
    /// The configuration knob to change before trying again.
    pub fn remedy(&self) -> &'static str {
        match self {
            StudyError::Decode { .. } => {
                "choose another text encoding (--encoding latin-1 or --encoding cp1252)"
            }
            StudyError::DelimiterAmbiguity { .. } => {
                "choose the delimiter explicitly (--delimiter comma, semicolon or tab) or the header row (--header-row)"
            }
            StudyError::EmptyResult { .. } => {
                "choose an earlier header row (--header-row) or check that the file contains records"
            }
            StudyError::Unparsable { .. } => {
                "check the type of the file, or save it again as .xlsx or as a delimited .csv file"
            }
            StudyError::OpeningFile { .. } => "check the path of the input file",
            StudyError::OpeningJson { .. } | StudyError::ParsingJson { .. } => {
                "check the path and the content of the configuration file"
            }
            StudyError::WritingOutput { .. } => "check the path given with --out",
            StudyError::InvalidConfig { .. } => "fix the option named in the message",
            StudyError::ReferenceMismatch {} => "inspect the differences printed above",
        }
    }
}

/// The field separator to use, or whether it should be sniffed.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum DelimiterChoice {
    #[default]
    Auto,
    Fixed(Delimiter),
}

impl DelimiterChoice {
    pub fn parse(s: &str) -> StudyResult<DelimiterChoice> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "" => Ok(DelimiterChoice::Auto),
            "comma" | "," => Ok(DelimiterChoice::Fixed(Delimiter::Comma)),
            "semicolon" | ";" => Ok(DelimiterChoice::Fixed(Delimiter::Semicolon)),
            "tab" | "\\t" | "\t" => Ok(DelimiterChoice::Fixed(Delimiter::Tab)),
            x => InvalidConfigSnafu {
                option: "delimiter",
                message: format!("unknown delimiter {:?} (auto, comma, semicolon or tab)", x),
            }
            .fail(),
        }
    }
}

/// Which row holds the column names.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum HeaderRow {
    #[default]
    Auto,
    /// 0-based row index, used verbatim.
    Index(usize),
}

impl HeaderRow {
    pub fn parse(s: &str) -> StudyResult<HeaderRow> {
        match s.trim() {
            x if x.eq_ignore_ascii_case("auto") => Ok(HeaderRow::Auto),
            x => x.parse::<usize>().map(HeaderRow::Index).ok().context(
                InvalidConfigSnafu {
                    option: "headerRowIndex",
                    message: format!("expected 'auto' or a non-negative integer, got {:?}", x),
                },
            ),
        }
    }
}

pub fn parse_strategy(s: &str) -> StudyResult<HeaderStrategy> {
    match s.trim().to_lowercase().as_str() {
        "bestmatch" | "best" => Ok(HeaderStrategy::BestMatch),
        "firstmatch" | "first" => Ok(HeaderStrategy::FirstMatch),
        x => InvalidConfigSnafu {
            option: "headerStrategy",
            message: format!("unknown strategy {:?} (bestMatch or firstMatch)", x),
        }
        .fail(),
    }
}

/// Everything a single load needs to know. It is not modified once the load starts.
#[derive(PartialEq, Debug, Clone)]
pub struct LoadConfig {
    pub delimiter: DelimiterChoice,
    pub encoding: TextEncoding,
    pub header_row: HeaderRow,
    pub header_strategy: HeaderStrategy,
    /// Overrides the default preview window of the header search.
    pub preview_window: Option<usize>,
    pub keywords: Vec<String>,
    pub worksheet_name: Option<String>,
    /// Explicit choices. The fields not mentioned here are suggested from the header.
    pub columns: ColumnMapping,
    /// Columns converted to numbers, in addition to the one mapped to DurationRaw.
    pub numeric_columns: Vec<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            delimiter: DelimiterChoice::Auto,
            encoding: TextEncoding::Utf8,
            header_row: HeaderRow::Auto,
            header_strategy: HeaderStrategy::BestMatch,
            preview_window: None,
            keywords: DEFAULT_HEADER_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            worksheet_name: None,
            columns: ColumnMapping::new(),
            numeric_columns: Vec::new(),
        }
    }
}

impl LoadConfig {
    /// Resolves the header row: verbatim when explicit, otherwise with the given search.
    ///
    /// The search is only run in the automatic mode.
    pub(crate) fn choose_header(
        &self,
        default_window: usize,
        search: impl FnOnce(&[String], usize, HeaderStrategy) -> HeaderLocation,
    ) -> HeaderChoice {
        match self.header_row {
            HeaderRow::Index(row_index) => HeaderChoice {
                row_index,
                source: HeaderSource::Explicit,
                matches: None,
            },
            HeaderRow::Auto => {
                let window = self.preview_window.unwrap_or(default_window);
                let location = search(&self.keywords, window, self.header_strategy);
                let source = if location.is_found() {
                    HeaderSource::Detected
                } else {
                    warn!(
                        "No header row found in the first {} rows, using the first row",
                        window
                    );
                    HeaderSource::Fallback
                };
                HeaderChoice {
                    row_index: location.row_or_first(),
                    source,
                    matches: location.matches(),
                }
            }
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HeaderSource {
    /// Found by the keyword search.
    Detected,
    /// The keyword search found nothing, the first row is used.
    Fallback,
    /// Given in the configuration.
    Explicit,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct HeaderChoice {
    pub row_index: usize,
    pub source: HeaderSource,
    pub matches: Option<usize>,
}

/// The rows of a file once the header is known, before any typing.
#[derive(PartialEq, Debug, Clone)]
pub(crate) struct RawTable {
    pub header_choice: HeaderChoice,
    pub delimiter: Option<Delimiter>,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub rows_skipped: usize,
}

#[derive(PartialEq, Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    fn from_raw(s: &str) -> Cell {
        let t = s.trim();
        if t.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(t.to_string())
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Cell>,
}

/// A table of named columns.
///
/// Invariant: all the columns have the same length. Missing cells are `Cell::Empty`.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ParsedTable {
    columns: Vec<Column>,
    num_rows: usize,
}

impl ParsedTable {
    pub(crate) fn from_rows(header: &[String], rows: &[Vec<String>]) -> ParsedTable {
        let mut columns: Vec<Column> = header
            .iter()
            .map(|name| Column {
                name: name.clone(),
                values: Vec::with_capacity(rows.len()),
            })
            .collect();
        for row in rows.iter() {
            for (idx, col) in columns.iter_mut().enumerate() {
                let cell = row.get(idx).map(|s| Cell::from_raw(s)).unwrap_or(Cell::Empty);
                col.values.push(cell);
            }
        }
        ParsedTable {
            columns,
            num_rows: rows.len(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// True when the column has values and none of them reads as a number.
    fn is_non_numeric(&self, name: &str) -> bool {
        let texts: Vec<&str> = match self.column(name) {
            Some(col) => col
                .values
                .iter()
                .filter_map(|c| match c {
                    Cell::Text(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect(),
            None => return false,
        };
        !texts.is_empty() && texts.iter().all(|s| parse_decimal(s).is_none())
    }

    /// Converts a column to numbers. Returns how many non-empty cells had to be coerced to zero.
    fn coerce_numeric(&mut self, name: &str) -> usize {
        let mut coerced = 0;
        if let Some(col) = self.columns.iter_mut().find(|c| c.name == name) {
            for cell in col.values.iter_mut() {
                let x = match cell {
                    Cell::Text(s) => match parse_decimal(s) {
                        Some(x) => x,
                        None => {
                            debug!("coerce_numeric: {}: {:?} -> 0", name, s);
                            coerced += 1;
                            0.0
                        }
                    },
                    Cell::Number(x) => *x,
                    Cell::Empty => normalize(""),
                };
                *cell = Cell::Number(x);
            }
        }
        coerced
    }
}

/// How a load went. All the soft conditions end up here.
#[derive(PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub source_name: String,
    pub source_digest: String,
    pub encoding: Option<String>,
    pub delimiter: Option<String>,
    pub header_row: usize,
    pub header_source: HeaderSource,
    pub header_matches: Option<usize>,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    pub numeric_coerced: usize,
    pub mapping: BTreeMap<String, String>,
    pub duplicate_columns: Vec<String>,
}

impl LoadReport {
    pub fn status_message(&self) -> String {
        let header = match self.header_source {
            HeaderSource::Detected => format!("headers detected at row {}", self.header_row + 1),
            HeaderSource::Fallback => "no header detected, using row 1".to_string(),
            HeaderSource::Explicit => format!("headers taken from row {}", self.header_row + 1),
        };
        let mut msg = format!("Loaded {} rows ({})", self.rows_loaded, header);
        if self.rows_skipped > 0 {
            msg.push_str(&format!(", {} malformed rows skipped", self.rows_skipped));
        }
        if self.numeric_coerced > 0 {
            msg.push_str(&format!(
                ", {} unreadable numbers replaced by 0",
                self.numeric_coerced
            ));
        }
        if !self.duplicate_columns.is_empty() {
            msg.push_str(&format!(
                ", columns mapped more than once: {}",
                self.duplicate_columns.join(", ")
            ));
        }
        msg
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Loaded {
    pub table: ParsedTable,
    pub mapping: ColumnMapping,
    pub report: LoadReport,
}

/// Explicit entries win, the remaining fields are suggested from the column names.
fn resolve_mapping(columns: &[String], explicit: &ColumnMapping) -> ColumnMapping {
    let mut mapping = ColumnMapping::suggest(columns);
    for (field, col) in explicit.iter() {
        if columns.iter().any(|c| c == col) {
            mapping.set(field, col.to_string());
        } else {
            warn!(
                "Column {:?} given for {} does not exist, keeping the suggestion {:?}",
                col,
                field,
                mapping.get(field)
            );
        }
    }
    mapping
}

/// Loads a time-study table: locates the header, parses the records and cleans the numbers.
pub fn load(file: &SourceFile, config: &LoadConfig) -> StudyResult<Loaded> {
    info!(
        "Loading {:?} ({} bytes) as {:?}",
        file.name,
        file.bytes.len(),
        file.kind()
    );
    let raw = match file.kind() {
        SourceKind::Delimited => io_csv::read_delimited(file, config)?,
        SourceKind::Spreadsheet => io_excel::read_spreadsheet(file, config)?,
    };
    let header_row = raw.header_choice.row_index;
    ensure!(
        !raw.rows.is_empty(),
        EmptyResultSnafu {
            name: &file.name,
            header_row
        }
    );

    let mut table = ParsedTable::from_rows(&raw.header, &raw.rows);
    let column_names = table.column_names();
    let mut mapping = resolve_mapping(&column_names, &config.columns);
    if let Some(col) = mapping.get(CanonicalField::DurationRaw).map(|c| c.to_string()) {
        let explicit = config.columns.get(CanonicalField::DurationRaw) == Some(col.as_str());
        if !explicit && table.is_non_numeric(&col) {
            warn!(
                "Column {:?} looks like {} but holds no number, it is left as text",
                col,
                CanonicalField::DurationRaw
            );
            mapping.remove(CanonicalField::DurationRaw);
        }
    }
    let duplicate_columns = mapping.duplicates();
    if !duplicate_columns.is_empty() {
        warn!(
            "Several fields are mapped to the same columns: {:?}",
            duplicate_columns
        );
    }

    let mut numeric: Vec<String> = Vec::new();
    if let Some(col) = mapping.get(CanonicalField::DurationRaw) {
        numeric.push(col.to_string());
    }
    for col in config.numeric_columns.iter() {
        if !column_names.contains(col) {
            warn!("Numeric column {:?} does not exist, ignored", col);
        } else if !numeric.contains(col) {
            numeric.push(col.clone());
        }
    }
    let mut numeric_coerced = 0;
    for col in numeric.iter() {
        numeric_coerced += table.coerce_numeric(col);
    }
    if numeric_coerced > 0 {
        warn!(
            "{} values could not be read as numbers and were replaced by 0",
            numeric_coerced
        );
    }

    let report = LoadReport {
        source_name: file.name.clone(),
        source_digest: file.digest(),
        encoding: match file.kind() {
            SourceKind::Delimited => Some(config.encoding.to_string()),
            SourceKind::Spreadsheet => None,
        },
        delimiter: raw.delimiter.map(|d| d.to_string()),
        header_row,
        header_source: raw.header_choice.source,
        header_matches: raw.header_choice.matches,
        rows_loaded: table.num_rows(),
        rows_skipped: raw.rows_skipped,
        numeric_coerced,
        mapping: mapping
            .iter()
            .map(|(f, c)| (f.to_string(), c.to_string()))
            .collect(),
        duplicate_columns,
    };
    info!("{}: {}", file.name, report.status_message());
    Ok(Loaded {
        table,
        mapping,
        report,
    })
}

/// The JSON document handed to the presentation layer.
pub fn build_summary_js(loaded: &Loaded) -> JSValue {
    json!({
        "report": loaded.report,
        "columns": loaded.table.columns(),
    })
}

/// Compares a summary with a reference file, printing the differences if any.
pub fn check_reference(summary: &JSValue, reference_path: String) -> StudyResult<()> {
    let contents = fs::read_to_string(reference_path.clone()).context(OpeningJsonSnafu {
        path: reference_path,
    })?;
    let reference: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    let pretty_ref = serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
    let pretty_summary = serde_json::to_string_pretty(summary).context(ParsingJsonSnafu {})?;
    if pretty_ref != pretty_summary {
        warn!("Found differences with the reference summary");
        print_diff(pretty_ref.as_str(), pretty_summary.as_str(), "\n");
        return ReferenceMismatchSnafu {}.fail();
    }
    info!("The loaded table matches the reference summary");
    Ok(())
}

/// Writes the summary to a file, or to the standard output with "stdout".
pub fn write_summary(summary: &JSValue, out: &str) -> StudyResult<()> {
    let pretty = serde_json::to_string_pretty(summary).context(ParsingJsonSnafu {})?;
    if out == "stdout" {
        println!("{}", pretty);
    } else {
        fs::write(out, pretty).context(WritingOutputSnafu { path: out })?;
        info!("Summary written to {}", out);
    }
    Ok(())
}
