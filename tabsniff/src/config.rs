// ********* Input data structures ***********

use std::fmt::Display;

/// Keywords expected in a genuine header row of a time-study export.
///
/// The English terms are complemented by the Spanish ones found in the field
/// exports. Matching is a case-insensitive substring test.
pub const DEFAULT_HEADER_KEYWORDS: &[&str] = &[
    "activity",
    "duration",
    "time",
    "type",
    "category",
    "start",
    "end",
    "description",
    "group",
    "actividad",
    "duración",
    "tiempo",
    "tipo",
    "categoría",
    "inicio",
    "fin",
    "descripción",
    "grupo",
];

/// Number of raw text lines scanned when looking for the header of a delimited file.
pub const TEXT_PREVIEW_WINDOW: usize = 50;

/// Number of parsed rows scanned when looking for the header of a spreadsheet.
pub const SHEET_PREVIEW_WINDOW: usize = 20;

/// Minimum number of distinct keywords a row must contain to be considered a header.
pub const MIN_HEADER_MATCHES: usize = 2;

/// The field separator of a delimited text file.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Delimiter {
    Comma,
    Semicolon,
    Tab,
}

impl Delimiter {
    /// The candidates tried when sniffing, in order of preference for ties.
    pub const CANDIDATES: [Delimiter; 3] = [Delimiter::Comma, Delimiter::Semicolon, Delimiter::Tab];

    pub fn as_byte(&self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Delimiter::Comma => "comma",
            Delimiter::Semicolon => "semicolon",
            Delimiter::Tab => "tab",
        }
    }
}

impl Display for Delimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How to choose among several rows that all qualify as a header.
///
/// - BestMatch scans the whole preview window and keeps the row with the
/// strictly highest number of keyword matches. Ties go to the earliest row.
/// It is robust to title rows that happen to mention a keyword or two.
///
/// - FirstMatch stops at the first row reaching the threshold.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum HeaderStrategy {
    #[default]
    BestMatch,
    FirstMatch,
}

// ******** Output data structures *********

/// The outcome of a header search.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum HeaderLocation {
    Found { row_index: usize, matches: usize },
    NotFound,
}

impl HeaderLocation {
    /// The row to use as header. A failed search degrades to the first row.
    pub fn row_or_first(&self) -> usize {
        match self {
            HeaderLocation::Found { row_index, .. } => *row_index,
            HeaderLocation::NotFound => 0,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, HeaderLocation::Found { .. })
    }

    /// Number of distinct keywords in the header row, if one was found.
    pub fn matches(&self) -> Option<usize> {
        match self {
            HeaderLocation::Found { matches, .. } => Some(*matches),
            HeaderLocation::NotFound => None,
        }
    }
}
