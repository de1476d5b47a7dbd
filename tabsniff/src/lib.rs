/*!
Structural guessing for messy tabular exports.

The functions in this crate never fail: they look at a preview of a file and
return their best guess, or tell that they have none.

```
use tabsniff::{locate_in_lines, HeaderLocation, HeaderStrategy, DEFAULT_HEADER_KEYWORDS};

let lines = [
    "Report generated 2024-01-01",
    "",
    "Category,Activity,Type,Duration",
    "Mech,Remove bolt,Internal,\"12,5\"",
];
let location = locate_in_lines(&lines, DEFAULT_HEADER_KEYWORDS, 50, HeaderStrategy::BestMatch);
assert_eq!(location, HeaderLocation::Found { row_index: 2, matches: 4 });
assert_eq!(tabsniff::normalize("12,5"), 12.5);
```
*/
mod config;
pub mod manual;
pub mod mapping;

use log::debug;
use std::collections::HashSet;

pub use crate::config::*;
pub use crate::mapping::*;

/// Lower-cased, de-duplicated keyword set.
fn prepare_keywords<K: AsRef<str>>(keywords: &[K]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut res: Vec<String> = Vec::new();
    for k in keywords {
        let lk = k.as_ref().trim().to_lowercase();
        if !lk.is_empty() && seen.insert(lk.clone()) {
            res.push(lk);
        }
    }
    res
}

/// Counts the distinct keywords contained in at least one of the cells.
///
/// The keywords are expected to be already lower-cased.
fn count_matches<S: AsRef<str>>(cells: &[S], keywords: &[String]) -> usize {
    let lowered: Vec<String> = cells.iter().map(|c| c.as_ref().to_lowercase()).collect();
    keywords
        .iter()
        .filter(|k| lowered.iter().any(|c| c.contains(k.as_str())))
        .count()
}

fn pick_header(scores: impl Iterator<Item = usize>, strategy: HeaderStrategy) -> HeaderLocation {
    let mut best = HeaderLocation::NotFound;
    let mut best_count = 0;
    for (row_index, matches) in scores.enumerate() {
        if matches < MIN_HEADER_MATCHES {
            continue;
        }
        match strategy {
            HeaderStrategy::FirstMatch => {
                return HeaderLocation::Found { row_index, matches };
            }
            HeaderStrategy::BestMatch => {
                // Strictly greater: the earliest row keeps ties.
                if matches > best_count {
                    best_count = matches;
                    best = HeaderLocation::Found { row_index, matches };
                }
            }
        }
    }
    best
}

/// Locates the header among the first `window` rows of a structured preview.
///
/// A row qualifies when at least two distinct keywords each appear in one of its
/// cells. Among qualifying rows, the `strategy` decides which one wins.
/// When no row qualifies, `HeaderLocation::NotFound` is returned and the caller
/// is expected to fall back to the first row.
pub fn locate<S: AsRef<str>, K: AsRef<str>>(
    rows: &[Vec<S>],
    keywords: &[K],
    window: usize,
    strategy: HeaderStrategy,
) -> HeaderLocation {
    let keywords = prepare_keywords(keywords);
    let res = pick_header(
        rows.iter()
            .take(window)
            .map(|row| count_matches(row.as_slice(), &keywords)),
        strategy,
    );
    debug!(
        "locate: scanned {} rows with {:?}: {:?}",
        rows.len().min(window),
        strategy,
        res
    );
    res
}

/// Same as [locate], but every raw text line is matched as a whole.
///
/// This is used on delimited files before the delimiter is known.
pub fn locate_in_lines<S: AsRef<str>, K: AsRef<str>>(
    lines: &[S],
    keywords: &[K],
    window: usize,
    strategy: HeaderStrategy,
) -> HeaderLocation {
    let keywords = prepare_keywords(keywords);
    let res = pick_header(
        lines
            .iter()
            .take(window)
            .map(|line| count_matches(&[line.as_ref()], &keywords)),
        strategy,
    );
    debug!(
        "locate_in_lines: scanned {} lines with {:?}: {:?}",
        lines.len().min(window),
        strategy,
        res
    );
    res
}

/// Chooses a delimiter given the number of fields each candidate produces on the header line.
///
/// The candidate with the most fields wins, as long as it produces more than one.
/// Ties are resolved with the order of [Delimiter::CANDIDATES] (comma first).
/// Returns None when no candidate splits the line.
pub fn choose_delimiter(field_counts: &[(Delimiter, usize)]) -> Option<Delimiter> {
    let mut best: Option<(Delimiter, usize)> = None;
    for cand in Delimiter::CANDIDATES.iter() {
        let count = field_counts
            .iter()
            .filter(|(d, _)| d == cand)
            .map(|(_, c)| *c)
            .max()
            .unwrap_or(0);
        if count <= 1 {
            continue;
        }
        match best {
            Some((_, best_count)) if best_count >= count => {}
            _ => best = Some((*cand, count)),
        }
    }
    debug!("choose_delimiter: {:?} -> {:?}", field_counts, best);
    best.map(|(d, _)| d)
}

/// Parses a quantity written with either a decimal comma or a decimal point.
///
/// When both separators appear, the last one is the decimal separator and the
/// other one groups thousands: `"1.234,5"` and `"1,234.5"` both give 1234.5.
/// A single separator repeated several times groups thousands (`"1.234.567"`).
/// A single comma is always decimal, so `"1,234"` gives 1.234.
///
/// Returns None for empty, unparsable or non-finite values.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let cleaned = match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) if s.matches(',').count() > 1 => s.replace(',', ""),
        (Some(_), None) => s.replace(',', "."),
        (None, Some(_)) if s.matches('.').count() > 1 => s.replace('.', ""),
        _ => s.to_string(),
    };
    cleaned.parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Parses a quantity, coercing anything unparsable to zero.
///
/// `"12,5"` and `"12.5"` both give 12.5. Empty and garbled values give 0.0, which
/// makes them indistinguishable from a real zero: use [parse_decimal] to tell
/// them apart.
pub fn normalize(raw: &str) -> f64 {
    parse_decimal(raw).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn header_after_title_rows() {
        init();
        let lines = vec![
            "Report generated 2024-01-01",
            "",
            "Category,Activity,Type,Duration",
            "Mech,Remove bolt,Internal,\"12,5\"",
        ];
        let res = locate_in_lines(&lines, DEFAULT_HEADER_KEYWORDS, 50, HeaderStrategy::BestMatch);
        assert_eq!(res, HeaderLocation::Found { row_index: 2, matches: 4 });
        // Same input, same answer.
        let res2 = locate_in_lines(&lines, DEFAULT_HEADER_KEYWORDS, 50, HeaderStrategy::BestMatch);
        assert_eq!(res, res2);
    }

    #[test]
    fn single_keyword_rows_never_win() {
        init();
        let rows = vec![
            row(&["Setup time study"]),
            row(&["Line 4", "Operator: J."]),
            row(&["Activity", "Notes"]),
        ];
        let res = locate(&rows, DEFAULT_HEADER_KEYWORDS, 20, HeaderStrategy::BestMatch);
        assert_eq!(res, HeaderLocation::NotFound);
        assert_eq!(res.row_or_first(), 0);
        assert!(!res.is_found());
    }

    #[test]
    fn best_match_skips_metadata_row() {
        init();
        let rows = vec![
            row(&["Start: 08:00", "End: 09:30"]),
            row(&["Activity", "Category", "Type", "Duration", "Start", "End"]),
            row(&["Remove bolt", "Mech", "Internal", "12", "08:00", "08:12"]),
        ];
        let best = locate(&rows, DEFAULT_HEADER_KEYWORDS, 20, HeaderStrategy::BestMatch);
        assert_eq!(best, HeaderLocation::Found { row_index: 1, matches: 6 });
        let first = locate(&rows, DEFAULT_HEADER_KEYWORDS, 20, HeaderStrategy::FirstMatch);
        assert_eq!(first, HeaderLocation::Found { row_index: 0, matches: 2 });
    }

    #[test]
    fn ties_go_to_the_earliest_row() {
        init();
        let rows = vec![
            row(&["x"]),
            row(&["Activity", "Duration"]),
            row(&["Category", "Type"]),
        ];
        let res = locate(&rows, &["activity", "duration", "category", "type"], 20, HeaderStrategy::BestMatch);
        assert_eq!(res, HeaderLocation::Found { row_index: 1, matches: 2 });
    }

    #[test]
    fn window_bounds_the_search() {
        init();
        let mut lines: Vec<String> = (0..10).map(|i| format!("note {}", i)).collect();
        lines.push("Activity;Duration;Type".to_string());
        let res = locate_in_lines(&lines, DEFAULT_HEADER_KEYWORDS, 10, HeaderStrategy::BestMatch);
        assert_eq!(res, HeaderLocation::NotFound);
        let res = locate_in_lines(&lines, DEFAULT_HEADER_KEYWORDS, 11, HeaderStrategy::BestMatch);
        assert_eq!(res, HeaderLocation::Found { row_index: 10, matches: 3 });
    }

    #[test]
    fn keywords_are_case_insensitive_and_distinct() {
        init();
        let cells = ["ACTIVIDAD", "Tiempo (seg)", "Tipo actual"];
        let keywords = prepare_keywords(&["actividad", "TIEMPO", "tiempo", "tipo", " "]);
        assert_eq!(keywords, vec!["actividad", "tiempo", "tipo"]);
        assert_eq!(count_matches(&cells, &keywords), 3);
        // "activity" appears in two cells but is counted once.
        assert_eq!(count_matches(&["Activity", "Activity code"], &prepare_keywords(&["activity"])), 1);
    }

    #[test]
    fn delimiter_choice() {
        init();
        use Delimiter::*;
        assert_eq!(choose_delimiter(&[(Comma, 1), (Semicolon, 4), (Tab, 1)]), Some(Semicolon));
        assert_eq!(choose_delimiter(&[(Comma, 3), (Semicolon, 3), (Tab, 1)]), Some(Comma));
        assert_eq!(choose_delimiter(&[(Comma, 1), (Semicolon, 2), (Tab, 2)]), Some(Semicolon));
        assert_eq!(choose_delimiter(&[(Comma, 1), (Semicolon, 1), (Tab, 1)]), None);
        assert_eq!(choose_delimiter(&[]), None);
    }

    #[test]
    fn decimal_normalization() {
        assert_eq!(normalize("12,5"), 12.5);
        assert_eq!(normalize("7.0"), 7.0);
        assert_eq!(normalize(" 3 "), 3.0);
        assert_eq!(normalize("abc"), 0.0);
        assert_eq!(normalize(""), 0.0);
        assert_eq!(normalize("NaN"), 0.0);
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("0"), Some(0.0));
        assert_eq!(parse_decimal("-1,25"), Some(-1.25));
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(parse_decimal("1.234,5"), Some(1234.5));
        assert_eq!(parse_decimal("1,234.5"), Some(1234.5));
        assert_eq!(parse_decimal("1.234.567"), Some(1234567.0));
        assert_eq!(parse_decimal("1,234,567"), Some(1234567.0));
        assert_eq!(parse_decimal("1,234"), Some(1.234));
        assert_eq!(normalize("12.345,67"), 12345.67);
        assert_eq!(parse_decimal("1,2,3.4,5"), None);
    }
}
