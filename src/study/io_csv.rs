// Primitives for reading delimited text files.

use crate::study::{
    io_common::{header_names, is_blank_row},
    *,
};

/// Splits the text in lines, keeping the byte offset at which each line starts.
///
/// Line terminators (`\n` or `\r\n`) are not part of the lines.
fn split_lines(text: &str) -> (Vec<&str>, Vec<usize>) {
    let mut lines: Vec<&str> = Vec::new();
    let mut starts: Vec<usize> = Vec::new();
    let mut offset = 0;
    for piece in text.split_inclusive('\n') {
        starts.push(offset);
        offset += piece.len();
        lines.push(piece.trim_end_matches('\n').trim_end_matches('\r'));
    }
    (lines, starts)
}

/// Splits a single line into fields, honoring quotes.
///
/// A blank line is one empty field.
fn split_line(line: &str, delimiter: Delimiter) -> Vec<String> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter.as_byte())
        .from_reader(line.as_bytes());
    match rdr.records().next() {
        Some(Ok(record)) => record.iter().map(|s| s.to_string()).collect(),
        _ => vec![line.to_string()],
    }
}

fn sniff_delimiter(header_line: &str) -> Option<Delimiter> {
    let counts: Vec<(Delimiter, usize)> = Delimiter::CANDIDATES
        .iter()
        .map(|d| (*d, split_line(header_line, *d).len()))
        .collect();
    choose_delimiter(&counts)
}

fn has_unbalanced_quotes(lines: &[&str]) -> bool {
    lines.iter().map(|l| l.matches('"').count()).sum::<usize>() % 2 == 1
}

/// Splits each line on its own.
///
/// Returns the rows with the expected width and the number of other non-blank
/// lines. A line with an unbalanced quote never counts as a row.
fn reread_lines(lines: &[&str], delimiter: Delimiter, width: usize) -> (Vec<Vec<String>>, usize) {
    let mut kept: Vec<Vec<String>> = Vec::new();
    let mut skipped = 0;
    for line in lines {
        let fields = split_line(line, delimiter);
        if is_blank_row(&fields) {
            continue;
        }
        if fields.len() == width && !has_unbalanced_quotes(&[*line]) {
            kept.push(fields);
        } else {
            skipped += 1;
        }
    }
    (kept, skipped)
}

pub(crate) fn read_delimited(file: &SourceFile, config: &LoadConfig) -> StudyResult<RawTable> {
    let name = file.name.as_str();
    let text = config.encoding.decode(&file.bytes).context(DecodeSnafu {
        name,
        encoding: config.encoding,
    })?;
    ensure!(
        !text.contains('\0'),
        UnparsableSnafu {
            name,
            message: "the file contains binary data"
        }
    );

    let (lines, starts) = split_lines(&text);
    ensure!(
        !lines.iter().all(|l| l.trim().is_empty()),
        EmptyResultSnafu {
            name,
            header_row: 0_usize
        }
    );

    let header_choice = config.choose_header(TEXT_PREVIEW_WINDOW, |keywords, window, strategy| {
        locate_in_lines(&lines, keywords, window, strategy)
    });
    let header_row = header_choice.row_index;
    debug!("read_delimited: {}: header choice {:?}", name, header_choice);

    // Nothing after the header: no point in sniffing a delimiter.
    ensure!(
        header_row < lines.len() && lines.iter().skip(header_row + 1).any(|l| !l.trim().is_empty()),
        EmptyResultSnafu { name, header_row }
    );

    let header_line = lines[header_row];
    let delimiter = match config.delimiter {
        DelimiterChoice::Fixed(d) => d,
        DelimiterChoice::Auto => sniff_delimiter(header_line).context(DelimiterAmbiguitySnafu {
            name,
            lineno: header_row + 1,
            line: header_line,
        })?,
    };
    info!("{}: delimiter {}, header at line {}", name, delimiter, header_row + 1);

    let header = header_names(&split_line(header_line, delimiter));
    let body_start = starts.get(header_row + 1).cloned().unwrap_or(text.len());
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter.as_byte())
        .from_reader(text[body_start..].as_bytes());

    // Records with the body line (1-based) at which they start.
    let mut records: Vec<(usize, Vec<String>)> = Vec::new();
    let mut rows_skipped = 0;
    for record_r in rdr.records() {
        match record_r {
            Ok(record) => {
                let line = record.position().map(|p| p.line() as usize).unwrap_or(1);
                records.push((line, record.iter().map(|s| s.to_string()).collect()));
            }
            Err(e) => {
                warn!("{}: unreadable record skipped: {}", name, e);
                rows_skipped += 1;
            }
        }
    }

    let body_end = lines.len() - header_row;
    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, (line, row)) in records.iter().enumerate() {
        if is_blank_row(row) {
            continue;
        }
        let next_line = records
            .get(idx + 1)
            .map(|(l, _)| *l)
            .unwrap_or(body_end)
            .min(body_end);
        // The physical lines the record was read from.
        let first = (header_row + line).min(lines.len() - 1);
        let span = &lines[first..(header_row + next_line).max(first + 1)];
        if row.len() == header.len() && (span.len() == 1 || !has_unbalanced_quotes(span)) {
            rows.push(row.clone());
        } else if span.len() > 1 {
            // An unbalanced quote swallows the lines below it: read them again one by one.
            let (kept, skipped) = reread_lines(span, delimiter, header.len());
            debug!(
                "read_delimited: lines {}..{}: broken record read again, {} rows kept, {} skipped",
                first + 1,
                first + span.len(),
                kept.len(),
                skipped
            );
            rows.extend(kept);
            rows_skipped += skipped;
        } else {
            debug!(
                "read_delimited: line {}: {} fields instead of {}, skipped: {:?}",
                header_row + line + 1,
                row.len(),
                header.len(),
                row
            );
            rows_skipped += 1;
        }
    }
    if rows_skipped > 0 {
        warn!(
            "{}: {} rows do not have {} fields and were skipped",
            name,
            rows_skipped,
            header.len()
        );
    }

    Ok(RawTable {
        header_choice,
        delimiter: Some(delimiter),
        header,
        rows,
        rows_skipped,
    })
}
