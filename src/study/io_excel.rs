// Primitives for reading workbooks (xlsx, xls, xlsb, ods).

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Reader};

use crate::study::{
    io_common::{header_names, is_blank_row},
    *,
};

pub(crate) fn read_spreadsheet(file: &SourceFile, config: &LoadConfig) -> StudyResult<RawTable> {
    let name = file.name.as_str();
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(file.bytes.clone())).map_err(|e| {
        UnparsableSnafu {
            name,
            message: e.to_string(),
        }
        .build()
    })?;

    let sheet_names = workbook.sheet_names();
    debug!("read_spreadsheet: {}: sheets {:?}", name, sheet_names);
    let sheet_name = match &config.worksheet_name {
        Some(wanted) => {
            ensure!(
                sheet_names.contains(wanted),
                InvalidConfigSnafu {
                    option: "excelWorksheetName",
                    message: format!(
                        "no worksheet named {:?} in {} (found {:?})",
                        wanted, name, sheet_names
                    ),
                }
            );
            wanted.clone()
        }
        None => match sheet_names.first() {
            Some(s) => s.clone(),
            None => {
                return EmptyResultSnafu {
                    name,
                    header_row: 0_usize,
                }
                .fail()
            }
        },
    };

    let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
        UnparsableSnafu {
            name,
            message: format!("worksheet {:?}: {}", sheet_name, e),
        }
        .build()
    })?;

    // The range starts at the first used cell: pad it so that row indices match the sheet.
    let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
    let mut rows: Vec<Vec<String>> = vec![Vec::new(); first_row];
    rows.extend(
        range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<String>>()),
    );
    info!(
        "{}: worksheet {:?}, {} rows (first used row: {})",
        name,
        sheet_name,
        rows.len(),
        first_row + 1
    );
    table_from_sheet_rows(name, rows, config)
}

/// Locates the header among the rows of a sheet and keeps the rows below it.
pub(crate) fn table_from_sheet_rows(
    name: &str,
    rows: Vec<Vec<String>>,
    config: &LoadConfig,
) -> StudyResult<RawTable> {
    ensure!(
        !rows.iter().all(|r| is_blank_row(r)),
        EmptyResultSnafu {
            name,
            header_row: 0_usize
        }
    );

    let header_choice = config.choose_header(SHEET_PREVIEW_WINDOW, |keywords, window, strategy| {
        locate(&rows, keywords, window, strategy)
    });
    let header_row = header_choice.row_index;
    ensure!(
        header_row < rows.len() && rows.iter().skip(header_row + 1).any(|r| !is_blank_row(r)),
        EmptyResultSnafu { name, header_row }
    );

    let header = header_names(&rows[header_row]);
    let mut body: Vec<Vec<String>> = Vec::new();
    let mut rows_skipped = 0;
    for (idx, row) in rows.into_iter().enumerate().skip(header_row + 1) {
        if is_blank_row(&row) {
            continue;
        }
        if row.len() != header.len() {
            debug!(
                "table_from_sheet_rows: row {}: {} cells instead of {}, skipped",
                idx + 1,
                row.len(),
                header.len()
            );
            rows_skipped += 1;
            continue;
        }
        body.push(row);
    }

    Ok(RawTable {
        header_choice,
        delimiter: None,
        header,
        rows: body,
        rows_skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    type SheetRows<'a> = &'a [(u32, &'a [&'a str])];

    /// A minimal xlsx package. Rows are given with their 1-based sheet number, cells start at column A.
    fn xlsx(sheets: &[(&str, SheetRows)]) -> Vec<u8> {
        let mut content_types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        );
        let mut workbook = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
        );
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        let mut parts: Vec<(String, String)> = Vec::new();
        for (idx, (sheet_name, sheet_rows)) in sheets.iter().enumerate() {
            let n = idx + 1;
            content_types.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                n
            ));
            workbook.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                sheet_name, n, n
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                n, n
            ));
            let mut data = String::new();
            for (r, cells) in sheet_rows.iter() {
                data.push_str(&format!(r#"<row r="{}">"#, r));
                for (c, value) in cells.iter().enumerate() {
                    let cell_ref = format!("{}{}", (b'A' + c as u8) as char, r);
                    if value.parse::<f64>().is_ok() {
                        data.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, cell_ref, value));
                    } else {
                        data.push_str(&format!(
                            r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                            cell_ref, value
                        ));
                    }
                }
                data.push_str("</row>");
            }
            parts.push((
                format!("xl/worksheets/sheet{}.xml", n),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
                    data
                ),
            ));
        }
        content_types.push_str("</Types>");
        workbook.push_str("</sheets></workbook>");
        rels.push_str("</Relationships>");
        parts.push(("[Content_Types].xml".to_string(), content_types));
        parts.push((
            "_rels/.rels".to_string(),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string(),
        ));
        parts.push(("xl/workbook.xml".to_string(), workbook));
        parts.push(("xl/_rels/workbook.xml.rels".to_string(), rels));

        let mut zw = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (path, body) in parts {
            zw.start_file(path, SimpleFileOptions::default()).unwrap();
            zw.write_all(body.as_bytes()).unwrap();
        }
        zw.finish().unwrap().into_inner()
    }

    fn study_workbook() -> Vec<u8> {
        let notes: SheetRows = &[(1, &["Line 4 notes"][..])];
        let study: SheetRows = &[
            (2, &["SMED study - Press 3"][..]),
            (4, &["Activity", "Type", "Duration"][..]),
            (5, &["Remove bolt", "Internal", "12.5"][..]),
            (6, &["Fetch tools", "External", "45"][..]),
        ];
        xlsx(&[("Notes", notes), ("Study", study)])
    }

    #[test]
    fn named_worksheet_with_sheet_row_numbers() {
        let f = SourceFile::from_bytes("study.xlsx", study_workbook());
        let config = LoadConfig {
            worksheet_name: Some("Study".to_string()),
            ..LoadConfig::default()
        };
        let raw = read_spreadsheet(&f, &config).unwrap();
        // Fourth row of the sheet, although the used range starts on the second one.
        assert_eq!(raw.header_choice.row_index, 3);
        assert_eq!(raw.header_choice.source, HeaderSource::Detected);
        assert_eq!(raw.header, vec!["Activity", "Type", "Duration"]);
        assert_eq!(
            raw.rows,
            rows(&[&["Remove bolt", "Internal", "12.5"], &["Fetch tools", "External", "45"]])
        );

        let loaded = load(&f, &config).unwrap();
        assert_eq!(loaded.report.header_row, 3);
        assert_eq!(loaded.report.delimiter, None);
        assert_eq!(loaded.report.encoding, None);
        assert_eq!(
            loaded.table.column("Duration").unwrap().values,
            vec![Cell::Number(12.5), Cell::Number(45.0)]
        );

        // The same index given explicitly points at the same row.
        let config = LoadConfig {
            header_row: HeaderRow::Index(3),
            ..config
        };
        let raw = read_spreadsheet(&f, &config).unwrap();
        assert_eq!(raw.header, vec!["Activity", "Type", "Duration"]);
        assert_eq!(raw.rows.len(), 2);
    }

    #[test]
    fn first_worksheet_by_default() {
        let f = SourceFile::from_bytes("study.xlsx", study_workbook());
        // "Notes" only holds a title.
        let err = read_spreadsheet(&f, &LoadConfig::default()).unwrap_err();
        assert!(matches!(err, StudyError::EmptyResult { header_row: 0, .. }), "{:?}", err);
    }

    #[test]
    fn missing_worksheet() {
        let f = SourceFile::from_bytes("study.xlsx", study_workbook());
        let config = LoadConfig {
            worksheet_name: Some("Hoja1".to_string()),
            ..LoadConfig::default()
        };
        let err = read_spreadsheet(&f, &config).unwrap_err();
        assert!(
            matches!(&err, StudyError::InvalidConfig { option, .. } if option == "excelWorksheetName"),
            "{:?}",
            err
        );
    }

    fn rows(cells: &[&[&str]]) -> Vec<Vec<String>> {
        cells
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn header_below_title_block() {
        let sheet = rows(&[
            &[],
            &["SMED study - Press 3", "", "", ""],
            &["Operator: J.", "", "", ""],
            &["Activity", "Category", "Current type", "Duration"],
            &["Remove bolt", "Mech", "Internal", "12.5"],
            &["", "", "", ""],
            &["Fetch tools", "Logistics", "External", "45"],
        ]);
        let raw = table_from_sheet_rows("study.xlsx", sheet, &LoadConfig::default()).unwrap();
        assert_eq!(raw.header_choice.row_index, 3);
        assert_eq!(raw.header_choice.source, HeaderSource::Detected);
        assert_eq!(raw.delimiter, None);
        assert_eq!(raw.header, vec!["Activity", "Category", "Current type", "Duration"]);
        assert_eq!(raw.rows.len(), 2);
        assert_eq!(raw.rows[1][0], "Fetch tools");
        assert_eq!(raw.rows_skipped, 0);
    }

    #[test]
    fn sheet_window_is_shorter_than_the_text_one() {
        let mut sheet: Vec<Vec<String>> = (0..SHEET_PREVIEW_WINDOW)
            .map(|i| vec![format!("note {}", i), String::new()])
            .collect();
        sheet.extend(rows(&[&["Activity", "Duration"], &["Remove bolt", "12"]]));
        let raw = table_from_sheet_rows("study.xlsx", sheet.clone(), &LoadConfig::default()).unwrap();
        assert_eq!(raw.header_choice.source, HeaderSource::Fallback);
        assert_eq!(raw.header_choice.row_index, 0);

        let config = LoadConfig {
            preview_window: Some(SHEET_PREVIEW_WINDOW + 1),
            ..LoadConfig::default()
        };
        let raw = table_from_sheet_rows("study.xlsx", sheet, &config).unwrap();
        assert_eq!(raw.header_choice.row_index, SHEET_PREVIEW_WINDOW);
        assert_eq!(raw.rows, rows(&[&["Remove bolt", "12"]]));
    }

    #[test]
    fn empty_sheets() {
        let err = table_from_sheet_rows("a.xlsx", Vec::new(), &LoadConfig::default()).unwrap_err();
        assert!(matches!(err, StudyError::EmptyResult { header_row: 0, .. }), "{:?}", err);
        let sheet = rows(&[&["Activity", "Duration"], &["", ""]]);
        let err = table_from_sheet_rows("a.xlsx", sheet, &LoadConfig::default()).unwrap_err();
        assert!(matches!(err, StudyError::EmptyResult { header_row: 0, .. }), "{:?}", err);
    }

    #[test]
    fn garbage_workbook_is_unparsable() {
        let f = SourceFile::from_bytes("study.xlsx", b"Activity,Duration\nA,1\n".to_vec());
        let err = read_spreadsheet(&f, &LoadConfig::default()).unwrap_err();
        assert!(matches!(err, StudyError::Unparsable { .. }), "{:?}", err);
        assert!(err.to_string().starts_with("study.xlsx is not readable"));
    }
}
