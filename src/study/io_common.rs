use std::fmt::Display;
use std::fs;
use std::path::Path;

use crate::study::*;

/// Extensions read as workbooks. Everything else is read as delimited text.
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "xla", "xlam", "ods"];

/// A file handed over by the host: a name (to pick the reader) and its full content.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SourceKind {
    Delimited,
    Spreadsheet,
}

impl SourceFile {
    /// Reads the whole file at once. The handle is released before returning.
    pub fn read(path: &str) -> StudyResult<SourceFile> {
        let bytes = fs::read(path).context(OpeningFileSnafu { path })?;
        Ok(SourceFile {
            name: simplify_file_name(path),
            bytes,
        })
    }

    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> SourceFile {
        SourceFile {
            name: name.to_string(),
            bytes,
        }
    }

    pub fn kind(&self) -> SourceKind {
        let ext = Path::new(self.name.as_str())
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
            SourceKind::Spreadsheet
        } else {
            SourceKind::Delimited
        }
    }

    /// SHA-256 of the content, to recognize a file that is loaded again.
    pub fn digest(&self) -> String {
        sha256::digest(self.bytes.as_slice())
    }
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// The text encodings accepted for delimited files.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// ISO-8859-1: every byte is the code point of the same value.
    Latin1,
    /// Windows-1252, as defined by the WHATWG encoding standard.
    Cp1252,
}

impl TextEncoding {
    pub fn parse(s: &str) -> StudyResult<TextEncoding> {
        match s.trim().to_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            "cp1252" | "windows-1252" => Ok(TextEncoding::Cp1252),
            x => InvalidConfigSnafu {
                option: "encoding",
                message: format!("unknown encoding {:?} (utf-8, latin-1 or cp1252)", x),
            }
            .fail(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Cp1252 => "cp1252",
        }
    }

    /// Decodes the bytes, or None if they are not valid in this encoding.
    ///
    /// Nothing is replaced: a single malformed sequence fails the whole decoding.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => {
                let b = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                encoding_rs::UTF_8
                    .decode_without_bom_handling_and_without_replacement(b)
                    .map(|s| s.into_owned())
            }
            TextEncoding::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes).into_owned()),
            TextEncoding::Cp1252 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|s| s.into_owned()),
        }
    }
}

impl Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Column names from a header row: trimmed, blanks named after their position and
/// repeated names suffixed with `.1`, `.2`... so that every name is unique.
pub fn header_names(raw: &[String]) -> Vec<String> {
    let mut res: Vec<String> = Vec::with_capacity(raw.len());
    for (idx, cell) in raw.iter().enumerate() {
        let base = match cell.trim() {
            "" => format!("Unnamed: {}", idx),
            s => s.to_string(),
        };
        let mut name = base.clone();
        let mut suffix = 1;
        while res.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        res.push(name);
    }
    res
}

pub fn is_blank_row<S: AsRef<str>>(row: &[S]) -> bool {
    row.iter().all(|c| c.as_ref().trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn kind_from_extension() {
        assert_eq!(SourceFile::from_bytes("a.CSV", vec![]).kind(), SourceKind::Delimited);
        assert_eq!(SourceFile::from_bytes("a.txt", vec![]).kind(), SourceKind::Delimited);
        assert_eq!(SourceFile::from_bytes("noext", vec![]).kind(), SourceKind::Delimited);
        assert_eq!(SourceFile::from_bytes("a.xlsx", vec![]).kind(), SourceKind::Spreadsheet);
        assert_eq!(SourceFile::from_bytes("b.Ods", vec![]).kind(), SourceKind::Spreadsheet);
    }

    #[test]
    fn read_from_disk() {
        let mut tmp = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(tmp, "Activity,Duration\nRemove bolt,12\n").unwrap();
        let path = tmp.path().display().to_string();
        let f = SourceFile::read(&path).unwrap();
        assert!(f.name.ends_with(".csv"));
        assert_eq!(f.kind(), SourceKind::Delimited);
        assert_eq!(f.bytes, b"Activity,Duration\nRemove bolt,12\n".to_vec());
        assert_eq!(f.digest().len(), 64);

        let err = SourceFile::read("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, StudyError::OpeningFile { .. }));
    }

    #[test]
    fn strict_decoding() {
        // "Duración" in latin-1
        let bytes = b"Duraci\xf3n";
        assert_eq!(TextEncoding::Utf8.decode(bytes), None);
        assert_eq!(TextEncoding::Latin1.decode(bytes), Some("Duración".to_string()));
        assert_eq!(TextEncoding::Cp1252.decode(bytes), Some("Duración".to_string()));
        // 0x80 is the euro sign in cp1252 and a control character in latin-1.
        assert_eq!(TextEncoding::Cp1252.decode(b"\x80"), Some("\u{20ac}".to_string()));
        assert_eq!(TextEncoding::Latin1.decode(b"\x80"), Some("\u{80}".to_string()));
        // The BOM is not part of the text.
        assert_eq!(
            TextEncoding::Utf8.decode(b"\xEF\xBB\xBFActivity"),
            Some("Activity".to_string())
        );
    }

    #[test]
    fn encoding_names() {
        assert_eq!(TextEncoding::parse("UTF-8").unwrap(), TextEncoding::Utf8);
        assert_eq!(TextEncoding::parse("latin1").unwrap(), TextEncoding::Latin1);
        assert_eq!(TextEncoding::parse("windows-1252").unwrap(), TextEncoding::Cp1252);
        assert!(TextEncoding::parse("ebcdic").is_err());
        assert_eq!(TextEncoding::Cp1252.to_string(), "cp1252");
    }

    #[test]
    fn unique_header_names() {
        let raw: Vec<String> = ["Type", " Activity ", "", "Type", "Type"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            header_names(&raw),
            vec!["Type", "Activity", "Unnamed: 2", "Type.1", "Type.2"]
        );
    }

    #[test]
    fn simplified_names() {
        assert_eq!(simplify_file_name("/data/line4/study.csv"), "study.csv");
        assert_eq!(simplify_file_name("study.csv"), "study.csv");
    }
}
