use crate::args::Args;
use crate::study::*;

use std::path::Path;

use serde::{Deserialize, Serialize};

/// The JSON configuration file. Every field is optional.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyConfigFile {
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    pub delimiter: Option<String>,
    pub encoding: Option<String>,
    /// "auto", or a 0-based index given as a number or a string.
    #[serde(rename = "headerRowIndex")]
    pub header_row_index: Option<JSValue>,
    #[serde(rename = "headerStrategy")]
    pub header_strategy: Option<String>,
    #[serde(rename = "previewWindow")]
    pub preview_window: Option<JSValue>,
    pub keywords: Option<Vec<String>>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    /// Canonical field name -> source column name.
    pub columns: Option<BTreeMap<String, String>>,
    #[serde(rename = "numericColumns")]
    pub numeric_columns: Option<Vec<String>>,
}

/// Reads a configuration file. A relative filePath is resolved from the directory of the file.
pub fn read_config(path: &str) -> StudyResult<StudyConfigFile> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let mut config: StudyConfigFile =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    if let Some(fp) = config.file_path.clone() {
        let root = Path::new(path).parent().unwrap_or_else(|| Path::new(""));
        if Path::new(fp.as_str()).is_relative() {
            let resolved = root.join(fp.as_str()).display().to_string();
            debug!("read_config: filePath {:?} resolved to {:?}", fp, resolved);
            config.file_path = Some(resolved);
        }
    }
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// Integers may be written as numbers or as strings.
fn read_js_int(x: &JSValue, option: &str) -> StudyResult<usize> {
    let res = match x {
        JSValue::Number(n) => n.as_u64().map(|x| x as usize),
        JSValue::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    res.context(InvalidConfigSnafu {
        option,
        message: format!("expected a non-negative integer, got {}", x),
    })
}

impl StudyConfigFile {
    /// Command line values take precedence over the ones of the file.
    pub fn apply_args(&mut self, args: &Args) {
        fn pick(arg: &Option<String>, current: &mut Option<String>) {
            if arg.is_some() {
                *current = arg.clone();
            }
        }
        pick(&args.input, &mut self.file_path);
        pick(&args.delimiter, &mut self.delimiter);
        pick(&args.encoding, &mut self.encoding);
        pick(&args.header_strategy, &mut self.header_strategy);
        pick(&args.excel_worksheet_name, &mut self.excel_worksheet_name);
        if let Some(hr) = &args.header_row {
            self.header_row_index = Some(JSValue::String(hr.clone()));
        }
    }

    pub fn input_path(&self) -> StudyResult<String> {
        self.file_path.clone().context(InvalidConfigSnafu {
            option: "input",
            message: "no input file given (--input or filePath)",
        })
    }

    fn header_row(&self) -> StudyResult<HeaderRow> {
        match &self.header_row_index {
            None | Some(JSValue::Null) => Ok(HeaderRow::Auto),
            Some(JSValue::String(s)) => HeaderRow::parse(s),
            Some(x) => read_js_int(x, "headerRowIndex").map(HeaderRow::Index),
        }
    }

    fn preview_window(&self) -> StudyResult<Option<usize>> {
        match &self.preview_window {
            None | Some(JSValue::Null) => Ok(None),
            Some(x) => {
                let w = read_js_int(x, "previewWindow")?;
                ensure!(
                    w > 0,
                    InvalidConfigSnafu {
                        option: "previewWindow",
                        message: "the preview window cannot be empty",
                    }
                );
                Ok(Some(w))
            }
        }
    }

    fn keywords(&self) -> StudyResult<Vec<String>> {
        match &self.keywords {
            None => Ok(LoadConfig::default().keywords),
            Some(kws) => {
                let distinct: Vec<String> = kws
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .fold(Vec::new(), |mut acc, k| {
                        if !acc.contains(&k) {
                            acc.push(k);
                        }
                        acc
                    });
                ensure!(
                    distinct.len() >= MIN_HEADER_MATCHES,
                    InvalidConfigSnafu {
                        option: "keywords",
                        message: format!(
                            "at least {} distinct keywords are needed to recognize a header, got {:?}",
                            MIN_HEADER_MATCHES, kws
                        ),
                    }
                );
                Ok(distinct)
            }
        }
    }

    fn columns(&self) -> StudyResult<ColumnMapping> {
        let mut mapping = ColumnMapping::new();
        for (field_name, column) in self.columns.iter().flatten() {
            let field = CanonicalField::parse(field_name).context(InvalidConfigSnafu {
                option: "columns",
                message: format!(
                    "unknown field {:?} (Activity, Category, CurrentType, ProposedType or DurationRaw)",
                    field_name
                ),
            })?;
            mapping.set(field, column.clone());
        }
        Ok(mapping)
    }

    /// Validates every option and builds the configuration of a load.
    pub fn to_load_config(&self) -> StudyResult<LoadConfig> {
        let default = LoadConfig::default();
        let res = LoadConfig {
            delimiter: match &self.delimiter {
                Some(d) => DelimiterChoice::parse(d)?,
                None => default.delimiter,
            },
            encoding: match &self.encoding {
                Some(e) => TextEncoding::parse(e)?,
                None => default.encoding,
            },
            header_row: self.header_row()?,
            header_strategy: match &self.header_strategy {
                Some(s) => parse_strategy(s)?,
                None => default.header_strategy,
            },
            preview_window: self.preview_window()?,
            keywords: self.keywords()?,
            worksheet_name: self.excel_worksheet_name.clone(),
            columns: self.columns()?,
            numeric_columns: self.numeric_columns.clone().unwrap_or_default(),
        };
        info!("load config: {:?}", res);
        Ok(res)
    }
}
