use clap::Parser;

/// Loads a time-study table exported by hand (CSV or spreadsheet) and prints it as JSON.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The file to load: .csv, .txt or a spreadsheet (.xlsx, .xls, .xlsb, .ods).
    /// Setting this option overrides the filePath of the configuration file.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (file path, optional) A JSON file with the load options. See the manual in the tabsniff crate
    /// for its format. Relative input paths are resolved from the directory of this file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (default auto) The field separator of delimited files: auto, comma, semicolon or tab.
    #[clap(short, long, value_parser)]
    pub delimiter: Option<String>,

    /// (default utf-8) The text encoding of delimited files: utf-8, latin-1 or cp1252.
    #[clap(short, long, value_parser)]
    pub encoding: Option<String>,

    /// (default auto) The 0-based index of the header row. When given, no detection is done.
    #[clap(long, value_parser)]
    pub header_row: Option<String>,

    /// (default bestMatch) How to choose between several header candidates: bestMatch or firstMatch.
    #[clap(long, value_parser)]
    pub header_strategy: Option<String>,

    /// (default: first worksheet) When using a spreadsheet, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (file path or 'stdout', default stdout) Where to write the loaded table and its report in JSON format.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing the expected JSON output. If provided, smedload will
    /// check that its output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// Turns on debug logging (written to the standard error). RUST_LOG still takes precedence.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
