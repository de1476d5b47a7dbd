use clap::Parser;
use log::{info, warn};

mod args;
mod study;

use crate::args::Args;
use crate::study::config_reader::{read_config, StudyConfigFile};
use crate::study::*;

fn run(args: &Args) -> StudyResult<()> {
    let mut config_file = match &args.config {
        Some(path) => read_config(path)?,
        None => StudyConfigFile::default(),
    };
    config_file.apply_args(args);
    let config = config_file.to_load_config()?;
    let input = config_file.input_path()?;

    let file = SourceFile::read(&input)?;
    let loaded = load(&file, &config)?;
    eprintln!("{}", loaded.report.status_message());

    let summary = build_summary_js(&loaded);
    write_summary(&summary, args.out.as_deref().unwrap_or("stdout"))?;

    if let Some(reference) = &args.reference {
        check_reference(&summary, reference.clone())?;
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    info!("args: {:?}", args);

    if let Err(e) = run(&args) {
        warn!("Error: {:?}", e);
        eprintln!("Error: {}", e);
        eprintln!("Suggestion: {}", e.remedy());
        std::process::exit(1);
    }
}
