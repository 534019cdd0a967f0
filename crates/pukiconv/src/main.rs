mod logging;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use pukiconv_core::config::resolve_options;
use pukiconv_core::convert::{ConversionReport, run_conversion};
use pukiconv_core::error::ConversionError;
use pukiconv_core::walker::ProgressReporter;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(
    name = "pukiconv",
    version,
    about = "Convert a PukiWiki data tree from EUC-JP to UTF-8 (file names and content)"
)]
struct Cli {
    #[arg(value_name = "SOURCE_DIR", help = "PukiWiki data root holding wiki/ backup/ attach/ diff/ cache/")]
    source_dir: PathBuf,
    #[arg(value_name = "DESTINATION_DIR", help = "Empty or missing directory to write the UTF-8 tree into")]
    destination_dir: PathBuf,
    #[arg(long, value_name = "PATH", help = "TOML file with a [convert] section")]
    config: Option<PathBuf>,
    #[arg(long, help = "Print the run report as JSON")]
    json: bool,
}

struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn processing(&mut self, path: &Path) {
        println!("{}", processing_line(path));
    }

    fn failed(&mut self, path: &Path, error: &ConversionError) {
        eprintln!("{}", failure_line(path, error));
    }
}

fn processing_line(path: &Path) -> String {
    format!("Processing... {}", normalize_path(path))
}

fn failure_line(path: &Path, error: &ConversionError) -> String {
    format!("Can't convert {} caused by {error}. Skipped.", normalize_path(path))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_logger();
    let cli = Cli::parse();

    let options = resolve_options(cli.config.as_deref())?;
    debug!(
        encoding = options.encoding.name(),
        preserve_raw_copy_mtime = options.preserve_raw_copy_mtime,
        "resolved options"
    );

    println!("Start.");
    let report = run_conversion(
        &cli.source_dir,
        &cli.destination_dir,
        &options,
        &mut ConsoleReporter,
    )
    .with_context(|| {
        format!(
            "cannot convert {} into {}",
            normalize_path(&cli.source_dir),
            normalize_path(&cli.destination_dir)
        )
    })?;
    println!("Done.");

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ConversionReport) {
    for dir in &report.directories {
        println!(
            "{}: converted {}, failed {} ({} {})",
            dir.subdir,
            dir.converted,
            dir.failed,
            dir.strategy.as_str(),
            dir.pattern
        );
    }
    println!("total.converted: {}", report.total_converted());
    println!("total.failed: {}", report.total_failed());
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
