use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use data_sweeper::config::FileOptions;
use data_sweeper::config::OptionsDocument;
use data_sweeper::config::DEFAULT_PREVIEW_ROWS;
use data_sweeper::output::OutputDirectory;
use data_sweeper::pipeline::process_batch;
use data_sweeper::pipeline::FileReport;
use data_sweeper::pipeline::Notice;
use data_sweeper::pipeline::UploadedFile;
use data_sweeper::ExportFormat;

#[derive(Parser, Debug)]
#[command(
    name = "data-sweeper",
    version,
    about = "Upload CSV or Excel files, clean them, and convert them!"
)]
struct Cli {
    /// Files or glob patterns to process
    #[arg(required = true)]
    files: Vec<String>,

    /// Remove rows that duplicate an earlier row
    #[arg(short = 'd', long = "remove-duplicates")]
    remove_duplicates: bool,

    /// Fill missing numbers with the mean of their column
    #[arg(short = 'f', long = "fill-missing")]
    fill_missing: bool,

    /// Columns to keep, repeatable or comma-separated; all columns when absent
    #[arg(short = 'c', long = "columns", value_delimiter = ',')]
    columns: Option<Vec<String>>,

    /// Target format
    #[arg(short = 't', long = "to", value_enum, default_value_t = ExportFormat::Csv)]
    to: ExportFormat,

    /// Directory receiving the converted files
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    output_dir: PathBuf,

    /// Number of rows shown in each preview
    #[arg(short = 'n', long = "preview-rows", default_value_t = DEFAULT_PREVIEW_ROWS)]
    preview_rows: usize,

    /// Print name, type and missing count of every column
    #[arg(long = "describe")]
    describe: bool,

    /// JSON document with per-file options
    #[arg(long = "options")]
    options: Option<PathBuf>,
}

impl Cli {
    /// Options applying to every file without an entry in the options document.
    fn defaults(&self) -> FileOptions {
        FileOptions {
            remove_duplicates: self.remove_duplicates,
            fill_missing_numeric: self.fill_missing,
            columns: self
                .columns
                .as_ref()
                .map(|columns| columns.iter().filter(|name| !name.is_empty()).cloned().collect()),
            convert_to: self.to,
            preview_rows: self.preview_rows,
            describe: self.describe,
        }
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "data_sweeper=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let defaults = cli.defaults();
    let document = match &cli.options {
        Some(path) => OptionsDocument::load(path)?,
        None => OptionsDocument::default(),
    };

    let mut failures = 0usize;
    let mut files = Vec::new();
    let inputs = expand_inputs(&cli.files);
    for path in &inputs {
        match read_upload(path) {
            Ok(file) => files.push(file),
            Err(error) => {
                warn!("{:#}", error);
                println!("{:#}", error);
                failures += 1;
            }
        }
    }
    info!("Processing {} files", files.len());

    let report = process_batch(files, |name| document.options_for(name, &defaults));
    let mut output = OutputDirectory::new(&cli.output_dir, &inputs);
    for file in &report.files {
        print_report(file);
        if let Some(artifact) = &file.artifact {
            if let Err(error) = output.write(artifact) {
                warn!("{}: {}", file.name, error);
                println!("{error}");
                failures += 1;
            }
        }
    }
    for notice in &report.notices {
        println!("{notice}");
    }

    failures += report.failed();
    Ok(if failures == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Expands glob patterns; a pattern matching nothing is kept as a literal path
/// so that a missing file is still reported.
fn expand_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let matches: Vec<PathBuf> = match glob::glob(pattern) {
            Ok(entries) => entries.filter_map(Result::ok).filter(|path| path.is_file()).collect(),
            Err(error) => {
                warn!("Invalid pattern '{}': {}", pattern, error);
                Vec::new()
            }
        };
        if matches.is_empty() {
            paths.push(PathBuf::from(pattern));
        } else {
            paths.extend(matches);
        }
    }
    paths
}

fn read_upload(path: &Path) -> Result<UploadedFile> {
    let content = fs::read(path).with_context(|| format!("Read '{}' failed", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(UploadedFile::new(&name, content))
}

fn print_report(file: &FileReport) {
    for notice in &file.notices {
        println!("{notice}");
        if let Notice::Preview { .. } = notice {
            if let Some(preview) = &file.preview {
                print!("{preview}");
            }
            if let Some(description) = &file.description {
                println!("Columns:");
                for column in description {
                    println!("  {}: {} ({} missing)", column.name, column.kind.as_str(), column.nulls);
                }
            }
        }
    }
}
