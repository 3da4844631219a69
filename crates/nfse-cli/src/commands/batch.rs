//! Batch processing command for multiple invoice files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use futures_util::StreamExt;
use futures_util::stream;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use nfse_core::models::FileExtension;
use nfse_core::{Municipality, Record, RecordKind, build_pipeline};

use super::process::{OutputFormat, extract_record, format_record};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Municipality that issued the invoices (maceio, penedo)
    #[arg(long)]
    city: Municipality,

    /// Record to extract (nota, tomador, prestador)
    #[arg(short, long, default_value = "nota")]
    record: RecordKind,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers (default: from config)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    record: Option<Record>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = Arc::new(super::load_config(config_path)?);

    let jobs = args.jobs.unwrap_or(config.batch.jobs).max(1);
    let continue_on_error = args.continue_on_error || config.batch.continue_on_error;

    // Fail on a bad pipeline definition before touching any file
    build_pipeline(args.city, args.record, &config)?;

    let wanted = args.city.extension();
    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .and_then(|e| e.parse::<FileExtension>().ok())
                == Some(wanted)
        })
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No .{} files found for pattern: {}", wanted, args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let (city, kind) = (args.city, args.record);
    let mut pending = stream::iter(files)
        .map(|path| {
            let config = Arc::clone(&config);
            async move {
                let file_start = Instant::now();
                let worker_path = path.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    extract_record(&worker_path, city, kind, &config)
                })
                .await
                .unwrap_or_else(|e| Err(anyhow::anyhow!("Worker failed: {}", e)));

                let processing_time_ms = file_start.elapsed().as_millis() as u64;
                match outcome {
                    Ok(record) => ProcessResult {
                        path,
                        record: Some(record),
                        error: None,
                        processing_time_ms,
                    },
                    Err(e) => ProcessResult {
                        path,
                        record: None,
                        error: Some(e.to_string()),
                        processing_time_ms,
                    },
                }
            }
        })
        .buffer_unordered(jobs);

    let mut results = Vec::new();
    while let Some(result) = pending.next().await {
        overall_pb.inc(1);

        if let Some(error_msg) = &result.error {
            if continue_on_error {
                warn!("Failed to process {}: {}", result.path.display(), error_msg);
            } else {
                overall_pb.abandon();
                error!("Failed to process {}: {}", result.path.display(), error_msg);
                anyhow::bail!("Processing failed: {}", error_msg);
            }
        }

        results.push(result);
    }

    overall_pb.finish_with_message("Complete");
    results.sort_by(|a, b| a.path.cmp(&b.path));

    let successful: Vec<_> = results.iter().filter(|r| r.record.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    if let Some(output_dir) = &args.output_dir {
        for result in &successful {
            if let Some(record) = &result.record {
                let output_name = result
                    .path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("nfse");

                let output_path = output_dir.join(format!(
                    "{}.{}.{}",
                    output_name,
                    kind,
                    args.format.extension()
                ));

                fs::write(&output_path, format_record(record, args.format)?)?;
                debug!("Wrote output to {}", output_path.display());
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, kind, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// One row per file: status, every schema field, timing and error.
fn write_summary(path: &Path, kind: RecordKind, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let field_names: Vec<&str> = kind.schema().field_names().collect();

    let mut header = vec!["filename", "status"];
    header.extend(&field_names);
    header.extend(["processing_time_ms", "error"]);
    wtr.write_record(&header)?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        let mut row = vec![filename.to_string()];
        match &result.record {
            Some(record) => {
                row.push("success".to_string());
                row.extend(
                    field_names
                        .iter()
                        .map(|name| record.get(name).unwrap_or_default().to_string()),
                );
            }
            None => {
                row.push("error".to_string());
                row.extend(field_names.iter().map(|_| String::new()));
            }
        }
        row.push(result.processing_time_ms.to_string());
        row.push(result.error.clone().unwrap_or_default());

        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}
