//! Process command - extract one record from a single invoice file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use nfse_core::models::config::NfseConfig;
use nfse_core::{Municipality, Payload, Record, RecordKind, SourceFile, build_pipeline};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (Maceió XML or Penedo PDF)
    #[arg(required = true)]
    input: PathBuf,

    /// Municipality that issued the invoice (maceio, penedo)
    #[arg(long)]
    city: Municipality,

    /// Record to extract (nota, tomador, prestador)
    #[arg(short, long, default_value = "nota")]
    record: RecordKind,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Extracting {} ({})...", args.record, args.city));

    let input = args.input.clone();
    let (city, kind) = (args.city, args.record);
    let outcome =
        tokio::task::spawn_blocking(move || extract_record(&input, city, kind, &config)).await?;

    pb.finish_and_clear();
    let record = outcome?;

    let output = format_record(&record, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Run a freshly built pipeline over one file.
pub fn extract_record(
    path: &Path,
    city: Municipality,
    kind: RecordKind,
    config: &NfseConfig,
) -> anyhow::Result<Record> {
    let source = SourceFile::from_path(path)?;
    let pipeline = build_pipeline(city, kind, config)?;

    match pipeline.run(Payload::File(source))? {
        Payload::Record(record) => Ok(record),
        other => anyhow::bail!("Pipeline {} returned {}", pipeline.name(), other.type_name()),
    }
}

pub fn format_record(record: &Record, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Csv => format_csv(record),
        OutputFormat::Text => Ok(format_text(record)),
    }
}

fn format_csv(record: &Record) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(record.fields().keys())?;
    wtr.write_record(record.fields().iter().map(|(_, value)| value.unwrap_or("")))?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(record: &Record) -> String {
    let mut output = format!("{}:\n", record.kind());

    let width = record.fields().keys().map(str::len).max().unwrap_or(0);
    for (name, value) in record.fields().iter() {
        output.push_str(&format!("  {:<width$}  {}\n", name, value.unwrap_or("-")));
    }

    output
}
