//! Catalog of supported documents: one pipeline per municipality and record kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use tracing::{debug, error};

use crate::error::{NfseError, PipelineError, ValidationError};
use crate::extract::{
    MaceioNota, MaceioPrestador, MaceioTomador, PenedoNota, PenedoPrestador, PenedoTomador,
};
use crate::format::{
    RemoveAccents, RemoveLeadingZeros, RemoveSpaces, ReplaceChars, ToOnlyNumbers, Uppercase,
};
use crate::models::business::RecordKind;
use crate::models::config::{FormatterStep, NfseConfig};
use crate::models::file::FileExtension;
use crate::pipeline::runner::Pipeline;
use crate::pipeline::task::{ExtractDataTask, FormatDataTask};

/// Municipalities whose NFS-e layout is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Municipality {
    /// Maceió, GISS XML web service responses.
    Maceio,
    /// Penedo, PDF invoices.
    Penedo,
}

impl Municipality {
    pub const ALL: [Municipality; 2] = [Self::Maceio, Self::Penedo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maceio => "maceio",
            Self::Penedo => "penedo",
        }
    }

    /// File type this municipality's invoices come in.
    pub fn extension(&self) -> FileExtension {
        match self {
            Self::Maceio => FileExtension::Xml,
            Self::Penedo => FileExtension::Pdf,
        }
    }
}

impl fmt::Display for Municipality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Municipality {
    type Err = NfseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "maceio" | "maceió" => Ok(Self::Maceio),
            "penedo" => Ok(Self::Penedo),
            _ => Err(NfseError::Unsupported(format!("municipality '{s}'"))),
        }
    }
}

/// Extraction task for the document type of `municipality` and `kind`.
pub fn extract_task(
    municipality: Municipality,
    kind: RecordKind,
) -> Result<ExtractDataTask, ValidationError> {
    match (municipality, kind) {
        (Municipality::Maceio, RecordKind::Nota) => ExtractDataTask::for_extractor::<MaceioNota>(),
        (Municipality::Maceio, RecordKind::Tomador) => {
            ExtractDataTask::for_extractor::<MaceioTomador>()
        }
        (Municipality::Maceio, RecordKind::Prestador) => {
            ExtractDataTask::for_extractor::<MaceioPrestador>()
        }
        (Municipality::Penedo, RecordKind::Nota) => ExtractDataTask::for_extractor::<PenedoNota>(),
        (Municipality::Penedo, RecordKind::Tomador) => {
            ExtractDataTask::for_extractor::<PenedoTomador>()
        }
        (Municipality::Penedo, RecordKind::Prestador) => {
            ExtractDataTask::for_extractor::<PenedoPrestador>()
        }
    }
}

/// Formatting task described by one configuration step.
pub fn format_task(step: &FormatterStep) -> Result<FormatDataTask, ValidationError> {
    let columns = step.columns().to_vec();
    match step {
        FormatterStep::RemoveLeadingZeros { .. } => {
            FormatDataTask::for_formatter(columns, RemoveLeadingZeros)
        }
        FormatterStep::ToOnlyNumbers { .. } => FormatDataTask::for_formatter(columns, ToOnlyNumbers),
        FormatterStep::ReplaceChars { replacements, .. } => {
            FormatDataTask::for_formatter(columns, ReplaceChars::new(replacements.clone()))
        }
        FormatterStep::Uppercase { .. } => FormatDataTask::for_formatter(columns, Uppercase),
        FormatterStep::RemoveSpaces { .. } => FormatDataTask::for_formatter(columns, RemoveSpaces),
        FormatterStep::RemoveAccents { .. } => FormatDataTask::for_formatter(columns, RemoveAccents),
    }
}

/// Assemble the pipeline for one document type: extraction followed by
/// the formatter steps configured for `kind`.
pub fn build_pipeline(
    municipality: Municipality,
    kind: RecordKind,
    config: &NfseConfig,
) -> Result<Pipeline, PipelineError> {
    let name = format!("{municipality}-{kind}");

    let mut builder = Pipeline::builder(name.clone()).try_task(extract_task(municipality, kind));
    for (i, step) in config.steps_for(kind).iter().enumerate() {
        let task = format_task(step).map(|task| task.named(format!("FormatDataTask[{i}]")));
        builder = builder.try_task(task);
    }

    match builder.build() {
        Ok(pipeline) => {
            debug!(pipeline = %name, tasks = ?pipeline.task_names(), "built pipeline");
            Ok(pipeline)
        }
        Err(err) => {
            error!("{err}");
            Err(err)
        }
    }
}
