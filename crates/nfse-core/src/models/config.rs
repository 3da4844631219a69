//! Configuration structures for the extraction pipelines.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::business::RecordKind;

/// Main configuration for nfse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NfseConfig {
    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Formatter steps per record kind.
    pub pipelines: PipelinesConfig,

    /// Batch processing configuration.
    pub batch: BatchConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `nfse_core::pipeline=debug`.
    pub filter: Option<String>,
}

/// Formatter steps applied after extraction, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelinesConfig {
    pub nota: Vec<FormatterStep>,
    pub tomador: Vec<FormatterStep>,
    pub prestador: Vec<FormatterStep>,
}

impl Default for PipelinesConfig {
    fn default() -> Self {
        let party = vec![FormatterStep::ToOnlyNumbers {
            columns: vec![
                "cnpj".to_string(),
                "cpf".to_string(),
                "cep".to_string(),
                "telefone".to_string(),
            ],
        }];

        Self {
            nota: vec![FormatterStep::RemoveLeadingZeros {
                columns: vec!["numero_nfs".to_string()],
            }],
            tomador: party.clone(),
            prestador: party,
        }
    }
}

/// One formatter applied to a set of columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormatterStep {
    RemoveLeadingZeros {
        columns: Vec<String>,
    },
    ToOnlyNumbers {
        columns: Vec<String>,
    },
    ReplaceChars {
        columns: Vec<String>,
        /// Ordered `[from, to]` pairs.
        replacements: Vec<(String, String)>,
    },
    Uppercase {
        columns: Vec<String>,
    },
    RemoveSpaces {
        columns: Vec<String>,
    },
    RemoveAccents {
        columns: Vec<String>,
    },
}

impl FormatterStep {
    pub fn columns(&self) -> &[String] {
        match self {
            Self::RemoveLeadingZeros { columns }
            | Self::ToOnlyNumbers { columns }
            | Self::ReplaceChars { columns, .. }
            | Self::Uppercase { columns }
            | Self::RemoveSpaces { columns }
            | Self::RemoveAccents { columns } => columns,
        }
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of documents processed in parallel.
    pub jobs: usize,

    /// Keep going after a document fails.
    pub continue_on_error: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            jobs: 4,
            continue_on_error: false,
        }
    }
}

impl NfseConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Formatter steps configured for `kind`.
    pub fn steps_for(&self, kind: RecordKind) -> &[FormatterStep] {
        match kind {
            RecordKind::Nota => &self.pipelines.nota,
            RecordKind::Tomador => &self.pipelines.tomador,
            RecordKind::Prestador => &self.pipelines.prestador,
        }
    }
}
