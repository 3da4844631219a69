//! The value threaded between pipeline tasks.

use serde::Serialize;

use crate::models::file::SourceFile;
use crate::models::schema::{FieldMap, Record};

/// Input or output of an operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// No value; what a pipeline receives when run without input.
    #[default]
    Empty,
    /// A document on disk.
    File(SourceFile),
    /// An unvalidated string-keyed mapping.
    Fields(FieldMap),
    /// A schema-validated record.
    Record(Record),
    /// Free text.
    Text(String),
}

impl Payload {
    /// Type descriptor used in validation messages.
    pub fn type_name(&self) -> String {
        match self {
            Self::Empty => "empty".to_string(),
            Self::File(file) => format!("file({})", file.extension),
            Self::Fields(_) => "fields".to_string(),
            Self::Record(record) => format!("record({})", record.kind()),
            Self::Text(_) => "text".to_string(),
        }
    }

    /// Whether the payload is a string-keyed mapping.
    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Fields(_) | Self::Record(_))
    }

    /// Field view of mapping payloads.
    pub fn fields(&self) -> Option<&FieldMap> {
        match self {
            Self::Fields(fields) => Some(fields),
            Self::Record(record) => Some(record.fields()),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&SourceFile> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<SourceFile> for Payload {
    fn from(file: SourceFile) -> Self {
        Self::File(file)
    }
}

impl From<FieldMap> for Payload {
    fn from(fields: FieldMap) -> Self {
        Self::Fields(fields)
    }
}

impl From<Record> for Payload {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}
