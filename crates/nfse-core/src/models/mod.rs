//! Data models: source files, record schemas, business records, configuration.

pub mod business;
pub mod config;
pub mod file;
pub mod schema;

pub use business::{RecordKind, NOTA, PRESTADOR, TOMADOR};
pub use config::{FormatterStep, NfseConfig};
pub use file::{FileExtension, SourceFile};
pub use schema::{FieldMap, FieldSpec, FieldType, Record, RecordSchema};
