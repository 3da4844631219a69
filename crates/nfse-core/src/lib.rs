//! Core library for NFS-e (Brazilian electronic service invoice) field extraction.
//!
//! This crate provides:
//! - An operation / task / pipeline framework with layered errors
//! - Field extractors for Maceió (GISS XML) and Penedo (PDF) invoices
//! - Column formatters (leading zeros, digits only, replacements, accents)
//! - Record schemas for the invoice and its service taker and provider
//! - A catalog assembling one pipeline per municipality and record kind

pub mod catalog;
pub mod error;
pub mod extract;
pub mod format;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod xml;

pub use catalog::{Municipality, build_pipeline};
pub use error::{
    NfseError, OperationError, PipelineError, ReaderError, Result, TaskError, ValidationError,
};
pub use extract::{FieldExtractor, FieldExtractorOperation};
pub use format::{Formatter, FormatterOperation};
pub use models::{FieldMap, NfseConfig, Record, RecordKind, SourceFile};
pub use pipeline::{Operation, Payload, Pipeline, Task};
