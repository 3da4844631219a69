//! Formatter operations: pure rewrites of configured columns.

mod rules;

pub use rules::{
    RemoveAccents, RemoveLeadingZeros, RemoveSpaces, ReplaceChars, ToOnlyNumbers, Uppercase,
};

use std::collections::HashSet;

use tracing::{debug, error};

use crate::error::{MissingColumnsError, OperationError, OperationFailure, ValidationError};
use crate::models::schema::{FieldMap, Record};
use crate::pipeline::operation::{Operation, OperationKind};
use crate::pipeline::payload::Payload;

/// A value transformation applied column by column.
pub trait Formatter: Clone + Send + Sync + 'static {
    /// Operation name used in errors and logs.
    const NAME: &'static str;

    fn format_value(&self, value: &str) -> String;

    /// Check the formatter's own settings.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Runs a [`Formatter`] over a fixed set of columns.
#[derive(Debug, Clone)]
pub struct FormatterOperation<F> {
    columns: Vec<String>,
    formatter: F,
}

pub type RemoveLeadingZerosFormatter = FormatterOperation<RemoveLeadingZeros>;
pub type ToOnlyNumbersFormatter = FormatterOperation<ToOnlyNumbers>;
pub type ReplaceCharsFormatter = FormatterOperation<ReplaceChars>;
pub type UppercaseFormatter = FormatterOperation<Uppercase>;
pub type RemoveSpacesFormatter = FormatterOperation<RemoveSpaces>;
pub type RemoveAccentsFormatter = FormatterOperation<RemoveAccents>;

impl<F: Formatter> FormatterOperation<F> {
    /// Fails unless `columns` is a non-empty list of distinct, non-blank names.
    pub fn new<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        formatter: F,
    ) -> Result<Self, ValidationError> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();

        let mut seen = HashSet::new();
        let problem = if columns.is_empty() {
            Some("empty list".to_string())
        } else if columns.iter().any(|c| c.trim().is_empty()) {
            Some("list with a blank column name".to_string())
        } else {
            columns
                .iter()
                .find(|c| !seen.insert(c.as_str()))
                .map(|c| format!("list with duplicate column '{c}'"))
        };

        if let Some(received) = problem {
            let err = ValidationError::new("new", "columns", received)
                .expecting("non-empty list of distinct column names");
            error!(formatter = F::NAME, "{err}");
            return Err(err);
        }

        formatter.validate()?;
        Ok(Self { columns, formatter })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn formatter(&self) -> &F {
        &self.formatter
    }

    pub fn validate_input_data_type(&self, input: &Payload) -> Result<(), ValidationError> {
        if input.is_mapping() {
            Ok(())
        } else {
            Err(
                ValidationError::new("validate_input_data_type", "input_data", input.type_name())
                    .expecting("fields or record"),
            )
        }
    }

    /// Lists every configured column absent from `fields`.
    pub fn validate_input_data_columns(&self, fields: &FieldMap) -> Result<(), MissingColumnsError> {
        let missing_columns: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !fields.contains_key(c))
            .cloned()
            .collect();

        if missing_columns.is_empty() {
            Ok(())
        } else {
            Err(MissingColumnsError {
                function_name: "validate_input_data_columns".to_string(),
                input_name: "input_data".to_string(),
                missing_columns,
            })
        }
    }

    /// Format the configured columns. Null values stay null.
    pub fn perform(&self, mut fields: FieldMap) -> FieldMap {
        for column in &self.columns {
            if let Some(Some(value)) = fields.get_mut(column) {
                *value = self.formatter.format_value(value);
            }
        }
        fields
    }

    /// [`perform`](Self::perform) on a record, keeping it a record.
    ///
    /// Formatted values are not re-checked against the record's schema.
    pub fn perform_record(&self, record: Record) -> Record {
        record.map_values(|name, value| {
            self.columns
                .iter()
                .any(|column| column == name)
                .then(|| self.formatter.format_value(value))
        })
    }

    pub fn validate_output_data(&self, output: &Payload) -> Result<(), ValidationError> {
        if output.is_mapping() {
            Ok(())
        } else {
            Err(
                ValidationError::new("validate_output_data", "output_data", output.type_name())
                    .expecting("fields or record"),
            )
        }
    }

    fn run_steps(&self, input: Payload) -> Result<Payload, OperationFailure> {
        self.validate_input_data_type(&input)?;

        let output = match input {
            Payload::Fields(fields) => {
                self.validate_input_data_columns(&fields)?;
                Payload::Fields(self.perform(fields))
            }
            Payload::Record(record) => {
                self.validate_input_data_columns(record.fields())?;
                Payload::Record(self.perform_record(record))
            }
            other => other,
        };

        self.validate_output_data(&output)?;
        Ok(output)
    }
}

impl<F: Formatter> Operation for FormatterOperation<F> {
    fn name(&self) -> &str {
        F::NAME
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Formatter
    }

    fn run(&self, input: Payload) -> Result<Payload, OperationError> {
        match self.run_steps(input) {
            Ok(output) => {
                debug!(formatter = F::NAME, columns = ?self.columns, "formatted columns");
                Ok(output)
            }
            Err(failure) => {
                let err = OperationError::new(F::NAME, failure);
                error!("{err}");
                Err(err)
            }
        }
    }
}
