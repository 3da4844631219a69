//! The atomic unit of work.

use std::fmt;

use tracing::{debug, error};

use super::payload::Payload;
use crate::error::{OperationError, OperationFailure};

/// Broad family an operation belongs to, checked by task contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Turns a document into a record.
    Extractor,
    /// Rewrites configured columns of a mapping.
    Formatter,
    /// Anything else.
    Custom,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extractor => f.write_str("extractor"),
            Self::Formatter => f.write_str("formatter"),
            Self::Custom => f.write_str("custom"),
        }
    }
}

/// A single `run(input) -> output` capability.
///
/// Operations carry no validation contract of their own; the task that
/// owns one checks what goes in and out.
pub trait Operation: Send {
    /// Name used in error messages and logs.
    fn name(&self) -> &str;

    fn kind(&self) -> OperationKind {
        OperationKind::Custom
    }

    fn run(&self, input: Payload) -> Result<Payload, OperationError>;
}

type OperationFn = Box<dyn Fn(Payload) -> Result<Payload, OperationFailure> + Send + Sync>;

/// Adapts a closure into an [`Operation`].
pub struct FnOperation {
    name: String,
    kind: OperationKind,
    func: OperationFn,
}

impl FnOperation {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Payload) -> Result<Payload, OperationFailure> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: OperationKind::Custom,
            func: Box::new(func),
        }
    }

    pub fn with_kind(mut self, kind: OperationKind) -> Self {
        self.kind = kind;
        self
    }
}

impl Operation for FnOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> OperationKind {
        self.kind
    }

    fn run(&self, input: Payload) -> Result<Payload, OperationError> {
        match (self.func)(input) {
            Ok(output) => {
                debug!(operation = %self.name, output = %output.type_name(), "operation finished");
                Ok(output)
            }
            Err(failure) => {
                let err = OperationError::new(self.name.clone(), failure);
                error!(operation = %self.name, "{err}");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_operation_runs_closure() {
        let op = FnOperation::new("Echo", Ok);
        assert_eq!(op.name(), "Echo");
        assert_eq!(op.kind(), OperationKind::Custom);
        assert_eq!(op.run(Payload::from("hi")).unwrap(), Payload::from("hi"));
    }

    #[test]
    fn test_fn_operation_wraps_failure() {
        let op = FnOperation::new("Broken", |_| Err(OperationFailure::other("disk on fire")))
            .with_kind(OperationKind::Formatter);

        let err = op.run(Payload::Empty).unwrap_err();
        assert_eq!(err.operation_name, "Broken");
        assert_eq!(err.to_string(), "error running operation Broken - disk on fire");
        assert_eq!(op.kind(), OperationKind::Formatter);
    }
}
