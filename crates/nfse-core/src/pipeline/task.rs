//! Tasks: the validation boundary around one operation.
//!
//! A task owns a recipe for its operation rather than the operation itself,
//! so every run starts from a freshly built instance and nothing leaks from
//! one document to the next.

use tracing::{debug, error, info_span};

use super::operation::{Operation, OperationKind};
use super::payload::Payload;
use crate::error::{TaskError, TaskFailure, TypeMismatch, ValidationError};
use crate::extract::{FieldExtractor, FieldExtractorOperation};
use crate::format::{Formatter, FormatterOperation};

/// A named step of a pipeline.
pub trait Task: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, input: Payload) -> Result<Payload, TaskError>;
}

/// What a task recognizes as a valid operation, input and output,
/// regardless of which operation is plugged in.
pub trait TaskContract: Send + Sync + 'static {
    /// Default task name.
    const NAME: &'static str;

    fn accepts_operation(&self, operation: &dyn Operation) -> Result<(), TypeMismatch>;

    fn accepts_input(&self, input: &Payload) -> Result<(), TypeMismatch>;

    fn accepts_output(&self, output: &Payload) -> Result<(), TypeMismatch>;
}

type OperationFactory = Box<dyn Fn() -> Result<Box<dyn Operation>, ValidationError> + Send + Sync>;

/// A task running one operation under a contract.
pub struct OperationTask<C: TaskContract> {
    name: String,
    contract: C,
    factory: OperationFactory,
}

impl<C: TaskContract> OperationTask<C> {
    /// Create a task that builds its operation with `factory` on every run.
    pub fn new<F, O>(contract: C, factory: F) -> Self
    where
        F: Fn() -> Result<O, ValidationError> + Send + Sync + 'static,
        O: Operation + 'static,
    {
        Self {
            name: C::NAME.to_string(),
            contract,
            factory: Box::new(move || factory().map(|op| Box::new(op) as Box<dyn Operation>)),
        }
    }

    /// Override the task name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn contract(&self) -> &C {
        &self.contract
    }

    /// Check the freshly built operation against the contract.
    #[doc(alias = "validate_operation_cls")]
    pub fn validate_operation(&self, operation: &dyn Operation) -> Result<(), ValidationError> {
        self.contract
            .accepts_operation(operation)
            .map_err(|m| ValidationError::from_mismatch("validate_operation", "operation", m))
    }

    pub fn validate_input(&self, input: &Payload) -> Result<(), ValidationError> {
        self.contract
            .accepts_input(input)
            .map_err(|m| ValidationError::from_mismatch("validate_input", "input_data", m))
    }

    pub fn validate_output(&self, output: &Payload) -> Result<(), ValidationError> {
        self.contract
            .accepts_output(output)
            .map_err(|m| ValidationError::from_mismatch("validate_output", "output_data", m))
    }

    fn run_steps(&self, input: Payload) -> Result<Payload, TaskFailure> {
        let operation = (self.factory)()?;
        self.validate_operation(operation.as_ref())?;
        self.validate_input(&input)?;
        let output = operation.run(input)?;
        self.validate_output(&output)?;
        Ok(output)
    }
}

impl<C: TaskContract> Task for OperationTask<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, input: Payload) -> Result<Payload, TaskError> {
        let span = info_span!("task", name = %self.name);
        let _guard = span.enter();

        debug!(input = %input.type_name(), "running task");
        match self.run_steps(input) {
            Ok(output) => {
                debug!(output = %output.type_name(), "task finished");
                Ok(output)
            }
            Err(failure) => {
                let err = TaskError::new(self.name.clone(), failure);
                error!("{err}");
                Err(err)
            }
        }
    }
}

fn expect_kind(operation: &dyn Operation, kind: OperationKind) -> Result<(), TypeMismatch> {
    if operation.kind() == kind {
        Ok(())
    } else {
        Err(TypeMismatch::new(
            format!("{} operation {}", operation.kind(), operation.name()),
            format!("{kind} operation"),
        ))
    }
}

/// Document in, validated record out, run by an extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractData;

impl TaskContract for ExtractData {
    const NAME: &'static str = "ExtractDataTask";

    fn accepts_operation(&self, operation: &dyn Operation) -> Result<(), TypeMismatch> {
        expect_kind(operation, OperationKind::Extractor)
    }

    fn accepts_input(&self, input: &Payload) -> Result<(), TypeMismatch> {
        match input {
            Payload::File(_) => Ok(()),
            other => Err(TypeMismatch::new(other.type_name(), "file")),
        }
    }

    fn accepts_output(&self, output: &Payload) -> Result<(), TypeMismatch> {
        match output {
            Payload::Record(_) => Ok(()),
            other => Err(TypeMismatch::new(other.type_name(), "record")),
        }
    }
}

/// Mapping in, mapping out, run by a formatter.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatData;

impl TaskContract for FormatData {
    const NAME: &'static str = "FormatDataTask";

    fn accepts_operation(&self, operation: &dyn Operation) -> Result<(), TypeMismatch> {
        expect_kind(operation, OperationKind::Formatter)
    }

    fn accepts_input(&self, input: &Payload) -> Result<(), TypeMismatch> {
        if input.is_mapping() {
            Ok(())
        } else {
            Err(TypeMismatch::new(input.type_name(), "fields or record"))
        }
    }

    fn accepts_output(&self, output: &Payload) -> Result<(), TypeMismatch> {
        if output.is_mapping() {
            Ok(())
        } else {
            Err(TypeMismatch::new(output.type_name(), "fields or record"))
        }
    }
}

/// Accepts any operation and payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyPayload;

impl TaskContract for AnyPayload {
    const NAME: &'static str = "Task";

    fn accepts_operation(&self, _operation: &dyn Operation) -> Result<(), TypeMismatch> {
        Ok(())
    }

    fn accepts_input(&self, _input: &Payload) -> Result<(), TypeMismatch> {
        Ok(())
    }

    fn accepts_output(&self, _output: &Payload) -> Result<(), TypeMismatch> {
        Ok(())
    }
}

pub type ExtractDataTask = OperationTask<ExtractData>;
pub type FormatDataTask = OperationTask<FormatData>;

impl OperationTask<ExtractData> {
    /// Task running the extractor for document type `E`.
    ///
    /// The extract method table is checked against the schema here, so an
    /// incomplete extractor fails when the pipeline is built.
    pub fn for_extractor<E: FieldExtractor>() -> Result<Self, ValidationError> {
        FieldExtractorOperation::<E>::new()?;
        Ok(Self::new(ExtractData, FieldExtractorOperation::<E>::new))
    }
}

impl OperationTask<FormatData> {
    /// Task running `formatter` over `columns`.
    pub fn for_formatter<F: Formatter>(
        columns: Vec<String>,
        formatter: F,
    ) -> Result<Self, ValidationError> {
        let prototype = FormatterOperation::new(columns, formatter)?;
        Ok(Self::new(FormatData, move || Ok(prototype.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OperationFailure;
    use crate::models::file::{FileExtension, SourceFile};
    use crate::models::schema::FieldMap;
    use crate::pipeline::operation::FnOperation;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Text in, text out, custom operations only.
    struct TextOnly;

    impl TaskContract for TextOnly {
        const NAME: &'static str = "DumpTask";

        fn accepts_operation(&self, operation: &dyn Operation) -> Result<(), TypeMismatch> {
            expect_kind(operation, OperationKind::Custom)
        }

        fn accepts_input(&self, input: &Payload) -> Result<(), TypeMismatch> {
            match input {
                Payload::Text(_) => Ok(()),
                other => Err(TypeMismatch::new(other.type_name(), "text")),
            }
        }

        fn accepts_output(&self, output: &Payload) -> Result<(), TypeMismatch> {
            self.accepts_input(output)
        }
    }

    fn mock_operation(output: Payload) -> FnOperation {
        FnOperation::new("MockOperation", move |_| Ok(output.clone()))
    }

    #[test]
    fn test_run_returns_operation_output() {
        let task = OperationTask::new(AnyPayload, || Ok(mock_operation(Payload::from("hello"))))
            .named("DummyTask");

        assert_eq!(task.name(), "DummyTask");
        assert_eq!(task.run(Payload::Empty).unwrap(), Payload::from("hello"));
    }

    #[test]
    fn test_rejected_operation() {
        let task = OperationTask::new(TextOnly, || {
            Ok(mock_operation(Payload::from("hello")).with_kind(OperationKind::Formatter))
        });

        let message = task.run(Payload::from("x")).unwrap_err().to_string().to_lowercase();
        assert!(message.contains("error running task dumptask"));
        assert!(message.contains("error validating operation"));
        assert!(message.contains("the received type is not allowed"));
    }

    #[test]
    fn test_rejected_input() {
        let task = OperationTask::new(TextOnly, || Ok(mock_operation(Payload::from("hello"))));

        let err = task.run(Payload::Empty).unwrap_err();
        assert!(matches!(err.source, TaskFailure::Validation(_)));
        let message = err.to_string().to_lowercase();
        assert!(message.contains("error running task dumptask"));
        assert!(message.contains("error validating input_data"));
        assert!(message.contains("the received type is not allowed: empty"));
    }

    #[test]
    fn test_rejected_output() {
        let task = OperationTask::new(TextOnly, || Ok(mock_operation(Payload::Empty)));

        let message = task.run(Payload::from("x")).unwrap_err().to_string().to_lowercase();
        assert!(message.contains("error running task dumptask"));
        assert!(message.contains("error validating output_data"));
        assert!(message.contains("the received type is not allowed"));
    }

    #[test]
    fn test_operation_failure_becomes_task_error() {
        let task = OperationTask::new(TextOnly, || {
            Ok(FnOperation::new("MockOperation", |_| {
                Err(OperationFailure::other("boom"))
            }))
        });

        let err = task.run(Payload::from("x")).unwrap_err();
        assert!(matches!(err.source, TaskFailure::Operation(_)));
        let message = err.to_string().to_lowercase();
        assert!(message.contains("error running task dumptask"));
        assert!(message.contains("error running operation mockoperation"));
        assert!(message.contains("boom"));
    }

    #[test]
    fn test_each_run_builds_a_fresh_operation() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let task = OperationTask::new(AnyPayload, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(mock_operation(Payload::Empty))
        });

        task.run(Payload::Empty).unwrap();
        task.run(Payload::Empty).unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_extract_and_format_contracts() {
        let file = Payload::from(SourceFile::new("a.xml", FileExtension::Xml));
        let fields = Payload::from(FieldMap::new());

        assert!(ExtractData.accepts_input(&file).is_ok());
        assert!(ExtractData.accepts_input(&fields).is_err());
        assert!(ExtractData.accepts_output(&fields).is_err());
        assert!(FormatData.accepts_input(&fields).is_ok());
        assert!(FormatData.accepts_input(&file).is_err());
        assert!(FormatData.accepts_output(&Payload::from("x")).is_err());

        let custom = mock_operation(Payload::Empty);
        assert!(ExtractData.accepts_operation(&custom).is_err());
        assert!(FormatData.accepts_operation(&custom).is_err());
    }
}
