//! Error types for the nfse-core library.
//!
//! Errors are layered the same way the framework is: a failure deep inside
//! an extract method is wrapped once per boundary it crosses (operation,
//! task, pipeline), and every wrapper embeds the message of what it wraps.
//! The outermost [`PipelineError`] therefore reads as the full chain.

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Main error type for APIs outside the pipeline run itself.
#[derive(Error, Debug)]
pub enum NfseError {
    /// A pipeline failed to build or to run.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A document reader failed.
    #[error("reader error: {0}")]
    Reader(#[from] ReaderError),

    /// A value did not match its expected shape.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown municipality, record kind or file extension.
    #[error("unsupported value: {0}")]
    Unsupported(String),
}

/// Result type for the nfse library.
pub type Result<T> = std::result::Result<T, NfseError>;

/// Errors raised by the PDF and XML reader collaborators.
///
/// Cloneable because lazily-read documents cache the outcome and hand the
/// same failure to every extract method that asks for the content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    /// The file does not exist.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The file exists but cannot be read.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The content is not a valid document of the expected format.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(String),
}

impl ReaderError {
    /// Classify an I/O error raised while reading `path`.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        let location = path.display().to_string();
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(location),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(location),
            _ => Self::Io(format!("{location}: {err}")),
        }
    }
}

/// A value did not match the shape expected at a boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Function that performed the validation.
    pub function_name: String,
    /// Name of the validated argument.
    pub input_name: String,
    /// Description of what was received.
    pub received_type: String,
    /// Description of what was expected, when known.
    pub expected_type: Option<String>,
}

impl ValidationError {
    pub fn new(
        function_name: impl Into<String>,
        input_name: impl Into<String>,
        received_type: impl Into<String>,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            input_name: input_name.into(),
            received_type: received_type.into(),
            expected_type: None,
        }
    }

    /// Attach the expected type descriptor.
    pub fn expecting(mut self, expected_type: impl Into<String>) -> Self {
        self.expected_type = Some(expected_type.into());
        self
    }

    /// Build from a predicate mismatch.
    pub fn from_mismatch(
        function_name: impl Into<String>,
        input_name: impl Into<String>,
        mismatch: TypeMismatch,
    ) -> Self {
        Self::new(function_name, input_name, mismatch.received).expecting(mismatch.expected)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error validating {} on function {} - the received type is not allowed: {}",
            self.input_name, self.function_name, self.received_type
        )?;
        if let Some(expected) = &self.expected_type {
            write!(f, "; expected type: {expected}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Outcome of a task type predicate that rejected a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected}, got {received}")]
pub struct TypeMismatch {
    pub received: String,
    pub expected: String,
}

impl TypeMismatch {
    pub fn new(received: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            received: received.into(),
            expected: expected.into(),
        }
    }
}

/// A formatter's configured columns are absent from its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "missing columns on function {function_name}: the following columns are missing: [{}] on the input {input_name}",
    .missing_columns.join(", ")
)]
pub struct MissingColumnsError {
    pub function_name: String,
    pub input_name: String,
    pub missing_columns: Vec<String>,
}

/// The original failure raised inside one extract method.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractFailure {
    /// The underlying document could not be read.
    #[error(transparent)]
    Reader(#[from] ReaderError),

    /// The method reported a failure of its own.
    #[error("{0}")]
    Message(String),

    /// The method panicked.
    #[error("panicked: {0}")]
    Panicked(String),
}

impl ExtractFailure {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// One extract method failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("error on extract method {method_name} - {source}")]
pub struct ExtractMethodError {
    pub method_name: String,
    #[source]
    pub source: ExtractFailure,
}

impl ExtractMethodError {
    pub fn new(method_name: impl Into<String>, source: ExtractFailure) -> Self {
        Self {
            method_name: method_name.into(),
            source,
        }
    }
}

/// One or more extract methods failed during a single extraction batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetAllExtractedInfoError {
    /// Every failure, in invocation order.
    pub failures: Vec<ExtractMethodError>,
}

impl GetAllExtractedInfoError {
    pub fn new(failures: Vec<ExtractMethodError>) -> Self {
        Self { failures }
    }

    /// Names of the failing methods, in invocation order.
    pub fn method_names(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.method_name.as_str()).collect()
    }
}

impl fmt::Display for GetAllExtractedInfoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error on the following extract methods: [")?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{failure}")?;
        }
        write!(f, "]")
    }
}

impl std::error::Error for GetAllExtractedInfoError {}

/// Why an operation failed.
#[derive(Error, Debug)]
pub enum OperationFailure {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    MissingColumns(#[from] MissingColumnsError),

    #[error(transparent)]
    Extraction(#[from] GetAllExtractedInfoError),

    /// A nested operation failed.
    #[error(transparent)]
    Operation(#[from] Box<OperationError>),

    /// Failure reported by a custom operation.
    #[error("{0}")]
    Other(String),
}

impl OperationFailure {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// One operation's run failed.
#[derive(Error, Debug)]
#[error("error running operation {operation_name} - {source}")]
pub struct OperationError {
    pub operation_name: String,
    #[source]
    pub source: OperationFailure,
}

impl OperationError {
    pub fn new(operation_name: impl Into<String>, source: impl Into<OperationFailure>) -> Self {
        Self {
            operation_name: operation_name.into(),
            source: source.into(),
        }
    }
}

/// Why a task failed.
#[derive(Error, Debug)]
pub enum TaskFailure {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Operation(#[from] OperationError),
}

/// One task's run failed.
#[derive(Error, Debug)]
#[error("error running task {task_name} - {source}")]
pub struct TaskError {
    pub task_name: String,
    #[source]
    pub source: TaskFailure,
}

impl TaskError {
    pub fn new(task_name: impl Into<String>, source: impl Into<TaskFailure>) -> Self {
        Self {
            task_name: task_name.into(),
            source: source.into(),
        }
    }
}

/// Why a pipeline failed.
#[derive(Error, Debug)]
pub enum PipelineFailure {
    /// A task failed while running; later tasks did not run.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// The pipeline could not be assembled.
    #[error("invalid pipeline definition: {0}")]
    Definition(#[from] ValidationError),
}

/// Terminal error reported to the caller of a pipeline.
#[derive(Error, Debug)]
#[error("error running pipeline {pipeline_name} - {source}")]
pub struct PipelineError {
    pub pipeline_name: String,
    #[source]
    pub source: PipelineFailure,
}

impl PipelineError {
    pub fn new(pipeline_name: impl Into<String>, source: impl Into<PipelineFailure>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            source: source.into(),
        }
    }

    /// The task error that aborted the run, if any.
    pub fn task_error(&self) -> Option<&TaskError> {
        match &self.source {
            PipelineFailure::Task(err) => Some(err),
            PipelineFailure::Definition(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_message() {
        let err = ValidationError::new("validate_input", "input_data", "text").expecting("file(xml)");
        let message = err.to_string();
        assert!(message.contains("error validating input_data on function validate_input"));
        assert!(message.contains("the received type is not allowed: text"));
        assert!(message.contains("expected type: file(xml)"));

        let bare = ValidationError::new("validate_input", "input_data", "text");
        assert!(!bare.to_string().contains("expected type"));
    }

    #[test]
    fn test_missing_columns_lists_every_column() {
        let err = MissingColumnsError {
            function_name: "validate_input_data_columns".to_string(),
            input_name: "input_data".to_string(),
            missing_columns: vec!["b".to_string(), "c".to_string()],
        };
        assert!(err.to_string().contains("[b, c]"));
    }

    #[test]
    fn test_get_all_extracted_info_error_keeps_order() {
        let err = GetAllExtractedInfoError::new(vec![
            ExtractMethodError::new("extract_first", ExtractFailure::msg("boom one")),
            ExtractMethodError::new("extract_second", ExtractFailure::msg("boom two")),
        ]);
        let message = err.to_string();

        let first = message.find("extract_first").unwrap();
        let second = message.find("extract_second").unwrap();
        assert!(first < second);
        assert!(message.contains("boom one"));
        assert!(message.contains("boom two"));
        assert_eq!(err.method_names(), vec!["extract_first", "extract_second"]);
    }

    #[test]
    fn test_wrapping_keeps_every_layer() {
        let extraction = GetAllExtractedInfoError::new(vec![ExtractMethodError::new(
            "extract_cep",
            ExtractFailure::Reader(ReaderError::NotFound("a.xml".to_string())),
        )]);
        let operation = OperationError::new("MaceioTomadorExtractor", extraction);
        let task = TaskError::new("ExtractDataTask", operation);
        let pipeline = PipelineError::new("maceio-tomador", task);

        let message = pipeline.to_string();
        assert!(message.contains("error running pipeline maceio-tomador"));
        assert!(message.contains("error running task ExtractDataTask"));
        assert!(message.contains("error running operation MaceioTomadorExtractor"));
        assert!(message.contains("extract_cep"));
        assert!(message.contains("file not found: a.xml"));
        assert!(pipeline.task_error().is_some());
    }

    #[test]
    fn test_reader_error_from_io() {
        let path = Path::new("missing.pdf");
        let err = ReaderError::from_io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err, ReaderError::NotFound("missing.pdf".to_string()));

        let err = ReaderError::from_io(
            path,
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, ReaderError::PermissionDenied(_)));
    }
}
