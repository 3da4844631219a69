//! Field-extractor operations.
//!
//! A document type is described by a [`FieldExtractor`]: one pure function
//! per output field, listed in an ordered table. The generic
//! [`FieldExtractorOperation`] runs every function in isolation, collects
//! all failures, and validates the assembled fields against the schema.

pub mod maceio;
pub mod patterns;
pub mod penedo;

pub use maceio::{MaceioNota, MaceioPrestador, MaceioTomador};
pub use penedo::{PenedoNota, PenedoPrestador, PenedoTomador};

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, error, warn};

use crate::error::{
    ExtractFailure, ExtractMethodError, GetAllExtractedInfoError, OperationError,
    OperationFailure, ValidationError,
};
use crate::models::file::{FileExtension, SourceFile};
use crate::models::schema::{FieldMap, Record, RecordSchema};
use crate::pipeline::operation::{Operation, OperationKind};
use crate::pipeline::payload::Payload;

/// Outcome of one extract method. No match is `Ok(None)`, not an error.
pub type ExtractResult = Result<Option<String>, ExtractFailure>;

/// A named function producing the value of one field.
pub struct ExtractMethod<E> {
    pub name: &'static str,
    pub field: &'static str,
    pub func: fn(&E) -> ExtractResult,
}

impl<E> ExtractMethod<E> {
    pub const fn new(name: &'static str, field: &'static str, func: fn(&E) -> ExtractResult) -> Self {
        Self { name, field, func }
    }
}

impl<E> Clone for ExtractMethod<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for ExtractMethod<E> {}

impl<E> fmt::Debug for ExtractMethod<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractMethod")
            .field("name", &self.name)
            .field("field", &self.field)
            .finish()
    }
}

/// Build an extract method list: `extract_methods![numero => Self::numero, ...]`.
///
/// Each method is named `extract_<field>`.
#[macro_export]
macro_rules! extract_methods {
    ($($field:ident => $func:expr),* $(,)?) => {
        vec![$(
            $crate::extract::ExtractMethod::new(
                concat!("extract_", stringify!($field)),
                stringify!($field),
                $func,
            )
        ),*]
    };
}

/// A document type whose fields are extracted one function at a time.
pub trait FieldExtractor: Sized + 'static {
    /// Operation name used in errors and logs.
    const NAME: &'static str;

    /// Schema the assembled fields must satisfy.
    fn schema() -> &'static RecordSchema;

    /// Extension of the documents this extractor reads.
    fn extension() -> FileExtension;

    /// Bind to a document. Reading is deferred: read failures surface from
    /// the extract methods that need the content.
    fn open(file: &SourceFile) -> Self;

    /// One method per schema field, in output order.
    fn extract_methods() -> Vec<ExtractMethod<Self>>;
}

/// Extract methods checked against a schema: every field exactly once.
pub struct ExtractMethodTable<E> {
    methods: Vec<ExtractMethod<E>>,
}

impl<E> ExtractMethodTable<E> {
    pub fn new(schema: &RecordSchema, methods: Vec<ExtractMethod<E>>) -> Result<Self, ValidationError> {
        let mut seen = HashSet::new();
        let mut problems = Vec::new();

        for method in &methods {
            if !seen.insert(method.field) {
                problems.push(format!("duplicate method for '{}'", method.field));
            }
            if schema.field(method.field).is_none() {
                problems.push(format!("method for unknown field '{}'", method.field));
            }
        }
        for field in schema.field_names() {
            if !seen.contains(field) {
                problems.push(format!("no method for '{field}'"));
            }
        }

        if problems.is_empty() {
            Ok(Self { methods })
        } else {
            Err(ValidationError::new("new", "extract_methods", problems.join("; "))
                .expecting(format!("one method per field of {}", schema.name)))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractMethod<E>> {
        self.methods.iter()
    }

    pub fn get(&self, field: &str) -> Option<&ExtractMethod<E>> {
        self.methods.iter().find(|method| method.field == field)
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.methods.iter().map(|method| method.field).collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<E> Clone for ExtractMethodTable<E> {
    fn clone(&self) -> Self {
        Self {
            methods: self.methods.clone(),
        }
    }
}

/// Runs a [`FieldExtractor`] as an operation.
pub struct FieldExtractorOperation<E> {
    table: ExtractMethodTable<E>,
}

impl<E: FieldExtractor> FieldExtractorOperation<E> {
    /// Fails when `E`'s extract methods do not cover its schema exactly.
    pub fn new() -> Result<Self, ValidationError> {
        let table = ExtractMethodTable::new(E::schema(), E::extract_methods()).map_err(|err| {
            error!(extractor = E::NAME, "{err}");
            err
        })?;
        Ok(Self { table })
    }

    pub fn extract_methods(&self) -> &ExtractMethodTable<E> {
        &self.table
    }

    /// Accept only files with this extractor's extension.
    pub fn validate_input<'a>(&self, input: &'a Payload) -> Result<&'a SourceFile, ValidationError> {
        match input {
            Payload::File(file) if file.extension == E::extension() => Ok(file),
            other => Err(ValidationError::new("validate_input", "input_data", other.type_name())
                .expecting(format!("file({})", E::extension()))),
        }
    }

    /// Run one method; errors and panics both come back as an [`ExtractMethodError`].
    pub fn run_extract_method(
        &self,
        document: &E,
        method: &ExtractMethod<E>,
    ) -> Result<Option<String>, ExtractMethodError> {
        let outcome = catch_unwind(AssertUnwindSafe(|| (method.func)(document)));

        let failure = match outcome {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(failure)) => failure,
            Err(payload) => ExtractFailure::Panicked(panic_message(payload.as_ref())),
        };

        let err = ExtractMethodError::new(method.name, failure);
        warn!(extractor = E::NAME, "{err}");
        Err(err)
    }

    /// Run every method, continuing past failures.
    ///
    /// Fails with every collected failure, in table order, if any method failed.
    pub fn get_all_extracted_info(&self, document: &E) -> Result<FieldMap, GetAllExtractedInfoError> {
        let mut fields = FieldMap::new();
        let mut failures = Vec::new();

        for method in self.table.iter() {
            match self.run_extract_method(document, method) {
                Ok(value) => {
                    fields.insert(method.field, value);
                }
                Err(err) => failures.push(err),
            }
        }

        if failures.is_empty() {
            debug!(extractor = E::NAME, fields = fields.len(), "extracted all fields");
            Ok(fields)
        } else {
            Err(GetAllExtractedInfoError::new(failures))
        }
    }

    pub fn validate_output(&self, fields: FieldMap) -> Result<Record, ValidationError> {
        E::schema().validate(fields).map_err(|mut err| {
            err.function_name = "validate_output".to_string();
            err.input_name = "output_data".to_string();
            err
        })
    }

    fn run_steps(&self, input: Payload) -> Result<Record, OperationFailure> {
        let file = self.validate_input(&input)?;
        let document = E::open(file);
        let fields = self.get_all_extracted_info(&document)?;
        Ok(self.validate_output(fields)?)
    }
}

impl<E: FieldExtractor> Operation for FieldExtractorOperation<E> {
    fn name(&self) -> &str {
        E::NAME
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Extractor
    }

    fn run(&self, input: Payload) -> Result<Payload, OperationError> {
        self.run_steps(input).map(Payload::Record).map_err(|failure| {
            let err = OperationError::new(E::NAME, failure);
            error!("{err}");
            err
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::{FieldSpec, FieldType};
    use pretty_assertions::assert_eq;

    static SAMPLE: RecordSchema = RecordSchema {
        name: "sample",
        fields: &[
            FieldSpec::required("numero", FieldType::Text),
            FieldSpec::required("valor", FieldType::Amount),
            FieldSpec::optional("serie", FieldType::Text),
        ],
        any_of: &[],
    };

    /// Behaviour is picked by the file stem so tests drive it through `run`.
    struct SampleDoc {
        mode: String,
    }

    impl SampleDoc {
        fn numero(&self) -> ExtractResult {
            match self.mode.as_str() {
                "one-fail" | "two-fail" => Err(ExtractFailure::msg("numero not found in layout")),
                _ => Ok(Some("0042".to_string())),
            }
        }

        fn valor(&self) -> ExtractResult {
            match self.mode.as_str() {
                "two-fail" => Err(ExtractFailure::msg("valor is garbled")),
                "panic" => panic!("index out of bounds"),
                "bad-valor" => Ok(Some("n/a".to_string())),
                _ => Ok(Some("120,00".to_string())),
            }
        }

        fn serie(&self) -> ExtractResult {
            Ok(None)
        }
    }

    impl FieldExtractor for SampleDoc {
        const NAME: &'static str = "SampleExtractor";

        fn schema() -> &'static RecordSchema {
            &SAMPLE
        }

        fn extension() -> FileExtension {
            FileExtension::Xml
        }

        fn open(file: &SourceFile) -> Self {
            let mode = file
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            Self { mode }
        }

        fn extract_methods() -> Vec<ExtractMethod<Self>> {
            extract_methods![
                numero => Self::numero,
                valor => Self::valor,
                serie => Self::serie,
            ]
        }
    }

    fn input(stem: &str) -> Payload {
        Payload::File(SourceFile::new(format!("{stem}.xml"), FileExtension::Xml))
    }

    fn operation() -> FieldExtractorOperation<SampleDoc> {
        FieldExtractorOperation::new().unwrap()
    }

    #[test]
    fn test_methods_cover_schema() {
        let op = operation();
        assert_eq!(op.extract_methods().fields(), vec!["numero", "valor", "serie"]);
        assert_eq!(op.extract_methods().get("valor").unwrap().name, "extract_valor");
    }

    #[test]
    fn test_table_rejects_incomplete_methods() {
        let missing: Vec<ExtractMethod<SampleDoc>> = extract_methods![
            numero => SampleDoc::numero,
            valor => SampleDoc::valor,
        ];
        let err = ExtractMethodTable::new(&SAMPLE, missing).err().unwrap();
        assert!(err.to_string().contains("no method for 'serie'"));

        let duplicated: Vec<ExtractMethod<SampleDoc>> = extract_methods![
            numero => SampleDoc::numero,
            numero => SampleDoc::numero,
            valor => SampleDoc::valor,
            serie => SampleDoc::serie,
        ];
        let err = ExtractMethodTable::new(&SAMPLE, duplicated).err().unwrap();
        assert!(err.to_string().contains("duplicate method for 'numero'"));

        let unknown: Vec<ExtractMethod<SampleDoc>> = extract_methods![
            numero => SampleDoc::numero,
            valor => SampleDoc::valor,
            serie => SampleDoc::serie,
            extra => SampleDoc::serie,
        ];
        let err = ExtractMethodTable::new(&SAMPLE, unknown).err().unwrap();
        assert!(err.to_string().contains("unknown field 'extra'"));
    }

    #[test]
    fn test_run_returns_validated_record() {
        let output = operation().run(input("ok")).unwrap();
        let record = output.as_record().unwrap();

        assert_eq!(record.kind(), "sample");
        assert_eq!(record.get("numero"), Some("0042"));
        assert_eq!(record.get("valor"), Some("120,00"));
        assert_eq!(record.fields().get("serie"), Some(&None));
    }

    #[test]
    fn test_one_failing_method() {
        let op = operation();
        let doc = SampleDoc::open(&SourceFile::new("one-fail.xml", FileExtension::Xml));

        let err = op.get_all_extracted_info(&doc).unwrap_err();
        assert_eq!(err.method_names(), vec!["extract_numero"]);
        let message = err.to_string();
        assert!(message.contains("extract_numero"));
        assert!(message.contains("numero not found in layout"));
    }

    #[test]
    fn test_two_failing_methods_in_order() {
        let err = operation().run(input("two-fail")).unwrap_err();
        let message = err.to_string();

        assert!(message.starts_with("error running operation SampleExtractor"));
        let first = message.find("extract_numero").unwrap();
        let second = message.find("extract_valor").unwrap();
        assert!(first < second);
        assert!(message.contains("numero not found in layout"));
        assert!(message.contains("valor is garbled"));
        assert!(matches!(err.source, OperationFailure::Extraction(_)));
    }

    #[test]
    fn test_panicking_method_is_captured() {
        let err = operation().run(input("panic")).unwrap_err();
        match &err.source {
            OperationFailure::Extraction(inner) => {
                assert_eq!(inner.method_names(), vec!["extract_valor"]);
                assert!(matches!(
                    &inner.failures[0].source,
                    ExtractFailure::Panicked(msg) if msg == "index out of bounds"
                ));
            }
            other => panic!("unexpected failure: {other}"),
        }
    }

    #[test]
    fn test_wrong_input_is_validation_error() {
        let op = operation();
        let pdf = Payload::File(SourceFile::new("ok.pdf", FileExtension::Pdf));

        let err = op.run(pdf).unwrap_err();
        assert!(matches!(err.source, OperationFailure::Validation(_)));
        assert!(err.to_string().contains("error validating input_data on function validate_input"));
        assert!(op.run(Payload::from("text")).is_err());
    }

    #[test]
    fn test_invalid_output_is_validation_error() {
        let err = operation().run(input("bad-valor")).unwrap_err();
        assert!(matches!(err.source, OperationFailure::Validation(_)));
        assert!(err.to_string().contains("error validating output_data on function validate_output"));
    }
}
