//! Field maps, record schemas and schema-validated records.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Ordered mapping of field name to raw string value.
///
/// Insertion order is kept so records serialise in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, Option<String>)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing an existing entry in place.
    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) -> Option<Option<String>> {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: Option<&str>) -> Self {
        self.insert(name, value.map(str::to_string));
        self
    }

    /// Entry for `name`: `None` when absent, `Some(None)` when null.
    pub fn get(&self, name: &str) -> Option<&Option<String>> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Non-null value for `name`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|value| value.as_deref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Option<String>> {
        self.entries
            .iter_mut()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

impl IntoIterator for FieldMap {
    type Item = (String, Option<String>);
    type IntoIter = std::vec::IntoIter<(String, Option<String>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Primitive type a field value must be coercible to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    /// Decimal amount, Brazilian (`1.234,56`) or ISO (`1234.56`) notation.
    Amount,
    Date,
    /// One of a closed set of codes.
    OneOf(&'static [&'static str]),
}

impl FieldType {
    fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Text => true,
            Self::Amount => parse_amount(value).is_some(),
            Self::Date => parse_date(value).is_some(),
            Self::OneOf(allowed) => allowed.contains(&value),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Amount => f.write_str("amount"),
            Self::Date => f.write_str("date"),
            Self::OneOf(allowed) => write!(f, "one of [{}]", allowed.join(", ")),
        }
    }
}

/// One field of a record schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
        }
    }
}

/// A typed record definition.
#[derive(Debug, PartialEq, Eq)]
pub struct RecordSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
    /// Groups of optional fields where at least one member must be non-null.
    pub any_of: &'static [&'static [&'static str]],
}

/// A single reason a field map does not satisfy a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldIssue {
    Missing(&'static str),
    Null(&'static str),
    Unknown(String),
    Invalid {
        field: &'static str,
        expected: FieldType,
        value: String,
    },
    NoneOf(&'static [&'static str]),
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(field) => write!(f, "missing required field '{field}'"),
            Self::Null(field) => write!(f, "required field '{field}' is null"),
            Self::Unknown(field) => write!(f, "unknown field '{field}'"),
            Self::Invalid {
                field,
                expected,
                value,
            } => write!(f, "field '{field}' is not a valid {expected}: '{value}'"),
            Self::NoneOf(group) => write!(f, "at least one of [{}] must be set", group.join(", ")),
        }
    }
}

impl RecordSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|spec| spec.name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter(|spec| spec.required)
            .map(|spec| spec.name)
    }

    pub fn optional_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter(|spec| !spec.required)
            .map(|spec| spec.name)
    }

    /// Every issue that keeps `fields` from satisfying this schema.
    pub fn check(&self, fields: &FieldMap) -> Vec<FieldIssue> {
        let mut issues = Vec::new();

        for spec in self.fields {
            match fields.get(spec.name) {
                None if spec.required => issues.push(FieldIssue::Missing(spec.name)),
                Some(None) if spec.required => issues.push(FieldIssue::Null(spec.name)),
                Some(Some(value)) if !spec.field_type.accepts(value) => {
                    issues.push(FieldIssue::Invalid {
                        field: spec.name,
                        expected: spec.field_type,
                        value: value.clone(),
                    })
                }
                _ => {}
            }
        }

        for key in fields.keys() {
            if self.field(key).is_none() {
                issues.push(FieldIssue::Unknown(key.to_string()));
            }
        }

        for group in self.any_of {
            if group.iter().all(|name| fields.value(name).is_none()) {
                issues.push(FieldIssue::NoneOf(group));
            }
        }

        issues
    }

    /// Validate `fields` and wrap them into a [`Record`].
    ///
    /// Values are kept as extracted; validation only checks they are
    /// coercible to the declared types. Absent optional fields are added
    /// as null so every record carries the full field set in schema order.
    pub fn validate(&'static self, fields: FieldMap) -> Result<Record, ValidationError> {
        let issues = self.check(&fields);
        if !issues.is_empty() {
            let received = issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ValidationError::new("validate", "fields", received)
                .expecting(format!("{} record", self.name)));
        }

        let mut ordered = FieldMap::new();
        for spec in self.fields {
            let value = fields.get(spec.name).cloned().flatten();
            ordered.insert(spec.name, value);
        }

        Ok(Record {
            schema: self,
            fields: ordered,
        })
    }
}

/// A field map that satisfied its schema when it was built.
///
/// Formatters rewrite values in place through [`Record::map_values`], which
/// keeps the schema and field set but does not re-check value types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    schema: &'static RecordSchema,
    fields: FieldMap,
}

impl Record {
    pub fn schema(&self) -> &'static RecordSchema {
        self.schema
    }

    /// Schema name, e.g. `nota`.
    pub fn kind(&self) -> &'static str {
        self.schema.name
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.value(name)
    }

    /// Value of an amount field as a decimal.
    pub fn amount(&self, name: &str) -> Option<Decimal> {
        self.get(name).and_then(parse_amount)
    }

    /// Value of a date field.
    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        self.get(name).and_then(parse_date)
    }

    pub fn into_fields(self) -> FieldMap {
        self.fields
    }

    /// Rewrite every non-null value whose field `f` returns a replacement for.
    pub fn map_values<F>(mut self, mut f: F) -> Self
    where
        F: FnMut(&str, &str) -> Option<String>,
    {
        for (name, value) in self.fields.entries.iter_mut() {
            if let Some(current) = value.as_deref() {
                if let Some(replacement) = f(name.as_str(), current) {
                    *value = Some(replacement);
                }
            }
        }
        self
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Parse a Brazilian or ISO formatted amount (e.g. "R$ 1.234,56" or "1234.56").
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let trimmed = s.trim().trim_start_matches("R$");
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if cleaned.is_empty()
        || !cleaned
            .chars()
            .all(|c| c.is_ascii_digit() || c == ',' || c == '.' || c == '-')
    {
        return None;
    }

    let normalized = if cleaned.contains(',') && !cleaned.contains('.') {
        cleaned.replace(',', ".")
    } else if cleaned.contains(',') && cleaned.contains('.') {
        // Whichever separator comes last is the decimal one
        match (cleaned.rfind(','), cleaned.rfind('.')) {
            (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
            _ => cleaned.replace(',', ""),
        }
    } else {
        cleaned
    };

    Decimal::from_str(&normalized).ok()
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Parse the date formats found on NFS-e documents.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
    {
        return Some(date);
    }

    if let Some(datetime) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
    {
        return Some(datetime.date());
    }

    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    static SAMPLE: RecordSchema = RecordSchema {
        name: "sample",
        fields: &[
            FieldSpec::required("numero", FieldType::Text),
            FieldSpec::required("valor", FieldType::Amount),
            FieldSpec::optional("emissao", FieldType::Date),
            FieldSpec::optional("cpf", FieldType::Text),
            FieldSpec::optional("cnpj", FieldType::Text),
            FieldSpec::required("reter", FieldType::OneOf(&["0", "1"])),
        ],
        any_of: &[&["cpf", "cnpj"]],
    };

    fn sample_fields() -> FieldMap {
        FieldMap::new()
            .with("numero", Some("0042"))
            .with("valor", Some("1.234,56"))
            .with("cnpj", Some("12.345.678/0001-90"))
            .with("reter", Some("1"))
    }

    #[test]
    fn test_field_map_keeps_order_and_replaces_in_place() {
        let mut map = FieldMap::new().with("b", Some("1")).with("a", None);
        map.insert("b", Some("2".to_string()));

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(map.value("b"), Some("2"));
        assert_eq!(map.get("a"), Some(&None));
        assert_eq!(map.get("c"), None);
    }

    #[test]
    fn test_validate_fills_optional_fields_in_schema_order() {
        let record = SAMPLE.validate(sample_fields()).unwrap();

        assert_eq!(record.kind(), "sample");
        assert_eq!(
            record.fields().keys().collect::<Vec<_>>(),
            vec!["numero", "valor", "emissao", "cpf", "cnpj", "reter"]
        );
        assert_eq!(record.get("numero"), Some("0042"));
        assert_eq!(record.get("emissao"), None);
        assert_eq!(record.amount("valor"), Decimal::from_str("1234.56").ok());
    }

    #[test]
    fn test_validate_reports_every_issue() {
        let fields = FieldMap::new()
            .with("valor", Some("abc"))
            .with("reter", None)
            .with("extra", Some("x"));

        let issues = SAMPLE.check(&fields);
        assert!(issues.contains(&FieldIssue::Missing("numero")));
        assert!(issues.contains(&FieldIssue::Null("reter")));
        assert!(issues.contains(&FieldIssue::Unknown("extra".to_string())));
        assert!(issues.contains(&FieldIssue::NoneOf(&["cpf", "cnpj"])));
        assert!(issues.iter().any(|issue| matches!(issue, FieldIssue::Invalid { field: "valor", .. })));

        let err = SAMPLE.validate(fields).unwrap_err();
        assert_eq!(err.function_name, "validate");
        assert!(err.to_string().contains("missing required field 'numero'"));
        assert!(err.to_string().contains("unknown field 'extra'"));
    }

    #[test]
    fn test_one_of_rejects_other_codes() {
        let fields = sample_fields().with("reter", Some("2"));
        assert!(SAMPLE.validate(fields).is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1.234,56"), Decimal::from_str("1234.56").ok());
        assert_eq!(parse_amount("R$ 120,00"), Decimal::from_str("120.00").ok());
        assert_eq!(parse_amount("1234.56"), Decimal::from_str("1234.56").ok());
        assert_eq!(parse_amount("1,234.56"), Decimal::from_str("1234.56").ok());
        assert_eq!(parse_amount("0"), Some(Decimal::ZERO));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("12abc"), None);
    }

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15);
        assert_eq!(parse_date("2024-03-15"), expected);
        assert_eq!(parse_date("15/03/2024"), expected);
        assert_eq!(parse_date("2024-03-15T10:20:30"), expected);
        assert_eq!(parse_date("2024-03-15T10:20:30.123"), expected);
        assert_eq!(parse_date("2024-03-15T10:20:30-03:00"), expected);
        assert_eq!(parse_date("15/03/2024 10:20:30"), expected);
        assert_eq!(parse_date("15/03/2024 10:20"), expected);
        assert_eq!(parse_date("March 15"), None);
    }

    #[test]
    fn test_record_serializes_in_order() {
        let record = SAMPLE.validate(sample_fields()).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.starts_with(r#"{"numero":"0042","valor":"1.234,56","emissao":null"#));
    }
}
