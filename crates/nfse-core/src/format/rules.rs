//! Built-in value formatters.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use super::Formatter;
use crate::error::ValidationError;

/// Strips leading zeros, keeping a single `0` for all-zero values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveLeadingZeros;

impl Formatter for RemoveLeadingZeros {
    const NAME: &'static str = "RemoveLeadingZeros";

    fn format_value(&self, value: &str) -> String {
        let trimmed = value.trim_start_matches('0');
        if trimmed.is_empty() && !value.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

/// Keeps ASCII digits only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToOnlyNumbers;

impl Formatter for ToOnlyNumbers {
    const NAME: &'static str = "ToOnlyNumbers";

    fn format_value(&self, value: &str) -> String {
        value.chars().filter(char::is_ascii_digit).collect()
    }
}

/// Applies `(from, to)` substring replacements in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceChars {
    replacements: Vec<(String, String)>,
}

impl ReplaceChars {
    pub fn new(replacements: Vec<(String, String)>) -> Self {
        Self { replacements }
    }

    pub fn replacements(&self) -> &[(String, String)] {
        &self.replacements
    }
}

impl Formatter for ReplaceChars {
    const NAME: &'static str = "ReplaceChars";

    fn format_value(&self, value: &str) -> String {
        self.replacements
            .iter()
            .fold(value.to_string(), |acc, (from, to)| acc.replace(from.as_str(), to))
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.replacements.iter().any(|(from, _)| from.is_empty()) {
            return Err(
                ValidationError::new("new", "replacements", "empty pattern")
                    .expecting("non-empty strings to replace"),
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Uppercase;

impl Formatter for Uppercase {
    const NAME: &'static str = "Uppercase";

    fn format_value(&self, value: &str) -> String {
        value.to_uppercase()
    }
}

/// Drops every ASCII space. Tabs and line breaks are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveSpaces;

impl Formatter for RemoveSpaces {
    const NAME: &'static str = "RemoveSpaces";

    fn format_value(&self, value: &str) -> String {
        value.chars().filter(|c| *c != ' ').collect()
    }
}

/// Decomposes to NFD and drops the combining marks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveAccents;

impl Formatter for RemoveAccents {
    const NAME: &'static str = "RemoveAccents";

    fn format_value(&self, value: &str) -> String {
        value.nfd().filter(|c| !is_combining_mark(*c)).collect()
    }
}
