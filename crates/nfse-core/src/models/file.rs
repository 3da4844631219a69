//! Source file handles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ValidationError;

/// File extensions a source document may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileExtension {
    Pdf,
    Docx,
    Doc,
    Xlsx,
    Xls,
    Csv,
    Xml,
}

impl FileExtension {
    pub const ALL: [FileExtension; 7] = [
        Self::Pdf,
        Self::Docx,
        Self::Doc,
        Self::Xlsx,
        Self::Xls,
        Self::Csv,
        Self::Xml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Doc => "doc",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Csv => "csv",
            Self::Xml => "xml",
        }
    }
}

impl fmt::Display for FileExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileExtension {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|ext| ext.as_str() == lowered)
            .ok_or_else(|| {
                ValidationError::new("from_str", "extension", s).expecting(
                    Self::ALL
                        .iter()
                        .map(|ext| ext.as_str())
                        .collect::<Vec<_>>()
                        .join("|"),
                )
            })
    }
}

/// An opaque handle to a document on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub extension: FileExtension,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, extension: FileExtension) -> Self {
        Self {
            path: path.into(),
            extension,
        }
    }

    /// Build a handle, taking the extension from the path.
    ///
    /// Fails when the path has no extension or the extension is not one of
    /// the known document types. The file itself is not touched.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let path = path.as_ref();
        let raw = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                ValidationError::new("from_path", "path", path.display().to_string())
                    .expecting("a path with a file extension")
            })?;
        let extension = raw.parse::<FileExtension>().map_err(|mut err| {
            err.function_name = "from_path".to_string();
            err.input_name = "path".to_string();
            err
        })?;

        Ok(Self::new(path, extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_parsing() {
        assert_eq!("pdf".parse::<FileExtension>().unwrap(), FileExtension::Pdf);
        assert_eq!("XML".parse::<FileExtension>().unwrap(), FileExtension::Xml);
        assert_eq!(".xlsx".parse::<FileExtension>().unwrap(), FileExtension::Xlsx);
        assert!("txt".parse::<FileExtension>().is_err());
    }

    #[test]
    fn test_source_file_from_path() {
        let file = SourceFile::from_path("notas/123.xml").unwrap();
        assert_eq!(file.extension, FileExtension::Xml);
        assert_eq!(file.path, PathBuf::from("notas/123.xml"));

        let err = SourceFile::from_path("notas/123.txt").unwrap_err();
        assert_eq!(err.function_name, "from_path");
        assert!(err.to_string().contains("123.txt") || err.received_type == "txt");

        assert!(SourceFile::from_path("notas/README").is_err());
    }
}
