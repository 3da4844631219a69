//! PDF text reader.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ReaderError;

/// Extract the text layer of the PDF at `path`.
pub fn extract_text(path: &Path) -> Result<String, ReaderError> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(ReaderError::InvalidFormat(format!(
            "{} is not a PDF file",
            path.display()
        )));
    }

    let data = std::fs::read(path).map_err(|e| ReaderError::from_io(path, e))?;
    let text = pdf_extract::extract_text_from_mem(&data)
        .map_err(|e| ReaderError::InvalidFormat(format!("{}: {e}", path.display())))?;

    debug!(path = %path.display(), chars = text.len(), "extracted PDF text");
    Ok(text)
}

/// Text of one PDF, read on first access and cached.
///
/// A read failure is cached too, so every caller sees the same error.
#[derive(Debug)]
pub struct TextDocument {
    path: Option<PathBuf>,
    text: OnceCell<Result<String, ReaderError>>,
}

impl TextDocument {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            text: OnceCell::new(),
        }
    }

    /// A document with already known text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            path: None,
            text: OnceCell::from(Ok(text.into())),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn text(&self) -> Result<&str, ReaderError> {
        let result = self.text.get_or_init(|| match &self.path {
            Some(path) => extract_text(path),
            None => Ok(String::new()),
        });
        match result {
            Ok(text) => Ok(text.as_str()),
            Err(err) => Err(err.clone()),
        }
    }

    pub fn lines(&self) -> Result<Vec<&str>, ReaderError> {
        Ok(self.text()?.lines().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_pdf_path() {
        let err = extract_text(Path::new("nota.xml")).unwrap_err();
        assert!(matches!(err, ReaderError::InvalidFormat(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_text(&dir.path().join("missing.pdf")).unwrap_err();
        assert!(matches!(err, ReaderError::NotFound(_)));
    }

    #[test]
    fn test_garbage_is_invalid_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        let err = extract_text(&path).unwrap_err();
        assert!(matches!(err, ReaderError::InvalidFormat(_)));
    }

    #[test]
    fn test_document_caches_failure() {
        let doc = TextDocument::open("/nonexistent/nota.pdf");
        let first = doc.text().unwrap_err();
        let second = doc.text().unwrap_err();
        assert_eq!(first, second);
    }

    #[test]
    fn test_from_text() {
        let doc = TextDocument::from_text("a\nb");
        assert_eq!(doc.text().unwrap(), "a\nb");
        assert_eq!(doc.lines().unwrap(), vec!["a", "b"]);
        assert!(doc.path().is_none());
    }
}
