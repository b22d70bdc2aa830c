use crate::error::{Error, Result};
use crate::fetch::{Fetcher, Request};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Turns a downloaded document into plain text lines
pub trait DocumentConverter {
    fn convert(&self, path: &Path) -> Result<String>;
}

impl<C: DocumentConverter + ?Sized> DocumentConverter for &C {
    fn convert(&self, path: &Path) -> Result<String> {
        (**self).convert(path)
    }
}

/// Poppler's `pdftotext` in layout mode, which keeps roll-call columns apart
#[derive(Debug, Clone)]
pub struct PdfToText {
    binary: PathBuf,
}

impl PdfToText {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for PdfToText {
    fn default() -> Self {
        Self::new("pdftotext")
    }
}

impl DocumentConverter for PdfToText {
    fn convert(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("-layout")
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| {
                Error::Conversion(format!("could not run {}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            return Err(Error::Conversion(format!(
                "{} exited with {} for {}: {}",
                self.binary.display(),
                output.status,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Download a document to a temporary file and convert it. The file is
/// removed once converted.
pub fn fetch_document_text<F, C>(fetcher: &F, converter: &C, request: &Request) -> Result<String>
where
    F: Fetcher + ?Sized,
    C: DocumentConverter + ?Sized,
{
    let page = fetcher.fetch(request)?;
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(&page.body)?;
    file.flush()?;
    converter.convert(file.path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Page;
    use std::cell::RefCell;

    struct OneDocument;

    impl Fetcher for OneDocument {
        fn fetch(&self, request: &Request) -> Result<Page> {
            Ok(Page {
                url: request.url.clone(),
                status: 200,
                body: b"YEAS\nSmith".to_vec(),
                truncated: false,
            })
        }
    }

    /// Reads the file back, remembering where it was
    struct ReadBack {
        seen: RefCell<Option<PathBuf>>,
    }

    impl DocumentConverter for ReadBack {
        fn convert(&self, path: &Path) -> Result<String> {
            *self.seen.borrow_mut() = Some(path.to_path_buf());
            Ok(std::fs::read_to_string(path)?)
        }
    }

    #[test]
    fn test_temporary_download_is_removed() {
        let converter = ReadBack {
            seen: RefCell::new(None),
        };
        let text = fetch_document_text(&OneDocument, &converter, &Request::get("https://x/1.pdf"))
            .unwrap();
        assert_eq!(text, "YEAS\nSmith");

        let path = converter.seen.borrow().clone().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_binary_is_conversion_error() {
        let converter = PdfToText::new("/nonexistent/pdftotext");
        let err = converter.convert(Path::new("/tmp/none.pdf")).unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }
}
