use shared::utils::is_pdf;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("only PDF files are supported: {0}")]
    NotPdf(String),
    #[error("upload path has no file name")]
    MissingFileName,
}

/// Checks a local file before it is sent to the indexing service.
#[derive(Debug, Clone, Default)]
pub struct UploadPolicy;

impl UploadPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Returns the file name to upload under.
    pub fn validate(&self, path: &Path) -> Result<String, UploadError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(UploadError::MissingFileName)?;
        if !is_pdf(path) {
            return Err(UploadError::NotPdf(name.to_string()));
        }
        Ok(name.to_string())
    }
}
