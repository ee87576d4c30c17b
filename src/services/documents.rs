//! Text extraction for the process document.
//!
//! The PDF itself is operational data dropped next to the binary; which file
//! to read comes from `Config`, and the extraction algorithm is entirely
//! `pdf-extract`'s business.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to extract pdf text: {0}")]
    Extract(#[from] pdf_extract::OutputError),

    #[error("extraction task was cancelled")]
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct DocumentStore {
    pdf_path: PathBuf,
}

impl DocumentStore {
    pub fn new(pdf_path: PathBuf) -> Self {
        Self { pdf_path }
    }

    /// Extract the full text of the configured process document.
    ///
    /// Parsing is synchronous and CPU-bound, so it runs on the blocking pool
    /// instead of stalling the async workers.
    pub async fn process_text(&self) -> Result<String, DocumentError> {
        let path = self.pdf_path.clone();

        tokio::task::spawn_blocking(move || pdf_extract::extract_text(&path))
            .await
            .map_err(|_| DocumentError::Cancelled)?
            .map_err(DocumentError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_an_extraction_error() {
        let store = DocumentStore::new(PathBuf::from("pdfs/definitely-not-there.pdf"));
        assert!(store.process_text().await.is_err());
    }
}
