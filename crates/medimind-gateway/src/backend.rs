//! Backend trait and the attachment payload it accepts.
//!
//! The `Backend` trait abstracts over the physical generative service.
//! Implementations:
//! - `VertexGemini`: Vertex AI `generateContent` over HTTPS
//! - test doubles that script responses and record calls

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use medimind_core::BackendError;

/// Binary payload sent alongside a prompt.
#[derive(Clone)]
pub struct Attachment {
    pub data: Vec<u8>,
    pub mime_type: String,
    /// File the payload was read from, if any.
    pub source: Option<PathBuf>,
}

impl Attachment {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            source: None,
        }
    }

    /// Read an attachment from disk.
    ///
    /// A file that disappeared since validation is reported as `NotFound`
    /// so no backend call is made for it.
    pub async fn load(path: &Path, mime_type: &str) -> Result<Self, BackendError> {
        let data = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                BackendError::NotFound(format!("attachment not found: {}", path.display()))
            }
            _ => BackendError::UnsupportedInput(format!(
                "cannot read attachment {}: {}",
                path.display(),
                e
            )),
        })?;

        if data.is_empty() {
            return Err(BackendError::UnsupportedInput(format!(
                "attachment is empty: {}",
                path.display()
            )));
        }

        Ok(Self {
            data,
            mime_type: mime_type.to_string(),
            source: Some(path.to_path_buf()),
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("bytes", &self.data.len())
            .field("mime_type", &self.mime_type)
            .field("source", &self.source)
            .finish()
    }
}

/// Trait for generative backends.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Generate text for a prompt and optional attachment.
    async fn generate(
        &self,
        prompt: &str,
        attachment: Option<&Attachment>,
    ) -> Result<String, BackendError>;

    /// Model or service identifier, for status reporting.
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cough.wav");
        std::fs::write(&path, b"RIFF....").unwrap();

        let att = Attachment::load(&path, "audio/wav").await.unwrap();
        assert_eq!(att.len(), 8);
        assert_eq!(att.mime_type, "audio/wav");
        assert_eq!(att.source.as_deref(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Attachment::load(&dir.path().join("gone.jpg"), "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_load_empty_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.png");
        std::fs::write(&path, b"").unwrap();
        let err = Attachment::load(&path, "image/png").await.unwrap_err();
        assert!(matches!(err, BackendError::UnsupportedInput(_)));
    }
}
