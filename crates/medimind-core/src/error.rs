//! Error types for MediMind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Empty request: at least one input (text, image, or audio) must be provided")]
    EmptyRequest,

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// A client-supplied file name that is not a plain name inside a data directory.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Quota or transport failure: {0}")]
    QuotaOrTransportFailure(String),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Synthesis failed: {0}")]
    SynthesisFailure(String),

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Classified failure of one backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("authentication failure: {0}")]
    AuthenticationFailure(String),

    /// Referenced attachment is missing. Raised before the call is made.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("quota or transport failure: {0}")]
    QuotaOrTransportFailure(String),

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),
}

impl BackendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthenticationFailure(_) => ErrorKind::AuthenticationFailure,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::QuotaOrTransportFailure(_) => ErrorKind::QuotaOrTransportFailure,
            Self::UnsupportedInput(_) => ErrorKind::UnsupportedInput,
        }
    }
}

impl From<BackendError> for Error {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::AuthenticationFailure(m) => Error::AuthenticationFailure(m),
            BackendError::NotFound(m) => Error::NotFound(m),
            BackendError::QuotaOrTransportFailure(m) => Error::QuotaOrTransportFailure(m),
            BackendError::UnsupportedInput(m) => Error::UnsupportedInput(m),
        }
    }
}

/// Serializable discriminant of [`Error`], recorded on failed interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EmptyRequest,
    UnsupportedLanguage,
    InvalidAttachment,
    InvalidCategory,
    InvalidPath,
    AuthenticationFailure,
    NotFound,
    QuotaOrTransportFailure,
    UnsupportedInput,
    SynthesisFailure,
    CorruptSnapshot,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyRequest => "empty_request",
            Self::UnsupportedLanguage => "unsupported_language",
            Self::InvalidAttachment => "invalid_attachment",
            Self::InvalidCategory => "invalid_category",
            Self::InvalidPath => "invalid_path",
            Self::AuthenticationFailure => "authentication_failure",
            Self::NotFound => "not_found",
            Self::QuotaOrTransportFailure => "quota_or_transport_failure",
            Self::UnsupportedInput => "unsupported_input",
            Self::SynthesisFailure => "synthesis_failure",
            Self::CorruptSnapshot => "corrupt_snapshot",
            Self::Internal => "internal",
        }
    }

    /// Whether this kind is raised locally, before any backend call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyRequest
                | Self::UnsupportedLanguage
                | Self::InvalidAttachment
                | Self::InvalidCategory
                | Self::InvalidPath
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyRequest => ErrorKind::EmptyRequest,
            Self::UnsupportedLanguage(_) => ErrorKind::UnsupportedLanguage,
            Self::InvalidAttachment(_) => ErrorKind::InvalidAttachment,
            Self::InvalidCategory(_) => ErrorKind::InvalidCategory,
            Self::InvalidPath(_) => ErrorKind::InvalidPath,
            Self::AuthenticationFailure(_) => ErrorKind::AuthenticationFailure,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::QuotaOrTransportFailure(_) => ErrorKind::QuotaOrTransportFailure,
            Self::UnsupportedInput(_) => ErrorKind::UnsupportedInput,
            Self::SynthesisFailure(_) => ErrorKind::SynthesisFailure,
            Self::CorruptSnapshot(_) => ErrorKind::CorruptSnapshot,
            Self::Io(_) | Self::Json(_) | Self::Config(_) | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_maps_to_same_kind() {
        let cases = [
            BackendError::AuthenticationFailure("bad token".into()),
            BackendError::NotFound("x.jpg".into()),
            BackendError::QuotaOrTransportFailure("503".into()),
            BackendError::UnsupportedInput("bad mime".into()),
        ];
        for backend_err in cases {
            let kind = backend_err.kind();
            let err: Error = backend_err.into();
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn test_validation_kinds() {
        assert!(ErrorKind::EmptyRequest.is_validation());
        assert!(ErrorKind::InvalidAttachment.is_validation());
        assert!(ErrorKind::InvalidPath.is_validation());
        assert!(!ErrorKind::SynthesisFailure.is_validation());
        assert!(!ErrorKind::QuotaOrTransportFailure.is_validation());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::QuotaOrTransportFailure).unwrap();
        assert_eq!(json, "\"quota_or_transport_failure\"");
        assert_eq!(
            ErrorKind::QuotaOrTransportFailure.to_string(),
            "quota_or_transport_failure"
        );
    }
}
