//! Runtime types.

use std::path::PathBuf;

use medimind_core::{BackendError, ErrorKind, Language, Modality, ModalitySet};
use medimind_ledger::RawInputs;
use serde::{Deserialize, Serialize};

pub use medimind_core::SynthesisPolicy;

/// Appended to every successful answer.
pub const HEALTH_DISCLAIMER: &str = "\
IMPORTANT DISCLAIMER
This health assistant is for educational and informational purposes only.
It is not a substitute for professional medical advice, diagnosis, or treatment.
Always consult with a qualified healthcare provider for medical concerns.
Never disregard professional medical advice or delay seeking it because of information provided by this assistant.";

/// A caller's query. Any combination of the three inputs may be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image: Option<PathBuf>,
    #[serde(default)]
    pub audio: Option<PathBuf>,
    /// Free-text context for the image.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    Language::default().code().to_string()
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            text: None,
            image: None,
            audio: None,
            description: None,
            language: default_language(),
        }
    }
}

impl QueryRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image = Some(path.into());
        self
    }

    pub fn with_audio(mut self, path: impl Into<PathBuf>) -> Self {
        self.audio = Some(path.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn in_language(mut self, code: impl Into<String>) -> Self {
        self.language = code.into();
        self
    }

    /// Text, if present and not blank.
    pub fn text_input(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn image_input(&self) -> Option<&PathBuf> {
        self.image.as_ref().filter(|p| !p.as_os_str().is_empty())
    }

    pub fn audio_input(&self) -> Option<&PathBuf> {
        self.audio.as_ref().filter(|p| !p.as_os_str().is_empty())
    }

    /// Modalities present in the request.
    pub fn modalities(&self) -> ModalitySet {
        let mut set = ModalitySet::new();
        if self.text_input().is_some() {
            set.insert(Modality::Text);
        }
        if self.image_input().is_some() {
            set.insert(Modality::Image);
        }
        if self.audio_input().is_some() {
            set.insert(Modality::Audio);
        }
        set
    }

    pub fn raw_inputs(&self) -> RawInputs {
        RawInputs {
            text: self.text_input().map(str::to_string),
            image: self.image_input().cloned(),
            audio: self.audio_input().cloned(),
            description: self.description.clone().filter(|d| !d.trim().is_empty()),
        }
    }
}

/// A validated attachment reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub path: PathBuf,
    pub mime_type: &'static str,
}

/// One validated input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalInput {
    Text(String),
    Image(AttachmentRef),
    Audio(AttachmentRef),
}

impl ModalInput {
    pub fn modality(&self) -> Modality {
        match self {
            Self::Text(_) => Modality::Text,
            Self::Image(_) => Modality::Image,
            Self::Audio(_) => Modality::Audio,
        }
    }
}

/// How a validated query is sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// One call with a modality-specific prompt.
    Single(ModalInput),
    /// One call per input, in aggregation order, then a synthesis call.
    Combined(Vec<ModalInput>),
}

/// Outcome of one sub-call in a multi-modality query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialResult {
    pub modality: Modality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PartialResult {
    pub fn from_result(modality: Modality, result: Result<String, BackendError>) -> Self {
        match result {
            Ok(text) => Self {
                modality,
                response: Some(text),
                error_kind: None,
                error: None,
            },
            Err(e) => Self {
                modality,
                response: None,
                error_kind: Some(e.kind()),
                error: Some(e.to_string()),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.response.is_some()
    }
}

/// A successful orchestration.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Id of the ledger entry recorded for this query.
    pub interaction_id: String,
    /// Final text, disclaimer included.
    pub response: String,
    pub modalities: ModalitySet,
    pub language: Language,
    /// Per-modality sub-results; empty for single-modality queries.
    pub partials: Vec<PartialResult>,
    pub gateway_calls: u32,
}

/// `Ok(answer)` or the classified failure.
pub type OrchestrationResult = medimind_core::Result<Answer>;
