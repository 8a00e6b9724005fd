//! Ledger types: interactions, sessions, and summaries.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use medimind_core::{Error, ErrorKind, ModalitySet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// References to what the caller submitted. Attachments are recorded by
/// path, never by content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One completed or failed orchestration. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub modalities: ModalitySet,
    /// Language code as submitted; rejected codes are kept verbatim.
    pub language: String,
    pub outcome: Outcome,
    /// Present iff `outcome` is success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Present iff `outcome` is failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub inputs: RawInputs,
    /// Backend calls issued by the orchestration.
    #[serde(default)]
    pub gateway_calls: u32,
}

impl Interaction {
    pub fn success(
        modalities: ModalitySet,
        language: impl Into<String>,
        inputs: RawInputs,
        response: impl Into<String>,
        gateway_calls: u32,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            modalities,
            language: language.into(),
            outcome: Outcome::Success,
            response: Some(response.into()),
            error_kind: None,
            error: None,
            inputs,
            gateway_calls,
        }
    }

    pub fn failure(
        modalities: ModalitySet,
        language: impl Into<String>,
        inputs: RawInputs,
        error: &Error,
        gateway_calls: u32,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            modalities,
            language: language.into(),
            outcome: Outcome::Failure,
            response: None,
            error_kind: Some(error.kind()),
            error: Some(error.to_string()),
            inputs,
            gateway_calls,
        }
    }

    /// Override the creation time.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Response length in characters (0 for failures).
    pub fn response_len(&self) -> usize {
        self.response.as_deref().map(|r| r.chars().count()).unwrap_or(0)
    }

    /// Check the response/error pairing against the outcome.
    pub(crate) fn check_consistency(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("interaction with empty id".into());
        }
        match self.outcome {
            Outcome::Success if self.response.is_none() => {
                Err(format!("interaction {}: success without response", self.id))
            }
            Outcome::Success if self.error_kind.is_some() => {
                Err(format!("interaction {}: success with error kind", self.id))
            }
            Outcome::Failure if self.error_kind.is_none() => {
                Err(format!("interaction {}: failure without error kind", self.id))
            }
            Outcome::Failure if self.response.is_some() => {
                Err(format!("interaction {}: failure with response", self.id))
            }
            _ => Ok(()),
        }
    }
}

/// Ordered interactions sharing one id and start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub interactions: Vec<Interaction>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            start_time: Utc::now(),
            interactions: Vec::new(),
        }
    }

    /// Recompute statistics from the interaction sequence.
    pub fn summarize(&self) -> SessionSummary {
        let count = self.interactions.len();
        let success_count = self.interactions.iter().filter(|i| i.is_success()).count();
        let success_rate = if count == 0 {
            0.0
        } else {
            success_count as f64 / count as f64
        };

        let duration_seconds = match (self.interactions.first(), self.interactions.last()) {
            (Some(first), Some(last)) => {
                let millis = (last.timestamp - first.timestamp).num_milliseconds();
                (millis.max(0) as f64) / 1000.0
            }
            _ => 0.0,
        };

        let mut by_modality = BTreeMap::new();
        let mut by_language = BTreeMap::new();
        let mut by_error_kind = BTreeMap::new();
        for interaction in &self.interactions {
            for modality in interaction.modalities.iter() {
                *by_modality.entry(modality.to_string()).or_insert(0) += 1;
            }
            *by_language.entry(interaction.language.clone()).or_insert(0) += 1;
            if let Some(kind) = interaction.error_kind {
                *by_error_kind.entry(kind.to_string()).or_insert(0) += 1;
            }
        }

        SessionSummary {
            session_id: self.id.clone(),
            start_time: self.start_time,
            count,
            success_count,
            success_rate,
            duration_seconds,
            by_modality,
            by_language,
            by_error_kind,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate statistics over one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub count: usize,
    pub success_count: usize,
    /// `success_count / count`, in `[0, 1]`; 0 for an empty session.
    pub success_rate: f64,
    /// Seconds between the first and last interaction.
    pub duration_seconds: f64,
    pub by_modality: BTreeMap<String, usize>,
    pub by_language: BTreeMap<String, usize>,
    pub by_error_kind: BTreeMap<String, usize>,
}

impl SessionSummary {
    pub fn failure_count(&self) -> usize {
        self.count - self.success_count
    }

    /// Success rate as a percentage rounded to two decimals.
    pub fn success_percent(&self) -> f64 {
        (self.success_rate * 10_000.0).round() / 100.0
    }
}
