//! MediMind Core: error taxonomy, supported languages and formats, configuration.

pub mod config;
pub mod error;
pub mod language;
pub mod modality;

pub use config::{AssistantConfig, DataPaths, SynthesisPolicy};
pub use error::{BackendError, Error, ErrorKind, Result};
pub use language::{HealthCategory, Language};
pub use modality::{Modality, ModalitySet};
