//! Input modalities and the attachment format whitelists.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Image extensions accepted as attachments, with their mime types.
pub const IMAGE_FORMATS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("bmp", "image/bmp"),
    ("tiff", "image/tiff"),
    ("webp", "image/webp"),
];

/// Audio extensions accepted as attachments, with their mime types.
pub const AUDIO_FORMATS: &[(&str, &str)] = &[
    ("wav", "audio/wav"),
    ("mp3", "audio/mpeg"),
    ("m4a", "audio/mp4"),
    ("flac", "audio/flac"),
    ("ogg", "audio/ogg"),
];

/// One input kind. Declaration order is the fixed aggregation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
    Audio,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Modality::Text, Modality::Image, Modality::Audio];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }

    /// Heading used for this modality's partial result in a synthesis prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "Text Analysis",
            Self::Image => "Image Analysis",
            Self::Audio => "Audio Analysis",
        }
    }

    /// Extension whitelist for attachment modalities. Empty for text.
    pub fn formats(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Text => &[],
            Self::Image => IMAGE_FORMATS,
            Self::Audio => AUDIO_FORMATS,
        }
    }

    /// Mime type for `path` if its extension is whitelisted for this modality.
    pub fn mime_type_for(&self, path: &Path) -> Option<&'static str> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.formats()
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, mime)| *mime)
    }

    /// Check that `path` exists, is a regular file, and has a whitelisted
    /// extension. Returns the attachment's mime type.
    pub fn validate_attachment(&self, path: &Path) -> Result<&'static str> {
        if !path.exists() {
            return Err(Error::InvalidAttachment(format!(
                "{} file not found: {}",
                self.as_str(),
                path.display()
            )));
        }
        if !path.is_file() {
            return Err(Error::InvalidAttachment(format!(
                "path is not a file: {}",
                path.display()
            )));
        }
        self.mime_type_for(path).ok_or_else(|| {
            let exts: Vec<_> = self.formats().iter().map(|(e, _)| *e).collect();
            Error::InvalidAttachment(format!(
                "unsupported {} format: {}. Supported: {}",
                self.as_str(),
                path.display(),
                exts.join(", ")
            ))
        })
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subset of {text, image, audio}, iterated in aggregation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModalitySet(BTreeSet<Modality>);

impl ModalitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, modality: Modality) {
        self.0.insert(modality);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Modality> + '_ {
        self.0.iter().copied()
    }

    /// `text+image` style label; `none` for the empty set.
    pub fn label(&self) -> String {
        if self.0.is_empty() {
            return "none".into();
        }
        self.iter().map(|m| m.as_str()).collect::<Vec<_>>().join("+")
    }
}

impl FromIterator<Modality> for ModalitySet {
    fn from_iter<I: IntoIterator<Item = Modality>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
