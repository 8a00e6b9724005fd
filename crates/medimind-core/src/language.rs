//! Supported languages and health tip categories.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Language a query is answered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English (`en`).
    En,
    /// Hindi (`hi`).
    Hi,
    /// Spanish (`es`).
    Es,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::Hi, Language::Es];

    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hi => "hi",
            Self::Es => "es",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "Hindi",
            Self::Es => "Spanish",
        }
    }

    /// Codes of every supported language, in declaration order.
    pub fn codes() -> Vec<&'static str> {
        Self::ALL.iter().map(|l| l.code()).collect()
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::En
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.code() == s)
            .ok_or_else(|| {
                Error::UnsupportedLanguage(format!(
                    "{}. Supported: {}",
                    s,
                    Self::codes().join(", ")
                ))
            })
    }
}

/// Topic a batch of health tips can be scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthCategory {
    GeneralHealth,
    Symptoms,
    Medications,
    FirstAid,
    Nutrition,
    Exercise,
    MentalHealth,
    Emergency,
}

impl HealthCategory {
    pub const ALL: [HealthCategory; 8] = [
        HealthCategory::GeneralHealth,
        HealthCategory::Symptoms,
        HealthCategory::Medications,
        HealthCategory::FirstAid,
        HealthCategory::Nutrition,
        HealthCategory::Exercise,
        HealthCategory::MentalHealth,
        HealthCategory::Emergency,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::GeneralHealth => "General Health",
            Self::Symptoms => "Symptoms",
            Self::Medications => "Medications",
            Self::FirstAid => "First Aid",
            Self::Nutrition => "Nutrition",
            Self::Exercise => "Exercise",
            Self::MentalHealth => "Mental Health",
            Self::Emergency => "Emergency",
        }
    }
}

impl std::fmt::Display for HealthCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HealthCategory {
    type Err = Error;

    /// Accepts the display name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|c| c.name()).collect();
                Error::InvalidCategory(format!("{}. Available: {}", s, names.join(", ")))
            })
    }
}
