//! Flattened CSV export, one row per interaction.

use std::path::{Path, PathBuf};

use medimind_core::Result;

use crate::snapshot::write_atomic;
use crate::types::Interaction;

/// Free-text columns are flattened to one line, then cut to this many
/// characters and suffixed with `...`.
pub const TRUNCATE_CHARS: usize = 100;

pub const COLUMNS: &[&str] = &[
    "timestamp",
    "modalities",
    "language",
    "outcome",
    "response_length",
    "gateway_calls",
    "error",
    "preview",
];

/// Render interactions as CSV text with a header row.
pub fn render_table(interactions: &[Interaction]) -> String {
    let mut out = COLUMNS.join(",");
    out.push('\n');

    for i in interactions {
        let row = [
            i.timestamp.to_rfc3339(),
            i.modalities.label(),
            i.language.clone(),
            i.outcome.as_str().to_string(),
            i.response_len().to_string(),
            i.gateway_calls.to_string(),
            truncate(&flatten(i.error.as_deref().unwrap_or("")), TRUNCATE_CHARS),
            truncate(&flatten(i.response.as_deref().unwrap_or("")), TRUNCATE_CHARS),
        ];
        let fields: Vec<String> = row.iter().map(|f| quote(f)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

/// Write the CSV export to `destination`.
pub fn write_table(interactions: &[Interaction], destination: &Path) -> Result<PathBuf> {
    write_atomic(destination, render_table(interactions).as_bytes())?;
    Ok(destination.to_path_buf())
}

/// Collapse every run of whitespace, newlines included, to one space.
fn flatten(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
