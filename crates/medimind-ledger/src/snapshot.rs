//! Durable JSON snapshots of a whole session.
//!
//! A snapshot holds a summary block and the ordered interaction list. The
//! summary is informational: on restore it is ignored and statistics are
//! recomputed from the interactions.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use medimind_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::types::{Interaction, Session, SessionSummary};

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// On-disk snapshot document.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub format_version: u32,
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub summary: SessionSummary,
    pub interactions: Vec<Interaction>,
}

impl SessionSnapshot {
    pub fn of(session: &Session) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            session_id: session.id.clone(),
            start_time: session.start_time,
            summary: session.summarize(),
            interactions: session.interactions.clone(),
        }
    }
}

/// Fields read back on restore. The summary block is skipped.
#[derive(Deserialize)]
struct StoredSnapshot {
    format_version: u32,
    session_id: String,
    start_time: DateTime<Utc>,
    interactions: Vec<Interaction>,
}

/// Serialize `session` and atomically replace `destination` with it.
pub fn write_snapshot(session: &Session, destination: &Path) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(&SessionSnapshot::of(session))?;
    write_atomic(destination, json.as_bytes())?;
    Ok(destination.to_path_buf())
}

/// Parse and validate a snapshot file into a session.
pub fn read_snapshot(source: &Path) -> Result<Session> {
    let raw = std::fs::read_to_string(source).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            Error::NotFound(format!("snapshot not found: {}", source.display()))
        }
        std::io::ErrorKind::InvalidData => {
            Error::CorruptSnapshot(format!("{} is not valid UTF-8", source.display()))
        }
        _ => Error::Io(e),
    })?;
    parse_snapshot(&raw)
}

pub(crate) fn parse_snapshot(raw: &str) -> Result<Session> {
    let stored: StoredSnapshot =
        serde_json::from_str(raw).map_err(|e| Error::CorruptSnapshot(e.to_string()))?;

    if stored.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(Error::CorruptSnapshot(format!(
            "unsupported format_version {}",
            stored.format_version
        )));
    }
    if stored.session_id.trim().is_empty() {
        return Err(Error::CorruptSnapshot("empty session_id".into()));
    }

    let mut seen = HashSet::new();
    for interaction in &stored.interactions {
        interaction
            .check_consistency()
            .map_err(Error::CorruptSnapshot)?;
        if !seen.insert(interaction.id.as_str()) {
            return Err(Error::CorruptSnapshot(format!(
                "duplicate interaction id {}",
                interaction.id
            )));
        }
        if interaction.timestamp < stored.start_time {
            return Err(Error::CorruptSnapshot(format!(
                "interaction {} predates session start",
                interaction.id
            )));
        }
    }

    Ok(Session {
        id: stored.session_id,
        start_time: stored.start_time,
        interactions: stored.interactions,
    })
}

/// Write via a temp file in the target directory, then rename over the
/// target. Readers see either the old file or the complete new one.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let mut temp = NamedTempFile::new_in(&parent)?;
    temp.write_all(data)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
