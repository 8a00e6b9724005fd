//! Session ledger: append, summarize, persist, restore, export.

use std::path::{Path, PathBuf};

use medimind_core::Result;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::export;
use crate::snapshot;
use crate::types::{Interaction, Session, SessionSummary};

/// Thread-safe holder of the active session.
///
/// Appends are serialized by the write lock; summaries read a consistent
/// snapshot under the read lock.
pub struct SessionLedger {
    session: RwLock<Session>,
}

impl SessionLedger {
    /// Create a ledger with a fresh, empty session.
    pub fn new() -> Self {
        Self::from_session(Session::new())
    }

    pub fn from_session(session: Session) -> Self {
        Self {
            session: RwLock::new(session),
        }
    }

    /// Append one interaction. Never rejects, never touches earlier entries.
    pub fn append(&self, interaction: Interaction) {
        let mut session = self.session.write();
        // Keep start_time <= every timestamp even if the wall clock stepped back.
        if interaction.timestamp < session.start_time {
            session.start_time = interaction.timestamp;
        }
        debug!(
            "Ledger append: {} {} ({})",
            interaction.id,
            interaction.outcome.as_str(),
            interaction.modalities.label()
        );
        session.interactions.push(interaction);
    }

    pub fn summarize(&self) -> SessionSummary {
        self.session.read().summarize()
    }

    /// Clone of the current session.
    pub fn session(&self) -> Session {
        self.session.read().clone()
    }

    pub fn interactions(&self) -> Vec<Interaction> {
        self.session.read().interactions.clone()
    }

    pub fn session_id(&self) -> String {
        self.session.read().id.clone()
    }

    pub fn len(&self) -> usize {
        self.session.read().interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every interaction and start a new session. Returns its id.
    pub fn reset(&self) -> String {
        let fresh = Session::new();
        let id = fresh.id.clone();
        let old = std::mem::replace(&mut *self.session.write(), fresh);
        info!(
            "Session reset: {} ({} interactions dropped) -> {}",
            old.id,
            old.interactions.len(),
            id
        );
        id
    }

    /// Write a full snapshot to `destination`, creating parent directories.
    pub fn persist(&self, destination: &Path) -> Result<PathBuf> {
        let session = self.session();
        let path = snapshot::write_snapshot(&session, destination)?;
        info!(
            "Session {} saved to {} ({} interactions)",
            session.id,
            path.display(),
            session.interactions.len()
        );
        Ok(path)
    }

    /// Replace the ledger contents with a stored snapshot.
    ///
    /// All-or-nothing: on any error the current session is untouched.
    pub fn restore(&self, source: &Path) -> Result<Session> {
        let restored = snapshot::read_snapshot(source)?;
        *self.session.write() = restored.clone();
        info!(
            "Session {} restored from {} ({} interactions)",
            restored.id,
            source.display(),
            restored.interactions.len()
        );
        Ok(restored)
    }

    /// Write the flattened CSV view of the current session.
    pub fn export_tabular(&self, destination: &Path) -> Result<PathBuf> {
        let interactions = self.interactions();
        let path = export::write_table(&interactions, destination)?;
        info!(
            "Exported {} interactions to {}",
            interactions.len(),
            path.display()
        );
        Ok(path)
    }
}

impl Default for SessionLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawInputs;
    use chrono::Duration;
    use medimind_core::{Error, ErrorKind, Modality, ModalitySet};
    use std::sync::Arc;

    fn ok(lang: &str, modalities: &[Modality]) -> Interaction {
        Interaction::success(
            modalities.iter().copied().collect::<ModalitySet>(),
            lang,
            RawInputs {
                text: Some("fever".into()),
                ..Default::default()
            },
            "See a doctor if it persists.",
            1,
        )
    }

    fn failed(lang: &str) -> Interaction {
        Interaction::failure(
            ModalitySet::new(),
            lang,
            RawInputs::default(),
            &Error::EmptyRequest,
            0,
        )
    }

    #[test]
    fn test_append_preserves_order() {
        let ledger = SessionLedger::new();
        let first = ok("en", &[Modality::Text]);
        let second = failed("hi");
        let ids = [first.id.clone(), second.id.clone()];
        ledger.append(first);
        ledger.append(second);

        let got: Vec<_> = ledger.interactions().into_iter().map(|i| i.id).collect();
        assert_eq!(got, ids);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_start_time_never_after_interactions() {
        let ledger = SessionLedger::new();
        let start = ledger.session().start_time;
        ledger.append(ok("en", &[Modality::Text]).at(start - Duration::seconds(5)));
        let session = ledger.session();
        assert!(session
            .interactions
            .iter()
            .all(|i| session.start_time <= i.timestamp));
    }

    #[test]
    fn test_persist_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions").join("s.json");

        let ledger = SessionLedger::new();
        let t0 = ledger.session().start_time;
        ledger.append(ok("en", &[Modality::Text]).at(t0 + Duration::seconds(1)));
        ledger.append(ok("es", &[Modality::Text, Modality::Image]).at(t0 + Duration::seconds(30)));
        ledger.append(failed("xx").at(t0 + Duration::seconds(42)));
        let before = ledger.summarize();

        ledger.persist(&path).unwrap();

        let other = SessionLedger::new();
        other.append(ok("hi", &[Modality::Audio]));
        let restored = other.restore(&path).unwrap();

        assert_eq!(restored.interactions.len(), 3);
        assert_eq!(other.summarize(), before);
        assert_eq!(other.session(), ledger.session());
    }

    #[test]
    fn test_failed_restore_leaves_ledger_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, r#"{"format_version":1,"session_id":"#).unwrap();

        let ledger = SessionLedger::new();
        ledger.append(ok("en", &[Modality::Text]));
        let before = ledger.session();

        let err = ledger.restore(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptSnapshot);
        assert_eq!(ledger.session(), before);
    }

    #[test]
    fn test_reset() {
        let ledger = SessionLedger::new();
        let old_id = ledger.session_id();
        ledger.append(ok("en", &[Modality::Text]));
        let new_id = ledger.reset();
        assert_ne!(old_id, new_id);
        assert!(ledger.is_empty());
        assert_eq!(ledger.summarize().success_rate, 0.0);
    }

    #[test]
    fn test_export_tabular() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SessionLedger::new();
        ledger.append(ok("en", &[Modality::Text]));
        ledger.append(failed("es"));

        let path = ledger.export_tabular(&dir.path().join("out.csv")).unwrap();
        let csv = std::fs::read_to_string(path).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_export_multiline_answer_keeps_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SessionLedger::new();
        ledger.append(Interaction::success(
            [Modality::Text].into_iter().collect(),
            "en",
            RawInputs::default(),
            "Likely a cold.\n\nIMPORTANT DISCLAIMER\nConsult a provider.",
            1,
        ));

        let path = ledger.export_tabular(&dir.path().join("out.csv")).unwrap();
        let csv = std::fs::read_to_string(path).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("Likely a cold. IMPORTANT DISCLAIMER Consult a provider."));
    }

    #[test]
    fn test_concurrent_appends_are_all_kept() {
        let ledger = Arc::new(SessionLedger::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        ledger.append(ok("en", &[Modality::Text]));
                        let summary = ledger.summarize();
                        assert_eq!(summary.count, summary.success_count);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ledger.summarize().count, 200);
    }
}
