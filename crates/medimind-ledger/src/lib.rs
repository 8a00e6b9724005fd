//! Session ledger: the append-only record of every orchestrated interaction.
//!
//! Statistics are recomputed from the interaction sequence on every request.
//! Snapshots are full JSON documents written atomically; the tabular export
//! is a derived CSV that can always be regenerated from a snapshot.

pub mod export;
pub mod ledger;
pub mod snapshot;
pub mod types;

pub use ledger::SessionLedger;
pub use snapshot::SessionSnapshot;
pub use types::*;
