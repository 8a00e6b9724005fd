//! Runtime orchestrator: turns one multimodal health query into backend calls.
//!
//! A single-modality query is one gateway call. A multi-modality query runs
//! one sub-call per modality in fixed order (text, image, audio) and then a
//! synthesis call that merges the partial answers. Every `handle` appends
//! exactly one interaction to the session ledger.

pub mod orchestrator;
pub mod prompts;
pub mod types;

pub use orchestrator::QueryOrchestrator;
pub use types::*;
