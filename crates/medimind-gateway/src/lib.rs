//! Gateway to the external generative backend.
//!
//! Every outbound call goes through one `RateLimiter` before it reaches a
//! `Backend`. The production backend is Vertex AI Gemini over HTTPS; tests
//! plug in scripted backends through the same trait.

pub mod backend;
pub mod config;
pub mod gateway;
pub mod providers;
pub mod rate_limiter;

pub use backend::{Attachment, Backend};
pub use config::{Credential, GatewayConfig};
pub use gateway::BackendGateway;
pub use providers::VertexGemini;
pub use rate_limiter::{Permit, RateLimitConfig, RateLimiter};
