//! Rate-limited, timeout-bounded entry point to a `Backend`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use medimind_core::{BackendError, Result};
use tracing::{debug, info, warn};

use crate::backend::{Attachment, Backend};
use crate::config::GatewayConfig;
use crate::providers::VertexGemini;
use crate::rate_limiter::RateLimiter;

/// Gateway shared by every orchestration routed to one backend.
pub struct BackendGateway {
    backend: Arc<dyn Backend>,
    limiter: RateLimiter,
    call_timeout: Duration,
    calls: AtomicU64,
}

impl BackendGateway {
    pub fn new(backend: Arc<dyn Backend>, limiter: RateLimiter, call_timeout: Duration) -> Self {
        Self {
            backend,
            limiter,
            call_timeout,
            calls: AtomicU64::new(0),
        }
    }

    /// Build the Vertex AI gateway. Fails on an invalid rate limit.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let limiter = RateLimiter::new(config.rate_limit)?;
        let backend = VertexGemini::new(config)?;
        debug!("Backend endpoint: {}", backend.endpoint());
        info!(
            "Backend gateway ready: model={}, project={}, location={}, {} calls/{:?}",
            config.model,
            config.project_id,
            config.location,
            config.rate_limit.max_calls,
            config.rate_limit.window
        );
        Ok(Self::new(Arc::new(backend), limiter, config.request_timeout))
    }

    /// Issue one backend call once the rate limiter admits it.
    ///
    /// Failures are classified, never retried. A call that outlives the
    /// per-call timeout is reported as `QuotaOrTransportFailure`.
    pub async fn invoke(
        &self,
        prompt: &str,
        attachment: Option<&Attachment>,
    ) -> std::result::Result<String, BackendError> {
        let permit = self.limiter.admit().await;
        self.calls.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Gateway call #{} admitted after {}ms",
            permit.sequence,
            permit.waited.as_millis()
        );

        match tokio::time::timeout(self.call_timeout, self.backend.generate(prompt, attachment))
            .await
        {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => {
                warn!("Gateway call #{} failed: {}", permit.sequence, e);
                Err(e)
            }
            Err(_) => {
                warn!(
                    "Gateway call #{} timed out after {:?}",
                    permit.sequence, self.call_timeout
                );
                Err(BackendError::QuotaOrTransportFailure(format!(
                    "backend call timed out after {}s",
                    self.call_timeout.as_secs_f64()
                )))
            }
        }
    }

    /// Calls issued through this gateway so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}
