use std::sync::Arc;

use crate::{Error, repositories::CodeRepository};

use super::RequestRateLimiter;

/// Periodically deletes expired verification codes.
///
/// Issuance already sweeps opportunistically; this task keeps the table bounded
/// when no codes are being requested. It also drops idle rate-limit counters when
/// given a limiter.
pub struct CodeSweeper<C: CodeRepository> {
    codes: Arc<C>,
    limiter: Option<Arc<RequestRateLimiter>>,
    interval: std::time::Duration,
}

impl<C: CodeRepository> CodeSweeper<C> {
    pub fn new(codes: Arc<C>, interval: std::time::Duration) -> Self {
        Self {
            codes,
            limiter: None,
            interval,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<RequestRateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Run one sweep now.
    pub async fn sweep(&self) -> Result<u64, Error> {
        let deleted = self.codes.delete_expired().await?;
        if deleted > 0 {
            tracing::info!(count = deleted, "Deleted expired verification codes");
        }
        Ok(deleted)
    }

    /// Start the background sweep.
    ///
    /// The first sweep runs immediately, then once per interval until `shutdown`
    /// changes. Failures are logged and the task keeps running.
    pub fn start(
        self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(self.interval);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        if let Err(e) = self.sweep().await {
                            tracing::warn!(error = %e, "Failed to delete expired verification codes");
                        }
                        if let Some(limiter) = &self.limiter {
                            let pruned = limiter.prune_idle();
                            if pruned > 0 {
                                tracing::debug!(count = pruned, "Pruned idle rate limit counters");
                            }
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down verification code sweeper");
                        break;
                    }
                }
            }
        })
    }
}
