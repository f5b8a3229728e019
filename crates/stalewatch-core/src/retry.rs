//! Bounded retry for remote calls
//!
//! Every call into the administrative API goes through [`RetryPolicy::execute`].
//! Only transport failures are retried, with a fixed wait between attempts; an
//! HTTP error response is returned on the first attempt.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{Error, Result, TransientKind};

/// Decides whether a failed attempt may be repeated
pub type RetryPredicate = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

/// Bookkeeping for one `execute` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryContext {
    /// Attempts made so far
    pub attempt: u32,
    /// Class of the most recent transient failure
    pub last_failure: Option<TransientKind>,
}

/// Fixed-backoff retry combinator
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
    should_retry: RetryPredicate,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Retry transient failures up to `max_attempts` total attempts
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            should_retry: Arc::new(Error::is_transient),
        }
    }

    /// Build from configuration
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.backoff)
    }

    /// Replace the transient-failure predicate
    pub fn with_predicate(
        mut self,
        predicate: impl Fn(&Error) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_retry = Arc::new(predicate);
        self
    }

    /// Total attempts allowed
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `call` until it succeeds, fails non-transiently, or attempts run out.
    ///
    /// `call` must perform exactly one remote request per invocation. After the
    /// last attempt the final transient error is returned unchanged.
    pub async fn execute<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut ctx = RetryContext::default();

        loop {
            ctx.attempt += 1;

            let err = match call().await {
                Ok(value) => {
                    if ctx.attempt > 1 {
                        debug!(operation, attempts = ctx.attempt, "Remote call recovered");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !(self.should_retry)(&err) {
                return Err(err);
            }

            ctx.last_failure = err.transient_kind();

            if ctx.attempt >= self.max_attempts {
                warn!(
                    operation,
                    attempts = ctx.attempt,
                    last_failure = ?ctx.last_failure,
                    "Giving up on remote call"
                );
                return Err(err);
            }

            warn!(
                operation,
                attempt = ctx.attempt,
                max_attempts = self.max_attempts,
                error = %err,
                "Transient failure, retrying"
            );
            metrics::counter!(
                "stalewatch_remote_call_retries_total",
                "operation" => operation.to_string()
            )
            .increment(1);

            tokio::time::sleep(self.backoff).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
