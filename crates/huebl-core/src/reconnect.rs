//! Reconnect-and-retry around session operations.
//!
//! [`ReconnectPolicy::run`] obtains a session through the
//! [`ConnectionCache`], runs an operation on it and, when the operation
//! fails with a transport error, drops the session, reconnects and runs the
//! whole operation again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::cache::ConnectionCache;
use crate::error::{Error, Result};
use crate::session::LightSession;

/// Upper bound for [`ReconnectPolicy::max_retries`].
pub const MAX_RETRIES_LIMIT: u32 = 5;

/// How often and how patiently to retry after a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Retries after the first attempt. Default 1.
    pub max_retries: u32,
    /// Pause before each retry. Default zero.
    pub retry_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            retry_delay: Duration::ZERO,
        }
    }
}

impl ReconnectPolicy {
    /// Create a policy with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Set the number of retries.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the pause before each retry.
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Validate the policy and return an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(Error::InvalidConfig(format!(
                "max_retries must be <= {}, got {}",
                MAX_RETRIES_LIMIT, self.max_retries
            )));
        }
        Ok(())
    }

    /// Run `operation` against the session for `address`.
    ///
    /// A failed connect counts as a failed attempt. Only transport errors
    /// are retried; decode, unsupported and configuration errors are
    /// returned at once and leave the session in place.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let on = policy
    ///     .run(&cache, address, |session| async move { session.get_power().await })
    ///     .await?;
    /// ```
    pub async fn run<F, Fut, T>(
        &self,
        cache: &ConnectionCache,
        address: &str,
        operation: F,
    ) -> Result<T>
    where
        F: Fn(Arc<LightSession>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;
        loop {
            let error = match attempt(cache, address, &operation).await {
                Ok(value) => {
                    if retries > 0 {
                        debug!("Operation on {} succeeded after {} retries", address, retries);
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !error.is_retryable() || retries >= self.max_retries {
                return Err(error);
            }

            retries += 1;
            warn!(
                "Operation on {} failed ({}), reconnecting (retry {}/{})",
                address, error, retries, self.max_retries
            );
            if !self.retry_delay.is_zero() {
                sleep(self.retry_delay).await;
            }
        }
    }
}

async fn attempt<F, Fut, T>(cache: &ConnectionCache, address: &str, operation: &F) -> Result<T>
where
    F: Fn(Arc<LightSession>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let session = cache.get_or_create(address).await?;
    match operation(Arc::clone(&session)).await {
        Ok(value) => Ok(value),
        Err(e) => {
            if e.is_retryable() {
                cache.discard(&session).await;
            }
            Err(e)
        }
    }
}
