//! Discovery of Hue Bluetooth lights.
//!
//! A discovery run scans once, keeps the advertisements that carry the Hue
//! BLE service, and connects to each match in turn until an overall
//! deadline. Lights that fail to connect are logged and skipped.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use huebl_types::uuids;

use crate::error::{Error, Result};
use crate::session::LightSession;
use crate::transport::{Advertisement, BleTransport};
use crate::util::normalize_address;

/// Options for a discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// How long to scan for advertisements.
    pub scan_duration: Duration,
    /// Time budget for the whole run, scan included.
    pub deadline: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            scan_duration: Duration::from_secs(5),
            deadline: Duration::from_secs(30),
        }
    }
}

impl DiscoveryOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    #[must_use]
    pub fn scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration;
        self
    }

    /// Set the overall deadline.
    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Validate the options and return an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.scan_duration.is_zero() {
            return Err(Error::invalid_config("scan_duration must be > 0"));
        }
        if self.deadline <= self.scan_duration {
            return Err(Error::invalid_config(
                "deadline must be > scan_duration to leave time for connecting",
            ));
        }
        Ok(())
    }
}

/// Advertisements carrying the Hue BLE service, one per address, in the
/// order they were first seen.
pub fn hue_candidates(advertisements: &[Advertisement]) -> Vec<&Advertisement> {
    let mut seen = HashSet::new();
    advertisements
        .iter()
        .filter(|ad| ad.advertises(uuids::HUE_BLE_SERVICE))
        .filter(|ad| seen.insert(normalize_address(&ad.address)))
        .collect()
}

/// Finds and connects lights.
pub struct Discoverer {
    transport: Arc<dyn BleTransport>,
}

impl std::fmt::Debug for Discoverer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discoverer").finish_non_exhaustive()
    }
}

impl Discoverer {
    /// Create a discoverer using `transport`.
    pub fn new(transport: Arc<dyn BleTransport>) -> Self {
        Self { transport }
    }

    /// Scan and connect every Hue light found.
    ///
    /// Returns the sessions that connected before the deadline. A failing
    /// scan is returned as an error; failing connects are skipped.
    pub async fn discover(&self, options: &DiscoveryOptions) -> Result<Vec<Arc<LightSession>>> {
        self.discover_with_cancel(options, CancellationToken::new())
            .await
    }

    /// Like [`Discoverer::discover`], stopping early when `cancel` fires.
    ///
    /// On cancellation the sessions connected so far are returned.
    #[tracing::instrument(level = "info", skip_all, fields(scan = ?options.scan_duration, deadline = ?options.deadline))]
    pub async fn discover_with_cancel(
        &self,
        options: &DiscoveryOptions,
        cancel: CancellationToken,
    ) -> Result<Vec<Arc<LightSession>>> {
        let deadline = Instant::now() + options.deadline;

        let advertisements = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Discovery cancelled during scan");
                return Ok(Vec::new());
            }
            result = self.transport.scan(options.scan_duration) => result?,
        };

        let candidates = hue_candidates(&advertisements);
        info!(
            "Scan saw {} peripheral(s), {} advertising the Hue service",
            advertisements.len(),
            candidates.len()
        );

        let mut sessions = Vec::new();
        for (index, ad) in candidates.iter().enumerate() {
            if Instant::now() >= deadline {
                warn!(
                    "Discovery deadline reached, skipping {} remaining light(s)",
                    candidates.len() - index
                );
                break;
            }

            debug!(
                "Connecting to {} ({})",
                ad.address,
                ad.local_name.as_deref().unwrap_or("unnamed")
            );
            let connect = timeout_at(
                deadline,
                LightSession::connect(self.transport.as_ref(), &ad.address),
            );
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Discovery cancelled, returning {} light(s)", sessions.len());
                    return Ok(sessions);
                }
                result = connect => result,
            };

            match result {
                Ok(Ok(session)) => sessions.push(Arc::new(session)),
                Ok(Err(e)) => warn!("Failed to connect to {}: {}", ad.address, e),
                Err(_) => warn!("Discovery deadline reached while connecting to {}", ad.address),
            }
        }

        info!("Discovered {} light(s)", sessions.len());
        Ok(sessions)
    }
}
