//! Bridge-facing driver.
//!
//! [`Driver`] is what the bridge talks to. It applies [`LightCommand`]s,
//! reads [`LightState`]s and discovers lights, hiding connection caching and
//! reconnects. The infallible entry points ([`Driver::apply`],
//! [`Driver::read_state`], [`Driver::discover`]) log failures instead of
//! returning them; the `try_` variants return them.
//!
//! # Example
//!
//! ```no_run
//! use huebl_core::{Driver, DriverConfig};
//! use huebl_types::LightCommand;
//!
//! #[tokio::main]
//! async fn main() -> huebl_core::Result<()> {
//!     let driver = Driver::bluetooth(&DriverConfig::default()).await?;
//!
//!     let mut lights = Vec::new();
//!     driver.discover(&mut lights).await;
//!
//!     for light in &lights {
//!         driver.apply(light, &LightCommand::new().on(true).bri(200)).await;
//!         println!("{:?}", driver.read_state(light).await);
//!     }
//!
//!     driver.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use huebl_types::{ColorMode, CommandEntry, LightCommand, LightDescriptor, LightState};

use crate::cache::ConnectionCache;
use crate::config::DriverConfig;
use crate::discovery::{Discoverer, DiscoveryOptions};
use crate::error::{ErrorKind, Result};
use crate::reconnect::ReconnectPolicy;
use crate::scan::BtleplugTransport;
use crate::session::{LightSession, Outcome};
use crate::transport::BleTransport;

/// What happened to each key of an applied command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Keys written and acknowledged, in order.
    pub applied: Vec<&'static str>,
    /// Keys skipped because the light lacks the capability.
    pub unsupported: Vec<&'static str>,
    /// Keys that failed without affecting the connection.
    pub failed: Vec<&'static str>,
}

impl ApplyReport {
    /// Whether every key was applied.
    pub fn is_complete(&self) -> bool {
        self.unsupported.is_empty() && self.failed.is_empty()
    }
}

/// Hue Bluetooth light driver.
pub struct Driver {
    cache: ConnectionCache,
    discoverer: Discoverer,
    discovery: DiscoveryOptions,
    policy: ReconnectPolicy,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("discovery", &self.discovery)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Driver {
    /// Create a driver over `transport` with default settings.
    pub fn new(transport: Arc<dyn BleTransport>) -> Self {
        Self {
            cache: ConnectionCache::new(Arc::clone(&transport)),
            discoverer: Discoverer::new(transport),
            discovery: DiscoveryOptions::default(),
            policy: ReconnectPolicy::default(),
        }
    }

    /// Create a driver over `transport` with discovery and retry settings
    /// from `config`.
    ///
    /// Connection settings belong to the transport and are not applied here.
    pub fn with_config(transport: Arc<dyn BleTransport>, config: &DriverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            discovery: config.discovery_options(),
            policy: config.reconnect_policy(),
            ..Self::new(transport)
        })
    }

    /// Create a driver on the host's first Bluetooth adapter.
    pub async fn bluetooth(config: &DriverConfig) -> Result<Self> {
        config.validate()?;
        let transport = BtleplugTransport::with_config(config.connection_config()).await?;
        Self::with_config(Arc::new(transport), config)
    }

    /// The connection cache.
    pub fn cache(&self) -> &ConnectionCache {
        &self.cache
    }

    /// The retry policy.
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// The discovery options.
    pub fn discovery_options(&self) -> &DiscoveryOptions {
        &self.discovery
    }

    /// Apply `command` to the light, logging any failure.
    pub async fn apply(&self, light: &LightDescriptor, command: &LightCommand) {
        match self.try_apply(light.address(), command).await {
            Ok(report) if report.is_complete() => {
                debug!("Applied {:?} to {}", report.applied, light.name);
            }
            Ok(report) => info!(
                "Partially applied command to {}: applied {:?}, unsupported {:?}, failed {:?}",
                light.name, report.applied, report.unsupported, report.failed
            ),
            Err(e) => error!("Failed to apply command to {}: {}", light.name, e),
        }
    }

    /// Apply `command` to the light at `address`.
    ///
    /// Entries are written in command order. An unsupported or failing key
    /// is skipped and the rest continue. A transport failure aborts the
    /// attempt and the whole command is retried on a fresh connection.
    #[tracing::instrument(level = "info", skip(self, command), fields(keys = command.len()))]
    pub async fn try_apply(&self, address: &str, command: &LightCommand) -> Result<ApplyReport> {
        if command.is_empty() {
            debug!("Empty command for {}, nothing to do", address);
            return Ok(ApplyReport::default());
        }
        self.policy
            .run(&self.cache, address, |session| {
                apply_command(session, command)
            })
            .await
    }

    /// Read the light's state. Any failure reports the light unreachable.
    pub async fn read_state(&self, light: &LightDescriptor) -> LightState {
        match self.try_read_state(light.address()).await {
            Ok(state) => state,
            Err(e) => {
                if e.kind() == ErrorKind::ProtocolDecode {
                    error!("Unreadable state from {}: {}", light.name, e);
                } else {
                    warn!("Failed to read state of {}: {}", light.name, e);
                }
                LightState::unreachable()
            }
        }
    }

    /// Read the state of the light at `address`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn try_read_state(&self, address: &str) -> Result<LightState> {
        self.policy
            .run(&self.cache, address, read_light_state)
            .await
    }

    /// Discover lights and append a descriptor for each one to `lights`.
    ///
    /// Every discovered session is registered in the connection cache.
    /// Failures are logged, never returned.
    pub async fn discover(&self, lights: &mut Vec<LightDescriptor>) {
        self.discover_with_cancel(lights, CancellationToken::new())
            .await;
    }

    /// Like [`Driver::discover`], stopping early when `cancel` fires.
    pub async fn discover_with_cancel(
        &self,
        lights: &mut Vec<LightDescriptor>,
        cancel: CancellationToken,
    ) {
        let sessions = match self
            .discoverer
            .discover_with_cancel(&self.discovery, cancel)
            .await
        {
            Ok(sessions) => sessions,
            Err(e) => {
                error!("Light discovery failed: {}", e);
                return;
            }
        };

        info!("Discovered {} Hue Bluetooth light(s)", sessions.len());
        for session in sessions {
            let descriptor =
                LightDescriptor::new(session.address(), session.name(), session.model());
            debug!(?descriptor, "Registering light");
            self.cache.insert(session).await;
            lights.push(descriptor);
        }
    }

    /// Disconnect every cached session.
    pub async fn shutdown(&self) {
        self.cache.clear().await;
    }
}

async fn apply_command(session: Arc<LightSession>, command: &LightCommand) -> Result<ApplyReport> {
    let mut report = ApplyReport::default();

    for entry in command.iter() {
        let key = entry.key();
        let outcome: Outcome<()> = match *entry {
            CommandEntry::Power(on) => session.set_power(on).await,
            CommandEntry::Brightness(bri) => session.set_brightness(bri.fraction()).await,
            CommandEntry::ColorXy([x, y]) => session.set_color_xy(x, y).await,
        }
        .into();

        match outcome {
            Outcome::Ok(()) => report.applied.push(key),
            Outcome::Unsupported(capability) => {
                debug!("{} does not support {}, skipping '{}'", session.address(), capability, key);
                report.unsupported.push(key);
            }
            Outcome::Failed(e) if e.is_retryable() => return Err(e),
            Outcome::Failed(e) if e.kind() == ErrorKind::CapabilityUnsupported => {
                debug!("Skipping '{}' on {}: {}", key, session.address(), e);
                report.unsupported.push(key);
            }
            Outcome::Failed(e) => {
                error!("Failed to apply '{}' to {}: {}", key, session.address(), e);
                report.failed.push(key);
            }
        }
    }

    Ok(report)
}

async fn read_light_state(session: Arc<LightSession>) -> Result<LightState> {
    let mut state = LightState::reachable();
    state.on = Some(session.get_power().await?);

    match session.color_mode() {
        Some(ColorMode::Xy) => {
            state.xy = Some(session.get_color_xy().await?);
            state.colormode = Some(ColorMode::Xy);
        }
        Some(ColorMode::Ct) => state.colormode = Some(ColorMode::Ct),
        None if session.supports_brightness() => {
            state.bri = Some(session.get_brightness().await?);
        }
        None => {}
    }

    Ok(state)
}
