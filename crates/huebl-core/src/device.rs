//! `btleplug` peripheral link.
//!
//! This module provides [`BtleplugLink`], the [`LightLink`] used against
//! real hardware, and [`ConnectionConfig`], the timeouts and attempt bounds
//! it connects with.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::{Adapter, Peripheral};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ConnectionFailureReason, Error, Result};
use crate::transport::LightLink;
use crate::util::{create_identifier, format_peripheral_id};

/// Default timeout for BLE characteristic read operations.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for BLE characteristic write operations.
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for one BLE connection attempt.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for service discovery.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default scan time used to locate a light that is not yet known.
const DEFAULT_FIND_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of transport-level connect attempts.
const DEFAULT_CONNECT_ATTEMPTS: u32 = 3;

/// Default pause between transport-level connect attempts.
const DEFAULT_ATTEMPT_DELAY: Duration = Duration::from_millis(500);

/// Configuration for BLE connection timeouts and behavior.
///
/// Use this to customize timeout values for different environments.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use huebl_core::device::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .connection_timeout(Duration::from_secs(20))
///     .connect_attempts(5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    /// Timeout for one BLE connection attempt.
    pub connection_timeout: Duration,
    /// Timeout for BLE read operations.
    pub read_timeout: Duration,
    /// Timeout for BLE write operations.
    pub write_timeout: Duration,
    /// Timeout for service discovery after connection.
    pub discovery_timeout: Duration,
    /// Scan duration used to locate a light the adapter has not seen yet.
    pub find_timeout: Duration,
    /// Number of connect attempts before giving up.
    pub connect_attempts: u32,
    /// Pause between connect attempts.
    pub attempt_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            find_timeout: DEFAULT_FIND_TIMEOUT,
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            attempt_delay: DEFAULT_ATTEMPT_DELAY,
        }
    }
}

impl ConnectionConfig {
    /// Create a new connection config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config for fast, reliable environments.
    ///
    /// Uses shorter timeouts for quicker failure detection
    /// when lights are nearby with strong signals.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(8),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            discovery_timeout: Duration::from_secs(5),
            find_timeout: Duration::from_secs(3),
            connect_attempts: 2,
            attempt_delay: Duration::from_millis(250),
        }
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the write timeout.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the scan duration used to locate unknown lights.
    #[must_use]
    pub fn find_timeout(mut self, timeout: Duration) -> Self {
        self.find_timeout = timeout;
        self
    }

    /// Set the number of connect attempts.
    #[must_use]
    pub fn connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = attempts;
        self
    }

    /// Set the pause between connect attempts.
    #[must_use]
    pub fn attempt_delay(mut self, delay: Duration) -> Self {
        self.attempt_delay = delay;
        self
    }

    /// Validate the config and return an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.connect_attempts == 0 {
            return Err(Error::invalid_config("connect_attempts must be >= 1"));
        }
        for (name, value) in [
            ("connection_timeout", self.connection_timeout),
            ("read_timeout", self.read_timeout),
            ("write_timeout", self.write_timeout),
            ("discovery_timeout", self.discovery_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::invalid_config(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }
}

/// A connected light reached through `btleplug`.
///
/// # Cleanup
///
/// Call [`LightLink::close`] before dropping the link. A link dropped while
/// still open logs a warning and spawns a best-effort disconnect.
pub struct BtleplugLink {
    /// Kept alive for the lifetime of the peripheral connection.
    #[allow(dead_code)]
    adapter: Adapter,
    peripheral: Peripheral,
    address: String,
    /// Characteristics by UUID, built after service discovery.
    characteristics: RwLock<HashMap<Uuid, Characteristic>>,
    service_count: usize,
    closed: AtomicBool,
    config: ConnectionConfig,
}

impl std::fmt::Debug for BtleplugLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BtleplugLink")
            .field("address", &self.address)
            .field("service_count", &self.service_count)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl BtleplugLink {
    /// Connect to a discovered peripheral and discover its services.
    ///
    /// Up to [`ConnectionConfig::connect_attempts`] connection attempts are
    /// made, each bounded by [`ConnectionConfig::connection_timeout`].
    #[tracing::instrument(level = "info", skip_all, fields(attempts = config.connect_attempts))]
    pub async fn establish(
        adapter: Adapter,
        peripheral: Peripheral,
        config: ConnectionConfig,
    ) -> Result<Self> {
        let properties = peripheral.properties().await?;
        let address = properties
            .as_ref()
            .map(|p| create_identifier(&p.address.to_string(), &peripheral.id()))
            .unwrap_or_else(|| format_peripheral_id(&peripheral.id()));

        let mut attempt = 0;
        loop {
            attempt += 1;
            info!("Connecting to {} (attempt {}/{})...", address, attempt, config.connect_attempts);
            let failure = match timeout(config.connection_timeout, peripheral.connect()).await {
                Ok(Ok(())) => break,
                Ok(Err(e)) => {
                    warn!("Connect attempt {} to {} failed: {}", attempt, address, e);
                    ConnectionFailureReason::from(&e)
                }
                Err(_) => {
                    warn!(
                        "Connect attempt {} to {} timed out after {:?}",
                        attempt, address, config.connection_timeout
                    );
                    ConnectionFailureReason::Timeout
                }
            };
            if attempt >= config.connect_attempts {
                return Err(Error::connection_failed(
                    Some(address),
                    ConnectionFailureReason::AttemptsExhausted {
                        attempts: attempt,
                        last: Box::new(failure),
                    },
                ));
            }
            sleep(config.attempt_delay).await;
        }
        info!("Connected!");

        debug!("Discovering services...");
        if let Err(e) = timeout(config.discovery_timeout, peripheral.discover_services())
            .await
            .map_err(|_| Error::timeout("discover services", config.discovery_timeout))
            .and_then(|r| r.map_err(Error::from))
        {
            if let Err(disconnect_err) = peripheral.disconnect().await {
                debug!("Disconnect after failed service discovery: {}", disconnect_err);
            }
            return Err(e);
        }

        let services = peripheral.services();
        debug!("Found {} services", services.len());

        let mut characteristics = HashMap::new();
        for service in &services {
            debug!("  Service: {}", service.uuid);
            for char in &service.characteristics {
                debug!("    Characteristic: {}", char.uuid);
                characteristics.insert(char.uuid, char.clone());
            }
        }

        Ok(Self {
            adapter,
            peripheral,
            address,
            characteristics: RwLock::new(characteristics),
            service_count: services.len(),
            closed: AtomicBool::new(false),
            config,
        })
    }

    /// Get the connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn find_characteristic(&self, uuid: Uuid) -> Result<Characteristic> {
        let cache = self
            .characteristics
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cache
            .get(&uuid)
            .cloned()
            .ok_or_else(|| Error::characteristic_not_found(uuid.to_string(), self.service_count))
    }
}

#[async_trait]
impl LightLink for BtleplugLink {
    fn address(&self) -> &str {
        &self.address
    }

    fn has_characteristic(&self, characteristic: Uuid) -> bool {
        self.characteristics
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(&characteristic)
    }

    fn service_count(&self) -> usize {
        self.service_count
    }

    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>> {
        let char = self.find_characteristic(characteristic)?;
        let data = timeout(self.config.read_timeout, self.peripheral.read(&char))
            .await
            .map_err(|_| {
                Error::timeout(
                    format!("read characteristic {}", characteristic),
                    self.config.read_timeout,
                )
            })??;
        Ok(data)
    }

    async fn write(&self, characteristic: Uuid, data: &[u8]) -> Result<()> {
        let char = self.find_characteristic(characteristic)?;
        timeout(
            self.config.write_timeout,
            self.peripheral.write(&char, data, WriteType::WithResponse),
        )
        .await
        .map_err(|_| {
            Error::timeout(
                format!("write characteristic {}", characteristic),
                self.config.write_timeout,
            )
        })?
        .map_err(|e| Error::WriteFailed {
            uuid: characteristic.to_string(),
            reason: e.to_string(),
        })
    }

    async fn clear_cache(&self) -> Result<()> {
        self.characteristics
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
        Ok(())
    }

    #[tracing::instrument(level = "info", skip(self), fields(address = %self.address))]
    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Disconnecting...");
        timeout(self.config.connection_timeout, self.peripheral.disconnect())
            .await
            .map_err(|_| Error::timeout("disconnect", self.config.connection_timeout))??;
        Ok(())
    }
}

impl Drop for BtleplugLink {
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        warn!(
            address = %self.address,
            "Link dropped without close() - performing best-effort disconnect"
        );

        let peripheral = self.peripheral.clone();
        let address = self.address.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = peripheral.disconnect().await {
                    debug!(
                        address = %address,
                        error = %e,
                        "Best-effort disconnect failed (light may already be disconnected)"
                    );
                }
            });
        }
    }
}
