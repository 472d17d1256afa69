//! `btleplug`-backed transport.
//!
//! [`BtleplugTransport`] scans the first Bluetooth adapter and opens
//! [`BtleplugLink`]s to lights by address.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::device::{BtleplugLink, ConnectionConfig};
use crate::error::{LightNotFoundReason, Error, Result};
use crate::transport::{Advertisement, BleTransport, LightLink};
use crate::util::{ZERO_ADDRESS, addresses_match, create_identifier, format_peripheral_id};

/// Number of scans made while looking for a light the adapter has not seen.
const FIND_ATTEMPTS: u32 = 3;

/// A radio whose running scan can be stopped.
#[async_trait]
pub(crate) trait ScanStop: Send + Sync + 'static {
    async fn stop(&self) -> Result<()>;
}

#[async_trait]
impl ScanStop for Adapter {
    async fn stop(&self) -> Result<()> {
        Central::stop_scan(self).await?;
        Ok(())
    }
}

/// Stops a running scan when dropped before [`ScanGuard::stop`] is called.
///
/// A scan future dropped mid-sleep (cancellation, a timeout) would otherwise
/// leave the radio scanning.
pub(crate) struct ScanGuard<S: ScanStop> {
    scanner: Option<S>,
}

impl<S: ScanStop> ScanGuard<S> {
    /// Guard a scan that `scanner` has already started.
    pub(crate) fn new(scanner: S) -> Self {
        Self {
            scanner: Some(scanner),
        }
    }

    /// Stop the scan now and report the result.
    pub(crate) async fn stop(mut self) -> Result<()> {
        match self.scanner.take() {
            Some(scanner) => scanner.stop().await,
            None => Ok(()),
        }
    }
}

impl<S: ScanStop> Drop for ScanGuard<S> {
    fn drop(&mut self) {
        let Some(scanner) = self.scanner.take() else {
            return;
        };
        debug!("Scan interrupted, stopping it");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = scanner.stop().await {
                        warn!("Failed to stop interrupted scan: {}", e);
                    }
                });
            }
            Err(_) => warn!("Scan interrupted outside a runtime; it was not stopped"),
        }
    }
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters
        .into_iter()
        .next()
        .ok_or(Error::LightNotFound(LightNotFoundReason::NoAdapter))
}

/// Transport over the host's Bluetooth adapter.
#[derive(Debug, Clone)]
pub struct BtleplugTransport {
    adapter: Adapter,
    config: ConnectionConfig,
}

impl BtleplugTransport {
    /// Open the first adapter with default connection settings.
    pub async fn new() -> Result<Self> {
        Self::with_config(ConnectionConfig::default()).await
    }

    /// Open the first adapter with custom connection settings.
    pub async fn with_config(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            adapter: get_adapter().await?,
            config,
        })
    }

    /// Use an already opened adapter.
    pub fn from_adapter(adapter: Adapter, config: ConnectionConfig) -> Self {
        Self { adapter, config }
    }

    /// Connection settings used for every link.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Locate a peripheral by address.
    ///
    /// Peripherals the adapter already knows are used without scanning.
    /// Otherwise up to three scans of increasing length are made, since
    /// advertisements are easily missed.
    #[tracing::instrument(level = "debug", skip(self))]
    async fn find_peripheral(&self, address: &str) -> Result<Peripheral> {
        if let Some(peripheral) = self.known_peripheral(address).await? {
            debug!("Found {} among known peripherals", address);
            return Ok(peripheral);
        }

        let base = self.config.find_timeout.max(Duration::from_secs(1));
        for attempt in 1..=FIND_ATTEMPTS {
            let duration = base * attempt;
            info!("Scan attempt {}/{} ({:?})...", attempt, FIND_ATTEMPTS, duration);

            self.adapter.start_scan(ScanFilter::default()).await?;
            let guard = ScanGuard::new(self.adapter.clone());
            sleep(duration).await;
            guard.stop().await?;

            if let Some(peripheral) = self.known_peripheral(address).await? {
                info!("Found {} on attempt {}", address, attempt);
                return Ok(peripheral);
            }
            if attempt < FIND_ATTEMPTS {
                warn!("Light {} not found, retrying...", address);
            }
        }

        Err(Error::light_not_found(address))
    }

    async fn known_peripheral(&self, address: &str) -> Result<Option<Peripheral>> {
        for peripheral in self.adapter.peripherals().await? {
            let peripheral_id = format_peripheral_id(&peripheral.id());
            if addresses_match(&peripheral_id, address) {
                return Ok(Some(peripheral));
            }
            if let Ok(Some(props)) = peripheral.properties().await {
                let mac = props.address.to_string();
                if mac != ZERO_ADDRESS && addresses_match(&mac, address) {
                    return Ok(Some(peripheral));
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl BleTransport for BtleplugTransport {
    async fn connect(&self, address: &str) -> Result<Arc<dyn LightLink>> {
        let peripheral = self.find_peripheral(address).await?;
        let link =
            BtleplugLink::establish(self.adapter.clone(), peripheral, self.config.clone()).await?;
        Ok(Arc::new(link))
    }

    #[tracing::instrument(level = "info", skip(self))]
    async fn scan(&self, duration: Duration) -> Result<Vec<Advertisement>> {
        info!("Starting BLE scan for {:?}...", duration);

        self.adapter.start_scan(ScanFilter::default()).await?;
        let guard = ScanGuard::new(self.adapter.clone());
        sleep(duration).await;
        guard.stop().await?;

        let mut seen = Vec::new();
        for peripheral in self.adapter.peripherals().await? {
            let props = match peripheral.properties().await {
                Ok(Some(props)) => props,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Error reading peripheral properties: {}", e);
                    continue;
                }
            };
            seen.push(Advertisement {
                address: create_identifier(&props.address.to_string(), &peripheral.id()),
                local_name: props.local_name,
                services: props.services,
                rssi: props.rssi,
            });
        }

        info!("Scan complete. Saw {} peripheral(s)", seen.len());
        Ok(seen)
    }
}
