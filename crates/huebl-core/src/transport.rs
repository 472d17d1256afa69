//! Trait abstractions over the BLE radio stack.
//!
//! The driver never talks to a Bluetooth stack directly. It goes through
//! [`BleTransport`] (scan, connect) and [`LightLink`] (one connected
//! peripheral). [`crate::scan::BtleplugTransport`] implements them on top of
//! `btleplug`; [`crate::mock::MockTransport`] implements them in memory for
//! tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

/// One advertisement seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Device address (MAC on Linux/Windows, peripheral UUID on macOS).
    pub address: String,
    /// Advertised local name, if any.
    pub local_name: Option<String>,
    /// Advertised service UUIDs.
    pub services: Vec<Uuid>,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
}

impl Advertisement {
    /// Whether the advertisement lists `service`.
    pub fn advertises(&self, service: Uuid) -> bool {
        self.services.contains(&service)
    }
}

/// Access to the Bluetooth radio.
///
/// Implementations own their connect policy: address resolution, connection
/// timeouts, and any transport-level reconnect attempts happen inside
/// [`BleTransport::connect`].
#[async_trait]
pub trait BleTransport: Send + Sync {
    /// Resolve `address` and establish a connection with services discovered.
    async fn connect(&self, address: &str) -> Result<Arc<dyn LightLink>>;

    /// Passively scan for `duration` and return every advertisement seen.
    async fn scan(&self, duration: Duration) -> Result<Vec<Advertisement>>;
}

/// A connected peripheral.
///
/// Reads and writes are addressed by characteristic UUID. Writes are always
/// acknowledged: an implementation must only return `Ok` once the peripheral
/// confirmed the write.
#[async_trait]
pub trait LightLink: Send + Sync {
    /// Address of the peripheral.
    fn address(&self) -> &str;

    /// Whether the discovered service table contains `characteristic`.
    fn has_characteristic(&self, characteristic: Uuid) -> bool;

    /// Number of services discovered on the peripheral.
    fn service_count(&self) -> usize;

    /// Read a characteristic value.
    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>>;

    /// Write a characteristic value and wait for the acknowledgement.
    async fn write(&self, characteristic: Uuid, data: &[u8]) -> Result<()>;

    /// Drop any transport-side cached state (attribute tables and the like).
    async fn clear_cache(&self) -> Result<()>;

    /// Close the connection.
    async fn close(&self) -> Result<()>;
}
