//! In-memory transport for testing.
//!
//! [`MockTransport`] implements [`BleTransport`] over a set of simulated
//! [`MockLight`]s, so the session, cache, reconnect and driver layers can be
//! exercised without Bluetooth hardware.
//!
//! # Features
//!
//! - **Failure injection**: transient or permanent link failures, and
//!   failing connects
//! - **Write log**: every acknowledged write, in order
//! - **Counters**: connects, reads, cache clears and closes
//! - **Latency simulation**: delay connects to exercise deadlines
//!
//! # Example
//!
//! ```
//! use huebl_core::mock::{MockLight, MockTransport};
//! use huebl_core::LightSession;
//!
//! #[tokio::main]
//! async fn main() {
//!     let transport = MockTransport::new();
//!     let light = transport.add_light(MockLight::builder().name("Desk").build());
//!
//!     let session = LightSession::connect(&transport, light.address()).await.unwrap();
//!     session.set_power(true).await.unwrap();
//!     assert_eq!(light.writes().len(), 1);
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use huebl_types::{codec, uuids};

use crate::error::{ConnectionFailureReason, LightNotFoundReason, Error, Result};
use crate::scan::{ScanGuard, ScanStop};
use crate::transport::{Advertisement, BleTransport, LightLink};
use crate::util::addresses_match;

/// A simulated light.
pub struct MockLight {
    address: String,
    local_name: Option<String>,
    advertised_services: Vec<Uuid>,
    rssi: Option<i16>,
    characteristics: HashSet<Uuid>,
    values: Mutex<HashMap<Uuid, Vec<u8>>>,
    writes: Mutex<Vec<(Uuid, Vec<u8>)>>,
    read_count: AtomicU32,
    clear_cache_count: AtomicU32,
    close_count: AtomicU32,
    should_fail: AtomicBool,
    /// Link operations to fail before succeeding again.
    remaining_failures: AtomicU32,
    fail_connect: AtomicBool,
    remaining_connect_failures: AtomicU32,
    /// Simulated connect latency in milliseconds (0 = no delay).
    connect_latency_ms: AtomicU64,
    /// Simulated read/write latency in milliseconds (0 = no delay).
    operation_latency_ms: AtomicU64,
}

impl std::fmt::Debug for MockLight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLight")
            .field("address", &self.address)
            .field("local_name", &self.local_name)
            .field("characteristics", &self.characteristics.len())
            .finish()
    }
}

impl MockLight {
    /// Start building a light. Defaults to a full-color light.
    pub fn builder() -> MockLightBuilder {
        MockLightBuilder::new()
    }

    /// Address of the light.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Advertisement this light emits during scans.
    pub fn advertisement(&self) -> Advertisement {
        Advertisement {
            address: self.address.clone(),
            local_name: self.local_name.clone(),
            services: self.advertised_services.clone(),
            rssi: self.rssi,
        }
    }

    /// Whether the light exposes `characteristic`.
    pub fn has_characteristic(&self, characteristic: Uuid) -> bool {
        self.characteristics.contains(&characteristic)
    }

    /// Current raw value of a characteristic.
    pub fn value(&self, characteristic: Uuid) -> Option<Vec<u8>> {
        lock(&self.values).get(&characteristic).cloned()
    }

    /// Overwrite the raw value of a characteristic.
    pub fn set_raw(&self, characteristic: Uuid, data: Vec<u8>) {
        lock(&self.values).insert(characteristic, data);
    }

    /// Set the power state as the light would report it.
    pub fn set_power(&self, on: bool) {
        self.set_raw(uuids::POWER, codec::encode_power(on).to_vec());
    }

    /// Acknowledged writes, oldest first.
    pub fn writes(&self) -> Vec<(Uuid, Vec<u8>)> {
        lock(&self.writes).clone()
    }

    /// Forget recorded writes.
    pub fn clear_writes(&self) {
        lock(&self.writes).clear();
    }

    /// Number of characteristic reads served.
    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::Relaxed)
    }

    /// Number of times a link asked to clear its cache.
    pub fn clear_cache_count(&self) -> u32 {
        self.clear_cache_count.load(Ordering::Relaxed)
    }

    /// Number of times a link was closed.
    pub fn close_count(&self) -> u32 {
        self.close_count.load(Ordering::Relaxed)
    }

    /// Make every link operation fail until reset.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Fail the next `count` link operations, then succeed.
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Get the number of remaining transient failures.
    pub fn remaining_failures(&self) -> u32 {
        self.remaining_failures.load(Ordering::Relaxed)
    }

    /// Make every connect fail until reset.
    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::Relaxed);
    }

    /// Fail the next `count` connects, then succeed.
    pub fn set_connect_failures(&self, count: u32) {
        self.remaining_connect_failures
            .store(count, Ordering::Relaxed);
    }

    /// Set simulated connect latency.
    pub fn set_connect_latency(&self, latency: Duration) {
        self.connect_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Set simulated latency for every read and write.
    ///
    /// The link is checked after the delay, so a link closed while an
    /// operation is in flight fails that operation.
    pub fn set_operation_latency(&self, latency: Duration) {
        self.operation_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    async fn operation_delay(&self) {
        let latency = self.operation_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
    }

    fn check_connect(&self) -> Result<()> {
        if take_one(&self.remaining_connect_failures) || self.fail_connect.load(Ordering::Relaxed)
        {
            return Err(Error::connection_failed(
                Some(self.address.clone()),
                ConnectionFailureReason::OutOfRange,
            ));
        }
        Ok(())
    }

    fn check_should_fail(&self, operation: &str) -> Result<()> {
        if take_one(&self.remaining_failures) || self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::timeout(
                format!("mock {} on {}", operation, self.address),
                Duration::from_secs(10),
            ));
        }
        Ok(())
    }
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
        .is_ok()
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Builder for [`MockLight`].
#[derive(Debug, Clone)]
pub struct MockLightBuilder {
    address: Option<String>,
    name: Option<String>,
    model: Option<String>,
    manufacturer: Option<String>,
    color_xy: bool,
    color_temperature: bool,
    brightness: bool,
    on: bool,
    brightness_fraction: f64,
    xy: [f64; 2],
    advertise_hue_service: bool,
    rssi: Option<i16>,
}

impl Default for MockLightBuilder {
    fn default() -> Self {
        Self {
            address: None,
            name: Some("Hue color lamp".to_string()),
            model: Some("LCA001".to_string()),
            manufacturer: Some("Signify Netherlands B.V.".to_string()),
            color_xy: true,
            color_temperature: true,
            brightness: true,
            on: false,
            brightness_fraction: 1.0,
            xy: [0.3127, 0.3290],
            advertise_hue_service: true,
            rssi: Some(-60),
        }
    }
}

impl MockLightBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address. A random MAC address is used otherwise.
    #[must_use]
    pub fn address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    /// Set the light name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Set the model number.
    #[must_use]
    pub fn model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    /// Set the manufacturer.
    #[must_use]
    pub fn manufacturer(mut self, manufacturer: &str) -> Self {
        self.manufacturer = Some(manufacturer.to_string());
        self
    }

    /// Remove the name, model and manufacturer characteristics.
    #[must_use]
    pub fn anonymous(mut self) -> Self {
        self.name = None;
        self.model = None;
        self.manufacturer = None;
        self
    }

    /// Whether the light has the color xy characteristic.
    #[must_use]
    pub fn color_xy(mut self, present: bool) -> Self {
        self.color_xy = present;
        self
    }

    /// Whether the light has the color temperature characteristic.
    #[must_use]
    pub fn color_temperature(mut self, present: bool) -> Self {
        self.color_temperature = present;
        self
    }

    /// Whether the light has the brightness characteristic.
    #[must_use]
    pub fn brightness(mut self, present: bool) -> Self {
        self.brightness = present;
        self
    }

    /// A white ambiance light: brightness and color temperature.
    #[must_use]
    pub fn white_ambiance(self) -> Self {
        self.color_xy(false).color_temperature(true).brightness(true)
    }

    /// A dimmable white light: brightness only.
    #[must_use]
    pub fn dimmable_only(self) -> Self {
        self.color_xy(false).color_temperature(false).brightness(true)
    }

    /// Initial power state.
    #[must_use]
    pub fn on(mut self, on: bool) -> Self {
        self.on = on;
        self
    }

    /// Initial brightness as a fraction.
    #[must_use]
    pub fn initial_brightness(mut self, fraction: f64) -> Self {
        self.brightness_fraction = fraction;
        self
    }

    /// Initial color.
    #[must_use]
    pub fn initial_xy(mut self, x: f64, y: f64) -> Self {
        self.xy = [x, y];
        self
    }

    /// Whether scans report the Hue BLE service for this light.
    #[must_use]
    pub fn advertise_hue_service(mut self, advertise: bool) -> Self {
        self.advertise_hue_service = advertise;
        self
    }

    /// Advertised signal strength.
    #[must_use]
    pub fn rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// Build the light.
    #[must_use]
    pub fn build(self) -> MockLight {
        let address = self.address.unwrap_or_else(random_address);

        let mut values = HashMap::new();
        values.insert(uuids::POWER, codec::encode_power(self.on).to_vec());
        if self.brightness {
            values.insert(
                uuids::BRIGHTNESS,
                codec::encode_brightness(self.brightness_fraction).to_vec(),
            );
        }
        if self.color_xy {
            values.insert(
                uuids::COLOR_XY,
                codec::encode_xy(self.xy[0], self.xy[1]).to_vec(),
            );
        }
        if self.color_temperature {
            values.insert(uuids::TEMPERATURE, vec![0x99, 0x01]);
        }
        for (uuid, text) in [
            (uuids::LIGHT_NAME, &self.name),
            (uuids::MODEL_NUMBER, &self.model),
            (uuids::MANUFACTURER_NAME, &self.manufacturer),
        ] {
            if let Some(text) = text {
                values.insert(uuid, text.as_bytes().to_vec());
            }
        }

        let advertised_services = if self.advertise_hue_service {
            vec![uuids::HUE_BLE_SERVICE]
        } else {
            Vec::new()
        };

        MockLight {
            address,
            local_name: self.name,
            advertised_services,
            rssi: self.rssi,
            characteristics: values.keys().copied().collect(),
            values: Mutex::new(values),
            writes: Mutex::new(Vec::new()),
            read_count: AtomicU32::new(0),
            clear_cache_count: AtomicU32::new(0),
            close_count: AtomicU32::new(0),
            should_fail: AtomicBool::new(false),
            remaining_failures: AtomicU32::new(0),
            fail_connect: AtomicBool::new(false),
            remaining_connect_failures: AtomicU32::new(0),
            connect_latency_ms: AtomicU64::new(0),
            operation_latency_ms: AtomicU64::new(0),
        }
    }
}

fn random_address() -> String {
    let bytes: [u8; 6] = rand::random();
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// A simulated Bluetooth radio.
#[derive(Debug, Default)]
pub struct MockTransport {
    lights: Mutex<Vec<Arc<MockLight>>>,
    advertisements: Mutex<Vec<Advertisement>>,
    connect_count: AtomicU32,
    scan_count: AtomicU32,
    scan_should_fail: AtomicBool,
    active_scans: Arc<AtomicU32>,
}

/// Stops a mock scan by lowering the active scan count.
struct MockScanner(Arc<AtomicU32>);

#[async_trait]
impl ScanStop for MockScanner {
    async fn stop(&self) -> Result<()> {
        self.0.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

impl MockTransport {
    /// Create a transport with no lights in range.
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a light in range. Its advertisement is appended to scan results.
    pub fn add_light(&self, light: MockLight) -> Arc<MockLight> {
        let light = Arc::new(light);
        lock(&self.advertisements).push(light.advertisement());
        lock(&self.lights).push(Arc::clone(&light));
        light
    }

    /// Append an advertisement from something that is not a mock light.
    pub fn add_advertisement(&self, advertisement: Advertisement) {
        lock(&self.advertisements).push(advertisement);
    }

    /// Number of connect calls, successful or not.
    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::Relaxed)
    }

    /// Number of scans performed.
    pub fn scan_count(&self) -> u32 {
        self.scan_count.load(Ordering::Relaxed)
    }

    /// Number of scans started and not yet stopped.
    pub fn active_scans(&self) -> u32 {
        self.active_scans.load(Ordering::SeqCst)
    }

    /// Make scans fail as if there were no adapter.
    pub fn set_scan_should_fail(&self, fail: bool) {
        self.scan_should_fail.store(fail, Ordering::Relaxed);
    }

    fn find(&self, address: &str) -> Option<Arc<MockLight>> {
        lock(&self.lights)
            .iter()
            .find(|light| addresses_match(light.address(), address))
            .cloned()
    }
}

#[async_trait]
impl BleTransport for MockTransport {
    async fn connect(&self, address: &str) -> Result<Arc<dyn LightLink>> {
        self.connect_count.fetch_add(1, Ordering::Relaxed);
        let light = self
            .find(address)
            .ok_or_else(|| Error::light_not_found(address))?;

        let latency = light.connect_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        light.check_connect()?;

        Ok(Arc::new(MockLink {
            light,
            open: AtomicBool::new(true),
            cleared: AtomicBool::new(false),
        }))
    }

    async fn scan(&self, duration: Duration) -> Result<Vec<Advertisement>> {
        self.scan_count.fetch_add(1, Ordering::Relaxed);
        if self.scan_should_fail.load(Ordering::Relaxed) {
            return Err(Error::LightNotFound(LightNotFoundReason::NoAdapter));
        }
        self.active_scans.fetch_add(1, Ordering::SeqCst);
        let guard = ScanGuard::new(MockScanner(Arc::clone(&self.active_scans)));
        tokio::time::sleep(duration).await;
        guard.stop().await?;
        Ok(lock(&self.advertisements).clone())
    }
}

/// Link to a [`MockLight`].
struct MockLink {
    light: Arc<MockLight>,
    open: AtomicBool,
    cleared: AtomicBool,
}

impl MockLink {
    fn check_usable(&self, operation: &str, characteristic: Uuid) -> Result<()> {
        if !self.open.load(Ordering::Relaxed) {
            return Err(Error::NotConnected);
        }
        self.light.check_should_fail(operation)?;
        if !self.has_characteristic(characteristic) {
            return Err(Error::characteristic_not_found(
                characteristic.to_string(),
                self.service_count(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LightLink for MockLink {
    fn address(&self) -> &str {
        self.light.address()
    }

    fn has_characteristic(&self, characteristic: Uuid) -> bool {
        !self.cleared.load(Ordering::Relaxed) && self.light.has_characteristic(characteristic)
    }

    fn service_count(&self) -> usize {
        3
    }

    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>> {
        self.light.operation_delay().await;
        self.check_usable("read", characteristic)?;
        self.light.read_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.light.value(characteristic).unwrap_or_default())
    }

    async fn write(&self, characteristic: Uuid, data: &[u8]) -> Result<()> {
        self.light.operation_delay().await;
        self.check_usable("write", characteristic)?;
        lock(&self.light.writes).push((characteristic, data.to_vec()));
        self.light.set_raw(characteristic, data.to_vec());
        Ok(())
    }

    async fn clear_cache(&self) -> Result<()> {
        self.light.clear_cache_count.fetch_add(1, Ordering::Relaxed);
        self.cleared.store(true, Ordering::Relaxed);
        self.light.check_should_fail("clear cache")
    }

    async fn close(&self) -> Result<()> {
        self.light.close_count.fetch_add(1, Ordering::Relaxed);
        self.open.store(false, Ordering::Relaxed);
        self.light.check_should_fail("close")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let light = MockLight::builder().build();
        assert_eq!(light.address().len(), 17);
        assert!(light.has_characteristic(uuids::COLOR_XY));
        assert!(light.has_characteristic(uuids::TEMPERATURE));
        assert!(light.has_characteristic(uuids::BRIGHTNESS));
        assert!(light.has_characteristic(uuids::LIGHT_NAME));
        assert_eq!(light.value(uuids::POWER), Some(vec![0x00]));
        assert!(light.advertisement().advertises(uuids::HUE_BLE_SERVICE));
    }

    #[test]
    fn test_builder_presets() {
        let light = MockLight::builder().white_ambiance().build();
        assert!(!light.has_characteristic(uuids::COLOR_XY));
        assert!(light.has_characteristic(uuids::TEMPERATURE));

        let light = MockLight::builder().anonymous().dimmable_only().build();
        assert!(!light.has_characteristic(uuids::LIGHT_NAME));
        assert!(!light.has_characteristic(uuids::TEMPERATURE));
        assert!(light.has_characteristic(uuids::BRIGHTNESS));
    }

    #[tokio::test]
    async fn test_connect_and_write_log() {
        let transport = MockTransport::new();
        let light = transport.add_light(MockLight::builder().address("AA:BB:CC:DD:EE:FF").build());

        let link = transport.connect("aa:bb:cc:dd:ee:ff").await.unwrap();
        link.write(uuids::POWER, &[0x01]).await.unwrap();
        assert_eq!(link.read(uuids::POWER).await.unwrap(), vec![0x01]);
        assert_eq!(light.writes(), vec![(uuids::POWER, vec![0x01])]);
        assert_eq!(transport.connect_count(), 1);

        link.close().await.unwrap();
        assert!(matches!(link.read(uuids::POWER).await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_transient_failures() {
        let transport = MockTransport::new();
        let light = transport.add_light(MockLight::builder().build());
        let link = transport.connect(light.address()).await.unwrap();

        light.set_transient_failures(2);
        assert!(link.read(uuids::POWER).await.is_err());
        assert!(link.read(uuids::POWER).await.is_err());
        assert!(link.read(uuids::POWER).await.is_ok());
        assert_eq!(light.remaining_failures(), 0);
    }

    #[tokio::test]
    async fn test_connect_failures() {
        let transport = MockTransport::new();
        let light = transport.add_light(MockLight::builder().build());

        light.set_connect_failures(1);
        assert!(transport.connect(light.address()).await.is_err());
        assert!(transport.connect(light.address()).await.is_ok());

        light.set_fail_connect(true);
        assert!(transport.connect(light.address()).await.is_err());
        assert_eq!(transport.connect_count(), 3);
    }

    #[tokio::test]
    async fn test_missing_characteristic() {
        let transport = MockTransport::new();
        let light = transport.add_light(MockLight::builder().dimmable_only().build());
        let link = transport.connect(light.address()).await.unwrap();

        let err = link.write(uuids::COLOR_XY, &[0; 4]).await.unwrap_err();
        assert!(matches!(err, Error::CharacteristicNotFound { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_during_slow_read_fails_the_read() {
        let transport = MockTransport::new();
        let light = transport.add_light(MockLight::builder().build());
        light.set_operation_latency(Duration::from_millis(100));
        let link = transport.connect(light.address()).await.unwrap();

        let start = tokio::time::Instant::now();
        assert!(link.read(uuids::POWER).await.is_ok());
        assert_eq!(start.elapsed(), Duration::from_millis(100));

        let (read, closed) = tokio::join!(link.read(uuids::POWER), link.close());
        assert!(closed.is_ok());
        assert!(matches!(read, Err(Error::NotConnected)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_returns_advertisements() {
        let transport = MockTransport::new();
        transport.add_light(MockLight::builder().build());
        transport.add_advertisement(Advertisement {
            address: "11:22:33:44:55:66".to_string(),
            local_name: Some("Thermometer".to_string()),
            services: Vec::new(),
            rssi: None,
        });

        let seen = transport.scan(Duration::from_secs(5)).await.unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(transport.scan_count(), 1);
        assert_eq!(transport.active_scans(), 0);

        transport.set_scan_should_fail(true);
        assert!(transport.scan(Duration::from_secs(1)).await.is_err());
    }
}
