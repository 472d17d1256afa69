//! One logical connection to one light.
//!
//! A [`LightSession`] is created by a successful [`LightSession::connect`]
//! and owns the transport link until [`LightSession::disconnect`]. Whether
//! the session is connected is derived from the presence of the link, so the
//! two cannot disagree.
//!
//! # Example
//!
//! ```no_run
//! use huebl_core::{BtleplugTransport, LightSession};
//!
//! #[tokio::main]
//! async fn main() -> huebl_core::Result<()> {
//!     let transport = BtleplugTransport::new().await?;
//!     let session = LightSession::connect(&transport, "AA:BB:CC:DD:EE:FF").await?;
//!
//!     session.set_power(true).await?;
//!     if session.supports_brightness() {
//!         session.set_brightness(0.5).await?;
//!     }
//!
//!     session.disconnect().await;
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};
use uuid::Uuid;

use huebl_types::{Capability, CapabilitySet, ColorMode, codec, uuids};

use crate::error::{Error, Result};
use crate::transport::{BleTransport, LightLink};

/// A connection to a single light.
pub struct LightSession {
    address: String,
    link: RwLock<Option<Arc<dyn LightLink>>>,
    name: String,
    model: String,
    manufacturer: Option<String>,
}

impl std::fmt::Debug for LightSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightSession")
            .field("address", &self.address)
            .field("name", &self.name)
            .field("model", &self.model)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl LightSession {
    /// Connect to the light at `address`.
    ///
    /// The transport resolves the address, connects (with its own bounded
    /// attempts) and discovers services. The session then reads the light's
    /// name and model, and its manufacturer on a best-effort basis. A light
    /// without a name or model characteristic gets an empty string.
    ///
    /// If reading name or model fails, the link is closed and the error is
    /// returned.
    #[tracing::instrument(level = "info", skip(transport))]
    pub async fn connect(transport: &dyn BleTransport, address: &str) -> Result<Self> {
        let link = transport.connect(address).await?;

        let info = async {
            let name = read_text(link.as_ref(), uuids::LIGHT_NAME, "name").await?;
            let model = read_text(link.as_ref(), uuids::MODEL_NUMBER, "model").await?;
            Ok::<_, Error>((name, model))
        }
        .await;

        let (name, model) = match info {
            Ok(info) => info,
            Err(e) => {
                warn!("Failed to read identity of {}: {}", address, e);
                if let Err(close_err) = link.close().await {
                    debug!("Close after failed connect also failed: {}", close_err);
                }
                return Err(e);
            }
        };

        let manufacturer =
            match read_text(link.as_ref(), uuids::MANUFACTURER_NAME, "manufacturer").await {
                Ok(manufacturer) => manufacturer,
                Err(e) => {
                    debug!("Manufacturer not readable on {}: {}", address, e);
                    None
                }
            };

        info!(
            name = name.as_deref().unwrap_or(""),
            model = model.as_deref().unwrap_or(""),
            manufacturer = manufacturer.as_deref().unwrap_or(""),
            "Connected to light"
        );

        Ok(Self {
            address: address.to_string(),
            link: RwLock::new(Some(link)),
            name: name.unwrap_or_default(),
            model: model.unwrap_or_default(),
            manufacturer,
        })
    }

    /// Close the connection.
    ///
    /// Clears the transport cache, then closes the link. Failures are logged
    /// and swallowed. Calling this on a disconnected session does nothing.
    #[tracing::instrument(level = "info", skip(self), fields(address = %self.address))]
    pub async fn disconnect(&self) {
        let link = self
            .link
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(link) = link else {
            return;
        };

        if let Err(e) = link.clear_cache().await {
            warn!("Failed to clear transport cache: {}", e);
        }
        if let Err(e) = link.close().await {
            warn!("Failed to close link: {}", e);
        }
    }

    /// Address of the light.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Name read on connect, empty if the light has none.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Model number read on connect, empty if the light has none.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Manufacturer read on connect.
    pub fn manufacturer(&self) -> Option<&str> {
        self.manufacturer.as_deref()
    }

    /// Whether the session holds a live link.
    pub fn is_connected(&self) -> bool {
        self.link
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    fn link(&self) -> Result<Arc<dyn LightLink>> {
        self.link
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or(Error::NotConnected)
    }

    fn has(&self, characteristic: Uuid) -> bool {
        self.link()
            .map(|link| link.has_characteristic(characteristic))
            .unwrap_or(false)
    }

    /// Link for an operation on `capability`, without touching the radio if
    /// the light lacks it.
    fn require(&self, capability: Capability) -> Result<Arc<dyn LightLink>> {
        let link = self.link()?;
        if link.has_characteristic(capability.characteristic()) {
            Ok(link)
        } else {
            Err(Error::Unsupported(capability))
        }
    }

    /// Whether the light exposes the color xy characteristic.
    pub fn supports_color_xy(&self) -> bool {
        self.has(uuids::COLOR_XY)
    }

    /// Whether the light exposes the color temperature characteristic.
    pub fn supports_color_temperature(&self) -> bool {
        self.has(uuids::TEMPERATURE)
    }

    /// Whether the light exposes the brightness characteristic.
    pub fn supports_brightness(&self) -> bool {
        self.has(uuids::BRIGHTNESS)
    }

    /// Capabilities of the live link. Empty when disconnected.
    pub fn capabilities(&self) -> CapabilitySet {
        CapabilitySet {
            color_xy: self.supports_color_xy(),
            color_temperature: self.supports_color_temperature(),
            brightness: self.supports_brightness(),
        }
    }

    /// Highest supported color mode.
    pub fn color_mode(&self) -> Option<ColorMode> {
        self.capabilities().color_mode()
    }

    /// Read a raw characteristic value.
    pub async fn read_characteristic(&self, characteristic: Uuid) -> Result<Vec<u8>> {
        self.link()?.read(characteristic).await
    }

    /// Write a raw characteristic value and wait for the acknowledgement.
    pub async fn write_characteristic(&self, characteristic: Uuid, data: &[u8]) -> Result<()> {
        self.link()?.write(characteristic, data).await
    }

    /// Read the power state.
    pub async fn get_power(&self) -> Result<bool> {
        let data = self.require(Capability::Power)?.read(uuids::POWER).await?;
        Ok(codec::decode_power(&data)?)
    }

    /// Switch the light on or off.
    pub async fn set_power(&self, on: bool) -> Result<()> {
        self.require(Capability::Power)?
            .write(uuids::POWER, &codec::encode_power(on))
            .await
    }

    /// Read brightness as a fraction.
    pub async fn get_brightness(&self) -> Result<f64> {
        let data = self
            .require(Capability::Brightness)?
            .read(uuids::BRIGHTNESS)
            .await?;
        Ok(codec::decode_brightness(&data)?)
    }

    /// Set brightness from a fraction in 0.0–1.0.
    pub async fn set_brightness(&self, fraction: f64) -> Result<()> {
        self.require(Capability::Brightness)?
            .write(uuids::BRIGHTNESS, &codec::encode_brightness(fraction))
            .await
    }

    /// Read the CIE xy color.
    pub async fn get_color_xy(&self) -> Result<[f64; 2]> {
        let data = self.require(Capability::ColorXy)?.read(uuids::COLOR_XY).await?;
        Ok(codec::decode_xy(&data)?)
    }

    /// Set the CIE xy color.
    pub async fn set_color_xy(&self, x: f64, y: f64) -> Result<()> {
        self.require(Capability::ColorXy)?
            .write(uuids::COLOR_XY, &codec::encode_xy(x, y))
            .await
    }
}

/// Read an optional ASCII characteristic. `Ok(None)` if the light lacks it.
async fn read_text(
    link: &dyn LightLink,
    characteristic: Uuid,
    field: &'static str,
) -> Result<Option<String>> {
    if !link.has_characteristic(characteristic) {
        debug!("Light has no {} characteristic", field);
        return Ok(None);
    }
    let data = link.read(characteristic).await?;
    Ok(Some(codec::decode_ascii(field, &data)?))
}

/// Result of an operation that may hit a missing capability.
///
/// Separates "the light cannot do this" from real failures so callers can
/// skip unsupported work without inspecting error variants.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The operation succeeded.
    Ok(T),
    /// The light lacks the capability; nothing was sent.
    Unsupported(Capability),
    /// The operation failed.
    Failed(Error),
}

impl<T> Outcome<T> {
    /// Whether the operation succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    /// Convert back into a `Result`.
    pub fn into_result(self) -> Result<T> {
        match self {
            Outcome::Ok(value) => Ok(value),
            Outcome::Unsupported(capability) => Err(Error::Unsupported(capability)),
            Outcome::Failed(e) => Err(e),
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Ok(value),
            Err(Error::Unsupported(capability)) => Outcome::Unsupported(capability),
            Err(e) => Outcome::Failed(e),
        }
    }
}
