//! Connection lifecycle and state synchronization for Hue Bluetooth lights.
//!
//! This crate drives Philips Hue lights over Bluetooth Low Energy. It keeps
//! one logical connection per light, translates between the bridge's light
//! state (on/off, brightness, CIE xy color) and the lights' characteristic
//! encodings, and recovers from dropped links by reconnecting once.
//!
//! # Features
//!
//! - **Discovery**: scan for lights advertising the Hue BLE service
//! - **Sessions**: connect, query capabilities, read and write typed values
//! - **Connection cache**: at most one live session per address
//! - **Reconnect policy**: transport failures reconnect and retry once
//! - **Driver**: bridge-facing `apply`, `read_state` and `discover`
//! - **Mock transport**: test the whole stack without hardware
//!
//! # Layers
//!
//! | Layer | Type |
//! |-------|------|
//! | Bridge entry points | [`Driver`] |
//! | Retry | [`ReconnectPolicy`] |
//! | Cache | [`ConnectionCache`] |
//! | Connection | [`LightSession`] |
//! | Radio | [`BleTransport`], [`LightLink`] |
//!
//! # Platform Differences
//!
//! Lights are keyed by address. On Linux and Windows that is the Bluetooth
//! MAC address (e.g. `AA:BB:CC:DD:EE:FF`). On macOS CoreBluetooth hides MAC
//! addresses and the peripheral UUID is used instead; it is stable for a
//! given light on a given Mac only.
//!
//! # Quick Start
//!
//! ```no_run
//! use huebl_core::{Driver, DriverConfig};
//! use huebl_types::LightCommand;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = Driver::bluetooth(&DriverConfig::default()).await?;
//!
//!     let mut lights = Vec::new();
//!     driver.discover(&mut lights).await;
//!     println!("Found {} lights", lights.len());
//!
//!     if let Some(light) = lights.first() {
//!         driver.apply(light, &LightCommand::new().on(true).xy(0.3127, 0.3290)).await;
//!         let state = driver.read_state(light).await;
//!         println!("{}", serde_json::to_string(&state)?);
//!     }
//!
//!     driver.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod device;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod mock;
pub mod reconnect;
pub mod scan;
pub mod session;
pub mod transport;
pub mod util;

// Re-export types crate modules
pub use huebl_types::codec;
pub use huebl_types::types;
pub use huebl_types::uuids;

// Core exports
pub use cache::ConnectionCache;
pub use config::{ConnectionSettings, DiscoverySettings, DriverConfig, ReconnectSettings};
pub use device::{BtleplugLink, ConnectionConfig};
pub use discovery::{Discoverer, DiscoveryOptions, hue_candidates};
pub use driver::{ApplyReport, Driver};
pub use error::{ConnectionFailureReason, LightNotFoundReason, Error, ErrorKind, Result};
pub use mock::{MockLight, MockLightBuilder, MockTransport};
pub use reconnect::ReconnectPolicy;
pub use scan::{BtleplugTransport, get_adapter};
pub use session::{LightSession, Outcome};
pub use transport::{Advertisement, BleTransport, LightLink};
pub use util::{addresses_match, create_identifier, format_peripheral_id, normalize_address};

// Re-export from types crate
pub use huebl_types::{
    BrightnessValue, Capability, CapabilitySet, ColorMode, CommandEntry, LightCommand,
    LightDescriptor, LightState, PROTOCOL_NAME, ParseError,
};
