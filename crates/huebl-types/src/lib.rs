//! Platform-agnostic types for Hue Bluetooth lights.
//!
//! This crate provides the pieces of the driver that do not touch the
//! radio, so they can be shared with bridge code and tested without
//! Bluetooth hardware.
//!
//! # Features
//!
//! - Characteristic UUID constants
//! - Bit-exact characteristic codec (power, brightness, color xy, strings)
//! - Light command, light state, and descriptor types with bridge-compatible
//!   JSON shapes (behind the default `serde` feature)
//! - Error types for payload decoding
//!
//! # Example
//!
//! ```
//! use huebl_types::codec;
//!
//! let bytes = codec::encode_xy(0.3127, 0.3290);
//! let [x, y] = codec::decode_xy(&bytes).unwrap();
//! assert!((x - 0.3127).abs() < 1e-4);
//! assert!((y - 0.3290).abs() < 1e-4);
//! ```

pub mod codec;
pub mod error;
pub mod types;
pub mod uuid;

pub use error::{ParseError, ParseResult};
pub use types::{
    BRI_SCALE_MAX, BrightnessValue, Capability, CapabilitySet, ColorMode, CommandEntry,
    LightCommand, LightDescriptor, LightState, PROTOCOL_NAME, ProtocolConfig,
};
pub use uuid as uuids;
