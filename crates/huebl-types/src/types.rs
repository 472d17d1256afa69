//! Core types shared between the driver and the bridge.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::uuid as uuids;

/// Protocol name the bridge registry uses for these lights.
pub const PROTOCOL_NAME: &str = "hue_bl";

/// Highest value of the bridge's integer brightness scale (1–254).
pub const BRI_SCALE_MAX: u8 = 254;

/// An optional light feature backed by a GATT characteristic.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new capabilities
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum Capability {
    /// On/off control.
    Power,
    /// Dimming.
    Brightness,
    /// CIE xy color.
    ColorXy,
    /// Color temperature (white ambiance).
    ColorTemperature,
}

impl Capability {
    /// The characteristic whose presence grants this capability.
    #[must_use]
    pub fn characteristic(self) -> ::uuid::Uuid {
        match self {
            Capability::Power => uuids::POWER,
            Capability::Brightness => uuids::BRIGHTNESS,
            Capability::ColorXy => uuids::COLOR_XY,
            Capability::ColorTemperature => uuids::TEMPERATURE,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Power => write!(f, "power"),
            Capability::Brightness => write!(f, "brightness"),
            Capability::ColorXy => write!(f, "color xy"),
            Capability::ColorTemperature => write!(f, "color temperature"),
        }
    }
}

/// Color mode reported in [`LightState::colormode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ColorMode {
    /// CIE xy color.
    Xy,
    /// Color temperature.
    Ct,
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::Xy => write!(f, "xy"),
            ColorMode::Ct => write!(f, "ct"),
        }
    }
}

/// Optional features a connected light exposes.
///
/// Always derived from the live characteristic table; never stored across
/// reconnects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CapabilitySet {
    /// Color xy characteristic present.
    pub color_xy: bool,
    /// Color temperature characteristic present.
    pub color_temperature: bool,
    /// Brightness characteristic present.
    pub brightness: bool,
}

impl CapabilitySet {
    /// Check a single capability. Power is assumed on every light.
    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Power => true,
            Capability::Brightness => self.brightness,
            Capability::ColorXy => self.color_xy,
            Capability::ColorTemperature => self.color_temperature,
        }
    }

    /// Highest-ranked color mode: xy, then ct, then none (brightness only).
    #[must_use]
    pub fn color_mode(&self) -> Option<ColorMode> {
        if self.color_xy {
            Some(ColorMode::Xy)
        } else if self.color_temperature {
            Some(ColorMode::Ct)
        } else {
            None
        }
    }
}

/// Brightness as received in a light command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BrightnessValue {
    /// Bridge scale, 1–254.
    Level(u8),
    /// Normalized fraction, 0.0–1.0.
    Fraction(f64),
}

impl BrightnessValue {
    /// Normalize to a 0.0–1.0 fraction.
    ///
    /// Levels are divided by 254, so `Level(128)` is about 0.504.
    #[must_use]
    pub fn fraction(self) -> f64 {
        match self {
            BrightnessValue::Level(level) => {
                f64::from(level.min(BRI_SCALE_MAX)) / f64::from(BRI_SCALE_MAX)
            }
            BrightnessValue::Fraction(f) if f.is_nan() => 0.0,
            BrightnessValue::Fraction(f) => f.clamp(0.0, 1.0),
        }
    }
}

/// One recognized key of a light command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandEntry {
    /// `on`: switch the light on or off.
    Power(bool),
    /// `bri`: set brightness.
    Brightness(BrightnessValue),
    /// `xy`: set CIE xy color.
    ColorXy([f64; 2]),
}

impl CommandEntry {
    /// Command key as the bridge spells it.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            CommandEntry::Power(_) => "on",
            CommandEntry::Brightness(_) => "bri",
            CommandEntry::ColorXy(_) => "xy",
        }
    }

    /// Capability needed to apply this entry.
    #[must_use]
    pub fn capability(&self) -> Capability {
        match self {
            CommandEntry::Power(_) => Capability::Power,
            CommandEntry::Brightness(_) => Capability::Brightness,
            CommandEntry::ColorXy(_) => Capability::ColorXy,
        }
    }
}

/// An ordered set of light changes.
///
/// Entries keep the order in which they were received; the driver writes
/// them in that order. When deserialized from a JSON object, unrecognized
/// keys are skipped.
///
/// # Example
///
/// ```
/// use huebl_types::LightCommand;
///
/// let command = LightCommand::new().on(true).bri(128);
/// assert_eq!(command.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightCommand {
    entries: Vec<CommandEntry>,
}

impl LightCommand {
    /// Create an empty command.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a power entry.
    #[must_use]
    pub fn on(mut self, on: bool) -> Self {
        self.entries.push(CommandEntry::Power(on));
        self
    }

    /// Append a brightness entry on the 1–254 scale.
    #[must_use]
    pub fn bri(mut self, level: u8) -> Self {
        self.entries
            .push(CommandEntry::Brightness(BrightnessValue::Level(level)));
        self
    }

    /// Append a brightness entry as a 0.0–1.0 fraction.
    #[must_use]
    pub fn bri_fraction(mut self, fraction: f64) -> Self {
        self.entries
            .push(CommandEntry::Brightness(BrightnessValue::Fraction(fraction)));
        self
    }

    /// Append a color entry.
    #[must_use]
    pub fn xy(mut self, x: f64, y: f64) -> Self {
        self.entries.push(CommandEntry::ColorXy([x, y]));
        self
    }

    /// Append an arbitrary entry.
    pub fn push(&mut self, entry: CommandEntry) {
        self.entries.push(entry);
    }

    /// Entries in application order.
    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    /// Iterate entries in application order.
    pub fn iter(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.iter()
    }

    /// Number of recognized entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the command carries no recognized entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<CommandEntry> for LightCommand {
    fn from_iter<I: IntoIterator<Item = CommandEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Light state as reported to the bridge.
///
/// Absent fields are omitted when serialized, so an unreachable light
/// serializes to exactly `{"reachable": false}`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LightState {
    /// Whether the light could be reached.
    pub reachable: bool,
    /// Power state.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub on: Option<bool>,
    /// CIE xy color.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub xy: Option<[f64; 2]>,
    /// Highest supported color mode.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub colormode: Option<ColorMode>,
    /// Brightness fraction, only for lights without any color mode.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub bri: Option<f64>,
}

impl LightState {
    /// The state reported when every attempt to reach the light failed.
    #[must_use]
    pub fn unreachable() -> Self {
        Self::default()
    }

    /// An empty reachable state, to be filled in by the reader.
    #[must_use]
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            ..Self::default()
        }
    }
}

/// Protocol-specific part of a [`LightDescriptor`].
///
/// `ip` is a historical field name: it carries the BLE address.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProtocolConfig {
    /// BLE address.
    pub ip: String,
    /// Model number read from the light.
    pub modelid: String,
    /// BLE address.
    pub id: String,
    /// BLE address.
    pub uniqueid: String,
}

/// A light as registered with the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LightDescriptor {
    /// Always [`PROTOCOL_NAME`].
    pub protocol: String,
    /// Light name.
    pub name: String,
    /// Model number.
    pub modelid: String,
    /// Addressing information.
    pub protocol_cfg: ProtocolConfig,
}

impl LightDescriptor {
    /// Build the descriptor for a light at `address`.
    pub fn new(address: &str, name: &str, model: &str) -> Self {
        Self {
            protocol: PROTOCOL_NAME.to_string(),
            name: name.to_string(),
            modelid: model.to_string(),
            protocol_cfg: ProtocolConfig {
                ip: address.to_string(),
                modelid: model.to_string(),
                id: address.to_string(),
                uniqueid: address.to_string(),
            },
        }
    }

    /// BLE address of the light.
    pub fn address(&self) -> &str {
        &self.protocol_cfg.ip
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use core::fmt;

    use serde::de::{self, IgnoredAny, MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{BRI_SCALE_MAX, BrightnessValue, CommandEntry, LightCommand};

    impl Serialize for BrightnessValue {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                BrightnessValue::Level(level) => serializer.serialize_u8(*level),
                BrightnessValue::Fraction(f) => serializer.serialize_f64(*f),
            }
        }
    }

    struct BrightnessVisitor;

    impl Visitor<'_> for BrightnessVisitor {
        type Value = BrightnessValue;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integer 1-254 or a fraction 0.0-1.0")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(BrightnessValue::Level(v.min(u64::from(BRI_SCALE_MAX)) as u8))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(BrightnessValue::Level(v.clamp(0, i64::from(BRI_SCALE_MAX)) as u8))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            if v.is_nan() {
                return Err(E::custom("brightness cannot be NaN"));
            }
            // Floats above 1.0 are levels written with a decimal point
            if v > 1.0 {
                Ok(BrightnessValue::Level(v.round().min(f64::from(BRI_SCALE_MAX)) as u8))
            } else {
                Ok(BrightnessValue::Fraction(v.max(0.0)))
            }
        }
    }

    impl<'de> Deserialize<'de> for BrightnessValue {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(BrightnessVisitor)
        }
    }

    impl Serialize for LightCommand {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(self.entries.len()))?;
            for entry in &self.entries {
                match entry {
                    CommandEntry::Power(on) => map.serialize_entry("on", on)?,
                    CommandEntry::Brightness(bri) => map.serialize_entry("bri", bri)?,
                    CommandEntry::ColorXy(xy) => map.serialize_entry("xy", xy)?,
                }
            }
            map.end()
        }
    }

    struct CommandVisitor;

    impl<'de> Visitor<'de> for CommandVisitor {
        type Value = LightCommand;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a light command object")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut command = LightCommand::new();
            while let Some(key) = map.next_key::<String>()? {
                match key.as_str() {
                    "on" => command.push(CommandEntry::Power(map.next_value()?)),
                    "bri" => command.push(CommandEntry::Brightness(map.next_value()?)),
                    "xy" => command.push(CommandEntry::ColorXy(map.next_value()?)),
                    _ => {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
            }
            Ok(command)
        }
    }

    impl<'de> Deserialize<'de> for LightCommand {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_map(CommandVisitor)
        }
    }
}


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn test_command_from_json_preserves_order() {
        let command: LightCommand = serde_json::from_str(r#"{"on": true, "bri": 128}"#).unwrap();
        assert_eq!(
            command.entries(),
            &[
                CommandEntry::Power(true),
                CommandEntry::Brightness(BrightnessValue::Level(128)),
            ]
        );

        let command: LightCommand = serde_json::from_str(r#"{"bri": 1, "on": false}"#).unwrap();
        let keys: Vec<_> = command.iter().map(CommandEntry::key).collect();
        assert_eq!(keys, ["bri", "on"]);
    }

    #[test]
    fn test_command_ignores_unknown_keys() {
        let command: LightCommand =
            serde_json::from_str(r#"{"transitiontime": 4, "xy": [0.3127, 0.329], "alert": "none"}"#)
                .unwrap();
        assert_eq!(command.entries(), &[CommandEntry::ColorXy([0.3127, 0.329])]);
    }

    #[test]
    fn test_command_brightness_forms() {
        let command: LightCommand = serde_json::from_str(r#"{"bri": 0.25}"#).unwrap();
        assert_eq!(
            command.entries(),
            &[CommandEntry::Brightness(BrightnessValue::Fraction(0.25))]
        );

        let command: LightCommand = serde_json::from_str(r#"{"bri": 200.0}"#).unwrap();
        assert_eq!(
            command.entries(),
            &[CommandEntry::Brightness(BrightnessValue::Level(200))]
        );

        let command: LightCommand = serde_json::from_str(r#"{"bri": 999}"#).unwrap();
        assert_eq!(
            command.entries(),
            &[CommandEntry::Brightness(BrightnessValue::Level(254))]
        );
    }

    #[test]
    fn test_command_rejects_bad_types() {
        assert!(serde_json::from_str::<LightCommand>(r#"{"on": "yes"}"#).is_err());
        assert!(serde_json::from_str::<LightCommand>(r#"{"xy": [0.1]}"#).is_err());
    }

    #[test]
    fn test_command_serializes_in_order() {
        let command = LightCommand::new().xy(0.5, 0.25).on(true);
        let json = serde_json::to_string(&command).unwrap();
        assert_eq!(json, r#"{"xy":[0.5,0.25],"on":true}"#);
    }

    #[test]
    fn test_unreachable_state_json() {
        let json = serde_json::to_value(LightState::unreachable()).unwrap();
        assert_eq!(json, serde_json::json!({"reachable": false}));
    }

    #[test]
    fn test_state_json_omits_absent_fields() {
        let state = LightState {
            on: Some(true),
            bri: Some(0.5),
            ..LightState::reachable()
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json, serde_json::json!({"reachable": true, "on": true, "bri": 0.5}));
    }

    #[test]
    fn test_colormode_json() {
        let state = LightState {
            on: Some(false),
            xy: Some([0.5, 0.5]),
            colormode: Some(ColorMode::Xy),
            ..LightState::reachable()
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["colormode"], "xy");
    }

    #[test]
    fn test_descriptor_json_shape() {
        let d = LightDescriptor::new("AA:BB:CC:DD:EE:FF", "Desk", "LCA001");
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "protocol": "hue_bl",
                "name": "Desk",
                "modelid": "LCA001",
                "protocol_cfg": {
                    "ip": "AA:BB:CC:DD:EE:FF",
                    "modelid": "LCA001",
                    "id": "AA:BB:CC:DD:EE:FF",
                    "uniqueid": "AA:BB:CC:DD:EE:FF"
                }
            })
        );
    }
}
