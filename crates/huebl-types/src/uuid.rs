//! Bluetooth UUIDs for Hue Bluetooth lights.
//!
//! This module contains all the UUIDs needed to discover and drive
//! Hue Bluetooth lights over Bluetooth Low Energy.

use uuid::{Uuid, uuid};

// --- Advertisement ---

/// Service UUID advertised by every light of the family.
///
/// Discovery only considers advertisements carrying this UUID.
pub const HUE_BLE_SERVICE: Uuid = uuid!("0000fe0f-0000-1000-8000-00805f9b34fb");

// --- Light control service ---

/// Light control service.
pub const LIGHT_CONTROL_SERVICE: Uuid = uuid!("932c32bd-0000-47a2-835a-a8d455b859dd");

/// Power state characteristic (`0x00` off, `0x01` on).
pub const POWER: Uuid = uuid!("932c32bd-0002-47a2-835a-a8d455b859dd");

/// Brightness characteristic (`0x01`..=`0xFE`).
pub const BRIGHTNESS: Uuid = uuid!("932c32bd-0003-47a2-835a-a8d455b859dd");

/// Color temperature characteristic. Only its presence is used.
pub const TEMPERATURE: Uuid = uuid!("932c32bd-0004-47a2-835a-a8d455b859dd");

/// CIE xy color characteristic (two little-endian `u16`).
pub const COLOR_XY: Uuid = uuid!("932c32bd-0005-47a2-835a-a8d455b859dd");

// --- Light configuration service ---

/// User-assigned light name.
pub const LIGHT_NAME: Uuid = uuid!("97fe6561-0003-4f62-86e9-b71ee2da3d22");

// --- Standard BLE Service UUIDs ---

/// Device Information service.
pub const DEVICE_INFO_SERVICE: Uuid = uuid!("0000180a-0000-1000-8000-00805f9b34fb");

/// Model number string characteristic.
pub const MODEL_NUMBER: Uuid = uuid!("00002a24-0000-1000-8000-00805f9b34fb");

/// Manufacturer name string characteristic.
pub const MANUFACTURER_NAME: Uuid = uuid!("00002a29-0000-1000-8000-00805f9b34fb");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hue_ble_service_uuid() {
        assert_eq!(
            HUE_BLE_SERVICE.to_string(),
            "0000fe0f-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_light_control_uuids_share_base() {
        // All control characteristics live under the 932c32bd base
        for uuid in [LIGHT_CONTROL_SERVICE, POWER, BRIGHTNESS, TEMPERATURE, COLOR_XY] {
            let s = uuid.to_string();
            assert!(s.starts_with("932c32bd-"), "{s}");
            assert!(s.ends_with("-47a2-835a-a8d455b859dd"), "{s}");
        }
    }

    #[test]
    fn test_control_characteristics_are_distinct() {
        let all = [POWER, BRIGHTNESS, TEMPERATURE, COLOR_XY, LIGHT_NAME, MODEL_NUMBER];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_standard_uuids() {
        assert_eq!(
            MODEL_NUMBER.to_string(),
            "00002a24-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            MANUFACTURER_NAME.to_string(),
            "00002a29-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            DEVICE_INFO_SERVICE.to_string(),
            "0000180a-0000-1000-8000-00805f9b34fb"
        );
    }
}
