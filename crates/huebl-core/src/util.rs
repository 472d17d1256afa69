//! Address helpers.
//!
//! Lights are keyed by address everywhere: in the connection cache, in
//! descriptors, and when resolving a peripheral. On macOS the stack hides
//! MAC addresses and reports `00:00:00:00:00:00`, so the peripheral ID is
//! used instead.

use btleplug::platform::PeripheralId;

/// Address reported by macOS for every peripheral.
pub const ZERO_ADDRESS: &str = "00:00:00:00:00:00";

/// Format a peripheral ID as a string.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Pick the address to key a light by: the MAC address, or the peripheral
/// ID where the platform hides MAC addresses.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    if address == ZERO_ADDRESS {
        format_peripheral_id(peripheral_id)
    } else {
        address.to_string()
    }
}

/// Canonical form of an address: lowercase, separators removed.
///
/// `AA:BB:CC:DD:EE:FF`, `aa-bb-cc-dd-ee-ff` and `aabbccddeeff` all
/// normalize to the same string.
pub fn normalize_address(address: &str) -> String {
    address
        .chars()
        .filter(|c| !matches!(c, ':' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether two addresses name the same light.
pub fn addresses_match(a: &str, b: &str) -> bool {
    normalize_address(a) == normalize_address(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("AA:BB:CC:DD:EE:FF"), "aabbccddeeff");
        assert_eq!(normalize_address("aa-bb-cc-dd-ee-ff"), "aabbccddeeff");
        assert_eq!(normalize_address("AABBCCDDEEFF"), "aabbccddeeff");
    }

    #[test]
    fn test_addresses_match() {
        assert!(addresses_match("AA:BB:CC:DD:EE:FF", "aa:bb:cc:dd:ee:ff"));
        assert!(addresses_match("AA:BB:CC:DD:EE:FF", "aabbccddeeff"));
        assert!(!addresses_match("AA:BB:CC:DD:EE:FF", "AA:BB:CC:DD:EE:00"));
    }

    #[test]
    fn test_macos_uuid_addresses_match() {
        let id = "6B0B1F5C-2D2F-4C47-9E0F-6A7A4E4B1D11";
        assert!(addresses_match(id, &id.to_lowercase()));
    }
}
