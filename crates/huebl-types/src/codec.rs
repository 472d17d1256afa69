//! Characteristic payload codec.
//!
//! Bit-exact translation between typed light values and the raw bytes the
//! light's GATT characteristics carry. Everything here is synchronous and
//! allocation-free except the string decoder.
//!
//! | Characteristic | Size | Layout |
//! |----------------|------|--------|
//! | Power | 1 | `0x00` off, anything else on |
//! | Brightness | 1 | `0x01..=0xFE`, fraction = byte / 255 |
//! | Color xy | 4 | `u16 LE x`, `u16 LE y`, coordinate = value / 0xFFFF |
//! | Name / Model | n | ASCII |

use bytes::{Buf, BufMut};

use crate::error::{ParseError, ParseResult};

/// Lowest brightness byte the light accepts.
pub const BRIGHTNESS_MIN: u8 = 1;

/// Highest brightness byte the light accepts.
pub const BRIGHTNESS_MAX: u8 = 254;

/// Divisor mapping a brightness byte to a 0.0–1.0 fraction.
pub const BRIGHTNESS_SCALE: f64 = 255.0;

/// Divisor mapping a color `u16` to a 0.0–1.0 chromaticity coordinate.
pub const XY_SCALE: f64 = 65535.0;

/// Size of the power payload.
pub const POWER_LEN: usize = 1;

/// Size of the brightness payload.
pub const BRIGHTNESS_LEN: usize = 1;

/// Size of the color xy payload.
pub const COLOR_XY_LEN: usize = 4;

fn expect_len(field: &'static str, data: &[u8], expected: usize) -> ParseResult<()> {
    if data.len() != expected {
        return Err(ParseError::invalid_length(field, expected, data.len()));
    }
    Ok(())
}

/// Decode the power characteristic.
pub fn decode_power(data: &[u8]) -> ParseResult<bool> {
    expect_len("power", data, POWER_LEN)?;
    Ok(data[0] != 0)
}

/// Encode the power characteristic.
pub fn encode_power(on: bool) -> [u8; POWER_LEN] {
    [u8::from(on)]
}

/// Decode the brightness characteristic into a 0.0–1.0 fraction.
///
/// The light never reports more than 254, so the upper bound is 254/255.
pub fn decode_brightness(data: &[u8]) -> ParseResult<f64> {
    expect_len("brightness", data, BRIGHTNESS_LEN)?;
    Ok(f64::from(data[0]) / BRIGHTNESS_SCALE)
}

/// Encode a 0.0–1.0 brightness fraction.
///
/// Out-of-range input is clamped to 0.0–1.0 and the result to the light's
/// 1–254 byte range. NaN encodes as the minimum.
pub fn encode_brightness(fraction: f64) -> [u8; BRIGHTNESS_LEN] {
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    let raw = (fraction * BRIGHTNESS_SCALE).round() as u8;
    [raw.clamp(BRIGHTNESS_MIN, BRIGHTNESS_MAX)]
}

/// Decode the color characteristic into CIE `[x, y]`.
pub fn decode_xy(data: &[u8]) -> ParseResult<[f64; 2]> {
    expect_len("color xy", data, COLOR_XY_LEN)?;
    let mut buf = data;
    let x = buf.get_u16_le();
    let y = buf.get_u16_le();
    Ok([f64::from(x) / XY_SCALE, f64::from(y) / XY_SCALE])
}

/// Encode CIE `x`, `y` coordinates.
///
/// Each coordinate is clamped to 0.0–1.0 before scaling.
pub fn encode_xy(x: f64, y: f64) -> [u8; COLOR_XY_LEN] {
    fn scale(coordinate: f64) -> u16 {
        let coordinate = if coordinate.is_nan() {
            0.0
        } else {
            coordinate.clamp(0.0, 1.0)
        };
        (coordinate * XY_SCALE).round() as u16
    }

    let mut out = [0u8; COLOR_XY_LEN];
    let mut buf = &mut out[..];
    buf.put_u16_le(scale(x));
    buf.put_u16_le(scale(y));
    out
}

/// Decode a read-only string characteristic (name, model, manufacturer).
///
/// Decoding is strict ASCII; trailing NUL padding is dropped.
pub fn decode_ascii(field: &'static str, data: &[u8]) -> ParseResult<String> {
    if let Some(offset) = data.iter().position(|b| !b.is_ascii()) {
        return Err(ParseError::NotAscii {
            field,
            byte: data[offset],
            offset,
        });
    }
    // All bytes are ASCII, so this cannot fail.
    let text = String::from_utf8_lossy(data);
    Ok(text.trim_end_matches('\0').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_decode() {
        assert!(!decode_power(&[0x00]).unwrap());
        assert!(decode_power(&[0x01]).unwrap());
        // Anything non-zero reads as on
        assert!(decode_power(&[0x7F]).unwrap());
    }

    #[test]
    fn test_power_encode() {
        assert_eq!(encode_power(true), [0x01]);
        assert_eq!(encode_power(false), [0x00]);
    }

    #[test]
    fn test_power_wrong_length() {
        let err = decode_power(&[]).unwrap_err();
        assert_eq!(err, ParseError::invalid_length("power", 1, 0));
        assert!(decode_power(&[1, 0]).is_err());
    }

    #[test]
    fn test_brightness_decode() {
        assert!((decode_brightness(&[255]).unwrap() - 1.0).abs() < f64::EPSILON);
        assert!((decode_brightness(&[254]).unwrap() - 254.0 / 255.0).abs() < f64::EPSILON);
        assert!((decode_brightness(&[1]).unwrap() - 1.0 / 255.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_brightness_encode_clamps_to_device_range() {
        assert_eq!(encode_brightness(0.0), [1]);
        assert_eq!(encode_brightness(1.0), [254]);
        assert_eq!(encode_brightness(-3.0), [1]);
        assert_eq!(encode_brightness(42.0), [254]);
        assert_eq!(encode_brightness(f64::NAN), [1]);
    }

    #[test]
    fn test_brightness_encode_half() {
        // round(0.5 * 255) = round(127.5) = 128
        assert_eq!(encode_brightness(0.5), [128]);
        // bri 128 on the 1-254 scale
        assert_eq!(encode_brightness(128.0 / 254.0), [129]);
    }

    #[test]
    fn test_brightness_wrong_length() {
        assert!(matches!(
            decode_brightness(&[1, 2]),
            Err(ParseError::InvalidLength { expected: 1, actual: 2, .. })
        ));
    }

    #[test]
    fn test_xy_encode_d65() {
        // D65 white point
        let bytes = encode_xy(0.3127, 0.3290);
        let x = u16::from_le_bytes([bytes[0], bytes[1]]);
        let y = u16::from_le_bytes([bytes[2], bytes[3]]);
        assert_eq!(x, 20493);
        assert_eq!(y, 21561);
    }

    #[test]
    fn test_xy_encode_extremes() {
        assert_eq!(encode_xy(0.0, 0.0), [0, 0, 0, 0]);
        assert_eq!(encode_xy(1.0, 1.0), [0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(encode_xy(-1.0, 2.0), [0, 0, 0xFF, 0xFF]);
    }

    #[test]
    fn test_xy_decode_little_endian() {
        let [x, y] = decode_xy(&[0xFF, 0xFF, 0x00, 0x80]).unwrap();
        assert!((x - 1.0).abs() < f64::EPSILON);
        assert!((y - 32768.0 / 65535.0).abs() < 1e-12);
    }

    #[test]
    fn test_xy_wrong_length() {
        let err = decode_xy(&[0x00, 0x01, 0x02]).unwrap_err();
        assert!(err.to_string().contains("requires 4 bytes"));
    }

    #[test]
    fn test_ascii_decode() {
        assert_eq!(decode_ascii("name", b"Hue color lamp").unwrap(), "Hue color lamp");
        assert_eq!(decode_ascii("model", b"LCA001\0\0").unwrap(), "LCA001");
        assert_eq!(decode_ascii("name", b"").unwrap(), "");
    }

    #[test]
    fn test_ascii_decode_rejects_non_ascii() {
        let err = decode_ascii("name", "Lámpara".as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::NotAscii { offset: 1, .. }));
    }
}
