//! Error types for huebl-core.
//!
//! This module defines all error types that can occur when driving
//! Hue Bluetooth lights.
//!
//! # Error Classes
//!
//! Every [`Error`] belongs to one [`ErrorKind`], which decides how the
//! driver reacts to it:
//!
//! | Kind | Variants | Driver reaction |
//! |------|----------|-----------------|
//! | [`ErrorKind::Transport`] | `Bluetooth`, `NotConnected`, `Timeout`, `ConnectionFailed`, `WriteFailed`, `LightNotFound` | Drop the session, reconnect, retry once |
//! | [`ErrorKind::ProtocolDecode`] | `Decode` | Not retried; logged, state reads report unreachable |
//! | [`ErrorKind::CapabilityUnsupported`] | `Unsupported`, `CharacteristicNotFound` | Skip that command key, keep going |
//! | [`ErrorKind::Configuration`] | `InvalidConfig` | Not retried; fix the configuration |
//!
//! A firmware/protocol mismatch will not fix itself on a fresh connection,
//! which is why decode failures are never retried.

use std::time::Duration;

use thiserror::Error;

use huebl_types::{Capability, ParseError};

/// Errors that can occur when communicating with Hue Bluetooth lights.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Light not found during scan or connection.
    #[error("Light not found: {0}")]
    LightNotFound(LightNotFoundReason),

    /// Operation attempted while not connected to the light.
    #[error("Not connected to light")]
    NotConnected,

    /// The light does not expose the characteristic for this capability.
    #[error("Light does not support {0}")]
    Unsupported(Capability),

    /// Required BLE characteristic not found on the light.
    #[error("Characteristic not found: {uuid} (searched in {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// Characteristic payload could not be decoded.
    #[error("Protocol decode error: {0}")]
    Decode(#[from] ParseError),

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Connection failed with specific reason.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// Address of the light that failed to connect.
        address: Option<String>,
        /// The structured reason for the failure.
        reason: ConnectionFailureReason,
    },

    /// Write was not acknowledged by the light.
    #[error("Write failed to characteristic {uuid}: {reason}")]
    WriteFailed {
        /// The characteristic UUID.
        uuid: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Radio or link failure. Recoverable by reconnecting.
    Transport,
    /// Payload did not match the expected layout.
    ProtocolDecode,
    /// The light lacks the characteristic for the requested feature.
    CapabilityUnsupported,
    /// The caller supplied an invalid configuration.
    Configuration,
}

/// Structured reasons for connection failures.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionFailureReason {
    /// Light is out of range.
    OutOfRange,
    /// Light or platform refused the connection.
    Rejected,
    /// Connection attempt timed out.
    Timeout,
    /// All transport-level connect attempts failed.
    AttemptsExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Why the final attempt failed.
        last: Box<ConnectionFailureReason>,
    },
    /// Generic BLE error.
    BleError(String),
}

impl std::fmt::Display for ConnectionFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "light out of range"),
            Self::Rejected => write!(f, "connection rejected by light"),
            Self::Timeout => write!(f, "connection timed out"),
            Self::AttemptsExhausted { attempts, last } => {
                write!(f, "gave up after {} attempts: {}", attempts, last)
            }
            Self::BleError(msg) => write!(f, "BLE error: {}", msg),
        }
    }
}

impl From<&btleplug::Error> for ConnectionFailureReason {
    fn from(err: &btleplug::Error) -> Self {
        match err {
            btleplug::Error::DeviceNotFound => Self::OutOfRange,
            btleplug::Error::PermissionDenied => Self::Rejected,
            btleplug::Error::TimedOut(_) => Self::Timeout,
            other => Self::BleError(other.to_string()),
        }
    }
}

/// Reason why a light was not found.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum LightNotFoundReason {
    /// No light with this address was seen.
    NotFound { identifier: String },
    /// No Bluetooth adapter available.
    NoAdapter,
}

impl std::fmt::Display for LightNotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { identifier } => write!(f, "light '{}' not found", identifier),
            Self::NoAdapter => write!(f, "no Bluetooth adapter available"),
        }
    }
}

impl Error {
    /// Create a light not found error for a specific address.
    pub fn light_not_found(identifier: impl Into<String>) -> Self {
        Self::LightNotFound(LightNotFoundReason::NotFound {
            identifier: identifier.into(),
        })
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a connection failure with structured reason.
    pub fn connection_failed(address: Option<String>, reason: ConnectionFailureReason) -> Self {
        Self::ConnectionFailed { address, reason }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Decode(_) => ErrorKind::ProtocolDecode,
            Error::Unsupported(_) | Error::CharacteristicNotFound { .. } => {
                ErrorKind::CapabilityUnsupported
            }
            Error::InvalidConfig(_) => ErrorKind::Configuration,
            Error::Bluetooth(_)
            | Error::LightNotFound(_)
            | Error::NotConnected
            | Error::Timeout { .. }
            | Error::ConnectionFailed { .. }
            | Error::WriteFailed { .. } => ErrorKind::Transport,
        }
    }

    /// Whether a fresh connection could make this operation succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}

/// Result type alias using huebl-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::light_not_found("AA:BB:CC:DD:EE:FF");
        assert!(err.to_string().contains("AA:BB:CC:DD:EE:FF"));

        let err = Error::NotConnected;
        assert_eq!(err.to_string(), "Not connected to light");

        let err = Error::Unsupported(Capability::ColorXy);
        assert_eq!(err.to_string(), "Light does not support color xy");

        let err = Error::characteristic_not_found("932c32bd-0005", 3);
        assert!(err.to_string().contains("932c32bd-0005"));
        assert!(err.to_string().contains("3 services"));

        let err = Error::timeout("read power", Duration::from_secs(10));
        assert!(err.to_string().contains("read power"));
        assert!(err.to_string().contains("10s"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::NotConnected.kind(), ErrorKind::Transport);
        assert_eq!(
            Error::timeout("connect", Duration::from_secs(1)).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            Error::Decode(ParseError::invalid_length("power", 1, 0)).kind(),
            ErrorKind::ProtocolDecode
        );
        assert_eq!(
            Error::Unsupported(Capability::Brightness).kind(),
            ErrorKind::CapabilityUnsupported
        );
        assert_eq!(Error::invalid_config("x").kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_only_transport_errors_retry() {
        assert!(Error::NotConnected.is_retryable());
        assert!(
            Error::connection_failed(None, ConnectionFailureReason::OutOfRange).is_retryable()
        );
        assert!(!Error::Decode(ParseError::invalid_length("power", 1, 2)).is_retryable());
        assert!(!Error::Unsupported(Capability::ColorXy).is_retryable());
        assert!(!Error::invalid_config("x").is_retryable());
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = ParseError::invalid_length("color xy", 4, 3).into();
        assert!(matches!(err, Error::Decode(_)));
        assert!(err.to_string().contains("requires 4 bytes"));
    }

    #[test]
    fn test_connection_failure_reasons() {
        let err = Error::connection_failed(
            Some("AA:BB".into()),
            ConnectionFailureReason::AttemptsExhausted {
                attempts: 3,
                last: Box::new(ConnectionFailureReason::Timeout),
            },
        );
        assert!(err.to_string().contains("gave up after 3 attempts: connection timed out"));

        let err = Error::LightNotFound(LightNotFoundReason::NoAdapter);
        assert!(err.to_string().contains("no Bluetooth adapter"));
    }

    #[test]
    fn test_connect_failure_from_btleplug() {
        assert_eq!(
            ConnectionFailureReason::from(&btleplug::Error::DeviceNotFound),
            ConnectionFailureReason::OutOfRange
        );
        assert_eq!(
            ConnectionFailureReason::from(&btleplug::Error::PermissionDenied),
            ConnectionFailureReason::Rejected
        );
        assert_eq!(
            ConnectionFailureReason::from(&btleplug::Error::TimedOut(Duration::from_secs(5))),
            ConnectionFailureReason::Timeout
        );
        assert!(matches!(
            ConnectionFailureReason::from(&btleplug::Error::NotConnected),
            ConnectionFailureReason::BleError(_)
        ));
    }

    #[test]
    fn test_btleplug_error_conversion() {
        fn _assert_from_impl<T: From<btleplug::Error>>() {}
        _assert_from_impl::<Error>();
    }
}
