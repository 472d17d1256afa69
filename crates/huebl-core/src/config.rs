//! Driver configuration.
//!
//! [`DriverConfig`] is the serializable form of every driver setting, with
//! durations as whole seconds or milliseconds so it reads well in a TOML
//! file. It converts into the runtime types: [`ConnectionConfig`],
//! [`DiscoveryOptions`] and [`ReconnectPolicy`].
//!
//! ```toml
//! [connection]
//! connect_timeout_secs = 15
//! connect_attempts = 3
//!
//! [discovery]
//! scan_duration_secs = 5
//! deadline_secs = 30
//!
//! [reconnect]
//! max_retries = 1
//! retry_delay_ms = 0
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device::ConnectionConfig;
use crate::discovery::DiscoveryOptions;
use crate::error::{Error, Result};
use crate::reconnect::ReconnectPolicy;

/// All driver settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Link settings.
    pub connection: ConnectionSettings,
    /// Discovery settings.
    pub discovery: DiscoverySettings,
    /// Retry settings.
    pub reconnect: ReconnectSettings,
}

/// Serializable [`ConnectionConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Timeout for one connection attempt, in seconds.
    pub connect_timeout_secs: u64,
    /// Read timeout, in seconds.
    pub read_timeout_secs: u64,
    /// Write timeout, in seconds.
    pub write_timeout_secs: u64,
    /// Service discovery timeout, in seconds.
    pub discovery_timeout_secs: u64,
    /// Scan time used to locate unknown lights, in seconds.
    pub find_timeout_secs: u64,
    /// Connect attempts per connect.
    pub connect_attempts: u32,
    /// Pause between connect attempts, in milliseconds.
    pub attempt_delay_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from(&ConnectionConfig::default())
    }
}

impl From<&ConnectionConfig> for ConnectionSettings {
    fn from(config: &ConnectionConfig) -> Self {
        Self {
            connect_timeout_secs: config.connection_timeout.as_secs(),
            read_timeout_secs: config.read_timeout.as_secs(),
            write_timeout_secs: config.write_timeout.as_secs(),
            discovery_timeout_secs: config.discovery_timeout.as_secs(),
            find_timeout_secs: config.find_timeout.as_secs(),
            connect_attempts: config.connect_attempts,
            attempt_delay_ms: config.attempt_delay.as_millis() as u64,
        }
    }
}

impl From<&ConnectionSettings> for ConnectionConfig {
    fn from(settings: &ConnectionSettings) -> Self {
        ConnectionConfig::new()
            .connection_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .read_timeout(Duration::from_secs(settings.read_timeout_secs))
            .write_timeout(Duration::from_secs(settings.write_timeout_secs))
            .discovery_timeout(Duration::from_secs(settings.discovery_timeout_secs))
            .find_timeout(Duration::from_secs(settings.find_timeout_secs))
            .connect_attempts(settings.connect_attempts)
            .attempt_delay(Duration::from_millis(settings.attempt_delay_ms))
    }
}

/// Serializable [`DiscoveryOptions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Scan duration, in seconds.
    pub scan_duration_secs: u64,
    /// Overall discovery deadline, in seconds.
    pub deadline_secs: u64,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        let options = DiscoveryOptions::default();
        Self {
            scan_duration_secs: options.scan_duration.as_secs(),
            deadline_secs: options.deadline.as_secs(),
        }
    }
}

/// Serializable [`ReconnectPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    /// Retries after a transport failure.
    pub max_retries: u32,
    /// Pause before each retry, in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        let policy = ReconnectPolicy::default();
        Self {
            max_retries: policy.max_retries,
            retry_delay_ms: policy.retry_delay.as_millis() as u64,
        }
    }
}

impl DriverConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the scan duration.
    #[must_use]
    pub fn scan_duration(mut self, duration: Duration) -> Self {
        self.discovery.scan_duration_secs = duration.as_secs();
        self
    }

    /// Override the discovery deadline.
    #[must_use]
    pub fn discovery_deadline(mut self, deadline: Duration) -> Self {
        self.discovery.deadline_secs = deadline.as_secs();
        self
    }

    /// Override the number of retries.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.reconnect.max_retries = retries;
        self
    }

    /// Runtime link settings.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::from(&self.connection)
    }

    /// Runtime discovery options.
    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions::new()
            .scan_duration(Duration::from_secs(self.discovery.scan_duration_secs))
            .deadline(Duration::from_secs(self.discovery.deadline_secs))
    }

    /// Runtime retry policy.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new()
            .max_retries(self.reconnect.max_retries)
            .retry_delay(Duration::from_millis(self.reconnect.retry_delay_ms))
    }

    /// Validate every section, reporting all problems at once.
    pub fn validate(&self) -> Result<()> {
        let problems: Vec<String> = [
            ("connection", self.connection_config().validate()),
            ("discovery", self.discovery_options().validate()),
            ("reconnect", self.reconnect_policy().validate()),
        ]
        .into_iter()
        .filter_map(|(section, result)| match result {
            Err(Error::InvalidConfig(message)) => Some(format!("{section}: {message}")),
            Err(other) => Some(format!("{section}: {other}")),
            Ok(()) => None,
        })
        .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfig(problems.join("; ")))
        }
    }
}
