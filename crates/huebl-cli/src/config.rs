//! Configuration file management.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use huebl_core::DriverConfig;
use serde::{Deserialize, Serialize};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default light address or alias
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<String>,

    /// Light aliases (friendly name -> light address)
    pub aliases: BTreeMap<String, String>,

    /// Driver settings (`[connection]`, `[discovery]`, `[reconnect]`)
    #[serde(flatten)]
    pub driver: DriverConfig,
}

impl Config {
    /// Default config file location
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("huebl")
            .join("config.toml")
    }

    /// Load config from `path`.
    ///
    /// A missing file yields the defaults unless `required` is set, as it is
    /// for a path given on the command line. An unreadable default file is
    /// reported and ignored.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        if !path.exists() {
            if required {
                bail!("Config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }

        match Self::read(path) {
            Ok(config) => Ok(config),
            Err(e) if !required => {
                tracing::warn!("Ignoring config file: {:#}", e);
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config
            .driver
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    /// Save config to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Resolve the light to use from the argument or the default, then
    /// through the alias table.
    pub fn resolve_light(&self, light: Option<String>) -> Result<String> {
        let Some(light) = light.or_else(|| self.light.clone()) else {
            bail!(
                "No light specified. Pass an address or alias, set HUEBL_LIGHT, \
                 or set `light` in {}",
                Self::path().display()
            );
        };
        Ok(self.aliases.get(&light).cloned().unwrap_or(light))
    }

    /// Driver settings with the scan duration overridden from the command line.
    ///
    /// The deadline moves with the scan so the time left for connecting
    /// stays what the config file allows.
    pub fn driver_config(&self, scan_secs: Option<u64>) -> Result<DriverConfig> {
        let mut driver = self.driver.clone();
        if let Some(secs) = scan_secs {
            let connect_budget = driver
                .discovery
                .deadline_secs
                .saturating_sub(driver.discovery.scan_duration_secs);
            driver = driver
                .scan_duration(Duration::from_secs(secs))
                .discovery_deadline(Duration::from_secs(secs.saturating_add(connect_budget)));
        }
        driver.validate().context("Invalid driver settings")?;
        Ok(driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_default_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("config.toml"), false).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load(&dir.path().join("config.toml"), true).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config {
            light: Some("kitchen".to_string()),
            driver: DriverConfig::new().max_retries(2),
            ..Default::default()
        };
        config
            .aliases
            .insert("kitchen".to_string(), "C4:29:96:12:34:56".to_string());
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path, true).unwrap(), config);
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "light = \"desk\"\n\n[discovery]\nscan_duration_secs = 12\ndeadline_secs = 40\n",
        )
        .unwrap();

        let config = Config::load(&path, true).unwrap();
        assert_eq!(config.light.as_deref(), Some("desk"));
        assert_eq!(config.driver.discovery.scan_duration_secs, 12);
        assert_eq!(config.driver.discovery.deadline_secs, 40);
        assert_eq!(config.driver.reconnect, DriverConfig::default().reconnect);
        assert!(config.aliases.is_empty());
    }

    #[test]
    fn test_invalid_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[reconnect]\nmax_retries = 100\n").unwrap();
        assert!(Config::load(&path, true).is_err());

        fs::write(&path, "light = [").unwrap();
        assert!(Config::load(&path, true).is_err());
    }

    #[test]
    fn test_broken_default_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "light = [").unwrap();
        assert_eq!(Config::load(&path, false).unwrap(), Config::default());
    }

    #[test]
    fn test_resolve_light() {
        let mut config = Config {
            light: Some("kitchen".to_string()),
            ..Default::default()
        };
        config
            .aliases
            .insert("kitchen".to_string(), "C4:29:96:12:34:56".to_string());

        assert_eq!(config.resolve_light(None).unwrap(), "C4:29:96:12:34:56");
        assert_eq!(
            config
                .resolve_light(Some("AA:BB:CC:DD:EE:FF".to_string()))
                .unwrap(),
            "AA:BB:CC:DD:EE:FF"
        );
        assert!(Config::default().resolve_light(None).is_err());
    }

    #[test]
    fn test_scan_override_keeps_connect_budget() {
        let config = Config::default();
        let defaults = DriverConfig::default().discovery;
        let budget = defaults.deadline_secs - defaults.scan_duration_secs;

        for secs in [2, 30, 60] {
            let driver = config.driver_config(Some(secs)).unwrap();
            assert_eq!(driver.discovery.scan_duration_secs, secs);
            assert_eq!(driver.discovery.deadline_secs, secs + budget);
        }

        assert!(config.driver_config(Some(0)).is_err());
    }

    #[test]
    fn test_scan_override_without_connect_budget_is_rejected() {
        let mut config = Config::default();
        config.driver.discovery.scan_duration_secs = 10;
        config.driver.discovery.deadline_secs = 10;
        assert!(config.driver_config(Some(30)).is_err());
    }
}
