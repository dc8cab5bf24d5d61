//! Configuration management for the parkd daemon.
//!
//! Handles loading, parsing, and validation of the YAML configuration file
//! that defines the slot set, the sensor backend, the HTTP endpoint and the
//! status display.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    env,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::sync::RwLock;

use crate::slots::SlotId;

/// Upper bound on the number of slots a single unit serves.
pub const MAX_SLOTS: usize = 4;

/// Main configuration structure for the parkd daemon.
///
/// # Example
///
/// ```yaml
/// version: 1
/// sensor_timeout_ms: 500
/// slots:
///   - id: Slot1
///     pin: 17
///   - id: Slot2
///     pin: 18
/// sensor:
///   kind: sysfs-gpio
///   base_path: /sys/class/gpio
///   active_low: true
/// server:
///   host: 0.0.0.0
///   port: 80
/// display:
///   enabled: true
///   url: http://localhost/data
///   poll_interval_ms: 5000
///   fetch_timeout_ms: 2000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version for compatibility checking.
    pub version: u8,

    /// Upper bound for a single sensor read, in milliseconds.
    #[serde(default = "defaults::sensor_timeout_ms")]
    pub sensor_timeout_ms: u64,

    /// Slots served by this unit, in display order.
    #[serde(default = "defaults::slots")]
    pub slots: Vec<SlotCfg>,

    /// Presence sensor backend.
    #[serde(default)]
    pub sensor: SensorCfg,

    /// HTTP endpoint of the state service.
    #[serde(default)]
    pub server: ServerCfg,

    /// Status display polling settings.
    #[serde(default)]
    pub display: DisplayCfg,
}

/// A single parking slot and the GPIO line its sensor is wired to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotCfg {
    /// Slot identifier as exposed over HTTP (e.g. "Slot1").
    pub id: String,

    /// BCM GPIO number of the presence sensor.
    #[serde(default)]
    pub pin: Option<u32>,
}

/// Presence sensor backend variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SensorCfg {
    /// GPIO lines exported through the Linux sysfs interface.
    SysfsGpio {
        /// Root of the exported GPIO tree.
        #[serde(default = "defaults::gpio_base_path")]
        base_path: PathBuf,

        /// Treat a low line as "occupied" (pull-up wiring).
        #[serde(default = "defaults::active_low")]
        active_low: bool,
    },
    /// Static readings, for bench setups without hardware.
    Fixed {
        /// Per-slot readings; slots not listed read as unoccupied.
        #[serde(default)]
        values: BTreeMap<String, bool>,
    },
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self::SysfsGpio {
            base_path: defaults::gpio_base_path(),
            active_low: defaults::active_low(),
        }
    }
}

/// Listening address of the state service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCfg {
    #[serde(default = "defaults::host")]
    pub host: String,

    #[serde(default = "defaults::port")]
    pub port: u16,
}

impl Default for ServerCfg {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
        }
    }
}

/// Status display polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayCfg {
    /// Run the display alongside the server in `serve` mode.
    #[serde(default = "defaults::display_enabled")]
    pub enabled: bool,

    /// State endpoint polled in `display` mode.
    #[serde(default = "defaults::display_url")]
    pub url: String,

    /// Delay between two polls, in milliseconds.
    #[serde(default = "defaults::poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound for a single poll, in milliseconds.
    #[serde(default = "defaults::fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

impl Default for DisplayCfg {
    fn default() -> Self {
        Self {
            enabled: defaults::display_enabled(),
            url: defaults::display_url(),
            poll_interval_ms: defaults::poll_interval_ms(),
            fetch_timeout_ms: defaults::fetch_timeout_ms(),
        }
    }
}

impl DisplayCfg {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            sensor_timeout_ms: defaults::sensor_timeout_ms(),
            slots: defaults::slots(),
            sensor: SensorCfg::default(),
            server: ServerCfg::default(),
            display: DisplayCfg::default(),
        }
    }
}

impl Config {
    /// Validates the configuration for consistency.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use parkd::config::Config;
    ///
    /// let config = Config::default();
    /// config.validate()?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.slots.is_empty() || self.slots.len() > MAX_SLOTS {
            anyhow::bail!(
                "Expected between 1 and {} slots, found {}",
                MAX_SLOTS,
                self.slots.len()
            );
        }

        let mut seen = HashSet::new();
        for slot in &self.slots {
            if slot.id.trim().is_empty() {
                anyhow::bail!("Slot identifiers cannot be empty");
            }
            if !seen.insert(slot.id.as_str()) {
                anyhow::bail!("Duplicate slot identifier '{}'", slot.id);
            }
        }

        match &self.sensor {
            SensorCfg::SysfsGpio { .. } => {
                if let Some(slot) = self.slots.iter().find(|s| s.pin.is_none()) {
                    anyhow::bail!("Slot '{}' has no GPIO pin configured", slot.id);
                }
            }
            SensorCfg::Fixed { values } => {
                if let Some(key) = values.keys().find(|k| !seen.contains(k.as_str())) {
                    anyhow::bail!("Fixed sensor value references unknown slot '{}'", key);
                }
            }
        }

        if self.sensor_timeout_ms == 0 {
            anyhow::bail!("sensor_timeout_ms must be greater than zero");
        }
        if self.display.poll_interval_ms == 0 || self.display.fetch_timeout_ms == 0 {
            anyhow::bail!("Display poll interval and fetch timeout must be greater than zero");
        }

        Ok(())
    }

    /// Configured slot identifiers in declaration order.
    pub fn slot_ids(&self) -> Vec<SlotId> {
        self.slots.iter().map(|s| SlotId::from(s.id.as_str())).collect()
    }

    pub fn sensor_timeout(&self) -> Duration {
        Duration::from_millis(self.sensor_timeout_ms)
    }
}

mod defaults {
    use super::SlotCfg;
    use std::path::PathBuf;

    pub fn sensor_timeout_ms() -> u64 {
        500
    }

    /// Four slots wired to BCM 17, 18, 27 and 22.
    pub fn slots() -> Vec<SlotCfg> {
        [17, 18, 27, 22]
            .into_iter()
            .enumerate()
            .map(|(idx, pin)| SlotCfg {
                id: format!("Slot{}", idx + 1),
                pin: Some(pin),
            })
            .collect()
    }

    pub fn gpio_base_path() -> PathBuf {
        PathBuf::from("/sys/class/gpio")
    }

    pub fn active_low() -> bool {
        true
    }

    pub fn host() -> String {
        "0.0.0.0".to_string()
    }

    pub fn port() -> u16 {
        80
    }

    pub fn display_enabled() -> bool {
        true
    }

    pub fn display_url() -> String {
        "http://localhost/data".to_string()
    }

    pub fn poll_interval_ms() -> u64 {
        5000
    }

    pub fn fetch_timeout_ms() -> u64 {
        2000
    }
}

fn locate_config() -> Option<PathBuf> {
    if let Ok(env_path) = env::var("PARKD_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    if let Some(mut cfg_dir) = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| Path::new(&h).join(".config")))
    {
        cfg_dir.push("parkd/config.yml");
        if cfg_dir.exists() {
            return Some(cfg_dir);
        }
    }

    let etc = Path::new("/etc/parkd/config.yml");
    if etc.exists() {
        return Some(etc.to_path_buf());
    }

    None
}

/// Configuration manager that owns the loaded configuration.
///
/// # Example
///
/// ```no_run
/// use parkd::config::ConfigManager;
/// use std::path::PathBuf;
///
/// # async fn example() -> anyhow::Result<()> {
/// // Load from specific path
/// let config_manager = ConfigManager::load(Some(PathBuf::from("config.yml"))).await?;
///
/// // Load from standard locations, falling back to defaults
/// let config_manager = ConfigManager::load(None).await?;
///
/// let port = config_manager.get().await.server.port;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<Config>>,
    path: Option<PathBuf>,
}

impl ConfigManager {
    /// Creates a new ConfigManager with the given config and source path.
    pub fn new(config: Config, path: Option<PathBuf>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            path,
        }
    }

    /// Loads configuration from file or standard locations.
    ///
    /// Searches for configuration in the following order:
    /// 1. Provided path parameter
    /// 2. PARKD_CONFIG environment variable
    /// 3. XDG_CONFIG_HOME/parkd/config.yml or ~/.config/parkd/config.yml
    /// 4. /etc/parkd/config.yml
    ///
    /// Built-in defaults are used when none of them exists.
    pub async fn load(path: Option<PathBuf>) -> Result<Self> {
        let Some(config_path) = path.or_else(locate_config) else {
            warn!("No configuration file found, using built-in defaults");
            let config = Config::default();
            config.validate().context("Built-in configuration is invalid")?;
            return Ok(Self::new(config, None));
        };

        info!("Loading config from: {}", config_path.display());
        let config = Self::load_config_from_path(&config_path).await?;

        Ok(Self::new(config, Some(config_path)))
    }

    /// Gets a read-only reference to the current configuration.
    pub async fn get(&self) -> tokio::sync::RwLockReadGuard<'_, Config> {
        self.config.read().await
    }

    /// Path the configuration was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Clones the current configuration.
    pub async fn clone_config(&self) -> Config {
        self.config.read().await.clone()
    }

    async fn load_config_from_path(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML in: {}", path.display()))?;

        if config.version != 1 {
            anyhow::bail!(
                "Unsupported config version {} in file: {}",
                config.version,
                path.display()
            );
        }

        config
            .validate()
            .with_context(|| format!("Configuration validation failed for: {}", path.display()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    fn fixed_config(ids: &[&str]) -> Config {
        Config {
            slots: ids
                .iter()
                .map(|id| SlotCfg {
                    id: id.to_string(),
                    pin: None,
                })
                .collect(),
            sensor: SensorCfg::Fixed {
                values: BTreeMap::new(),
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn config_load_valid_yaml() {
        let yaml_content = r#"
version: 1
sensor_timeout_ms: 250
slots:
  - id: "Slot1"
    pin: 17
  - id: "Slot2"
    pin: 18
sensor:
  kind: "sysfs-gpio"
  base_path: "/tmp/gpio"
  active_low: false
server:
  host: "127.0.0.1"
  port: 8080
display:
  enabled: false
  url: "http://10.0.0.5/data"
  poll_interval_ms: 1000
  fetch_timeout_ms: 1500
"#;

        let temp_file = create_temp_config(yaml_content);
        let config_manager = ConfigManager::load(Some(temp_file.path().to_path_buf()))
            .await
            .unwrap();
        let config = config_manager.clone_config().await;

        assert_eq!(config.version, 1);
        assert_eq!(config.sensor_timeout(), Duration::from_millis(250));
        assert_eq!(config.slot_ids(), vec![SlotId::from("Slot1"), SlotId::from("Slot2")]);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert!(!config.display.enabled);
        assert_eq!(config.display.url, "http://10.0.0.5/data");
        assert_eq!(config.display.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.display.fetch_timeout(), Duration::from_millis(1500));
        match config.sensor {
            SensorCfg::SysfsGpio { base_path, active_low } => {
                assert_eq!(base_path, PathBuf::from("/tmp/gpio"));
                assert!(!active_low);
            }
            other => panic!("Expected sysfs-gpio sensor, got {other:?}"),
        }
        assert_eq!(config_manager.path(), Some(temp_file.path()));
    }

    #[tokio::test]
    async fn missing_sections_fall_back_to_defaults() {
        let temp_file = create_temp_config("version: 1\n");
        let config = ConfigManager::load(Some(temp_file.path().to_path_buf()))
            .await
            .unwrap()
            .clone_config()
            .await;

        assert_eq!(config.slots.len(), 4);
        assert_eq!(config.slots[3].id, "Slot4");
        assert_eq!(config.slots[3].pin, Some(22));
        assert_eq!(config.server.port, 80);
        assert_eq!(config.display.poll_interval_ms, 5000);
        assert_eq!(config.display.fetch_timeout_ms, 2000);
    }

    #[tokio::test]
    async fn fixed_sensor_values_parse() {
        let yaml_content = r#"
version: 1
slots:
  - id: "Slot1"
  - id: "Slot2"
sensor:
  kind: "fixed"
  values:
    Slot2: true
"#;
        let temp_file = create_temp_config(yaml_content);
        let config = ConfigManager::load(Some(temp_file.path().to_path_buf()))
            .await
            .unwrap()
            .clone_config()
            .await;

        match config.sensor {
            SensorCfg::Fixed { values } => {
                assert_eq!(values, BTreeMap::from([("Slot2".to_string(), true)]));
            }
            other => panic!("Expected fixed sensor, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsupported_version_is_rejected() {
        let temp_file = create_temp_config("version: 2\n");
        let result = ConfigManager::load(Some(temp_file.path().to_path_buf())).await;

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Unsupported config version 2"));
    }

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_too_many_slots() {
        let config = fixed_config(&["A", "B", "C", "D", "E"]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("between 1 and 4"));
    }

    #[test]
    fn validate_rejects_empty_slot_set() {
        assert!(fixed_config(&[]).validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let err = fixed_config(&["Slot1", "Slot1"]).validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate slot identifier 'Slot1'"));
    }

    #[test]
    fn validate_requires_pins_for_gpio() {
        let config = Config {
            sensor: SensorCfg::default(),
            ..fixed_config(&["Slot1"])
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no GPIO pin"));
    }

    #[test]
    fn validate_rejects_fixed_values_for_unknown_slots() {
        let config = Config {
            sensor: SensorCfg::Fixed {
                values: BTreeMap::from([("Slot9".to_string(), true)]),
            },
            ..fixed_config(&["Slot1"])
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Slot9"));
    }

    #[test]
    fn validate_rejects_zero_intervals() {
        let mut config = fixed_config(&["Slot1"]);
        config.display.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = fixed_config(&["Slot1"]);
        config.sensor_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    #[serial]
    async fn env_variable_selects_config_file() {
        let temp_file = create_temp_config(
            "version: 1\nslots:\n  - id: Bay\n    pin: 5\nserver:\n  port: 9090\n",
        );
        // SAFETY: serialized with every other test touching the environment.
        unsafe { env::set_var("PARKD_CONFIG", temp_file.path()) };
        let result = ConfigManager::load(None).await;
        unsafe { env::remove_var("PARKD_CONFIG") };

        let config = result.unwrap().clone_config().await;
        assert_eq!(config.slot_ids(), vec![SlotId::from("Bay")]);
        assert_eq!(config.server.port, 9090);
    }
}
