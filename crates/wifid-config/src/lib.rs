//! Daemon configuration for wifid.
//!
//! `config.toml` from the platform config directory, overlaid with
//! `WIFID_`-prefixed environment variables, and translated into the typed
//! `wifid_core::ManagerConfig` the core consumes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wifid_core::fsm::FsmBitSet;
use wifid_core::{CommitSettings, DaemonSettings, ManagerConfig, ZwdfsSettings};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub commit: CommitSection,

    #[serde(default)]
    pub hostapd: HostapdSection,

    #[serde(default)]
    pub wpa_supplicant: SupplicantSection,

    #[serde(default)]
    pub zwdfs: ZwdfsSection,

    #[serde(default)]
    pub log: LogSection,
}

/// Auto-commit debounce.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommitSection {
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Longer wait applied while the process is still booting.
    #[serde(default = "default_boot_delay_ms")]
    pub boot_delay_ms: u64,

    /// Pending bits below this index never trigger a commit on their own.
    #[serde(default)]
    pub significant_bit: usize,
}

impl Default for CommitSection {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            boot_delay_ms: default_boot_delay_ms(),
            significant_bit: 0,
        }
    }
}

fn default_delay_ms() -> u64 {
    500
}
fn default_boot_delay_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HostapdSection {
    #[serde(default = "default_hostapd_ctrl_dir")]
    pub ctrl_dir: PathBuf,

    /// Where generated `*_hapd.conf` files live.
    #[serde(default = "default_tmp")]
    pub conf_dir: PathBuf,

    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,

    #[serde(default = "default_reply_buffer")]
    pub reply_buffer: usize,

    /// Directory for client-side reply sockets.
    #[serde(default = "default_tmp")]
    pub local_dir: PathBuf,
}

impl Default for HostapdSection {
    fn default() -> Self {
        Self {
            ctrl_dir: default_hostapd_ctrl_dir(),
            conf_dir: default_tmp(),
            reply_timeout_ms: default_reply_timeout_ms(),
            reply_buffer: default_reply_buffer(),
            local_dir: default_tmp(),
        }
    }
}

fn default_hostapd_ctrl_dir() -> PathBuf {
    PathBuf::from("/var/run/hostapd")
}
fn default_tmp() -> PathBuf {
    PathBuf::from("/tmp")
}
fn default_reply_timeout_ms() -> u64 {
    2000
}
fn default_reply_buffer() -> usize {
    4096
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SupplicantSection {
    #[serde(default = "default_supplicant_ctrl_dir")]
    pub ctrl_dir: PathBuf,
}

impl Default for SupplicantSection {
    fn default() -> Self {
        Self {
            ctrl_dir: default_supplicant_ctrl_dir(),
        }
    }
}

fn default_supplicant_ctrl_dir() -> PathBuf {
    PathBuf::from("/var/run/wpa_supplicant")
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ZwdfsSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_base_timeout_secs")]
    pub base_timeout_secs: u64,
}

impl Default for ZwdfsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            base_timeout_secs: default_base_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_base_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogSection {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "warn".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "wifid", "wifid").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("wifid");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then `path` (missing file is fine), then `WIFID_*` variables.
/// Nested keys use `__`: `WIFID_COMMIT__DELAY_MS=250`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("WIFID_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Validate and build the core's runtime configuration.
    pub fn to_manager_config(&self) -> Result<ManagerConfig, ConfigError> {
        if self.commit.delay_ms == 0 {
            return Err(ConfigError::Validation {
                field: "commit.delay_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.commit.significant_bit >= FsmBitSet::CAPACITY {
            return Err(ConfigError::Validation {
                field: "commit.significant_bit".into(),
                reason: format!("must be below {}", FsmBitSet::CAPACITY),
            });
        }
        if self.hostapd.reply_buffer < 64 {
            return Err(ConfigError::Validation {
                field: "hostapd.reply_buffer".into(),
                reason: format!("{} bytes cannot hold a STATUS reply", self.hostapd.reply_buffer),
            });
        }

        let hostapd = DaemonSettings {
            ctrl_dir: self.hostapd.ctrl_dir.clone(),
            local_dir: self.hostapd.local_dir.clone(),
            reply_timeout: Duration::from_millis(self.hostapd.reply_timeout_ms),
            reply_buffer: self.hostapd.reply_buffer,
        };
        let wpa_supplicant = DaemonSettings {
            ctrl_dir: self.wpa_supplicant.ctrl_dir.clone(),
            ..hostapd.clone()
        };

        Ok(ManagerConfig {
            commit: CommitSettings {
                delay: Duration::from_millis(self.commit.delay_ms),
                boot_delay: Duration::from_millis(self.commit.boot_delay_ms),
                significant_bit: self.commit.significant_bit,
            },
            zwdfs: ZwdfsSettings {
                enabled: self.zwdfs.enabled,
                base_timeout: Duration::from_secs(self.zwdfs.base_timeout_secs),
            },
            hostapd,
            wpa_supplicant,
            conf_dir: self.hostapd.conf_dir.clone(),
        })
    }
}
