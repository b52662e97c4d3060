//! Shared helpers for command handlers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use wifid_config::Config;
use wifid_core::conf::{ConfigStore, SectionKey};
use wifid_core::{CoreError, ManagerConfig};
use wifid_ctrl::{CtrlClient, MacAddress};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Configuration ────────────────────────────────────────────────────

/// `--config`, or the platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(wifid_config::config_path)
}

pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(wifid_config::load_config_from(&config_path(global))?)
}

/// Core settings with the connection flags applied on top.
pub fn manager_config(global: &GlobalOpts) -> Result<ManagerConfig, CliError> {
    let mut config = load_config(global)?.to_manager_config()?;
    if let Some(dir) = &global.ctrl_dir {
        config.hostapd.ctrl_dir.clone_from(dir);
    }
    if let Some(ms) = global.timeout_ms {
        config.hostapd.reply_timeout = Duration::from_millis(ms);
    }
    Ok(config)
}

// ── Control socket ───────────────────────────────────────────────────

/// Open a control connection to `iface`, reporting a missing or dead
/// socket as `NotReady`.
pub async fn connect(global: &GlobalOpts, iface: &str) -> Result<CtrlClient, CliError> {
    let settings = manager_config(global)?;
    let ctrl_config = settings.hostapd.ctrl_config(iface);
    let path = ctrl_config.ctrl_path.display().to_string();

    let mut client = CtrlClient::new(iface, ctrl_config);
    match client.open().await {
        Ok(()) => Ok(client),
        Err(e @ (wifid_ctrl::Error::NotReady | wifid_ctrl::Error::Io(_))) => {
            tracing::debug!(iface, error = %e, "control socket unavailable");
            Err(CliError::NotReady {
                iface: iface.into(),
                path,
            })
        }
        Err(e) => Err(e.into()),
    }
}

// ── Config file sections ─────────────────────────────────────────────

/// Owned form of a `--section` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionArg {
    Header,
    Name(String),
    Address(MacAddress),
}

impl SectionArg {
    /// `"header"` or nothing selects the header; anything that parses as a
    /// MAC address selects by `bssid`; the rest is a section name.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("header") => Self::Header,
            Some(raw) => raw
                .parse::<MacAddress>()
                .map_or_else(|_| Self::Name(raw.to_owned()), Self::Address),
        }
    }

    pub fn key(&self) -> SectionKey<'_> {
        match self {
            Self::Header => SectionKey::Header,
            Self::Name(name) => SectionKey::Name(name),
            Self::Address(mac) => SectionKey::Address(mac),
        }
    }

    /// Every section of either store, header first, in order of appearance.
    pub fn all_of(old: &ConfigStore, new: &ConfigStore) -> Vec<Self> {
        let mut out = vec![Self::Header];
        for section in old.sections().iter().chain(new.sections()) {
            if let Some(name) = &section.name {
                let arg = Self::Name(name.clone());
                if !out.contains(&arg) {
                    out.push(arg);
                }
            }
        }
        out
    }
}

impl std::fmt::Display for SectionArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header => f.write_str("header"),
            Self::Name(name) => f.write_str(name),
            Self::Address(mac) => write!(f, "{mac}"),
        }
    }
}

pub fn load_store(path: &Path) -> Result<ConfigStore, CliError> {
    Ok(ConfigStore::load(path)?)
}

/// Fail with `NotFound` unless the store has `section`.
pub fn require_section(store: &ConfigStore, section: &SectionArg) -> Result<(), CliError> {
    if store.section(section.key()).is_some() {
        Ok(())
    } else {
        Err(CoreError::NotFound {
            entity_type: "config section",
            identifier: section.to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_argument_forms() {
        assert_eq!(SectionArg::parse(None), SectionArg::Header);
        assert_eq!(SectionArg::parse(Some("header")), SectionArg::Header);
        assert_eq!(SectionArg::parse(Some("wlan0")), SectionArg::Name("wlan0".into()));
        assert!(matches!(SectionArg::parse(Some("02:11:22:33:44:55")), SectionArg::Address(_)));
    }

    #[test]
    fn all_sections_are_deduplicated() {
        let old = ConfigStore::parse("driver=nl80211\ninterface=wlan0\nbss=wlan0.1\n");
        let new = ConfigStore::parse("driver=nl80211\ninterface=wlan0\nbss=wlan0.2\n");
        let names: Vec<String> = SectionArg::all_of(&old, &new).iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["header", "wlan0", "wlan0.1", "wlan0.2"]);
    }
}
