//! Runtime configuration consumed by [`Manager`](crate::Manager).
//!
//! This is the resolved, typed form; `wifid-config` builds it from TOML
//! and environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use wifid_ctrl::CtrlConfig;

use crate::fsm::CommitSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZwdfsSettings {
    pub enabled: bool,
    /// Safety timeout before the target's clear time is added.
    pub base_timeout: Duration,
}

impl Default for ZwdfsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_timeout: Duration::from_secs(30),
        }
    }
}

/// Where a security daemon listens and how to talk to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonSettings {
    pub ctrl_dir: PathBuf,
    /// Directory for client-side reply sockets.
    pub local_dir: PathBuf,
    pub reply_timeout: Duration,
    pub reply_buffer: usize,
}

impl DaemonSettings {
    pub fn ctrl_config(&self, iface: &str) -> CtrlConfig {
        CtrlConfig {
            ctrl_path: self.ctrl_dir.join(iface),
            local_dir: self.local_dir.clone(),
            reply_timeout: self.reply_timeout,
            buffer_size: self.reply_buffer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    pub commit: CommitSettings,
    pub zwdfs: ZwdfsSettings,
    pub hostapd: DaemonSettings,
    pub wpa_supplicant: DaemonSettings,
    /// Directory holding generated daemon config files.
    pub conf_dir: PathBuf,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        let daemon = |ctrl_dir: &str| DaemonSettings {
            ctrl_dir: PathBuf::from(ctrl_dir),
            local_dir: PathBuf::from("/tmp"),
            reply_timeout: Duration::from_secs(2),
            reply_buffer: 4096,
        };
        Self {
            commit: CommitSettings::default(),
            zwdfs: ZwdfsSettings::default(),
            hostapd: daemon("/var/run/hostapd"),
            wpa_supplicant: daemon("/var/run/wpa_supplicant"),
            conf_dir: PathBuf::from("/tmp"),
        }
    }
}

impl ManagerConfig {
    /// hostapd config file for a radio.
    pub fn hostapd_conf_path(&self, radio: &str) -> PathBuf {
        self.conf_dir.join(format!("{radio}_hapd.conf"))
    }

    /// wpa_supplicant config file for an endpoint interface.
    pub fn supplicant_conf_path(&self, iface: &str) -> PathBuf {
        self.conf_dir.join(format!("{iface}_wpa_supplicant.conf"))
    }

    pub fn conf_dir(&self) -> &Path {
        &self.conf_dir
    }
}
