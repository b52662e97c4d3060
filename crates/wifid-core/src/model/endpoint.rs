use serde::{Deserialize, Serialize};
use wifid_ctrl::MacAddress;

use super::ap::SecurityConfig;

/// Station-side interface driven through wpa_supplicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub alias: String,
    pub radio: String,
    pub enabled: bool,
    /// Profile of the network to join.
    pub ssid: String,
    pub bssid: Option<MacAddress>,
    pub security: SecurityConfig,
    /// EAP identity for enterprise profiles.
    pub identity: Option<String>,
}

impl EndpointRecord {
    pub fn new(alias: impl Into<String>, radio: impl Into<String>, ssid: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            radio: radio.into(),
            enabled: true,
            ssid: ssid.into(),
            bssid: None,
            security: SecurityConfig::default(),
            identity: None,
        }
    }
}
