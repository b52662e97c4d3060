use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use wifid_ctrl::MacAddress;

/// Authentication / encryption mode of a BSS or a station profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString)]
pub enum SecurityMode {
    #[default]
    #[strum(serialize = "None")]
    Open,
    #[strum(serialize = "WEP-64")]
    Wep64,
    #[strum(serialize = "WEP-128")]
    Wep128,
    #[strum(serialize = "WPA2-Personal")]
    Wpa2Personal,
    #[strum(serialize = "WPA3-Personal")]
    Wpa3Personal,
    #[strum(serialize = "WPA2-WPA3-Personal")]
    Wpa2Wpa3Personal,
    #[strum(serialize = "WPA2-Enterprise")]
    Wpa2Enterprise,
    #[strum(serialize = "OWE")]
    Owe,
}

impl SecurityMode {
    pub fn is_wep(self) -> bool {
        matches!(self, Self::Wep64 | Self::Wep128)
    }

    pub fn uses_psk(self) -> bool {
        matches!(self, Self::Wpa2Personal | Self::Wpa2Wpa3Personal)
    }

    pub fn uses_sae(self) -> bool {
        matches!(self, Self::Wpa3Personal | Self::Wpa2Wpa3Personal)
    }
}

/// Management frame protection policy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum MfpMode {
    #[default]
    Disabled,
    Optional,
    Required,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub mode: SecurityMode,
    pub mfp: MfpMode,
    /// WPA passphrase (8-63 chars) or 64 hex digit PSK.
    pub key_passphrase: Option<String>,
    pub sae_passphrase: Option<String>,
    pub wep_key: Option<String>,
}

/// The slice of an access point the control plane needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPointRecord {
    /// Interface name; also names the section in the hostapd config.
    pub alias: String,
    pub radio: String,
    pub bssid: Option<MacAddress>,
    pub enabled: bool,
    pub ssid: String,
    pub security: SecurityConfig,
    pub ssid_advertisement: bool,
    pub client_isolation: bool,
    pub max_stations: u32,
    pub wmm: bool,
    pub bss_transition: bool,
    pub neighbour_reports: bool,
}

impl AccessPointRecord {
    pub fn new(alias: impl Into<String>, radio: impl Into<String>, ssid: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            radio: radio.into(),
            bssid: None,
            enabled: true,
            ssid: ssid.into(),
            security: SecurityConfig::default(),
            ssid_advertisement: true,
            client_isolation: false,
            max_stations: 32,
            wmm: true,
            bss_transition: false,
            neighbour_reports: false,
        }
    }
}
