// ── wpa_supplicant config writer ──
//
// Global `key=value` lines followed by a single `network={ ... }` block.
// String-valued network fields are double-quoted with `\` and `"`
// backslash-escaped; numeric and enum fields are written bare.

use std::fmt::Write as _;
use std::path::Path;

use indexmap::IndexMap;

use super::atomic_write;
use crate::error::CoreError;
use crate::model::{EndpointRecord, MfpMode, SecurityMode};

/// Network fields the supplicant parses as quoted strings.
const QUOTED_KEYS: &[&str] = &[
    "ssid",
    "psk",
    "sae_password",
    "identity",
    "anonymous_identity",
    "password",
    "ca_cert",
    "client_cert",
    "private_key",
    "private_key_passwd",
    "phase1",
    "phase2",
];

/// Quote and escape a string value.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn needs_quotes(key: &str, value: &str) -> bool {
    // A 64 hex digit psk is the raw key and stays bare.
    if key == "psk" && value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }
    QUOTED_KEYS.contains(&key)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplicantConfig {
    pub globals: IndexMap<String, String>,
    /// Unquoted values; quoting happens at render time.
    pub network: IndexMap<String, String>,
}

impl SupplicantConfig {
    pub fn new(ctrl_dir: &Path) -> Self {
        let mut globals = IndexMap::new();
        globals.insert("ctrl_interface".into(), ctrl_dir.display().to_string());
        globals.insert("update_config".into(), "1".into());
        Self {
            globals,
            network: IndexMap::new(),
        }
    }

    /// Station profile for `endpoint`.
    pub fn from_endpoint(ctrl_dir: &Path, endpoint: &EndpointRecord) -> Result<Self, CoreError> {
        let mut config = Self::new(ctrl_dir);
        let net = &mut config.network;
        let security = &endpoint.security;

        net.insert("ssid".into(), endpoint.ssid.clone());
        if let Some(bssid) = &endpoint.bssid {
            net.insert("bssid".into(), bssid.to_string());
        }

        let passphrase = || {
            security.key_passphrase.clone().ok_or_else(|| CoreError::InvalidArgument {
                field: "key_passphrase".into(),
                reason: format!("{} profile without a passphrase", security.mode),
            })
        };
        let key_mgmt = match security.mode {
            SecurityMode::Open => "NONE",
            SecurityMode::Wep64 | SecurityMode::Wep128 => {
                let key = security.wep_key.clone().ok_or_else(|| CoreError::InvalidArgument {
                    field: "wep_key".into(),
                    reason: "WEP profile without a key".into(),
                })?;
                net.insert("wep_key0".into(), key);
                net.insert("wep_tx_keyidx".into(), "0".into());
                "NONE"
            }
            SecurityMode::Wpa2Personal => {
                net.insert("psk".into(), passphrase()?);
                "WPA-PSK"
            }
            SecurityMode::Wpa3Personal => {
                let sae = match &security.sae_passphrase {
                    Some(sae) => sae.clone(),
                    None => passphrase()?,
                };
                net.insert("sae_password".into(), sae);
                "SAE"
            }
            SecurityMode::Wpa2Wpa3Personal => {
                net.insert("psk".into(), passphrase()?);
                if let Some(sae) = &security.sae_passphrase {
                    net.insert("sae_password".into(), sae.clone());
                }
                "WPA-PSK SAE"
            }
            SecurityMode::Wpa2Enterprise => {
                if let Some(identity) = &endpoint.identity {
                    net.insert("identity".into(), identity.clone());
                }
                "WPA-EAP"
            }
            SecurityMode::Owe => "OWE",
        };
        net.insert("key_mgmt".into(), key_mgmt.into());

        let mfp = match (security.mode, security.mfp) {
            (SecurityMode::Wpa3Personal | SecurityMode::Owe, _) | (_, MfpMode::Required) => Some("2"),
            (_, MfpMode::Optional) => Some("1"),
            (_, MfpMode::Disabled) => None,
        };
        if let Some(mfp) = mfp {
            net.insert("ieee80211w".into(), mfp.into());
        }
        if !endpoint.enabled {
            net.insert("disabled".into(), "1".into());
        }
        Ok(config)
    }

    pub fn render(&self) -> Result<String, CoreError> {
        let mut out = String::new();
        for (key, value) in &self.globals {
            check_single_line(key, value)?;
            let _ = writeln!(out, "{key}={value}");
        }
        if self.network.is_empty() {
            return Ok(out);
        }
        out.push_str("network={\n");
        for (key, value) in &self.network {
            check_single_line(key, value)?;
            if needs_quotes(key, value) {
                let _ = writeln!(out, "\t{key}={}", quote(value));
            } else {
                let _ = writeln!(out, "\t{key}={value}");
            }
        }
        out.push_str("}\n");
        Ok(out)
    }

    pub fn write(&self, path: &Path) -> Result<(), CoreError> {
        let contents = self.render()?;
        atomic_write(path, contents.as_bytes())
    }
}

fn check_single_line(key: &str, value: &str) -> Result<(), CoreError> {
    if value.contains('\n') {
        return Err(CoreError::InvalidArgument {
            field: key.into(),
            reason: "value spans more than one line".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::SecurityConfig;

    fn endpoint(mode: SecurityMode) -> EndpointRecord {
        let mut ep = EndpointRecord::new("wlan0-sta", "wifi0", "Home \"5G\"");
        ep.security = SecurityConfig {
            mode,
            key_passphrase: Some("pa\\ss word".into()),
            ..SecurityConfig::default()
        };
        ep
    }

    #[test]
    fn quote_escapes_backslash_and_quote() {
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[test]
    fn wpa2_profile_renders() {
        let ep = endpoint(SecurityMode::Wpa2Personal);
        let config = SupplicantConfig::from_endpoint(Path::new("/var/run/wpa_supplicant"), &ep).unwrap();

        let expected = [
            "ctrl_interface=/var/run/wpa_supplicant",
            "update_config=1",
            "network={",
            "\tssid=\"Home \\\"5G\\\"\"",
            "\tpsk=\"pa\\\\ss word\"",
            "\tkey_mgmt=WPA-PSK",
            "}",
            "",
        ]
        .join("\n");
        assert_eq!(config.render().unwrap(), expected);
    }

    #[test]
    fn raw_psk_stays_unquoted() {
        let mut ep = endpoint(SecurityMode::Wpa2Personal);
        ep.security.key_passphrase = Some("0f".repeat(32));
        let rendered = SupplicantConfig::from_endpoint(Path::new("/run"), &ep)
            .unwrap()
            .render()
            .unwrap();
        assert!(rendered.contains(&format!("\tpsk={}\n", "0f".repeat(32))));
    }

    #[test]
    fn wpa3_requires_mfp() {
        let ep = endpoint(SecurityMode::Wpa3Personal);
        let config = SupplicantConfig::from_endpoint(Path::new("/run"), &ep).unwrap();
        assert_eq!(config.network.get("ieee80211w").map(String::as_str), Some("2"));
        assert_eq!(config.network.get("key_mgmt").map(String::as_str), Some("SAE"));
    }

    #[test]
    fn missing_passphrase_is_invalid() {
        let mut ep = endpoint(SecurityMode::Wpa2Personal);
        ep.security.key_passphrase = None;
        assert!(SupplicantConfig::from_endpoint(Path::new("/run"), &ep).is_err());
    }

    #[test]
    fn write_is_atomic_and_readable() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wpa.conf");
        let ep = endpoint(SecurityMode::Open);
        let config = SupplicantConfig::from_endpoint(Path::new("/run"), &ep).unwrap();

        config.write(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\tkey_mgmt=NONE\n"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
