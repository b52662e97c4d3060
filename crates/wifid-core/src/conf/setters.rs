// ── Parameter-group setters ──
//
// Each setter loads the interface's config file, computes the values its
// group should have for the given access point, diffs them against what
// is stored, writes the file back when something changed and returns the
// action needed to apply it. Executing that action is the caller's job.

use std::path::Path;

use crate::error::CoreError;
use crate::model::{AccessPointRecord, MfpMode, SecurityMode};

use super::classify::{Action, ParamChange, classify};
use super::store::{ConfigStore, SectionKey};

/// Desired state of one key; `None` removes it.
type Desired = (&'static str, Option<String>);

fn flag(on: bool) -> Option<String> {
    Some(if on { "1" } else { "0" }.to_owned())
}

fn set(value: &str) -> Option<String> {
    Some(value.to_owned())
}

/// Apply `desired` to the AP's section on disk and classify the result.
fn update_group(path: &Path, ap: &AccessPointRecord, group: &'static str, desired: Vec<Desired>) -> Result<Action, CoreError> {
    let mut store = ConfigStore::load(path)?;
    let section = SectionKey::Name(&ap.alias);
    if store.section(section).is_none() {
        return Err(CoreError::not_found("config section", ap.alias.as_str()));
    }

    let mut changes = Vec::new();
    for (key, value) in desired {
        let old = store.get(section, key).map(str::to_owned);
        if old == value {
            continue;
        }
        match &value {
            Some(v) => {
                store.set(section, key, v)?;
            }
            None => {
                store.remove(section, key);
            }
        }
        changes.push(ParamChange {
            name: key.to_owned(),
            old,
            new: value,
        });
    }

    if changes.is_empty() {
        tracing::debug!(ap = %ap.alias, group, "config already up to date");
        return Ok(Action::None);
    }
    store.write(path)?;
    let action = classify(&changes, ap.enabled);
    tracing::debug!(ap = %ap.alias, group, changed = changes.len(), %action, "config group updated");
    Ok(action)
}

pub fn set_ssid(path: &Path, ap: &AccessPointRecord) -> Result<Action, CoreError> {
    if ap.ssid.is_empty() || ap.ssid.len() > 32 {
        return Err(CoreError::InvalidArgument {
            field: "ssid".into(),
            reason: format!("length {} outside 1..=32", ap.ssid.len()),
        });
    }
    update_group(path, ap, "ssid", vec![("ssid", set(&ap.ssid))])
}

fn is_hex_psk(key: &str) -> bool {
    key.len() == 64 && key.chars().all(|c| c.is_ascii_hexdigit())
}

fn secret_key_params(ap: &AccessPointRecord) -> Result<Vec<Desired>, CoreError> {
    let security = &ap.security;
    let mut params = Vec::new();

    if security.mode.uses_psk() {
        let key = security.key_passphrase.as_deref().unwrap_or_default();
        if is_hex_psk(key) {
            params.push(("wpa_psk", set(key)));
            params.push(("wpa_passphrase", None));
        } else if (8..=63).contains(&key.len()) {
            params.push(("wpa_passphrase", set(key)));
            params.push(("wpa_psk", None));
        } else {
            return Err(CoreError::InvalidArgument {
                field: "key_passphrase".into(),
                reason: "expected 8-63 characters or 64 hex digits".into(),
            });
        }
    } else {
        params.push(("wpa_passphrase", None));
        params.push(("wpa_psk", None));
    }

    if security.mode.uses_sae() {
        let sae = security
            .sae_passphrase
            .as_deref()
            .or(security.key_passphrase.as_deref())
            .unwrap_or_default();
        if sae.is_empty() {
            return Err(CoreError::InvalidArgument {
                field: "sae_passphrase".into(),
                reason: "empty SAE password".into(),
            });
        }
        params.push(("sae_password", set(sae)));
    } else {
        params.push(("sae_password", None));
    }

    if security.mode.is_wep() {
        let key = security.wep_key.as_deref().unwrap_or_default();
        let expected = if security.mode == SecurityMode::Wep64 { [5, 10] } else { [13, 26] };
        if !expected.contains(&key.len()) {
            return Err(CoreError::InvalidArgument {
                field: "wep_key".into(),
                reason: format!("{} requires a key of {} or {} characters", security.mode, expected[0], expected[1]),
            });
        }
        // ASCII WEP keys are quoted, hex keys are not.
        let value = if key.len() == expected[0] { format!("\"{key}\"") } else { key.to_owned() };
        params.push(("wep_key0", Some(value)));
    } else {
        params.push(("wep_key0", None));
    }
    Ok(params)
}

pub fn set_secret_key(path: &Path, ap: &AccessPointRecord) -> Result<Action, CoreError> {
    let params = secret_key_params(ap)?;
    update_group(path, ap, "secret_key", params)
}

fn security_mode_params(ap: &AccessPointRecord) -> Vec<Desired> {
    let ieee80211w = |mfp: MfpMode| {
        set(match mfp {
            MfpMode::Disabled => "0",
            MfpMode::Optional => "1",
            MfpMode::Required => "2",
        })
    };
    let rsn = |key_mgmt: &str, mfp: Option<String>| -> Vec<Desired> {
        vec![
            ("wpa", set("2")),
            ("wpa_key_mgmt", set(key_mgmt)),
            ("rsn_pairwise", set("CCMP")),
            ("ieee80211w", mfp),
            ("auth_algs", set("1")),
            ("wep_default_key", None),
        ]
    };

    let mfp = ap.security.mfp;
    let mut params = match ap.security.mode {
        SecurityMode::Open => vec![
            ("wpa", None),
            ("wpa_key_mgmt", None),
            ("rsn_pairwise", None),
            ("ieee80211w", None),
            ("auth_algs", set("1")),
            ("wep_default_key", None),
        ],
        SecurityMode::Wep64 | SecurityMode::Wep128 => vec![
            ("wpa", None),
            ("wpa_key_mgmt", None),
            ("rsn_pairwise", None),
            ("ieee80211w", None),
            ("auth_algs", set("1")),
            ("wep_default_key", set("0")),
        ],
        SecurityMode::Wpa2Personal => rsn("WPA-PSK", ieee80211w(mfp)),
        SecurityMode::Wpa3Personal => rsn("SAE", ieee80211w(MfpMode::Required)),
        SecurityMode::Wpa2Wpa3Personal => rsn("WPA-PSK SAE", ieee80211w(mfp.max(MfpMode::Optional))),
        SecurityMode::Wpa2Enterprise => rsn("WPA-EAP", ieee80211w(mfp)),
        SecurityMode::Owe => rsn("OWE", ieee80211w(MfpMode::Required)),
    };
    let enterprise = ap.security.mode == SecurityMode::Wpa2Enterprise;
    params.push(("ieee8021x", enterprise.then(|| "1".to_owned())));
    params
}

pub fn set_security_mode(path: &Path, ap: &AccessPointRecord) -> Result<Action, CoreError> {
    update_group(path, ap, "security_mode", security_mode_params(ap))
}

/// Non-security parameters: station limit, WMM, 802.11k/v.
pub fn set_common_params(path: &Path, ap: &AccessPointRecord) -> Result<Action, CoreError> {
    let params = vec![
        ("max_num_sta", Some(ap.max_stations.to_string())),
        ("wmm_enabled", flag(ap.wmm)),
        ("bss_transition", flag(ap.bss_transition)),
        ("rrm_neighbor_report", flag(ap.neighbour_reports)),
    ];
    update_group(path, ap, "common", params)
}

pub fn set_ssid_advertisement(path: &Path, ap: &AccessPointRecord) -> Result<Action, CoreError> {
    update_group(
        path,
        ap,
        "ssid_advertisement",
        vec![("ignore_broadcast_ssid", flag(!ap.ssid_advertisement))],
    )
}

pub fn set_client_isolation(path: &Path, ap: &AccessPointRecord) -> Result<Action, CoreError> {
    update_group(path, ap, "client_isolation", vec![("ap_isolate", flag(ap.client_isolation))])
}
