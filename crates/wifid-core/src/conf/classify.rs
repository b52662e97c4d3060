// ── Action classification ──
//
// Maps each changed parameter to the cheapest action that makes the
// daemon pick it up, then takes the worst case over the whole diff.
// Parameters missing from the table fall back to `SigHup`: an unknown
// parameter always forces a reload rather than silently doing nothing.

use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use super::store::{ConfigStore, SectionKey};

/// What it takes to apply a change, cheapest first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    None,
    UpdateBeacon,
    ReloadSecretKey,
    Toggle,
    SigHup,
    Restart,
}

/// Action applied to parameters the table does not list.
pub const DEFAULT_ACTION: Action = Action::SigHup;

/// Parameter name → required action.
pub const PARAM_ACTIONS: &[(&str, Action)] = &[
    // Picked up live by the daemon.
    ("max_num_sta", Action::None),
    ("ap_max_inactivity", Action::None),
    ("skip_inactivity_poll", Action::None),
    ("disassoc_low_ack", Action::None),
    ("bss_load_update_period", Action::None),
    ("chan_util_avg_period", Action::None),
    // Beacon / probe-response content only.
    ("ignore_broadcast_ssid", Action::UpdateBeacon),
    ("rrm_neighbor_report", Action::UpdateBeacon),
    ("rrm_beacon_report", Action::UpdateBeacon),
    ("bss_transition", Action::UpdateBeacon),
    ("mbo", Action::UpdateBeacon),
    ("mbo_cell_data_conn_pref", Action::UpdateBeacon),
    ("interworking", Action::UpdateBeacon),
    // Keys reloaded in place, beacon refreshed.
    ("ssid", Action::ReloadSecretKey),
    ("wpa_passphrase", Action::ReloadSecretKey),
    ("wpa_psk", Action::ReloadSecretKey),
    ("wpa_psk_file", Action::ReloadSecretKey),
    ("sae_password", Action::ReloadSecretKey),
    // Needs the BSS torn down and brought back.
    ("wpa", Action::Toggle),
    ("wpa_key_mgmt", Action::Toggle),
    ("wpa_pairwise", Action::Toggle),
    ("rsn_pairwise", Action::Toggle),
    ("ieee80211w", Action::Toggle),
    ("sae_require_mfp", Action::Toggle),
    ("ieee8021x", Action::Toggle),
    ("auth_algs", Action::Toggle),
    ("ap_isolate", Action::Toggle),
    ("multi_ap", Action::Toggle),
    ("wmm_enabled", Action::Toggle),
    // Full config reload.
    ("auth_server_addr", Action::SigHup),
    ("auth_server_port", Action::SigHup),
    ("auth_server_shared_secret", Action::SigHup),
    ("acct_server_addr", Action::SigHup),
    ("wps_state", Action::SigHup),
    ("config_methods", Action::SigHup),
    ("device_name", Action::SigHup),
    // Daemon restart.
    ("wep_key0", Action::Restart),
    ("wep_key1", Action::Restart),
    ("wep_key2", Action::Restart),
    ("wep_key3", Action::Restart),
    ("wep_default_key", Action::Restart),
    ("interface", Action::Restart),
    ("bss", Action::Restart),
    ("bssid", Action::Restart),
    ("bridge", Action::Restart),
    ("driver", Action::Restart),
    ("ctrl_interface", Action::Restart),
    ("hw_mode", Action::Restart),
];

/// Required action for one parameter, ignoring interface state.
pub fn action_for(param: &str) -> Action {
    PARAM_ACTIONS
        .iter()
        .find(|(name, _)| *name == param)
        .map_or(DEFAULT_ACTION, |(_, action)| *action)
}

/// One parameter's old and new value; `None` means absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamChange {
    pub name: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl ParamChange {
    pub fn new(name: impl Into<String>, old: Option<&str>, new: Option<&str>) -> Self {
        Self {
            name: name.into(),
            old: old.map(str::to_owned),
            new: new.map(str::to_owned),
        }
    }

    /// Raw string comparison, no normalization.
    pub fn is_change(&self) -> bool {
        self.old != self.new
    }
}

/// Worst-case action over every real change. Nothing applies while the
/// interface is disabled.
pub fn classify<'a, I>(changes: I, iface_enabled: bool) -> Action
where
    I: IntoIterator<Item = &'a ParamChange>,
{
    if !iface_enabled {
        return Action::None;
    }
    changes
        .into_iter()
        .filter(|c| c.is_change())
        .map(|c| {
            let action = action_for(&c.name);
            tracing::trace!(param = %c.name, %action, "classified change");
            action
        })
        .max()
        .unwrap_or(Action::None)
}

/// Changes between two sections over the union of their keys, in order of
/// first appearance (old keys first).
pub fn diff(old: &ConfigStore, new: &ConfigStore, section: SectionKey<'_>) -> Vec<ParamChange> {
    let old_params = old.section(section).map(|s| &s.params);
    let new_params = new.section(section).map(|s| &s.params);

    let keys = old_params
        .into_iter()
        .chain(new_params)
        .flat_map(|params| params.keys());
    let mut seen = indexmap::IndexSet::new();
    for key in keys {
        seen.insert(key.as_str());
    }

    seen.into_iter()
        .filter_map(|key| {
            let change = ParamChange::new(
                key,
                old_params.and_then(|p| p.get(key)).map(String::as_str),
                new_params.and_then(|p| p.get(key)).map(String::as_str),
            );
            change.is_change().then_some(change)
        })
        .collect()
}

/// Classify the difference of one section between two snapshots.
pub fn classify_sections(old: &ConfigStore, new: &ConfigStore, section: SectionKey<'_>, iface_enabled: bool) -> Action {
    classify(&diff(old, new, section), iface_enabled)
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn one(name: &str, old: &str, new: &str) -> Vec<ParamChange> {
        vec![ParamChange::new(name, Some(old), Some(new))]
    }

    #[test]
    fn actions_are_totally_ordered() {
        let all: Vec<Action> = Action::iter().collect();
        let mut sorted = all.clone();
        sorted.sort();
        assert_eq!(all, sorted);
        assert!(Action::None < Action::UpdateBeacon);
        assert!(Action::SigHup < Action::Restart);
    }

    #[test]
    fn table_lookups() {
        assert_eq!(classify(&one("max_num_sta", "32", "64"), true), Action::None);
        assert_eq!(classify(&one("wpa_psk", "a", "b"), true), Action::ReloadSecretKey);
        assert_eq!(classify(&one("ssid", "OldNet", "NewNet"), true), Action::ReloadSecretKey);
        assert_eq!(classify(&one("wep_key0", "a", "b"), true), Action::Restart);
        assert_eq!(classify(&one("ignore_broadcast_ssid", "0", "1"), true), Action::UpdateBeacon);
    }

    #[test]
    fn unmapped_parameter_forces_reload() {
        assert_eq!(classify(&one("foo_bar", "0", "1"), true), Action::SigHup);
        assert_eq!(
            classify(&[ParamChange::new("foo_bar", None, Some("1"))], true),
            Action::SigHup
        );
    }

    #[test]
    fn disabled_interface_needs_nothing() {
        assert_eq!(classify(&one("wep_key0", "a", "b"), false), Action::None);
    }

    #[test]
    fn unchanged_values_are_ignored() {
        assert_eq!(classify(&one("wep_key0", "same", "same"), true), Action::None);
        // Raw comparison: case differences count.
        assert_eq!(classify(&one("foo", "ABC", "abc"), true), Action::SigHup);
    }

    #[test]
    fn worst_case_wins() {
        let changes = vec![
            ParamChange::new("max_num_sta", Some("1"), Some("2")),
            ParamChange::new("wpa_key_mgmt", Some("WPA-PSK"), Some("SAE")),
            ParamChange::new("ssid", Some("a"), Some("b")),
        ];
        assert_eq!(classify(&changes, true), Action::Toggle);
    }

    #[test]
    fn adding_a_change_never_lowers_the_action() {
        let pool: Vec<ParamChange> = PARAM_ACTIONS
            .iter()
            .map(|(name, _)| ParamChange::new(*name, Some("0"), Some("1")))
            .chain([ParamChange::new("unknown_param", None, Some("x"))])
            .collect();

        // Every prefix against the next prefix, in two orders.
        for ordering in [pool.clone(), pool.iter().rev().cloned().collect()] {
            let mut previous = Action::None;
            for n in 1..=ordering.len() {
                let action = classify(&ordering[..n], true);
                assert!(action >= previous, "{action} < {previous} after adding {}", ordering[n - 1].name);
                previous = action;
            }
        }
    }

    #[test]
    fn diff_covers_added_removed_and_changed() {
        let old = ConfigStore::parse("interface=wlan0\nssid=OldNet\nmax_num_sta=32\n");
        let new = ConfigStore::parse("interface=wlan0\nssid=NewNet\nwpa=2\n");

        let changes = diff(&old, &new, SectionKey::Name("wlan0"));

        assert_eq!(
            changes,
            vec![
                ParamChange::new("ssid", Some("OldNet"), Some("NewNet")),
                ParamChange::new("max_num_sta", Some("32"), None),
                ParamChange::new("wpa", None, Some("2")),
            ]
        );
        assert_eq!(
            classify_sections(&old, &new, SectionKey::Name("wlan0"), true),
            Action::Toggle
        );
    }
}
