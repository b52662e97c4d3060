#![allow(clippy::unwrap_used)]
// Config files on disk: round trips, classification of edits, setters.

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wifid_core::conf::setters;
use wifid_core::conf::{Action, ConfigStore, SectionKey, classify_sections};
use wifid_core::model::{MfpMode, SecurityMode};
use wifid_core::AccessPointRecord;

// ── Helpers ─────────────────────────────────────────────────────────

const RADIO_CONF: &str = "\
ctrl_interface=/var/run/hostapd
driver=nl80211
interface=wlan0
ssid=OldNet
wpa=2
wpa_key_mgmt=WPA-PSK
wpa_passphrase=correct-horse
max_num_sta=32
bss=wlan0.1
ssid=Guest
ignore_broadcast_ssid=0
";

fn write_conf(dir: &TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("wifi0_hapd.conf");
    std::fs::write(&path, text).unwrap();
    path
}

fn edited(key: &str, value: &str) -> (ConfigStore, ConfigStore) {
    let old = ConfigStore::parse(RADIO_CONF);
    let mut new = old.clone();
    new.set(SectionKey::Name("wlan0"), key, value).unwrap();
    (old, new)
}

// ── Round trips ─────────────────────────────────────────────────────

#[test]
fn test_write_then_load_preserves_sections_and_order() {
    let dir = TempDir::new().unwrap();
    let path = write_conf(&dir, RADIO_CONF);

    let store = ConfigStore::load(&path).unwrap();
    store.write(&path).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), RADIO_CONF);
    let reloaded = ConfigStore::load(&path).unwrap();
    assert_eq!(reloaded.sections(), store.sections());
}

#[test]
fn test_comments_are_dropped_on_rewrite() {
    let dir = TempDir::new().unwrap();
    let path = write_conf(&dir, "# generated\ndriver=nl80211\n\ninterface=wlan0\nssid=Lab\n");

    ConfigStore::load(&path).unwrap().write(&path).unwrap();

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "driver=nl80211\ninterface=wlan0\nssid=Lab\n"
    );
}

#[test]
fn test_built_store_renders_expected_file() {
    let mut store = ConfigStore::new();
    store.set(SectionKey::Header, "ctrl_interface", "/var/run/hostapd").unwrap();
    store.set(SectionKey::Header, "country_code", "DE").unwrap();
    store.add_interface("wlan0");
    store.set(SectionKey::Name("wlan0"), "bssid", "02:11:22:33:44:50").unwrap();
    store.set(SectionKey::Name("wlan0"), "ssid", "HomeNet").unwrap();
    store.add_bss("wlan0.1");
    store.set(SectionKey::Name("wlan0.1"), "bssid", "02:11:22:33:44:51").unwrap();
    store.set(SectionKey::Name("wlan0.1"), "ssid", "Guest").unwrap();
    store.set(SectionKey::Name("wlan0.1"), "ap_isolate", "1").unwrap();

    insta::assert_snapshot!(store.render().unwrap(), @r"
    ctrl_interface=/var/run/hostapd
    country_code=DE
    interface=wlan0
    bssid=02:11:22:33:44:50
    ssid=HomeNet
    bss=wlan0.1
    bssid=02:11:22:33:44:51
    ssid=Guest
    ap_isolate=1
    ");
}

/// Values that need escaping on disk, or look like they might.
const AWKWARD_VALUES: &[&str] = &[
    "",
    "plain",
    "two\nlines",
    "trailing newline\n",
    "back\\slash",
    "ends in backslash\\",
    "literal \\n not a newline",
    "crlf\r\nvalue",
    "a=b=c",
    " padded ",
    "#not a comment",
    "ünïcode ✓",
];

#[test]
fn test_generated_stores_survive_write_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("generated.conf");

    for (n, value) in AWKWARD_VALUES.iter().enumerate() {
        let other = AWKWARD_VALUES[(n + 3) % AWKWARD_VALUES.len()];
        let mut store = ConfigStore::new();
        store.set(SectionKey::Header, "ctrl_interface", value).unwrap();
        for iface in 0..=(n % 3) {
            let name = format!("wlan{iface}");
            store.add_interface(&name);
            store.set(SectionKey::Name(&name), "ssid", value).unwrap();
            store.set(SectionKey::Name(&name), "wpa_passphrase", other).unwrap();
            for bss in 0..(n % 2 + 1) {
                let bss_name = format!("{name}.{bss}");
                store.add_bss(&bss_name);
                store.set(SectionKey::Name(&bss_name), "ssid", other).unwrap();
                store.set(SectionKey::Name(&bss_name), "ap_isolate", value).unwrap();
            }
        }

        store.write(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let line_count = store.sections().iter().map(|s| s.params.len()).sum::<usize>();
        assert_eq!(text.lines().count(), line_count, "value {value:?} broke a line:\n{text}");

        let reloaded = ConfigStore::load(&path).unwrap();
        assert_eq!(reloaded, store, "value {value:?} did not survive");
    }
}

#[test]
fn test_lookup_by_address_after_reload() {
    let dir = TempDir::new().unwrap();
    let path = write_conf(&dir, "interface=wlan0\nbssid=02:11:22:33:44:50\nssid=A\nbss=wlan0.1\nbssid=02:11:22:33:44:51\nssid=B\n");

    let store = ConfigStore::load(&path).unwrap();
    let mac = "02:11:22:33:44:51".parse().unwrap();

    assert_eq!(store.lookup_by_address(&mac, "ssid"), Some("B"));
    assert_eq!(store.lookup_by_name("wlan0", "ssid"), Some("A"));
}

// ── Classification ──────────────────────────────────────────────────

#[test]
fn test_ssid_change_reloads_secret_key() {
    let (old, new) = edited("ssid", "NewNet");
    assert_eq!(
        classify_sections(&old, &new, SectionKey::Name("wlan0"), true),
        Action::ReloadSecretKey
    );
}

#[test]
fn test_single_parameter_actions() {
    let psk = "ab".repeat(32);
    let cases = [
        ("max_num_sta", "64", Action::None),
        ("wpa_psk", psk.as_str(), Action::ReloadSecretKey),
        ("ieee80211w", "2", Action::Toggle),
        ("wep_key0", "\"abcde\"", Action::Restart),
        ("foo_bar", "1", Action::SigHup),
    ];
    for (key, value, expected) in cases {
        let (old, new) = edited(key, value);
        assert_eq!(
            classify_sections(&old, &new, SectionKey::Name("wlan0"), true),
            expected,
            "{key}"
        );
    }
}

#[test]
fn test_strongest_action_wins() {
    let old = ConfigStore::parse(RADIO_CONF);
    let mut new = old.clone();
    new.set(SectionKey::Name("wlan0"), "max_num_sta", "8").unwrap();
    new.set(SectionKey::Name("wlan0"), "ssid", "Renamed").unwrap();
    new.set(SectionKey::Name("wlan0"), "wpa_key_mgmt", "SAE").unwrap();

    assert_eq!(classify_sections(&old, &new, SectionKey::Name("wlan0"), true), Action::Toggle);
}

#[test]
fn test_unchanged_or_disabled_needs_nothing() {
    let old = ConfigStore::parse(RADIO_CONF);
    assert_eq!(
        classify_sections(&old, &old.clone(), SectionKey::Name("wlan0"), true),
        Action::None
    );

    let (old, new) = edited("driver", "other");
    assert_eq!(classify_sections(&old, &new, SectionKey::Name("wlan0"), false), Action::None);
}

// ── Setters ─────────────────────────────────────────────────────────

#[test]
fn test_set_ssid_writes_and_classifies() {
    let dir = TempDir::new().unwrap();
    let path = write_conf(&dir, RADIO_CONF);
    let ap = AccessPointRecord::new("wlan0", "wifi0", "NewNet");

    assert_eq!(setters::set_ssid(&path, &ap).unwrap(), Action::ReloadSecretKey);
    assert_eq!(ConfigStore::load(&path).unwrap().lookup_by_name("wlan0", "ssid"), Some("NewNet"));

    // Second call finds nothing to do.
    assert_eq!(setters::set_ssid(&path, &ap).unwrap(), Action::None);
}

#[test]
fn test_set_ssid_rejects_overlong_name() {
    let dir = TempDir::new().unwrap();
    let path = write_conf(&dir, RADIO_CONF);
    let ap = AccessPointRecord::new("wlan0", "wifi0", "x".repeat(33));

    assert!(setters::set_ssid(&path, &ap).is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), RADIO_CONF);
}

#[test]
fn test_switch_to_wpa3_toggles_interface() {
    let dir = TempDir::new().unwrap();
    let path = write_conf(&dir, RADIO_CONF);
    let mut ap = AccessPointRecord::new("wlan0", "wifi0", "OldNet");
    ap.security.mode = SecurityMode::Wpa3Personal;
    ap.security.mfp = MfpMode::Required;
    ap.security.sae_passphrase = Some("correct-horse".into());

    assert_eq!(setters::set_security_mode(&path, &ap).unwrap(), Action::Toggle);
    let store = ConfigStore::load(&path).unwrap();
    assert_eq!(store.lookup_by_name("wlan0", "wpa_key_mgmt"), Some("SAE"));
    assert_eq!(store.lookup_by_name("wlan0", "ieee80211w"), Some("2"));
}

#[test]
fn test_setter_on_missing_section_is_not_found() {
    let dir = TempDir::new().unwrap();
    let path = write_conf(&dir, RADIO_CONF);
    let ap = AccessPointRecord::new("wlan7", "wifi0", "Lab");

    assert!(setters::set_client_isolation(&path, &ap).unwrap_err().is_not_found());
}
