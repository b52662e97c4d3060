// ── Control commands ──
//
// Builders for every command string the control plane sends. The exact
// spelling is the wire contract with the daemon; arguments are validated
// here so a malformed MAC or PIN never reaches the socket.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const PING: &str = "PING";
pub const PONG: &str = "PONG";
pub const STATUS: &str = "STATUS";
pub const ATTACH: &str = "ATTACH";
pub const DETACH: &str = "DETACH";
pub const ENABLE: &str = "ENABLE";
pub const DISABLE: &str = "DISABLE";
pub const RELOAD: &str = "RELOAD";
pub const RELOAD_WPA_PSK: &str = "RELOAD_WPA_PSK";
pub const UPDATE_BEACON: &str = "UPDATE_BEACON";
pub const WPS_PBC: &str = "WPS_PBC";
pub const WPS_CANCEL: &str = "WPS_CANCEL";

pub const REPLY_OK: &str = "OK";
pub const REPLY_FAIL: &str = "FAIL";
pub const REPLY_UNKNOWN: &str = "UNKNOWN COMMAND";

// ── MacAddress ──────────────────────────────────────────────────────

/// Validated MAC address, normalized to lowercase colon-separated format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    /// Parse a colon- or dash-separated MAC address.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', ":");
        let octets: Vec<&str> = normalized.split(':').collect();
        let well_formed = octets.len() == 6
            && octets
                .iter()
                .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()));
        if !well_formed {
            return Err(Error::invalid("mac", format!("'{raw}' is not a MAC address")));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == "ff:ff:ff:ff:ff:ff"
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MacAddress {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ── Validation helpers ──────────────────────────────────────────────

/// Lowercase hex encoding, as the daemon expects for `ssid=` arguments.
pub fn hex_encode(bytes: &[u8]) -> String {
    use fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

fn validate_hex(field: &'static str, raw: &str) -> Result<(), Error> {
    if raw.is_empty() || raw.len() % 2 != 0 || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::invalid(field, format!("'{raw}' is not an even-length hex string")));
    }
    Ok(())
}

fn validate_token(field: &'static str, raw: &str) -> Result<(), Error> {
    if raw.is_empty() || raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::invalid(field, format!("'{raw}' must be a single token")));
    }
    Ok(())
}

/// Validate a WPS device PIN.
///
/// Four-digit PINs are accepted as-is; eight-digit PINs must carry a valid
/// checksum in their last digit.
pub fn validate_wps_pin(pin: &str) -> Result<(), Error> {
    if !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::invalid("pin", "must contain only digits"));
    }
    match pin.len() {
        4 => Ok(()),
        8 => {
            let weighted: u32 = pin
                .bytes()
                .map(|b| u32::from(b - b'0'))
                .zip([3, 1, 3, 1, 3, 1, 3, 1])
                .map(|(digit, weight)| digit * weight)
                .sum();
            if weighted % 10 == 0 {
                Ok(())
            } else {
                Err(Error::invalid("pin", "checksum digit mismatch"))
            }
        }
        n => Err(Error::invalid("pin", format!("expected 4 or 8 digits, got {n}"))),
    }
}

// ── Builders ────────────────────────────────────────────────────────

/// `SET <key> <value>`
pub fn set(key: &str, value: &str) -> Result<String, Error> {
    validate_token("key", key)?;
    if value.contains(['\n', '\r']) {
        return Err(Error::invalid("value", "must not contain line breaks"));
    }
    Ok(format!("SET {key} {value}"))
}

/// `STA <mac>`
pub fn sta(mac: &MacAddress) -> String {
    format!("STA {mac}")
}

/// `BSS <bssid>`
pub fn bss(bssid: &MacAddress) -> String {
    format!("BSS {bssid}")
}

/// `DEAUTHENTICATE <mac> reason=<n>`
pub fn deauthenticate(mac: &MacAddress, reason: u16) -> String {
    format!("DEAUTHENTICATE {mac} reason={reason}")
}

/// `DISASSOCIATE <mac> reason=<n>`
pub fn disassociate(mac: &MacAddress, reason: u16) -> String {
    format!("DISASSOCIATE {mac} reason={reason}")
}

/// `SET_NEIGHBOR <bssid> ssid=<hex> nr=<hex>`
pub fn set_neighbor(bssid: &MacAddress, ssid: &str, nr_hex: &str) -> Result<String, Error> {
    if ssid.is_empty() || ssid.len() > 32 {
        return Err(Error::invalid("ssid", "must be 1..=32 bytes"));
    }
    validate_hex("nr", nr_hex)?;
    Ok(format!(
        "SET_NEIGHBOR {bssid} ssid={} nr={}",
        hex_encode(ssid.as_bytes()),
        nr_hex.to_ascii_lowercase()
    ))
}

/// `REMOVE_NEIGHBOR <bssid> ssid=<hex>`
pub fn remove_neighbor(bssid: &MacAddress, ssid: &str) -> Result<String, Error> {
    if ssid.is_empty() || ssid.len() > 32 {
        return Err(Error::invalid("ssid", "must be 1..=32 bytes"));
    }
    Ok(format!(
        "REMOVE_NEIGHBOR {bssid} ssid={}",
        hex_encode(ssid.as_bytes())
    ))
}

/// `WPS_PIN any <pin> <timeout>`
pub fn wps_pin(pin: &str, timeout_secs: u32) -> Result<String, Error> {
    validate_wps_pin(pin)?;
    Ok(format!("WPS_PIN any {pin} {timeout_secs}"))
}

/// `WPS_AP_PIN set <pin> <timeout>`
pub fn wps_ap_pin(pin: &str, timeout_secs: u32) -> Result<String, Error> {
    validate_wps_pin(pin)?;
    Ok(format!("WPS_AP_PIN set {pin} {timeout_secs}"))
}

/// A candidate entry of a BSS transition management request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCandidate {
    pub bssid: MacAddress,
    pub bssid_info: u32,
    pub op_class: u8,
    pub channel: u8,
    pub phy_type: u8,
}

/// `BSS_TM_REQ <sta> pref=<0|1> ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BssTmRequest {
    pub sta: MacAddress,
    pub candidates: Vec<TransitionCandidate>,
    pub disassoc_imminent: bool,
    /// Disassociation timer in beacon intervals.
    pub disassoc_timer: Option<u16>,
    /// Validity interval in beacon intervals.
    pub valid_int: Option<u8>,
    pub abridged: bool,
}

impl BssTmRequest {
    pub fn new(sta: MacAddress) -> Self {
        Self {
            sta,
            candidates: Vec::new(),
            disassoc_imminent: false,
            disassoc_timer: None,
            valid_int: None,
            abridged: false,
        }
    }

    pub fn to_command(&self) -> String {
        let pref = u8::from(!self.candidates.is_empty());
        let mut cmd = format!("BSS_TM_REQ {} pref={pref}", self.sta);
        if self.abridged {
            cmd.push_str(" abridged=1");
        }
        if self.disassoc_imminent {
            cmd.push_str(" disassoc_imminent=1");
        }
        if let Some(timer) = self.disassoc_timer {
            cmd.push_str(&format!(" disassoc_timer={timer}"));
        }
        if let Some(valid) = self.valid_int {
            cmd.push_str(&format!(" valid_int={valid}"));
        }
        for c in &self.candidates {
            cmd.push_str(&format!(
                " neighbor={},0x{:08x},{},{},{}",
                c.bssid, c.bssid_info, c.op_class, c.channel, c.phy_type
            ));
        }
        cmd
    }
}

/// `CHAN_SWITCH <cs_count> <freq> bandwidth=<mhz> [center_freq1=<mhz>] [ht] [vht] [he]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChanSwitch {
    pub cs_count: u8,
    pub freq: u32,
    pub bandwidth: u32,
    pub center_freq1: Option<u32>,
    pub ht: bool,
    pub vht: bool,
    pub he: bool,
}

impl ChanSwitch {
    pub fn to_command(&self) -> String {
        let mut cmd = format!(
            "CHAN_SWITCH {} {} bandwidth={}",
            self.cs_count, self.freq, self.bandwidth
        );
        if let Some(cf1) = self.center_freq1 {
            cmd.push_str(&format!(" center_freq1={cf1}"));
        }
        for (flag, name) in [(self.ht, "ht"), (self.vht, "vht"), (self.he, "he")] {
            if flag {
                cmd.push(' ');
                cmd.push_str(name);
            }
        }
        cmd
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mac(raw: &str) -> MacAddress {
        MacAddress::parse(raw).unwrap()
    }

    #[test]
    fn mac_normalizes_dashes_and_case() {
        assert_eq!(mac("AA-BB-CC-DD-EE-0F").as_str(), "aa:bb:cc:dd:ee:0f");
    }

    #[test]
    fn mac_rejects_garbage() {
        for bad in ["", "aa:bb:cc", "gg:bb:cc:dd:ee:ff", "aabbccddeeff", "a:b:c:d:e:f"] {
            assert!(MacAddress::parse(bad).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn deauthenticate_wire_format() {
        assert_eq!(
            deauthenticate(&mac("aa:bb:cc:dd:ee:ff"), 3),
            "DEAUTHENTICATE aa:bb:cc:dd:ee:ff reason=3"
        );
    }

    #[test]
    fn set_neighbor_hex_encodes_ssid() {
        let cmd = set_neighbor(&mac("00:11:22:33:44:55"), "Home", "0011AB").unwrap();
        assert_eq!(cmd, "SET_NEIGHBOR 00:11:22:33:44:55 ssid=486f6d65 nr=0011ab");
    }

    #[test]
    fn set_neighbor_rejects_odd_hex() {
        assert!(set_neighbor(&mac("00:11:22:33:44:55"), "Home", "abc").is_err());
    }

    #[test]
    fn remove_neighbor_wire_format() {
        let cmd = remove_neighbor(&mac("00:11:22:33:44:55"), "Home").unwrap();
        assert_eq!(cmd, "REMOVE_NEIGHBOR 00:11:22:33:44:55 ssid=486f6d65");
    }

    #[test]
    fn wps_pin_checksum() {
        assert!(validate_wps_pin("12345670").is_ok());
        assert!(validate_wps_pin("12345678").is_err());
        assert!(validate_wps_pin("1234").is_ok());
        assert!(validate_wps_pin("12a4").is_err());
        assert!(validate_wps_pin("123456").is_err());
        assert_eq!(wps_pin("12345670", 120).unwrap(), "WPS_PIN any 12345670 120");
        assert_eq!(wps_ap_pin("1234", 0).unwrap(), "WPS_AP_PIN set 1234 0");
    }

    #[test]
    fn set_rejects_multiline_values() {
        assert_eq!(set("max_num_sta", "32").unwrap(), "SET max_num_sta 32");
        assert!(set("ssid", "a\nb").is_err());
        assert!(set("two words", "x").is_err());
    }

    #[test]
    fn bss_tm_request_without_candidates() {
        let req = BssTmRequest::new(mac("aa:bb:cc:dd:ee:ff"));
        assert_eq!(req.to_command(), "BSS_TM_REQ aa:bb:cc:dd:ee:ff pref=0");
    }

    #[test]
    fn bss_tm_request_with_candidate() {
        let mut req = BssTmRequest::new(mac("aa:bb:cc:dd:ee:ff"));
        req.disassoc_imminent = true;
        req.disassoc_timer = Some(100);
        req.valid_int = Some(255);
        req.abridged = true;
        req.candidates.push(TransitionCandidate {
            bssid: mac("00:11:22:33:44:55"),
            bssid_info: 0x8f,
            op_class: 115,
            channel: 36,
            phy_type: 9,
        });
        assert_eq!(
            req.to_command(),
            "BSS_TM_REQ aa:bb:cc:dd:ee:ff pref=1 abridged=1 disassoc_imminent=1 \
             disassoc_timer=100 valid_int=255 neighbor=00:11:22:33:44:55,0x0000008f,115,36,9"
        );
    }

    #[test]
    fn chan_switch_wire_format() {
        let cs = ChanSwitch {
            cs_count: 5,
            freq: 5500,
            bandwidth: 80,
            center_freq1: Some(5530),
            ht: true,
            vht: true,
            he: false,
        };
        assert_eq!(
            cs.to_command(),
            "CHAN_SWITCH 5 5500 bandwidth=80 center_freq1=5530 ht vht"
        );
    }
}
