// ── Reply parsing ──
//
// Control-socket replies are either a bare status token (`OK`, `FAIL`,
// `PONG`) or a multi-line `key=value` block. Optional keys may be absent;
// an oversized value is a framing error, never silently truncated.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::Error;

/// Default upper bound on a single extracted value.
pub const DEFAULT_VALUE_LIMIT: usize = 256;

/// Extract the value for `key` from a `key=value` reply.
///
/// Returns `Ok(None)` when the key is absent and a [`Error::Protocol`]
/// when the value does not fit in `max_len` bytes.
pub fn get_value<'a>(reply: &'a str, key: &str, max_len: usize) -> Result<Option<&'a str>, Error> {
    for line in reply.lines() {
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        if k != key {
            continue;
        }
        if v.len() > max_len {
            return Err(Error::Protocol(format!(
                "value of '{key}' is {} bytes, limit {max_len}",
                v.len()
            )));
        }
        return Ok(Some(v));
    }
    Ok(None)
}

/// Like [`get_value`] but a missing key becomes [`Error::NotFound`].
pub fn require_value<'a>(reply: &'a str, key: &str) -> Result<&'a str, Error> {
    get_value(reply, key, DEFAULT_VALUE_LIMIT)?.ok_or_else(|| Error::NotFound { key: key.into() })
}

/// Parse an integer field, treating absence as `None`.
pub fn get_number<T: std::str::FromStr>(reply: &str, key: &str) -> Result<Option<T>, Error> {
    match get_value(reply, key, DEFAULT_VALUE_LIMIT)? {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Protocol(format!("'{key}' is not numeric: {raw}"))),
        None => Ok(None),
    }
}

/// Collect every `key=value` line into an ordered map. Lines without `=`
/// are skipped (the first line of a `STA` reply is the bare address).
pub fn parse_kv(reply: &str) -> IndexMap<String, String> {
    reply
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
}

/// `true` if the trimmed reply equals the status token.
pub fn is_token(reply: &str, token: &str) -> bool {
    reply.trim_end_matches(['\n', '\r']) == token
}

// ── STATUS ──────────────────────────────────────────────────────────

/// One BSS entry from an AP `STATUS` reply (`bss[i]=`, `bssid[i]=`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BssStatus {
    pub ifname: String,
    pub bssid: Option<String>,
    pub ssid: Option<String>,
    pub num_sta: Option<u32>,
}

/// Typed view of the fields of a `STATUS` reply the control plane uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReply {
    /// Interface state, e.g. `ENABLED`, `DFS`, `DISABLED`, `COUNTRY_UPDATE`.
    pub state: String,
    pub channel: Option<u32>,
    pub freq: Option<u32>,
    pub cac_time_left_seconds: Option<u32>,
    pub bss: Vec<BssStatus>,
}

impl StatusReply {
    pub fn parse(reply: &str) -> Result<Self, Error> {
        let state = require_value(reply, "state")?.to_owned();
        let mut bss = Vec::new();
        for idx in 0.. {
            let Some(ifname) = get_value(reply, &format!("bss[{idx}]"), DEFAULT_VALUE_LIMIT)? else {
                break;
            };
            bss.push(BssStatus {
                ifname: ifname.to_owned(),
                bssid: get_value(reply, &format!("bssid[{idx}]"), DEFAULT_VALUE_LIMIT)?
                    .map(str::to_owned),
                ssid: get_value(reply, &format!("ssid[{idx}]"), DEFAULT_VALUE_LIMIT)?
                    .map(str::to_owned),
                num_sta: get_number(reply, &format!("num_sta[{idx}]"))?,
            });
        }

        Ok(Self {
            state,
            channel: get_number(reply, "channel")?,
            freq: get_number(reply, "freq")?,
            cac_time_left_seconds: get_number(reply, "cac_time_left_seconds")?,
            bss,
        })
    }

    /// The interface is running a foreground channel availability check.
    pub fn is_dfs(&self) -> bool {
        self.state == "DFS"
    }

    pub fn is_enabled(&self) -> bool {
        self.state == "ENABLED"
    }
}

// ── STA <mac> ───────────────────────────────────────────────────────

/// Typed view of a `STA <mac>` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaInfo {
    pub mac: String,
    pub flags: Vec<String>,
    pub aid: Option<u32>,
    pub signal: Option<i32>,
    pub connected_time: Option<u64>,
    pub rx_bytes: Option<u64>,
    pub tx_bytes: Option<u64>,
    /// Every other field the daemon reported.
    pub extra: IndexMap<String, String>,
}

impl StaInfo {
    pub fn parse(reply: &str) -> Result<Self, Error> {
        let mac = reply
            .lines()
            .next()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.contains('='))
            .ok_or_else(|| Error::Protocol("STA reply does not start with an address".into()))?;
        if is_token(mac, "FAIL") {
            return Err(Error::Failed {
                command: "STA".into(),
                reply: mac.into(),
            });
        }

        let flags = get_value(reply, "flags", DEFAULT_VALUE_LIMIT)?
            .map(|raw| {
                raw.split(']')
                    .map(|f| f.trim_start_matches('['))
                    .filter(|f| !f.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        let mut extra = parse_kv(reply);
        for known in ["flags", "aid", "signal", "connected_time", "rx_bytes", "tx_bytes"] {
            extra.shift_remove(known);
        }

        Ok(Self {
            mac: mac.to_owned(),
            flags,
            aid: get_number(reply, "aid")?,
            signal: get_number(reply, "signal")?,
            connected_time: get_number(reply, "connected_time")?,
            rx_bytes: get_number(reply, "rx_bytes")?,
            tx_bytes: get_number(reply, "tx_bytes")?,
            extra,
        })
    }

    pub fn is_authorized(&self) -> bool {
        self.flags.iter().any(|f| f == "AUTHORIZED")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const STATUS: &str = "state=ENABLED\n\
        phy=phy0\n\
        freq=5500\n\
        channel=100\n\
        cac_time_left_seconds=0\n\
        bss[0]=wlan0\n\
        bssid[0]=00:11:22:33:44:55\n\
        ssid[0]=HomeNet\n\
        num_sta[0]=2\n\
        bss[1]=wlan0.1\n\
        bssid[1]=00:11:22:33:44:56\n\
        ssid[1]=Guest\n\
        num_sta[1]=0\n";

    #[test]
    fn get_value_present_and_absent() {
        assert_eq!(get_value(STATUS, "channel", 16).unwrap(), Some("100"));
        assert_eq!(get_value(STATUS, "country_code", 16).unwrap(), None);
    }

    #[test]
    fn get_value_does_not_match_prefixes() {
        assert_eq!(get_value(STATUS, "bss", 16).unwrap(), None);
    }

    #[test]
    fn oversized_value_is_protocol_error() {
        let err = get_value(STATUS, "ssid[0]", 3).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "got {err:?}");
    }

    #[test]
    fn require_value_reports_not_found() {
        let err = require_value("OK\n", "state").unwrap_err();
        assert!(matches!(err, Error::NotFound { ref key } if key == "state"));
    }

    #[test]
    fn parses_status_reply() {
        let status = StatusReply::parse(STATUS).unwrap();
        assert!(status.is_enabled());
        assert_eq!(status.channel, Some(100));
        assert_eq!(status.freq, Some(5500));
        assert_eq!(status.bss.len(), 2);
        assert_eq!(status.bss[1].ssid.as_deref(), Some("Guest"));
        assert_eq!(status.bss[0].num_sta, Some(2));
    }

    #[test]
    fn non_numeric_field_is_protocol_error() {
        let err = StatusReply::parse("state=DFS\nchannel=abc\n").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn parses_sta_reply() {
        let reply = "aa:bb:cc:dd:ee:ff\n\
            flags=[AUTH][ASSOC][AUTHORIZED][WMM]\n\
            aid=3\n\
            signal=-47\n\
            rx_bytes=1024\n\
            tx_bytes=2048\n\
            connected_time=37\n\
            supported_rates=8c 12 98 24\n";
        let sta = StaInfo::parse(reply).unwrap();
        assert_eq!(sta.mac, "aa:bb:cc:dd:ee:ff");
        assert!(sta.is_authorized());
        assert_eq!(sta.flags, vec!["AUTH", "ASSOC", "AUTHORIZED", "WMM"]);
        assert_eq!(sta.signal, Some(-47));
        assert_eq!(sta.extra.get("supported_rates").unwrap(), "8c 12 98 24");
        assert!(!sta.extra.contains_key("aid"));
    }

    #[test]
    fn sta_fail_reply() {
        assert!(matches!(
            StaInfo::parse("FAIL\n"),
            Err(Error::Failed { .. })
        ));
    }

    #[test]
    fn token_comparison_ignores_newline() {
        assert!(is_token("OK\n", "OK"));
        assert!(!is_token("OK-ish\n", "OK"));
    }
}
