use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::channel::{Band, ChannelSpec};

/// Detailed operational state of a radio as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RadioStatus {
    #[default]
    Unknown,
    Down,
    Up,
    Dormant,
    /// Foreground channel availability check in progress; not transmitting.
    FgCac,
    Error,
}

/// State of the dedicated background radar-detection chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BgDfsState {
    #[default]
    Off,
    Idle,
    Clearing,
    Available,
    RadarDetected,
}

/// The slice of a radio the control plane needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioRecord {
    pub name: String,
    pub band: Band,
    pub enabled: bool,
    pub status: RadioStatus,
    /// Channel currently in use.
    pub channel: ChannelSpec,
    /// Channel requested by the data model, not yet applied.
    pub target_channel: Option<ChannelSpec>,
    /// Hardware has a background radar chain and it is switched on.
    pub bg_dfs_enabled: bool,
    pub bg_dfs_state: BgDfsState,
}

impl RadioRecord {
    pub fn new(name: impl Into<String>, channel: ChannelSpec) -> Self {
        Self {
            name: name.into(),
            band: channel.band,
            enabled: true,
            status: RadioStatus::Unknown,
            channel,
            target_channel: None,
            bg_dfs_enabled: false,
            bg_dfs_state: BgDfsState::Off,
        }
    }

    pub fn is_in_fg_cac(&self) -> bool {
        self.status == RadioStatus::FgCac
    }
}

/// A change reported by the radio layer, old and new values included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioChange {
    Status { old: RadioStatus, new: RadioStatus },
    BackgroundDfs { old: BgDfsState, new: BgDfsState },
    Channel { old: ChannelSpec, new: ChannelSpec },
}
