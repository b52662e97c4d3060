// ── Channel specification ──
//
// Band / channel / bandwidth triple plus the 5 GHz block arithmetic the
// DFS sequencing needs: which 20 MHz sub-channels an operating block
// covers, whether any of them needs a channel availability check, and
// how long that check takes.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Standard channel availability check time.
pub const CAC_TIME: Duration = Duration::from_secs(60);
/// CAC time for the weather-radar sub-band (ETSI, channels 120-128).
pub const WEATHER_CAC_TIME: Duration = Duration::from_secs(600);

const DFS_CHANNELS: std::ops::RangeInclusive<u16> = 52..=144;
const WEATHER_CHANNELS: std::ops::RangeInclusive<u16> = 120..=128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum Band {
    #[strum(serialize = "2.4GHz")]
    Ghz2_4,
    #[strum(serialize = "5GHz")]
    Ghz5,
    #[strum(serialize = "6GHz")]
    Ghz6,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum Bandwidth {
    #[strum(serialize = "20MHz")]
    Mhz20,
    #[strum(serialize = "40MHz")]
    Mhz40,
    #[strum(serialize = "80MHz")]
    Mhz80,
    #[strum(serialize = "160MHz")]
    Mhz160,
}

impl Bandwidth {
    pub fn mhz(self) -> u16 {
        match self {
            Self::Mhz20 => 20,
            Self::Mhz40 => 40,
            Self::Mhz80 => 80,
            Self::Mhz160 => 160,
        }
    }

    /// Number of 20 MHz sub-channels in a block of this width.
    pub fn subchannel_count(self) -> u16 {
        self.mhz() / 20
    }

    pub fn half(self) -> Option<Self> {
        match self {
            Self::Mhz20 => None,
            Self::Mhz40 => Some(Self::Mhz20),
            Self::Mhz80 => Some(Self::Mhz40),
            Self::Mhz160 => Some(Self::Mhz80),
        }
    }
}

/// Operating channel of a radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub band: Band,
    pub channel: u16,
    pub bandwidth: Bandwidth,
}

impl ChannelSpec {
    pub fn new(band: Band, channel: u16, bandwidth: Bandwidth) -> Self {
        Self {
            band,
            channel,
            bandwidth,
        }
    }

    /// First 20 MHz channel of the operating block.
    pub fn block_start(&self) -> u16 {
        match self.band {
            // 2.4 GHz blocks overlap; the primary channel stands for the block.
            Band::Ghz2_4 => self.channel,
            Band::Ghz5 => {
                let base = if self.channel >= 149 { 149 } else { 36 };
                let span = 4 * self.bandwidth.subchannel_count();
                if self.channel < base {
                    return self.channel;
                }
                base + ((self.channel - base) / span) * span
            }
            Band::Ghz6 => {
                let span = 4 * self.bandwidth.subchannel_count();
                1 + ((self.channel.saturating_sub(1)) / span) * span
            }
        }
    }

    /// Every 20 MHz channel covered by the operating block.
    pub fn subchannels(&self) -> Vec<u16> {
        if self.band == Band::Ghz2_4 {
            return vec![self.channel];
        }
        let start = self.block_start();
        (0..self.bandwidth.subchannel_count())
            .map(|i| start + 4 * i)
            .collect()
    }

    /// Any sub-channel lies in the radar-detection range.
    pub fn is_dfs(&self) -> bool {
        self.band == Band::Ghz5 && self.subchannels().iter().any(|c| DFS_CHANNELS.contains(c))
    }

    pub fn is_weather(&self) -> bool {
        self.band == Band::Ghz5
            && self
                .subchannels()
                .iter()
                .any(|c| WEATHER_CHANNELS.contains(c))
    }

    /// Passive listening is needed before transmitting on this block.
    pub fn requires_clearing(&self) -> bool {
        self.is_dfs()
    }

    /// Time a channel availability check on this block takes.
    pub fn clear_time(&self) -> Duration {
        if !self.is_dfs() {
            Duration::ZERO
        } else if self.is_weather() {
            WEATHER_CAC_TIME
        } else {
            CAC_TIME
        }
    }

    /// Primary channel centre frequency in MHz.
    pub fn freq(&self) -> u32 {
        let ch = u32::from(self.channel);
        match self.band {
            Band::Ghz2_4 if self.channel == 14 => 2484,
            Band::Ghz2_4 => 2407 + 5 * ch,
            Band::Ghz5 => 5000 + 5 * ch,
            Band::Ghz6 => 5950 + 5 * ch,
        }
    }

    /// Centre frequency of the whole block in MHz.
    pub fn center_freq(&self) -> u32 {
        let subs = self.subchannels();
        let first = subs.first().copied().unwrap_or(self.channel);
        let last = subs.last().copied().unwrap_or(self.channel);
        let centre = Self {
            channel: (first + last) / 2,
            ..*self
        };
        centre.freq()
    }

    /// `other` covers every sub-channel of `self`.
    pub fn is_within(&self, other: &Self) -> bool {
        let outer = other.subchannels();
        self.band == other.band && self.subchannels().iter().all(|c| outer.contains(c))
    }

    /// Block a background radar chain must clear before switching from
    /// `current` to `self`.
    ///
    /// When only the bandwidth grows on the same channel and the current
    /// block is exactly one half of the target, only the other half still
    /// needs clearing; the half in use is already known to be free.
    pub fn pre_clear_block(&self, current: &Self) -> Self {
        let same_channel = current.band == self.band && current.channel == self.channel;
        if !same_channel || self.bandwidth <= current.bandwidth {
            return *self;
        }
        let Some(half) = self.bandwidth.half() else {
            return *self;
        };
        if current.bandwidth != half || !current.is_within(self) {
            return *self;
        }

        let subs = self.subchannels();
        let split = usize::from(half.subchannel_count());
        let (lower, upper) = subs.split_at(split.min(subs.len()));
        let other_half = if lower.contains(&current.channel) { upper } else { lower };
        match other_half.first() {
            Some(&channel) => Self::new(self.band, channel, half),
            None => *self,
        }
    }
}

impl fmt::Display for ChannelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.channel, self.bandwidth.mhz(), self.band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch5(channel: u16, bw: Bandwidth) -> ChannelSpec {
        ChannelSpec::new(Band::Ghz5, channel, bw)
    }

    #[test]
    fn block_start_alignment() {
        assert_eq!(ch5(44, Bandwidth::Mhz80).block_start(), 36);
        assert_eq!(ch5(116, Bandwidth::Mhz80).block_start(), 116);
        assert_eq!(ch5(124, Bandwidth::Mhz160).block_start(), 100);
        assert_eq!(ch5(157, Bandwidth::Mhz80).block_start(), 149);
        assert_eq!(ch5(104, Bandwidth::Mhz40).block_start(), 100);
    }

    #[test]
    fn subchannels_of_80mhz_block() {
        assert_eq!(ch5(108, Bandwidth::Mhz80).subchannels(), vec![100, 104, 108, 112]);
    }

    #[test]
    fn dfs_detection() {
        assert!(!ch5(36, Bandwidth::Mhz80).is_dfs());
        assert!(ch5(52, Bandwidth::Mhz20).is_dfs());
        // 36-64 at 160 MHz reaches into the DFS range.
        assert!(ch5(36, Bandwidth::Mhz160).is_dfs());
        assert!(!ChannelSpec::new(Band::Ghz2_4, 6, Bandwidth::Mhz20).is_dfs());
        assert!(!ChannelSpec::new(Band::Ghz6, 37, Bandwidth::Mhz160).is_dfs());
    }

    #[test]
    fn clear_times() {
        assert_eq!(ch5(36, Bandwidth::Mhz20).clear_time(), Duration::ZERO);
        assert_eq!(ch5(100, Bandwidth::Mhz40).clear_time(), CAC_TIME);
        assert_eq!(ch5(116, Bandwidth::Mhz80).clear_time(), WEATHER_CAC_TIME);
    }

    #[test]
    fn frequencies() {
        assert_eq!(ch5(36, Bandwidth::Mhz20).freq(), 5180);
        assert_eq!(ch5(100, Bandwidth::Mhz80).center_freq(), 5530);
        assert_eq!(ChannelSpec::new(Band::Ghz2_4, 14, Bandwidth::Mhz20).freq(), 2484);
        assert_eq!(ChannelSpec::new(Band::Ghz2_4, 6, Bandwidth::Mhz20).freq(), 2437);
    }

    #[test]
    fn pre_clear_for_new_channel_is_the_target() {
        let current = ch5(36, Bandwidth::Mhz80);
        let target = ch5(100, Bandwidth::Mhz80);
        assert_eq!(target.pre_clear_block(&current), target);
    }

    #[test]
    fn pre_clear_for_bandwidth_doubling_is_other_half() {
        let current = ch5(100, Bandwidth::Mhz40);
        let target = ch5(100, Bandwidth::Mhz80);
        assert_eq!(target.pre_clear_block(&current), ch5(108, Bandwidth::Mhz40));

        let current = ch5(60, Bandwidth::Mhz80);
        let target = ch5(60, Bandwidth::Mhz160);
        assert_eq!(target.pre_clear_block(&current), ch5(36, Bandwidth::Mhz80));
    }

    #[test]
    fn pre_clear_for_larger_jump_is_whole_block() {
        let current = ch5(100, Bandwidth::Mhz20);
        let target = ch5(100, Bandwidth::Mhz80);
        assert_eq!(target.pre_clear_block(&current), target);
    }

    #[test]
    fn pre_clear_for_bandwidth_shrink_is_target() {
        let current = ch5(100, Bandwidth::Mhz80);
        let target = ch5(100, Bandwidth::Mhz40);
        assert_eq!(target.pre_clear_block(&current), target);
    }
}
