// ── Zero-wait DFS sequencing ──
//
// Moves a radio onto a new channel without going dark for a channel
// availability check: the background radar chain clears the target block
// while the radio keeps serving on its current channel, then the radio
// switches. Every non-`Init` state is bounded by a safety timer that
// synthesizes `Stop` on expiry.

use std::time::Duration;

use serde::Serialize;
use strum::{Display, EnumString, IntoStaticStr};
use wifid_ctrl::{CtrlEvent, CtrlEventKind};

use crate::error::CoreError;
use crate::model::{BgDfsState, ChannelSpec, RadioChange, RadioRecord, RadioStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ZwdfsState {
    #[default]
    Init,
    ForegroundClearing,
    BackgroundClearing,
    Switching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ZwdfsEvent {
    Start,
    Stop,
    ClearDone,
    Radar,
    End,
}

/// What the state machine needs from the radio and driver layers.
pub trait ZwdfsEnv {
    fn radio(&self) -> &RadioRecord;

    /// A commit is reconfiguring the radio right now.
    fn is_commit_pending(&self) -> bool;

    fn apply_channel_switch(&mut self, target: &ChannelSpec, direct: bool) -> Result<(), CoreError>;

    /// Queue the switch for the next commit instead of issuing it now.
    fn defer_channel_switch(&mut self, target: &ChannelSpec);

    fn start_background_clear(&mut self, block: &ChannelSpec) -> Result<(), CoreError>;

    fn stop_background_clear(&mut self) -> Result<(), CoreError>;

    fn arm_safety_timer(&mut self, timeout: Duration);

    fn disarm_safety_timer(&mut self);
}

/// One per radio with a background radar chain.
#[derive(Debug, Clone)]
pub struct ZwdfsMachine {
    radio: String,
    state: ZwdfsState,
    previous: ZwdfsState,
    target: Option<ChannelSpec>,
    direct_switch: bool,
    base_timeout: Duration,
    safety_armed: bool,
}

impl ZwdfsMachine {
    pub fn new(radio: impl Into<String>, base_timeout: Duration) -> Self {
        Self {
            radio: radio.into(),
            state: ZwdfsState::Init,
            previous: ZwdfsState::Init,
            target: None,
            direct_switch: false,
            base_timeout,
            safety_armed: false,
        }
    }

    pub fn state(&self) -> ZwdfsState {
        self.state
    }

    pub fn previous_state(&self) -> ZwdfsState {
        self.previous
    }

    pub fn target(&self) -> Option<ChannelSpec> {
        self.target
    }

    pub fn is_safety_timer_armed(&self) -> bool {
        self.safety_armed
    }

    /// Set the target and feed `Start`.
    pub fn start(&mut self, target: ChannelSpec, direct: bool, env: &mut dyn ZwdfsEnv) -> ZwdfsState {
        self.target = Some(target);
        self.direct_switch = direct;
        self.handle_event(ZwdfsEvent::Start, env)
    }

    pub fn handle_event(&mut self, event: ZwdfsEvent, env: &mut dyn ZwdfsEnv) -> ZwdfsState {
        use ZwdfsEvent as E;
        use ZwdfsState as S;

        let next = match (self.state, event) {
            (S::Init, E::Start)
            | (S::ForegroundClearing, E::ClearDone | E::Radar)
            | (S::BackgroundClearing | S::Switching, E::Start) => self.evaluate_start(env),
            (S::ForegroundClearing | S::BackgroundClearing | S::Switching, E::Stop) | (S::BackgroundClearing, E::Radar) => {
                self.stop(env)
            }
            (S::BackgroundClearing, E::ClearDone) => self.switch_after_clear(env),
            (S::Switching, E::End) => {
                self.disarm(env);
                self.target = None;
                S::Init
            }
            (state, event) => {
                tracing::info!(radio = %self.radio, %state, %event, "ignoring zwdfs event");
                return state;
            }
        };

        if next != self.state {
            tracing::debug!(radio = %self.radio, from = %self.state, to = %next, %event, "zwdfs transition");
            self.previous = self.state;
            self.state = next;
        }
        next
    }

    fn evaluate_start(&mut self, env: &mut dyn ZwdfsEnv) -> ZwdfsState {
        let Some(target) = self.target else {
            tracing::warn!(radio = %self.radio, "zwdfs start without a target channel");
            return self.stop(env);
        };
        self.disarm(env);
        env.arm_safety_timer(self.base_timeout + target.clear_time());
        self.safety_armed = true;

        let radio = env.radio();
        if radio.is_in_fg_cac() {
            return ZwdfsState::ForegroundClearing;
        }
        if self.direct_switch || !target.requires_clearing() || !radio.bg_dfs_enabled {
            return self.switch_to(target, true, env);
        }

        let block = target.pre_clear_block(&radio.channel);
        if let Err(e) = env.stop_background_clear() {
            tracing::debug!(radio = %self.radio, error = %e, "no background clear to stop");
        }
        match env.start_background_clear(&block) {
            Ok(()) => {
                tracing::info!(radio = %self.radio, %block, "background clearing started");
                ZwdfsState::BackgroundClearing
            }
            Err(e) => {
                tracing::warn!(radio = %self.radio, error = %e, "background clear failed, switching directly");
                self.switch_to(target, true, env)
            }
        }
    }

    fn switch_after_clear(&mut self, env: &mut dyn ZwdfsEnv) -> ZwdfsState {
        match self.target {
            Some(target) => self.switch_to(target, false, env),
            None => self.stop(env),
        }
    }

    /// Issue the switch, or queue it behind an in-flight commit.
    fn switch_to(&self, target: ChannelSpec, direct: bool, env: &mut dyn ZwdfsEnv) -> ZwdfsState {
        if env.is_commit_pending() {
            tracing::debug!(radio = %self.radio, %target, "commit in flight, deferring channel switch");
            env.defer_channel_switch(&target);
        } else if let Err(e) = env.apply_channel_switch(&target, direct) {
            tracing::warn!(radio = %self.radio, %target, error = %e, "channel switch failed");
        }
        ZwdfsState::Switching
    }

    fn stop(&mut self, env: &mut dyn ZwdfsEnv) -> ZwdfsState {
        if let Err(e) = env.stop_background_clear() {
            tracing::debug!(radio = %self.radio, error = %e, "stop background clear failed");
        }
        self.disarm(env);
        self.target = None;
        ZwdfsState::Init
    }

    fn disarm(&mut self, env: &mut dyn ZwdfsEnv) {
        if self.safety_armed {
            env.disarm_safety_timer();
            self.safety_armed = false;
        }
    }
}

// ── Event synthesis ──────────────────────────────────────────────────

/// Event implied by a radio-layer change, if any.
pub fn event_for_change(change: &RadioChange, target: Option<&ChannelSpec>) -> Option<ZwdfsEvent> {
    match *change {
        RadioChange::Status {
            old: RadioStatus::FgCac,
            new: RadioStatus::Up,
        } => Some(ZwdfsEvent::ClearDone),
        RadioChange::Status {
            old: RadioStatus::FgCac,
            new: RadioStatus::Down | RadioStatus::Error,
        } => Some(ZwdfsEvent::Radar),
        RadioChange::BackgroundDfs {
            old: BgDfsState::Clearing,
            new: BgDfsState::Available,
        } => Some(ZwdfsEvent::ClearDone),
        RadioChange::BackgroundDfs { old, new: BgDfsState::RadarDetected } if old != BgDfsState::RadarDetected => {
            Some(ZwdfsEvent::Radar)
        }
        RadioChange::Channel { new, .. } if target.is_some_and(|t| *t == new) => Some(ZwdfsEvent::End),
        _ => None,
    }
}

/// Event implied by an unsolicited daemon message in `state`.
///
/// While clearing in the background only background-chain reports count,
/// and vice versa, so a stray foreground CAC result cannot trigger the
/// switch early.
pub fn event_for_ctrl(event: &CtrlEvent, state: ZwdfsState) -> Option<ZwdfsEvent> {
    let relevant = match state {
        ZwdfsState::BackgroundClearing => event.is_background(),
        ZwdfsState::ForegroundClearing => !event.is_background(),
        ZwdfsState::Init | ZwdfsState::Switching => false,
    };
    if !relevant {
        return None;
    }
    match event.kind {
        CtrlEventKind::DfsCacCompleted if event.cac_succeeded() => Some(ZwdfsEvent::ClearDone),
        CtrlEventKind::DfsCacCompleted | CtrlEventKind::DfsRadarDetected => Some(ZwdfsEvent::Radar),
        _ => None,
    }
}
