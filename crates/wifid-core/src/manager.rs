// ── Manager ──
//
// Facade the data-model layer talks to. Owns the registry, the driver,
// the per-radio commit timers and the per-radio ZWDFS machines, and
// makes sure a channel switch never lands in the middle of a commit.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use wifid_ctrl::CtrlEvent;

use crate::config::ManagerConfig;
use crate::conf::{Action, ConfigStore, SectionKey, classify_sections};
use crate::driver::{CommitStatus, Driver};
use crate::error::CoreError;
use crate::fsm::{CommitScheduler, FsmAttribute, NotifyOutcome, RadioAttr};
use crate::model::{AccessPointRecord, ChannelSpec, EndpointRecord, RadioChange, RadioRecord};
use crate::registry::Registry;
use crate::zwdfs::{ZwdfsEnv, ZwdfsEvent, ZwdfsMachine, ZwdfsState, event_for_change, event_for_ctrl};

struct ZwdfsSlot {
    machine: ZwdfsMachine,
    safety: Option<CancellationToken>,
}

/// Something for a radio's ZWDFS machine to act on.
enum ZwdfsInput {
    Start { target: ChannelSpec, direct: bool },
    Event(ZwdfsEvent),
    Change(RadioChange),
    Ctrl(CtrlEvent),
}

/// A radio's machine plus inputs that arrived while it was busy.
///
/// Driver calls made by the machine may report back into the manager on
/// the same task; those inputs are queued and run once the current one
/// finishes instead of waiting on the machine's lock.
struct ZwdfsCell {
    slot: Mutex<ZwdfsSlot>,
    queued: Mutex<VecDeque<ZwdfsInput>>,
    /// State after the last fully handled input.
    settled: Mutex<ZwdfsState>,
}

impl ZwdfsCell {
    fn new(slot: ZwdfsSlot) -> Self {
        Self {
            settled: Mutex::new(slot.machine.state()),
            slot: Mutex::new(slot),
            queued: Mutex::new(VecDeque::new()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Drop for ZwdfsSlot {
    fn drop(&mut self) {
        if let Some(cancel) = self.safety.take() {
            cancel.cancel();
        }
    }
}

struct Inner {
    config: ManagerConfig,
    registry: Registry,
    driver: Arc<dyn Driver>,
    scheduler: CommitScheduler,
    zwdfs: DashMap<String, Arc<ZwdfsCell>>,
}

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Manager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("driver", &self.inner.driver.name())
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

impl Manager {
    pub fn new(config: ManagerConfig, driver: Arc<dyn Driver>) -> Self {
        let scheduler = CommitScheduler::new(config.commit.clone());
        Self {
            inner: Arc::new(Inner {
                config,
                registry: Registry::new(),
                driver,
                scheduler,
                zwdfs: DashMap::new(),
            }),
        }
    }

    fn from_weak(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn driver(&self) -> &dyn Driver {
        self.inner.driver.as_ref()
    }

    // ── Entity lifecycle ─────────────────────────────────────────────

    pub fn add_radio(&self, record: RadioRecord) {
        let name = record.name.clone();
        self.inner.registry.add_radio(record);
        self.inner.scheduler.register_radio(&name);
        if self.inner.config.zwdfs.enabled {
            self.inner.zwdfs.insert(
                name.clone(),
                Arc::new(ZwdfsCell::new(ZwdfsSlot {
                    machine: ZwdfsMachine::new(&name, self.inner.config.zwdfs.base_timeout),
                    safety: None,
                })),
            );
        }
        tracing::info!(radio = %name, "radio registered");
    }

    pub fn add_access_point(&self, record: AccessPointRecord) -> Result<(), CoreError> {
        self.inner.registry.add_access_point(record)
    }

    pub fn add_endpoint(&self, record: EndpointRecord) -> Result<(), CoreError> {
        self.inner.registry.add_endpoint(record)
    }

    /// Cancel the radio's timers, stop any background clearing and forget
    /// the radio with everything on it.
    pub fn teardown_radio(&self, radio: &str) -> Option<RadioRecord> {
        self.inner.scheduler.teardown_radio(radio);
        if let Some((_, cell)) = self.inner.zwdfs.remove(radio) {
            let active = match cell.slot.try_lock() {
                Ok(slot) => slot.machine.state() != ZwdfsState::Init,
                Err(TryLockError::Poisoned(slot)) => slot.into_inner().machine.state() != ZwdfsState::Init,
                // Torn down from inside one of its own driver calls.
                Err(TryLockError::WouldBlock) => true,
            };
            if active {
                if let Some(record) = self.inner.registry.radio(radio) {
                    if let Err(e) = self.inner.driver.stop_background_clear(&record) {
                        tracing::debug!(radio, error = %e, "stop background clear on teardown failed");
                    }
                }
            }
        }
        let removed = self.inner.registry.remove_radio(radio);
        if removed.is_some() {
            tracing::info!(radio, "radio torn down");
        }
        removed
    }

    /// Tear down every radio.
    pub fn shutdown(&self) {
        for radio in self.inner.registry.radio_names() {
            self.teardown_radio(&radio);
        }
    }

    // ── Commit batching ──────────────────────────────────────────────

    /// Record a changed attribute and arm the owning radio's commit timer.
    pub fn mark_changed<A: FsmAttribute>(&self, entity: &str, attr: A) -> Result<NotifyOutcome, CoreError> {
        let radio = self.inner.registry.mark(entity, attr)?;
        tracing::trace!(entity, ?attr, radio = %radio, "attribute marked");
        Ok(self.notify(&radio))
    }

    /// Force a full resync of `radio` on its next commit.
    pub fn mark_sync_all(&self, radio: &str) -> Result<NotifyOutcome, CoreError> {
        self.inner.registry.mark_sync_all(radio)?;
        Ok(self.notify(radio))
    }

    fn notify(&self, radio: &str) -> NotifyOutcome {
        let threshold = self.inner.config.commit.significant_bit;
        let significant = self.inner.registry.has_significant_pending(radio, threshold);
        let in_flight = self.inner.registry.is_commit_pending(radio);

        let weak = Arc::downgrade(&self.inner);
        let name = radio.to_owned();
        self.inner.scheduler.notify(radio, significant, in_flight, move || {
            if let Some(manager) = Self::from_weak(&weak) {
                // The next edit re-arms the timer either way.
                match manager.try_commit(&name) {
                    Ok(status) => tracing::trace!(radio = %name, ?status, "timed commit finished"),
                    Err(e) => tracing::debug!(radio = %name, error = %e, "timed commit did not run"),
                }
            }
        })
    }

    /// A commit on the radio has started and not been confirmed.
    pub fn is_commit_pending(&self, radio: &str) -> bool {
        self.inner.registry.is_commit_pending(radio)
    }

    /// Hand every pending bit on `radio` to the driver.
    ///
    /// Returns `Ok(None)` when nothing was committed: a previous commit is
    /// still in flight, or nothing is pending.
    pub fn try_commit(&self, radio: &str) -> Result<Option<CommitStatus>, CoreError> {
        let registry = &self.inner.registry;
        if registry.is_commit_pending(radio) {
            tracing::debug!(radio, "commit already in flight, waiting for next edit");
            return Ok(None);
        }
        let request = registry.begin_commit(radio)?;
        if request.is_empty() {
            registry.end_commit(radio);
            return Ok(None);
        }

        tracing::debug!(
            radio,
            aps = request.access_points.len(),
            endpoints = request.endpoints.len(),
            "committing"
        );
        match self.inner.driver.commit(&request) {
            Ok(CommitStatus::Done) => {
                self.commit_done(radio);
                Ok(Some(CommitStatus::Done))
            }
            Ok(CommitStatus::InProgress) => Ok(Some(CommitStatus::InProgress)),
            Err(e) => {
                tracing::warn!(radio, error = %e, "commit failed");
                registry.abort_commit(radio);
                Err(e)
            }
        }
    }

    /// Driver confirmation that the in-flight commit finished. Edits that
    /// arrived meanwhile get their own commit.
    pub fn commit_done(&self, radio: &str) {
        self.inner.registry.end_commit(radio);
        tracing::debug!(radio, "commit confirmed");
        self.notify(radio);
    }

    // ── Config classification ────────────────────────────────────────

    pub fn classify(&self, old: &ConfigStore, new: &ConfigStore, section: SectionKey<'_>, iface_enabled: bool) -> Action {
        classify_sections(old, new, section, iface_enabled)
    }

    // ── Zero-wait DFS ────────────────────────────────────────────────

    /// State after the last fully handled input.
    pub fn zwdfs_state(&self, radio: &str) -> Option<ZwdfsState> {
        self.inner.zwdfs.get(radio).map(|cell| *lock(&cell.settled))
    }

    /// Start moving `radio` to its requested channel.
    ///
    /// Returns the state once every queued input is handled. Called from
    /// inside one of the radio's own driver calls, the start is queued
    /// and the current state is returned.
    pub fn zwdfs_start(&self, radio: &str, direct: bool) -> Result<ZwdfsState, CoreError> {
        let record = self
            .inner
            .registry
            .radio(radio)
            .ok_or_else(|| CoreError::not_found("radio", radio))?;
        let target = record.target_channel.ok_or_else(|| CoreError::InvalidArgument {
            field: "target_channel".into(),
            reason: format!("radio {radio} has no requested channel"),
        })?;
        self.drive_to_state(radio, ZwdfsInput::Start { target, direct })
    }

    pub fn zwdfs_stop(&self, radio: &str) -> Result<ZwdfsState, CoreError> {
        self.zwdfs_event(radio, ZwdfsEvent::Stop)
    }

    pub fn zwdfs_event(&self, radio: &str, event: ZwdfsEvent) -> Result<ZwdfsState, CoreError> {
        if self.inner.registry.radio(radio).is_none() {
            return Err(CoreError::not_found("radio", radio));
        }
        self.drive_to_state(radio, ZwdfsInput::Event(event))
    }

    /// Apply a change reported by the radio layer and feed any event it
    /// implies to the radio's ZWDFS machine.
    pub fn on_radio_change(&self, radio: &str, change: RadioChange) -> Result<Option<ZwdfsState>, CoreError> {
        self.inner.registry.update_radio(radio, |record| match change {
            RadioChange::Status { new, .. } => record.status = new,
            RadioChange::BackgroundDfs { new, .. } => record.bg_dfs_state = new,
            RadioChange::Channel { new, .. } => {
                record.channel = new;
                if record.target_channel == Some(new) {
                    record.target_channel = None;
                }
            }
        })?;

        if !self.inner.zwdfs.contains_key(radio) {
            return Ok(None);
        }
        self.drive(radio, ZwdfsInput::Change(change))
    }

    /// Feed a daemon DFS notification to the radio's ZWDFS machine.
    pub fn on_ctrl_event(&self, radio: &str, event: &CtrlEvent) -> Result<Option<ZwdfsState>, CoreError> {
        if !self.inner.zwdfs.contains_key(radio) {
            return Ok(None);
        }
        self.drive(radio, ZwdfsInput::Ctrl(event.clone()))
    }

    fn drive_to_state(&self, radio: &str, input: ZwdfsInput) -> Result<ZwdfsState, CoreError> {
        match self.drive(radio, input)? {
            Some(state) => Ok(state),
            None => self
                .zwdfs_state(radio)
                .ok_or_else(|| CoreError::not_found("zwdfs machine", radio)),
        }
    }

    /// Queue `input` and, unless the machine is already busy further up
    /// the stack, run everything queued. No map guard is held while the
    /// machine calls into the driver.
    ///
    /// Returns the state after the last input that produced an event.
    fn drive(&self, radio: &str, input: ZwdfsInput) -> Result<Option<ZwdfsState>, CoreError> {
        let cell = self
            .inner
            .zwdfs
            .get(radio)
            .map(|cell| Arc::clone(cell.value()))
            .ok_or_else(|| CoreError::not_found("zwdfs machine", radio))?;
        lock(&cell.queued).push_back(input);

        let mut last = None;
        loop {
            let mut slot = match cell.slot.try_lock() {
                Ok(slot) => slot,
                Err(TryLockError::Poisoned(slot)) => slot.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    tracing::debug!(radio, "zwdfs machine busy, input queued");
                    return Ok(last);
                }
            };
            let result = self.run_queued(radio, &cell, &mut slot, &mut last);
            *lock(&cell.settled) = slot.machine.state();
            drop(slot);
            result?;

            // Something may have been queued between the last pop and the unlock.
            if lock(&cell.queued).is_empty() {
                return Ok(last);
            }
        }
    }

    fn run_queued(
        &self,
        radio: &str,
        cell: &ZwdfsCell,
        slot: &mut ZwdfsSlot,
        last: &mut Option<ZwdfsState>,
    ) -> Result<(), CoreError> {
        loop {
            let next = lock(&cell.queued).pop_front();
            let Some(input) = next else {
                return Ok(());
            };
            if let Some(state) = self.apply_input(radio, slot, input)? {
                *last = Some(state);
            }
        }
    }

    fn apply_input(&self, radio: &str, slot: &mut ZwdfsSlot, input: ZwdfsInput) -> Result<Option<ZwdfsState>, CoreError> {
        let record = self
            .inner
            .registry
            .radio(radio)
            .ok_or_else(|| CoreError::not_found("radio", radio))?;
        let ZwdfsSlot { machine, safety } = slot;
        let mut env = RadioEnv {
            inner: &self.inner,
            radio: record,
            safety,
        };

        let event = match input {
            ZwdfsInput::Start { target, direct } => return Ok(Some(machine.start(target, direct, &mut env))),
            ZwdfsInput::Event(event) => Some(event),
            ZwdfsInput::Change(change) => event_for_change(&change, machine.target().as_ref()),
            ZwdfsInput::Ctrl(event) => event_for_ctrl(&event, machine.state()),
        };
        Ok(event.map(|event| machine.handle_event(event, &mut env)))
    }
}

// ── ZWDFS environment ────────────────────────────────────────────────

struct RadioEnv<'a> {
    inner: &'a Arc<Inner>,
    radio: RadioRecord,
    safety: &'a mut Option<CancellationToken>,
}

impl ZwdfsEnv for RadioEnv<'_> {
    fn radio(&self) -> &RadioRecord {
        &self.radio
    }

    fn is_commit_pending(&self) -> bool {
        self.inner.registry.is_commit_pending(&self.radio.name)
    }

    fn apply_channel_switch(&mut self, target: &ChannelSpec, direct: bool) -> Result<(), CoreError> {
        self.inner.driver.apply_channel_switch(&self.radio, target, direct)
    }

    fn defer_channel_switch(&mut self, target: &ChannelSpec) {
        let name = &self.radio.name;
        let marked = self
            .inner
            .registry
            .update_radio(name, |record| record.target_channel = Some(*target))
            .and_then(|()| self.inner.registry.mark(name, RadioAttr::Channel));
        if let Err(e) = marked {
            tracing::warn!(radio = %name, error = %e, "could not queue channel switch");
        }
    }

    fn start_background_clear(&mut self, block: &ChannelSpec) -> Result<(), CoreError> {
        self.inner.driver.start_background_clear(&self.radio, block)
    }

    fn stop_background_clear(&mut self) -> Result<(), CoreError> {
        self.inner.driver.stop_background_clear(&self.radio)
    }

    fn arm_safety_timer(&mut self, timeout: Duration) {
        self.disarm_safety_timer();
        let cancel = CancellationToken::new();
        *self.safety = Some(cancel.clone());

        let weak = Arc::downgrade(self.inner);
        let radio = self.radio.name.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(timeout) => {
                    tracing::warn!(radio = %radio, timeout_secs = timeout.as_secs(), "zwdfs safety timer expired");
                    if let Some(manager) = Manager::from_weak(&weak) {
                        if let Err(e) = manager.zwdfs_event(&radio, ZwdfsEvent::Stop) {
                            tracing::debug!(radio = %radio, error = %e, "zwdfs stop after timeout failed");
                        }
                    }
                }
            }
        });
    }

    fn disarm_safety_timer(&mut self) {
        if let Some(cancel) = self.safety.take() {
            cancel.cancel();
        }
    }
}
