// ── Commit scheduler ──
//
// One debounce timer per radio. The first qualifying edit arms it; later
// edits ride along until it fires. The timer is never restarted while
// running, so a steady stream of edits cannot push the commit out forever.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Debounce parameters shared by every radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSettings {
    pub delay: Duration,
    /// Grace period after process start during which commits wait longer.
    pub boot_delay: Duration,
    /// Bits below this index never arm the timer by themselves.
    pub significant_bit: usize,
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
            boot_delay: Duration::from_secs(10),
            significant_bit: 0,
        }
    }
}

// ── CommitTimer ──────────────────────────────────────────────────────

/// Per-radio timer state.
#[derive(Debug)]
pub struct CommitTimer {
    pub last_call_time: Option<Instant>,
    pub min_boot_delay: Duration,
    pub configured_delay: Duration,
    running: Arc<AtomicBool>,
    cancel: Option<CancellationToken>,
}

impl CommitTimer {
    fn new(settings: &CommitSettings) -> Self {
        Self {
            last_call_time: None,
            min_boot_delay: settings.boot_delay,
            configured_delay: settings.delay,
            running: Arc::new(AtomicBool::new(false)),
            cancel: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// `max(configured_delay, boot delay still remaining)`.
    pub fn effective_delay(&self, started_at: Instant, now: Instant) -> Duration {
        let boot_remaining = self
            .min_boot_delay
            .saturating_sub(now.saturating_duration_since(started_at));
        self.configured_delay.max(boot_remaining)
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for CommitTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// What `notify` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Nothing significant pending.
    Ignored,
    /// A commit is still in flight; the next edit after it retries.
    CommitInFlight,
    /// Timer already armed; the pending commit will pick the edit up.
    AlreadyRunning,
    Armed(Duration),
    UnknownRadio,
}

// ── CommitScheduler ──────────────────────────────────────────────────

/// Sole owner of the per-radio commit timers.
#[derive(Debug)]
pub struct CommitScheduler {
    settings: CommitSettings,
    started_at: Instant,
    timers: DashMap<String, CommitTimer>,
}

impl CommitScheduler {
    pub fn new(settings: CommitSettings) -> Self {
        Self::with_start(settings, Instant::now())
    }

    /// Scheduler whose boot grace period counts from `started_at`.
    pub fn with_start(settings: CommitSettings, started_at: Instant) -> Self {
        Self {
            settings,
            started_at,
            timers: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &CommitSettings {
        &self.settings
    }

    pub fn register_radio(&self, radio: &str) {
        self.timers
            .entry(radio.to_owned())
            .or_insert_with(|| CommitTimer::new(&self.settings));
    }

    /// Cancel and forget the radio's timer.
    pub fn teardown_radio(&self, radio: &str) {
        if let Some((_, mut timer)) = self.timers.remove(radio) {
            timer.stop();
            tracing::debug!(radio, "commit timer torn down");
        }
    }

    pub fn is_running(&self, radio: &str) -> bool {
        self.timers.get(radio).is_some_and(|t| t.is_running())
    }

    pub fn stop(&self, radio: &str) {
        if let Some(mut timer) = self.timers.get_mut(radio) {
            timer.stop();
        }
    }

    /// Arm the radio's timer if the edit warrants a commit.
    ///
    /// `significant` says whether the radio (or one of its children) has
    /// pending bits at or above the threshold; `commit_in_flight` whether
    /// the driver is still applying the previous batch. `on_expiry` runs
    /// once when the timer fires.
    pub fn notify<F>(&self, radio: &str, significant: bool, commit_in_flight: bool, on_expiry: F) -> NotifyOutcome
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(mut timer) = self.timers.get_mut(radio) else {
            tracing::warn!(radio, "notify for unregistered radio");
            return NotifyOutcome::UnknownRadio;
        };
        let now = Instant::now();
        timer.last_call_time = Some(now);

        if !significant {
            return NotifyOutcome::Ignored;
        }
        if timer.is_running() {
            return NotifyOutcome::AlreadyRunning;
        }
        if commit_in_flight {
            tracing::debug!(radio, "commit in flight, not arming timer");
            return NotifyOutcome::CommitInFlight;
        }

        let delay = timer.effective_delay(self.started_at, now);
        let cancel = CancellationToken::new();
        let running = Arc::clone(&timer.running);
        running.store(true, Ordering::SeqCst);
        timer.cancel = Some(cancel.clone());

        let name = radio.to_owned();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    running.store(false, Ordering::SeqCst);
                    tracing::debug!(radio = %name, "commit timer expired");
                    on_expiry();
                }
            }
        });

        tracing::debug!(radio, delay_ms = delay.as_millis(), "commit timer armed");
        NotifyOutcome::Armed(delay)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn settings(delay_ms: u64, boot_ms: u64) -> CommitSettings {
        CommitSettings {
            delay: Duration::from_millis(delay_ms),
            boot_delay: Duration::from_millis(boot_ms),
            significant_bit: 0,
        }
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let make = move || {
            let c = Arc::clone(&c);
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }) as Box<dyn FnOnce() + Send>
        };
        (count, make)
    }

    #[test]
    fn effective_delay_respects_boot_grace() {
        let timer = CommitTimer::new(&settings(500, 10_000));
        let start = Instant::now();
        assert_eq!(timer.effective_delay(start, start), Duration::from_secs(10));
        assert_eq!(
            timer.effective_delay(start, start + Duration::from_millis(9_800)),
            Duration::from_millis(500)
        );
        assert_eq!(
            timer.effective_delay(start, start + Duration::from_secs(60)),
            Duration::from_millis(500)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_once_after_delay() {
        let scheduler = CommitScheduler::new(settings(500, 0));
        scheduler.register_radio("wifi0");
        let (count, make) = counter();

        let outcome = scheduler.notify("wifi0", true, false, make());
        assert_eq!(outcome, NotifyOutcome::Armed(Duration::from_millis(500)));
        assert!(scheduler.is_running("wifi0"));

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_running("wifi0"));
    }

    #[tokio::test(start_paused = true)]
    async fn running_timer_is_not_restarted() {
        let scheduler = CommitScheduler::new(settings(500, 0));
        scheduler.register_radio("wifi0");
        let (count, make) = counter();

        scheduler.notify("wifi0", true, false, make());
        tokio::time::sleep(Duration::from_millis(400)).await;
        let outcome = scheduler.notify("wifi0", true, false, make());
        assert_eq!(outcome, NotifyOutcome::AlreadyRunning);

        // Fires at the original deadline, not 500ms after the second edit.
        tokio::time::sleep(Duration::from_millis(101)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn insignificant_or_in_flight_does_not_arm() {
        let scheduler = CommitScheduler::new(settings(500, 0));
        scheduler.register_radio("wifi0");
        let (_, make) = counter();

        assert_eq!(scheduler.notify("wifi0", false, false, make()), NotifyOutcome::Ignored);
        assert_eq!(scheduler.notify("wifi0", true, true, make()), NotifyOutcome::CommitInFlight);
        assert_eq!(scheduler.notify("wifi1", true, false, make()), NotifyOutcome::UnknownRadio);
        assert!(!scheduler.is_running("wifi0"));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_timer() {
        let scheduler = CommitScheduler::new(settings(500, 0));
        scheduler.register_radio("wifi0");
        let (count, make) = counter();

        scheduler.notify("wifi0", true, false, make());
        scheduler.teardown_radio("wifi0");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!scheduler.is_running("wifi0"));
    }

    #[tokio::test(start_paused = true)]
    async fn boot_grace_extends_first_commit() {
        let scheduler = CommitScheduler::new(settings(500, 3_000));
        scheduler.register_radio("wifi0");
        let (_, make) = counter();

        let outcome = scheduler.notify("wifi0", true, false, make());
        assert_eq!(outcome, NotifyOutcome::Armed(Duration::from_secs(3)));
    }
}
