// ── Control-socket client ──
//
// One client per managed interface, holding two datagram links to the
// daemon: a command link for request/reply and an event link subscribed
// with ATTACH. Readiness requires both links plus a successful ATTACH;
// any socket failure drops readiness and the owner must re-open.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::net::UnixDatagram;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;

use crate::command::{self, MacAddress};
use crate::error::Error;
use crate::event::{CtrlEvent, EVENT_CHANNEL_CAPACITY, event_loop};
use crate::reply::{StaInfo, StatusReply, is_token};

static LINK_COUNTER: AtomicU32 = AtomicU32::new(0);

// ── CtrlConfig ───────────────────────────────────────────────────────

/// Where the daemon listens and how long to wait for it.
#[derive(Debug, Clone)]
pub struct CtrlConfig {
    /// Daemon-side socket, e.g. `/var/run/hostapd/wlan0`.
    pub ctrl_path: PathBuf,
    /// Directory for the client-side sockets the daemon replies to.
    pub local_dir: PathBuf,
    /// Default timeout for request/reply exchanges.
    pub reply_timeout: Duration,
    /// Largest reply accepted before reporting [`Error::Partial`].
    pub buffer_size: usize,
}

impl CtrlConfig {
    /// Config for interface `iface` under the daemon's control directory.
    pub fn for_interface(ctrl_dir: impl AsRef<Path>, iface: &str) -> Self {
        Self {
            ctrl_path: ctrl_dir.as_ref().join(iface),
            ..Self::default()
        }
    }
}

impl Default for CtrlConfig {
    fn default() -> Self {
        Self {
            ctrl_path: PathBuf::from("/var/run/hostapd/wlan0"),
            local_dir: std::env::temp_dir(),
            reply_timeout: Duration::from_secs(2),
            buffer_size: 4096,
        }
    }
}

// ── Link ─────────────────────────────────────────────────────────────

/// A bound + connected datagram socket. The client-side socket file is
/// removed when the link is dropped.
struct Link {
    socket: Arc<UnixDatagram>,
    local_path: PathBuf,
}

impl Link {
    fn connect(config: &CtrlConfig, role: &str) -> Result<Self, Error> {
        let local_path = config.local_dir.join(format!(
            "wifid_{role}_{}-{}",
            std::process::id(),
            LINK_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        // A stale file from a crashed process would make bind fail.
        let _ = std::fs::remove_file(&local_path);

        let socket = UnixDatagram::bind(&local_path)?;
        if let Err(e) = socket.connect(&config.ctrl_path) {
            let _ = std::fs::remove_file(&local_path);
            return Err(e.into());
        }

        Ok(Self {
            socket: Arc::new(socket),
            local_path,
        })
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.local_path);
    }
}

// ── CtrlClient ───────────────────────────────────────────────────────

/// Duplex control-socket client for one interface of a security daemon.
pub struct CtrlClient {
    name: String,
    config: CtrlConfig,
    enabled: bool,
    cmd: Option<Link>,
    event: Option<Link>,
    attached: bool,
    ready: Arc<AtomicBool>,
    /// Serializes request/reply exchanges on the command link.
    exchange: Mutex<()>,
    /// Replies still owed for fire-and-forget sends on the command link.
    unanswered: AtomicUsize,
    event_tx: broadcast::Sender<Arc<CtrlEvent>>,
    reader_cancel: Option<CancellationToken>,
}

impl CtrlClient {
    pub fn new(name: impl Into<String>, config: CtrlConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            name: name.into(),
            config,
            enabled: true,
            cmd: None,
            event: None,
            attached: false,
            ready: Arc::new(AtomicBool::new(false)),
            exchange: Mutex::new(()),
            unanswered: AtomicUsize::new(0),
            event_tx,
            reader_cancel: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn socket_path(&self) -> &Path {
        &self.config.ctrl_path
    }

    pub fn config(&self) -> &CtrlConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling does not close an open link; it only refuses new `open()`s.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Both links open, ATTACH accepted, and no socket failure since.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst) && self.cmd.is_some() && self.attached
    }

    /// Subscribe to unsolicited events. Receivers survive re-opens.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<CtrlEvent>> {
        self.event_tx.subscribe()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Open the event link, ATTACH, then open the command link.
    ///
    /// On failure nothing is left half-open.
    pub async fn open(&mut self) -> Result<(), Error> {
        if !self.enabled {
            tracing::debug!(iface = %self.name, "open refused: interface disabled");
            return Err(Error::NotReady);
        }
        if self.is_ready() {
            return Ok(());
        }
        // Tear down leftovers from a lost connection.
        self.close().await;

        tracing::debug!(iface = %self.name, path = %self.config.ctrl_path.display(), "opening control connection");

        let event = Link::connect(&self.config, "ev")?;
        let reply = exchange_on(
            &event.socket,
            command::ATTACH,
            self.config.reply_timeout,
            self.config.buffer_size,
            &AtomicUsize::new(0),
        )
        .await?;
        if !is_token(&reply, command::REPLY_OK) {
            return Err(Error::Failed {
                command: command::ATTACH.into(),
                reply: reply.trim_end().into(),
            });
        }

        let cmd = match Link::connect(&self.config, "cmd") {
            Ok(link) => link,
            Err(e) => {
                let _ = event.socket.send(command::DETACH.as_bytes()).await;
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        tokio::spawn(event_loop(
            self.name.clone(),
            Arc::clone(&event.socket),
            self.event_tx.clone(),
            Arc::clone(&self.ready),
            cancel.clone(),
            self.config.buffer_size,
        ));

        self.event = Some(event);
        self.cmd = Some(cmd);
        self.attached = true;
        self.reader_cancel = Some(cancel);
        self.ready.store(true, Ordering::SeqCst);

        tracing::info!(iface = %self.name, "control connection ready");
        Ok(())
    }

    /// Best-effort DETACH, then close both links.
    pub async fn close(&mut self) {
        if let Some(cancel) = self.reader_cancel.take() {
            cancel.cancel();
        }
        if self.attached {
            if let Some(event) = &self.event {
                if let Err(e) = event.socket.send(command::DETACH.as_bytes()).await {
                    tracing::debug!(iface = %self.name, error = %e, "DETACH failed, closing anyway");
                }
            }
        }
        self.attached = false;
        self.ready.store(false, Ordering::SeqCst);
        self.event = None;
        self.cmd = None;
        self.unanswered.store(0, Ordering::SeqCst);
    }

    // ── Commands ─────────────────────────────────────────────────────

    fn cmd_socket(&self) -> Result<&UnixDatagram, Error> {
        if !self.is_ready() {
            return Err(Error::NotReady);
        }
        self.cmd
            .as_ref()
            .map(|link| link.socket.as_ref())
            .ok_or(Error::NotReady)
    }

    fn mark_lost(&self, err: &std::io::Error) {
        tracing::warn!(iface = %self.name, error = %err, "command socket lost");
        self.ready.store(false, Ordering::SeqCst);
    }

    /// Fire-and-forget write. The daemon still answers; that reply is
    /// discarded by the next exchange instead of being returned by it.
    pub async fn send(&self, cmd: &str) -> Result<(), Error> {
        let socket = self.cmd_socket()?;
        let _guard = self.exchange.lock().await;
        tracing::trace!(iface = %self.name, cmd, "send");
        match socket.send(cmd.as_bytes()).await {
            Ok(n) if n == cmd.len() => {
                self.unanswered.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Ok(written) => Err(Error::PartialWrite {
                written,
                expected: cmd.len(),
            }),
            Err(e) => {
                self.mark_lost(&e);
                Err(e.into())
            }
        }
    }

    /// Write `cmd` and wait up to `timeout` for its reply.
    pub async fn send_synced(&self, cmd: &str, timeout: Duration) -> Result<String, Error> {
        let socket = self.cmd_socket()?;
        let _guard = self.exchange.lock().await;
        tracing::debug!(iface = %self.name, cmd, "request");

        match exchange_on(socket, cmd, timeout, self.config.buffer_size, &self.unanswered).await {
            Err(Error::Io(e)) => {
                self.mark_lost(&e);
                Err(Error::Io(e))
            }
            other => other,
        }
    }

    /// `true` only if the reply equals `expected` (trailing newline ignored).
    pub async fn send_check_response(&self, cmd: &str, expected: &str, timeout: Duration) -> bool {
        match self.send_synced(cmd, timeout).await {
            Ok(reply) => is_token(&reply, expected),
            Err(e) => {
                tracing::debug!(iface = %self.name, cmd, error = %e, "command check failed");
                false
            }
        }
    }

    /// Request with the configured default timeout.
    pub async fn request(&self, cmd: &str) -> Result<String, Error> {
        self.send_synced(cmd, self.config.reply_timeout).await
    }

    /// Request that must be answered with `OK`.
    pub async fn request_ok(&self, cmd: &str) -> Result<(), Error> {
        let reply = self.request(cmd).await?;
        if is_token(&reply, command::REPLY_OK) {
            Ok(())
        } else {
            Err(Error::Failed {
                command: cmd.into(),
                reply: reply.trim_end().into(),
            })
        }
    }

    /// Liveness check.
    pub async fn ping(&self) -> bool {
        self.send_check_response(command::PING, command::PONG, self.config.reply_timeout)
            .await
    }

    pub async fn status(&self) -> Result<StatusReply, Error> {
        let reply = self.request(command::STATUS).await?;
        StatusReply::parse(&reply)
    }

    pub async fn sta(&self, mac: &MacAddress) -> Result<StaInfo, Error> {
        let reply = self.request(&command::sta(mac)).await?;
        StaInfo::parse(&reply)
    }
}

impl Drop for CtrlClient {
    fn drop(&mut self) {
        if let Some(cancel) = self.reader_cancel.take() {
            cancel.cancel();
        }
    }
}

// ── Exchange ─────────────────────────────────────────────────────────

/// Send one command and read its reply, skipping unsolicited messages.
///
/// Anything already queued on the socket (a reply that missed its
/// timeout, or the answer to a fire-and-forget send) is flushed first, and
/// replies still owed to earlier sends are skipped before ours.
async fn exchange_on(
    socket: &UnixDatagram,
    cmd: &str,
    timeout: Duration,
    buffer_size: usize,
    unanswered: &AtomicUsize,
) -> Result<String, Error> {
    // One spare byte so an oversized datagram is detectable.
    let mut buf = vec![0u8; buffer_size + 1];
    drain_stale(socket, &mut buf, unanswered)?;

    let written = socket.send(cmd.as_bytes()).await?;
    if written != cmd.len() {
        return Err(Error::PartialWrite {
            written,
            expected: cmd.len(),
        });
    }

    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let len = tokio::time::timeout_at(deadline, socket.recv(&mut buf))
            .await
            .map_err(|_| Error::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })??;

        if len > buffer_size {
            return Err(Error::Partial {
                len,
                capacity: buffer_size,
            });
        }
        if buf.first() == Some(&b'<') {
            tracing::trace!("skipping unsolicited message on request link");
            continue;
        }
        if take_unanswered(unanswered) {
            tracing::trace!("skipping reply to an earlier send");
            continue;
        }
        return Ok(String::from_utf8_lossy(&buf[..len]).into_owned());
    }
}

/// Consume one owed reply, if any.
fn take_unanswered(unanswered: &AtomicUsize) -> bool {
    unanswered
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Read and drop every datagram already queued, without waiting.
fn drain_stale(socket: &UnixDatagram, buf: &mut [u8], unanswered: &AtomicUsize) -> Result<(), Error> {
    loop {
        match socket.try_recv(buf) {
            Ok(_) => {
                if buf.first() != Some(&b'<') {
                    take_unanswered(unanswered);
                }
                tracing::trace!("dropped stale datagram on request link");
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
}
