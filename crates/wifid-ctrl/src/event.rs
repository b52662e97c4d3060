//! Unsolicited event stream from an attached control connection.
//!
//! Once `ATTACH` succeeds the daemon pushes `<level>NAME args...` datagrams
//! on the event socket. A background task reads them, parses each into a
//! [`CtrlEvent`] and fans it out through a [`tokio::sync::broadcast`]
//! channel. The task never touches the command socket, so a caller blocked
//! in `send_synced` is unaffected by event traffic.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use strum::{Display, EnumString, IntoStaticStr};
use tokio::net::UnixDatagram;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

// ── Broadcast channel capacity ───────────────────────────────────────

pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 256;

// ── CtrlEventKind ────────────────────────────────────────────────────

/// Event names the control plane reacts to. Anything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Display, EnumString, IntoStaticStr, Serialize)]
pub enum CtrlEventKind {
    #[strum(serialize = "AP-STA-CONNECTED")]
    StaConnected,
    #[strum(serialize = "AP-STA-DISCONNECTED")]
    StaDisconnected,
    #[strum(serialize = "DFS-CAC-START")]
    DfsCacStart,
    #[strum(serialize = "DFS-CAC-COMPLETED")]
    DfsCacCompleted,
    #[strum(serialize = "DFS-RADAR-DETECTED")]
    DfsRadarDetected,
    #[strum(serialize = "DFS-NOP-FINISHED")]
    DfsNopFinished,
    #[strum(serialize = "CTRL-EVENT-CHANNEL-SWITCH", serialize = "AP-CSA-FINISHED")]
    ChannelSwitch,
    #[strum(serialize = "AP-ENABLED")]
    ApEnabled,
    #[strum(serialize = "AP-DISABLED")]
    ApDisabled,
    #[strum(serialize = "CTRL-EVENT-TERMINATING")]
    Terminating,
    #[strum(serialize = "WPS-SUCCESS", serialize = "WPS-REG-SUCCESS")]
    WpsSuccess,
    #[strum(default)]
    Other(String),
}

// ── CtrlEvent ────────────────────────────────────────────────────────

/// A parsed unsolicited message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CtrlEvent {
    /// Interface that emitted the event, when the daemon prefixed `IFNAME=`.
    pub ifname: Option<String>,
    /// Message priority (`<3>` → 3).
    pub level: u8,
    pub name: String,
    pub kind: CtrlEventKind,
    /// Whitespace-separated arguments after the event name.
    pub args: Vec<String>,
}

impl CtrlEvent {
    /// Parse `[IFNAME=<if> ]<level>NAME args...`. Returns `None` for
    /// anything that is not an unsolicited message (e.g. a stray `OK`).
    pub fn parse(raw: &str) -> Option<Self> {
        let mut rest = raw.trim_end_matches(['\n', '\r', '\0']);

        let mut ifname = None;
        if let Some(tail) = rest.strip_prefix("IFNAME=") {
            let (name, after) = tail.split_once(' ')?;
            ifname = Some(name.to_owned());
            rest = after;
        }

        let body = rest.strip_prefix('<')?;
        let (level, body) = body.split_once('>')?;
        let level = level.parse().ok()?;

        let mut parts = body.split_whitespace();
        let name = parts.next()?.to_owned();
        let args = parts.map(str::to_owned).collect();
        let kind = name
            .parse()
            .unwrap_or_else(|_| CtrlEventKind::Other(name.clone()));

        Some(Self {
            ifname,
            level,
            name,
            kind,
            args,
        })
    }

    /// Value of a `key=value` argument, with trailing separators trimmed.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args.iter().find_map(|a| {
            a.split_once('=')
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| v.trim_end_matches(','))
        })
    }

    /// The first bare argument, conventionally the station address.
    pub fn subject(&self) -> Option<&str> {
        self.args.iter().map(String::as_str).find(|a| !a.contains('='))
    }

    /// `DFS-CAC-COMPLETED success=1` vs an aborted check.
    pub fn cac_succeeded(&self) -> bool {
        self.kind == CtrlEventKind::DfsCacCompleted && self.arg("success") == Some("1")
    }

    /// DFS events raised by the dedicated background radar chain.
    pub fn is_background(&self) -> bool {
        self.arg("radar_background") == Some("1")
    }
}

// ── Background read loop ─────────────────────────────────────────────

/// Read events until cancellation, socket loss or daemon termination.
///
/// Any exit other than cancellation drops the connection's readiness so
/// the owner knows to re-open it.
pub(crate) async fn event_loop(
    name: String,
    socket: Arc<UnixDatagram>,
    event_tx: broadcast::Sender<Arc<CtrlEvent>>,
    ready: Arc<AtomicBool>,
    cancel: CancellationToken,
    buffer_size: usize,
) {
    let mut buf = vec![0u8; buffer_size];

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(iface = %name, "event reader cancelled");
                return;
            }
            received = socket.recv(&mut buf) => {
                let len = match received {
                    Ok(len) => len,
                    Err(e) => {
                        tracing::warn!(iface = %name, error = %e, "event socket lost");
                        ready.store(false, Ordering::SeqCst);
                        return;
                    }
                };
                let text = String::from_utf8_lossy(&buf[..len]);
                let Some(event) = CtrlEvent::parse(&text) else {
                    tracing::trace!(iface = %name, msg = %text.trim_end(), "non-event message on event socket");
                    continue;
                };
                tracing::debug!(iface = %name, event = %event.name, "control event");

                let terminating = event.kind == CtrlEventKind::Terminating;
                // No subscribers is fine.
                let _ = event_tx.send(Arc::new(event));

                if terminating {
                    tracing::info!(iface = %name, "daemon terminating, connection no longer ready");
                    ready.store(false, Ordering::SeqCst);
                    return;
                }
            }
        }
    }
}
