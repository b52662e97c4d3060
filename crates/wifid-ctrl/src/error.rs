use thiserror::Error;

/// Top-level error type for the `wifid-ctrl` crate.
///
/// Covers every failure mode of a control-socket exchange with a security
/// daemon: link state, timeouts, reply framing and argument validation.
/// `wifid-core` maps these into domain-level errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Link state ──────────────────────────────────────────────────
    /// The connection was never opened, was closed, or lost its socket.
    #[error("control connection is not ready")]
    NotReady,

    // ── Exchange ────────────────────────────────────────────────────
    /// No reply arrived within the allotted time.
    #[error("no reply within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The reply did not fit into the reply buffer.
    #[error("reply truncated: {len} bytes exceed buffer of {capacity}")]
    Partial { len: usize, capacity: usize },

    /// A datagram write delivered fewer bytes than requested.
    #[error("partial write: {written} of {expected} bytes")]
    PartialWrite { written: usize, expected: usize },

    /// Malformed or truncated reply payload.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The daemon answered `FAIL` (or anything other than the expected token).
    #[error("command '{command}' failed: {reply}")]
    Failed { command: String, reply: String },

    /// An optional key was absent from a `key=value` reply.
    #[error("key '{key}' not present in reply")]
    NotFound { key: String },

    // ── Input ───────────────────────────────────────────────────────
    /// A command argument failed validation (MAC, PIN, hex, ...).
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Socket creation, bind or connect failure.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if reopening the connection might resolve the error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotReady | Self::Timeout { .. } | Self::Io(_))
    }

    /// Returns `true` if the link must be re-`open()`ed before further use.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady)
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }
}
