// ── Core error types ──
//
// Domain errors from wifid-core. Callers never see raw socket errors;
// the `From<wifid_ctrl::Error>` impl translates transport-layer failures
// into the same taxonomy the driver and config layers use.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Link errors ──────────────────────────────────────────────────
    #[error("control link for {iface} is not ready")]
    NotReady { iface: String },

    #[error("daemon did not answer within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("protocol error: {message}")]
    Protocol { message: String },

    #[error("daemon rejected '{command}': {reply}")]
    Rejected { command: String, reply: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    // ── Driver errors ────────────────────────────────────────────────
    #[error("operation not implemented by driver: {operation}")]
    NotImplemented { operation: &'static str },

    #[error("driver failure in {operation}: {message}")]
    Driver {
        operation: &'static str,
        message: String,
    },

    // ── File errors ──────────────────────────────────────────────────
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn not_found(entity_type: &'static str, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            identifier: identifier.into(),
        }
    }

    /// Absent optional data; callers usually treat this as "nothing to do".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<wifid_ctrl::Error> for CoreError {
    fn from(err: wifid_ctrl::Error) -> Self {
        match err {
            wifid_ctrl::Error::NotReady => CoreError::NotReady {
                iface: "<unknown>".into(),
            },
            wifid_ctrl::Error::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            wifid_ctrl::Error::Partial { len, capacity } => CoreError::Protocol {
                message: format!("reply of {len} bytes exceeds buffer of {capacity}"),
            },
            wifid_ctrl::Error::PartialWrite { written, expected } => CoreError::Protocol {
                message: format!("partial write: {written} of {expected} bytes"),
            },
            wifid_ctrl::Error::Protocol(message) => CoreError::Protocol { message },
            wifid_ctrl::Error::Failed { command, reply } => CoreError::Rejected { command, reply },
            wifid_ctrl::Error::NotFound { key } => CoreError::NotFound {
                entity_type: "reply key",
                identifier: key,
            },
            wifid_ctrl::Error::InvalidArgument { field, reason } => CoreError::InvalidArgument {
                field: field.into(),
                reason,
            },
            wifid_ctrl::Error::Io(source) => CoreError::Io {
                path: "<control socket>".into(),
                source,
            },
        }
    }
}
