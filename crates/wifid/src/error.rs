//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use wifid_config::ConfigError;
use wifid_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not talk to the daemon for {iface}")]
    #[diagnostic(
        code(wifid::not_ready),
        help(
            "Check that the daemon is running and its control socket exists.\n\
             Socket: {path}\n\
             Override the directory with --ctrl-dir."
        )
    )]
    NotReady { iface: String, path: String },

    #[error("Daemon did not answer within {timeout_ms}ms")]
    #[diagnostic(
        code(wifid::timeout),
        help("Increase the reply timeout with --timeout-ms.")
    )]
    Timeout { timeout_ms: u64 },

    #[error("Daemon rejected '{command}': {reply}")]
    #[diagnostic(code(wifid::rejected))]
    Rejected { command: String, reply: String },

    #[error("Protocol error: {message}")]
    #[diagnostic(code(wifid::protocol))]
    Protocol { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(wifid::not_found), help("{hint}"))]
    NotFound {
        resource_type: String,
        identifier: String,
        hint: String,
    },

    // ── Unsupported ──────────────────────────────────────────────────
    #[error("Operation '{operation}' is not supported by this driver")]
    #[diagnostic(code(wifid::unsupported))]
    Unsupported { operation: String },

    #[error("Driver failure in {operation}: {message}")]
    #[diagnostic(code(wifid::driver))]
    Driver { operation: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(wifid::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file already exists")]
    #[diagnostic(
        code(wifid::config_exists),
        help(
            "Use --force to overwrite it.\n\
             Path: {path}"
        )
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(wifid::config))]
    Config(Box<figment::Error>),

    #[error("Failed to serialize config: {0}")]
    #[diagnostic(code(wifid::config))]
    ConfigSerialize(#[from] toml::ser::Error),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error("I/O error on {path}")]
    #[diagnostic(code(wifid::io))]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to encode JSON: {0}")]
    #[diagnostic(code(wifid::json))]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotReady { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Validation { .. } | Self::ConfigExists { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotReady { iface } => CliError::NotReady {
                iface,
                path: "(unknown)".into(),
            },

            CoreError::Timeout { timeout_ms } => CliError::Timeout { timeout_ms },

            CoreError::Protocol { message } => CliError::Protocol { message },

            CoreError::Rejected { command, reply } => CliError::Rejected { command, reply },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                resource_type: entity_type.into(),
                hint: "Run: wifid conf show <file> to list what is there".into(),
                identifier,
            },

            CoreError::InvalidArgument { field, reason } => CliError::Validation { field, reason },

            CoreError::NotImplemented { operation } => CliError::Unsupported {
                operation: operation.into(),
            },

            CoreError::Driver { operation, message } => CliError::Driver {
                operation: operation.into(),
                message,
            },

            CoreError::Io { path, source } => CliError::FileIo { path, source },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

impl From<wifid_ctrl::Error> for CliError {
    fn from(err: wifid_ctrl::Error) -> Self {
        CoreError::from(err).into()
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Serialization(e) => CliError::ConfigSerialize(e),
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_keep_their_exit_codes() {
        let not_found: CliError = CoreError::NotFound {
            entity_type: "config section",
            identifier: "wlan9".into(),
        }
        .into();
        assert_eq!(not_found.exit_code(), exit_code::NOT_FOUND);

        let timeout: CliError = wifid_ctrl::Error::Timeout { timeout_ms: 50 }.into();
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);

        let unsupported: CliError = CoreError::NotImplemented { operation: "commit" }.into();
        assert_eq!(unsupported.exit_code(), exit_code::UNSUPPORTED);
    }
}
