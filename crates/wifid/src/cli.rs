//! Clap derive structures for the `wifid` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wifid -- control-plane tool for hostapd / wpa_supplicant access points
#[derive(Debug, Parser)]
#[command(
    name = "wifid",
    version,
    about = "Inspect and drive the WiFi access-point control plane",
    long_about = "Classify config changes, edit daemon config files and talk to\n\
        hostapd / wpa_supplicant control sockets from the command line.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "WIFID_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Control socket directory (overrides config)
    #[arg(long, env = "WIFID_CTRL_DIR", global = true)]
    pub ctrl_dir: Option<PathBuf>,

    /// Reply timeout in milliseconds (overrides config)
    #[arg(long, env = "WIFID_TIMEOUT_MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// Output format
    #[arg(long, short = 'o', env = "WIFID_OUTPUT", default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Work out which action a config change needs
    Classify(ClassifyArgs),

    /// Inspect or edit a hostapd-style config file
    #[command(alias = "cf")]
    Conf(ConfArgs),

    /// Send a raw command to a daemon control socket
    Ctrl(CtrlArgs),

    /// Show the parsed STATUS of an interface
    CtrlStatus(CtrlStatusArgs),

    /// Stream unsolicited daemon events
    Events(EventsArgs),

    /// Manage wifid configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Classify ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Config file before the change
    pub old: PathBuf,

    /// Config file after the change
    pub new: PathBuf,

    /// Only this section (interface/bss name, bssid, or "header")
    #[arg(long, short = 's')]
    pub section: Option<String>,

    /// Treat the interface as disabled
    #[arg(long)]
    pub disabled: bool,
}

// ── Conf ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfArgs {
    #[command(subcommand)]
    pub command: ConfCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfCommand {
    /// List every parameter
    Show {
        file: PathBuf,

        /// Only this section
        #[arg(long, short = 's')]
        section: Option<String>,
    },

    /// Print one parameter
    Get {
        file: PathBuf,
        key: String,

        /// Section to read (default: header)
        #[arg(long, short = 's')]
        section: Option<String>,
    },

    /// Set a parameter and report the action it needs
    Set {
        file: PathBuf,
        key: String,
        value: String,

        /// Section to edit (default: header)
        #[arg(long, short = 's')]
        section: Option<String>,
    },

    /// Remove a parameter and report the action it needs
    Unset {
        file: PathBuf,
        key: String,

        /// Section to edit (default: header)
        #[arg(long, short = 's')]
        section: Option<String>,
    },
}

// ── Control socket ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CtrlArgs {
    /// Interface name (socket under the control directory)
    pub iface: String,

    /// Command words, joined with spaces
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Args)]
pub struct CtrlStatusArgs {
    /// Interface name
    pub iface: String,
}

#[derive(Debug, Args)]
pub struct EventsArgs {
    /// Interface name
    pub iface: String,

    /// Stop after this many events
    #[arg(long, short = 'n')]
    pub count: Option<usize>,

    /// Only events whose name starts with this prefix (e.g. "DFS-")
    #[arg(long, short = 'f')]
    pub filter: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
