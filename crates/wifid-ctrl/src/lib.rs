//! Async client for the hostapd / wpa_supplicant control-socket protocol.
//!
//! - **[`CtrlClient`]**: two datagram links per interface (command + event),
//!   ATTACH/DETACH handshake, request/reply with timeout, fire-and-forget
//!   writes. Socket loss drops readiness; reconnect policy belongs to the
//!   owner.
//! - **[`command`]**: builders for the bit-exact command strings, with
//!   argument validation.
//! - **[`reply`]**: `key=value` extraction and typed `STATUS` / `STA` views.
//! - **[`event`]**: unsolicited `<level>NAME args` messages, broadcast to
//!   subscribers.

pub mod client;
pub mod command;
pub mod error;
pub mod event;
pub mod reply;

pub use client::{CtrlClient, CtrlConfig};
pub use command::MacAddress;
pub use error::Error;
pub use event::{CtrlEvent, CtrlEventKind};
pub use reply::{StaInfo, StatusReply};
