//! Control-plane core for a WiFi access-point manager.
//!
//! Turns data-model edits into batched, correctly ordered work for the
//! security daemons and the driver:
//!
//! - **[`fsm`]**: per-entity action bitsets and the per-radio debounce
//!   timer that decides *when* a batch of edits is committed.
//! - **[`conf`]**: hostapd / wpa_supplicant config files, the diff engine
//!   and the table that picks the cheapest action for a change.
//! - **[`zwdfs`]**: the zero-wait DFS state machine sequencing background
//!   channel clearing and the final switch.
//! - **[`Manager`]**: facade wiring registry, driver, timers and ZWDFS
//!   together, and keeping channel switches out of in-flight commits.

pub mod conf;
pub mod config;
pub mod driver;
pub mod error;
pub mod fsm;
pub mod manager;
pub mod model;
pub mod registry;
pub mod zwdfs;

pub use config::{DaemonSettings, ManagerConfig, ZwdfsSettings};
pub use conf::{Action, ConfigStore, SectionKey, apply_action, classify};
pub use driver::{CommitRequest, CommitStatus, Driver, NullDriver};
pub use error::CoreError;
pub use fsm::{ApAttr, BitActionSet, CommitSettings, EndpointAttr, FsmBitSet, NotifyOutcome, RadioAttr};
pub use manager::Manager;
pub use model::{AccessPointRecord, Band, Bandwidth, ChannelSpec, EndpointRecord, EntityKind, RadioRecord};
pub use registry::Registry;
pub use zwdfs::{ZwdfsEvent, ZwdfsMachine, ZwdfsState};
