// ── Entity records ──
//
// Radios, access points and endpoints as seen by the control plane:
// opaque records carrying only the fields commit sequencing, config
// writing and DFS switching read.

pub mod ap;
pub mod channel;
pub mod endpoint;
pub mod radio;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

pub use ap::{AccessPointRecord, MfpMode, SecurityConfig, SecurityMode};
pub use channel::{Band, Bandwidth, ChannelSpec};
pub use endpoint::EndpointRecord;
pub use radio::{BgDfsState, RadioChange, RadioRecord, RadioStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Radio,
    AccessPoint,
    Endpoint,
}
