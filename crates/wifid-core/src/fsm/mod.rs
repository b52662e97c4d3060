pub mod attr;
pub mod bits;
pub mod scheduler;

pub use attr::{ApAttr, EndpointAttr, FsmAttribute, RadioAttr};
pub use bits::{BitActionSet, CommitBits, FsmBitSet};
pub use scheduler::{CommitScheduler, CommitSettings, CommitTimer, NotifyOutcome};
