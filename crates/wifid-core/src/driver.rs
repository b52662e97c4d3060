// ── Driver capability object ──
//
// The hardware-facing half of the control plane. Every operation has a
// default returning `NotImplemented`, so a driver overrides only what its
// hardware supports and callers can tell "unsupported" from "failed".

use crate::error::CoreError;
use crate::fsm::CommitBits;
use crate::model::{ChannelSpec, RadioRecord};

/// Everything one commit applies: the radio's bits plus those of every
/// AP and endpoint on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitRequest {
    pub radio: String,
    pub radio_bits: CommitBits,
    pub access_points: Vec<(String, CommitBits)>,
    pub endpoints: Vec<(String, CommitBits)>,
}

impl CommitRequest {
    pub fn is_empty(&self) -> bool {
        self.radio_bits.is_empty()
            && self.access_points.iter().all(|(_, b)| b.is_empty())
            && self.endpoints.iter().all(|(_, b)| b.is_empty())
    }
}

/// How the driver finished a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    /// Applied synchronously.
    Done,
    /// Still applying; the driver calls `Manager::commit_done` when finished.
    InProgress,
}

pub trait Driver: Send + Sync {
    fn name(&self) -> &str {
        "null"
    }

    fn commit(&self, _request: &CommitRequest) -> Result<CommitStatus, CoreError> {
        Err(CoreError::NotImplemented { operation: "commit" })
    }

    /// Move `radio` to `target`. `direct` skips any background pre-clear.
    fn apply_channel_switch(&self, _radio: &RadioRecord, _target: &ChannelSpec, _direct: bool) -> Result<(), CoreError> {
        Err(CoreError::NotImplemented {
            operation: "apply_channel_switch",
        })
    }

    fn start_background_clear(&self, _radio: &RadioRecord, _block: &ChannelSpec) -> Result<(), CoreError> {
        Err(CoreError::NotImplemented {
            operation: "start_background_clear",
        })
    }

    fn stop_background_clear(&self, _radio: &RadioRecord) -> Result<(), CoreError> {
        Err(CoreError::NotImplemented {
            operation: "stop_background_clear",
        })
    }

    /// Restart the security daemon serving `radio`.
    fn restart_security_daemon(&self, _radio: &RadioRecord) -> Result<(), CoreError> {
        Err(CoreError::NotImplemented {
            operation: "restart_security_daemon",
        })
    }

    /// Make the daemon re-read its config file (SIGHUP).
    fn reload_security_daemon(&self, _radio: &RadioRecord) -> Result<(), CoreError> {
        Err(CoreError::NotImplemented {
            operation: "reload_security_daemon",
        })
    }
}

/// Driver that supports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDriver;

impl Driver for NullDriver {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Band, Bandwidth};

    #[test]
    fn null_driver_reports_not_implemented() {
        let radio = RadioRecord::new("wifi0", ChannelSpec::new(Band::Ghz5, 36, Bandwidth::Mhz80));
        let driver = NullDriver;

        assert!(driver.commit(&CommitRequest::default()).is_err_and(|e| e.is_not_implemented()));
        assert!(driver.stop_background_clear(&radio).is_err_and(|e| e.is_not_implemented()));
        assert_eq!(driver.name(), "null");
    }
}
