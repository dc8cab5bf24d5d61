//! Error taxonomy for the occupancy state service and its consumers.

use std::time::Duration;

use thiserror::Error;

use crate::slots::SlotId;

/// Errors raised by the slot store, the state service and display sync.
///
/// Every variant is recovered at the boundary where it occurs: the HTTP
/// interface turns it into a status body, display sync logs it and keeps
/// its shadow copy, and sensor faults degrade to "unoccupied".
#[derive(Debug, Error)]
pub enum ParkError {
    /// The slot is not part of the configured slot set.
    #[error("unknown slot '{0}'")]
    UnknownSlot(SlotId),

    /// An update payload could not be accepted.
    #[error("{0}")]
    MalformedInput(String),

    /// The state service could not be reached.
    #[error("state service unreachable: {0}")]
    Unreachable(String),

    /// A bounded operation did not finish in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The state service answered with something that is not a full occupancy map.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A presence sensor could not be read or returned an out-of-range value.
    #[error("sensor fault on '{slot}': {reason}")]
    SensorFault { slot: SlotId, reason: String },
}

pub type Result<T> = std::result::Result<T, ParkError>;
