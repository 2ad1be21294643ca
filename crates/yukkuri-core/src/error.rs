//! Panel client error types.
//!
//! This is the error every public client operation returns. Adapters map
//! their own failures into [`TransportError`] first; the client then
//! lifts Panel faults into the slot/value kinds below.

use std::time::Duration;

use thiserror::Error;

use crate::domain::{Slot, VoiceParameter};
use crate::ports::TransportError;

/// Result alias for Panel client operations.
pub type PanelResult<T> = Result<T, PanelError>;

/// Errors surfaced by the Panel client.
#[derive(Debug, Error)]
pub enum PanelError {
    /// The call channel failed or the reply was unusable.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The Panel has no such slot.
    #[error("Panel rejected {slot}: no such slot")]
    InvalidSlot {
        /// The rejected slot.
        slot: Slot,
    },

    /// The Panel refused a setter's value.
    #[error("Panel rejected {parameter} value: {message}")]
    InvalidValue {
        /// Parameter the value was meant for.
        parameter: VoiceParameter,
        /// Panel-provided detail.
        message: String,
    },

    /// Synchronous playback did not finish before the deadline.
    #[error("Playback on {slot} did not finish within {}ms", .waited.as_millis())]
    TimedOut {
        /// Slot that was playing.
        slot: Slot,
        /// Time spent since the play request.
        waited: Duration,
    },

    /// Synchronous playback wait was abandoned by the caller.
    ///
    /// The Panel is not told to stop; call `stop` for that.
    #[error("Playback wait on {slot} cancelled")]
    Cancelled {
        /// Slot that was being waited on.
        slot: Slot,
    },

    /// Synchronous playback failed on a call to the Panel.
    #[error("Playback on {slot} failed: {source}")]
    PlaybackFailed {
        /// Slot that was playing.
        slot: Slot,
        /// The failing call's error.
        #[source]
        source: Box<PanelError>,
    },
}

impl PanelError {
    /// Whether the root cause is a transport failure.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::PlaybackFailed { source, .. } => source.is_transport(),
            _ => false,
        }
    }

    /// Whether this is a playback deadline expiry.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Whether this is a caller-initiated cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Whether the Panel could not be reached at all.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_unreachable(),
            Self::PlaybackFailed { source, .. } => source.is_unreachable(),
            _ => false,
        }
    }
}
