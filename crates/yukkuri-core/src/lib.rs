//! Core domain types and port definitions for driving a Yukkuri voice panel.
//!
//! The Panel is a text-to-speech control application exposing a fixed set of
//! controls: two text areas (Kanji and Koe), per-slot voice settings, and
//! play/stop/save buttons. This crate holds the types every adapter shares:
//!
//! - [`domain`] - `Slot`, voice parameter newtypes, `PanelVersion`
//! - [`ports`] - the `PanelTransport` request/response port
//! - [`error`] - the `PanelError` taxonomy returned by the client
//! - [`settings`] - settings document and playback timing policy
//!
//! With the `test-utils` feature, `testing::FakePanel` provides an
//! in-memory Panel for tests.

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod error;
pub mod ports;
pub mod settings;

#[cfg(feature = "test-utils")]
pub mod testing;

// Re-export commonly used types for convenience
pub use domain::{
    PanelVersion, Slot, SlotError, Speed, VoiceEffect, VoiceParameter, VoiceSettings, VoiceType,
    Volume,
};
pub use error::{PanelError, PanelResult};
pub use ports::{FaultCode, PanelCommand, PanelFault, PanelTransport, PanelValue, TransportError};
pub use settings::{
    DEFAULT_ENDPOINT, DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL, DEFAULT_START_GRACE, PanelSettings,
    PlaybackPolicy, SettingsError, SettingsUpdate, validate_settings,
};

// Silence unused dev-dependency warnings
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio as _;
#[cfg(test)]
use tokio_test as _;
