//! Core domain types.
//!
//! These types describe what the Panel owns, independent of how a call
//! reaches it.
//!
//! # Structure
//!
//! - `slot` - Validated setting slot index (`Slot`)
//! - `voice` - Per-slot voice parameters (`VoiceType`, `Speed`, ...)
//! - `version` - Panel version number

mod slot;
mod version;
mod voice;

pub use slot::{Slot, SlotError};
pub use version::PanelVersion;
pub use voice::{Speed, VoiceEffect, VoiceParameter, VoiceSettings, VoiceType, Volume};
