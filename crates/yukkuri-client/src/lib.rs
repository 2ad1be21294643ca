//! Panel client built on the `yukkuri-core` transport port.
//!
//! - [`client`] - `PanelClient`, every text, voice and button operation
//! - [`playback`] - `play_sync`, the cancellable wait for playback to end
//! - [`speech`] - read-aloud queue that feeds utterances to the Panel
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use yukkuri_client::PanelClient;
//! use yukkuri_core::Slot;
//!
//! let client = PanelClient::new(Arc::new(transport));
//! client.set_kanji_text("ゆっくりしていってね").await?;
//! let report = client.play_sync(Slot::PRIMARY, &CancellationToken::new()).await?;
//! ```

#![deny(unused_crate_dependencies)]

pub mod client;
pub mod playback;
pub mod speech;

pub use client::PanelClient;
pub use playback::{PlaybackHandle, PlaybackPhase, PlaybackReport};
pub use speech::{
    DEFAULT_BACKLOG_THRESHOLD, DEFAULT_DEQUEUE_INTERVAL, Speaker, SpeechQueue, SpeechQueueConfig,
    SpeedStep, TickOutcome, adjusted_speed, clean_comment, default_speed_steps,
};

// Silence unused dev-dependency warnings
#[cfg(test)]
use async_trait as _;
#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tokio_test as _;
