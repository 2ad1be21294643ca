//! Per-slot voice parameters.
//!
//! The Panel owns the valid ranges for every parameter. These types only
//! keep the units apart; range checking happens on the Panel side and
//! comes back as `PanelError::InvalidValue`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index into the Panel's list of voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceType(pub u32);

/// Index into the Panel's list of voice effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceEffect(pub u32);

/// Speaking speed as the Panel's integer setting (100 is normal speed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Speed(pub i32);

/// Output volume as the Panel's integer setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Volume(pub i32);

impl Speed {
    /// The Panel's normal speaking speed.
    pub const NORMAL: Self = Self(100);
}

/// Names one of the five per-slot parameters.
///
/// Used in error reports so a rejected value says which control it was
/// aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoiceParameter {
    VoiceType,
    VoiceEffect,
    Intonation,
    Speed,
    Volume,
}

impl VoiceParameter {
    /// All parameters, in Panel layout order.
    pub const ALL: [Self; 5] = [
        Self::VoiceType,
        Self::VoiceEffect,
        Self::Intonation,
        Self::Speed,
        Self::Volume,
    ];

    /// Stable lowercase label for logs and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VoiceType => "voice type",
            Self::VoiceEffect => "voice effect",
            Self::Intonation => "intonation",
            Self::Speed => "speed",
            Self::Volume => "volume",
        }
    }
}

impl fmt::Display for VoiceParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of every voice parameter of one slot.
///
/// Not a cache: it is read in one pass of five round trips and goes stale
/// the moment the Panel changes out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSettings {
    pub voice_type: VoiceType,
    pub voice_effect: VoiceEffect,
    pub intonation: bool,
    pub speed: Speed,
    pub volume: Volume,
}
