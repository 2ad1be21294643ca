//! Panel transport port.
//!
//! The transport is the only way a call reaches the Panel process. It is a
//! plain request/response primitive: one command id, an ordered list of
//! primitive parameters, one reply. Whether the bytes travel over HTTP, a
//! local socket or an OS scripting bridge is an adapter concern.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use thiserror::Error;

use crate::domain::Slot;

/// Every command the Panel understands.
///
/// Parameter order follows the Panel's own signatures: the value comes
/// first and the slot last (`setVoiceSpeed(speed, slot)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PanelCommand {
    // Kanji text area
    SetKanjiText,
    GetKanjiText,
    PushKoeTextGenerateButton,

    // Koe (phonetic) text area
    SetKoeText,
    GetKoeText,
    PushKoeTextClearButton,

    // Voice selection
    SetVoiceType,
    GetVoiceType,
    SetVoiceEffect,
    GetVoiceEffect,
    SetIntonation,
    GetIntonation,

    // Transport buttons
    PushPlayButton,
    PushStopButton,
    PushSaveButton,

    // Speed and volume
    SetVoiceSpeed,
    GetVoiceSpeed,
    SetVoiceVolume,
    GetVoiceVolume,

    // Metadata and playback state
    GetVersion,
    IsStillPlaying,
}

impl PanelCommand {
    /// Wire identifier of the command.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SetKanjiText => "setKanjiText",
            Self::GetKanjiText => "getKanjiText",
            Self::PushKoeTextGenerateButton => "pushKoeTextGenerateButton",
            Self::SetKoeText => "setKoeText",
            Self::GetKoeText => "getKoeText",
            Self::PushKoeTextClearButton => "pushKoeTextClearButton",
            Self::SetVoiceType => "setVoiceType",
            Self::GetVoiceType => "getVoiceType",
            Self::SetVoiceEffect => "setVoiceEffect",
            Self::GetVoiceEffect => "getVoiceEffect",
            Self::SetIntonation => "setIntonation",
            Self::GetIntonation => "getIntonation",
            Self::PushPlayButton => "pushPlayButton",
            Self::PushStopButton => "pushStopButton",
            Self::PushSaveButton => "pushSaveButton",
            Self::SetVoiceSpeed => "setVoiceSpeed",
            Self::GetVoiceSpeed => "getVoiceSpeed",
            Self::SetVoiceVolume => "setVoiceVolume",
            Self::GetVoiceVolume => "getVoiceVolume",
            Self::GetVersion => "getVersion",
            Self::IsStillPlaying => "isStillPlaying",
        }
    }

    /// Whether the command addresses a single slot.
    ///
    /// Slot commands carry the slot as their last parameter.
    #[must_use]
    pub const fn is_slot_command(self) -> bool {
        !matches!(
            self,
            Self::SetKanjiText
                | Self::GetKanjiText
                | Self::PushKoeTextGenerateButton
                | Self::SetKoeText
                | Self::GetKoeText
                | Self::PushKoeTextClearButton
                | Self::GetVersion
        )
    }
}

impl fmt::Display for PanelCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A primitive parameter or reply value.
///
/// Serialized untagged so the wire form is the bare JSON primitive.
/// Commands with nothing to return answer [`PanelValue::Unit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PanelValue {
    Unit,
    Bool(bool),
    Int(i64),
    Number(Number),
    Text(String),
}

impl PanelValue {
    /// Short type label for protocol error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Unit => "nothing",
            Self::Bool(_) => "a boolean",
            Self::Int(_) => "an integer",
            Self::Number(_) => "a number",
            Self::Text(_) => "text",
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Number(number) => number.as_i64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Numeric reply as a JSON number, integer or not.
    #[must_use]
    pub fn into_number(self) -> Option<Number> {
        match self {
            Self::Int(value) => Some(Number::from(value)),
            Self::Number(number) => Some(number),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for PanelValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PanelValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for PanelValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PanelValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PanelValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for PanelValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<Slot> for PanelValue {
    fn from(slot: Slot) -> Self {
        Self::Int(i64::from(slot))
    }
}

/// Category of a fault reported by the Panel itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FaultCode {
    /// The addressed slot does not exist.
    InvalidSlot,
    /// A setter's value is outside what the Panel accepts.
    InvalidValue,
    /// Any other Panel-side failure (save I/O, busy engine, ...).
    #[serde(other)]
    Failure,
}

/// A fault the Panel reported in place of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("Panel reported {code:?}: {message}")]
pub struct PanelFault {
    pub code: FaultCode,
    #[serde(default)]
    pub message: String,
}

impl PanelFault {
    pub fn new(code: FaultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Errors produced by a transport adapter.
///
/// Adapter-specific failures (HTTP, socket, serialization) are mapped into
/// these variants at the port boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The Panel process could not be reached at all.
    #[error("Panel unreachable: {0}")]
    Unreachable(String),

    /// The channel broke while a call was in flight.
    #[error("Transport I/O error: {0}")]
    Io(String),

    /// The reply could not be understood.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The Panel answered with a fault.
    #[error(transparent)]
    Panel(#[from] PanelFault),
}

impl TransportError {
    /// Whether the Panel is simply not there (not running, wrong address).
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }

    /// The Panel fault carried by this error, if any.
    #[must_use]
    pub const fn fault(&self) -> Option<&PanelFault> {
        match self {
            Self::Panel(fault) => Some(fault),
            _ => None,
        }
    }
}

/// Request/response channel to the Panel.
///
/// Implementations must always return: a reply or an error, never a
/// dangling call. Cancellation is done by dropping the returned future.
#[async_trait]
pub trait PanelTransport: Send + Sync {
    /// Deliver one command and wait for the Panel's reply.
    async fn invoke(
        &self,
        command: PanelCommand,
        params: Vec<PanelValue>,
    ) -> Result<PanelValue, TransportError>;

    /// Whether overlapping `invoke` calls are safe on this channel.
    ///
    /// When `false` (the default) the client serializes every call so
    /// replies cannot be matched to the wrong request.
    fn supports_concurrent_calls(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_names() {
        assert_eq!(PanelCommand::SetKanjiText.as_str(), "setKanjiText");
        assert_eq!(PanelCommand::IsStillPlaying.as_str(), "isStillPlaying");
        assert_eq!(
            serde_json::to_string(&PanelCommand::PushKoeTextGenerateButton).unwrap(),
            "\"pushKoeTextGenerateButton\""
        );
    }

    #[test]
    fn test_slot_commands() {
        assert!(PanelCommand::PushPlayButton.is_slot_command());
        assert!(PanelCommand::GetVoiceVolume.is_slot_command());
        assert!(!PanelCommand::GetKoeText.is_slot_command());
        assert!(!PanelCommand::GetVersion.is_slot_command());
    }

    #[test]
    fn test_value_wire_form() {
        let params = vec![
            PanelValue::from("ゆっくり"),
            PanelValue::from(120),
            PanelValue::from(true),
            PanelValue::Unit,
        ];
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, "[\"ゆっくり\",120,true,null]");

        let parsed: Vec<PanelValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, params);
    }

    #[test]
    fn test_fractional_reply_is_number() {
        let value: PanelValue = serde_json::from_str("1.5").unwrap();
        assert!(matches!(value, PanelValue::Number(_)));
        assert_eq!(value.as_int(), None);
        assert!(value.into_number().is_some());
    }

    #[test]
    fn test_unknown_fault_code_is_failure() {
        let fault: PanelFault =
            serde_json::from_str(r#"{"code":"diskFull","message":"no space"}"#).unwrap();
        assert_eq!(fault.code, FaultCode::Failure);
        assert_eq!(fault.message, "no space");
    }

    #[test]
    fn test_unreachable_classification() {
        assert!(TransportError::Unreachable("refused".into()).is_unreachable());
        let panel = TransportError::from(PanelFault::new(FaultCode::InvalidSlot, "no slot 9"));
        assert!(!panel.is_unreachable());
        assert_eq!(panel.fault().map(|f| f.code), Some(FaultCode::InvalidSlot));
    }
}
