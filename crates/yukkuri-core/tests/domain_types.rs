//! Integration tests for the public domain and port types.
//!
//! Exercises the re-exported surface the client and adapters build on.

use yukkuri_core::{
    FaultCode, PanelCommand, PanelError, PanelFault, PanelValue, Slot, SlotError, TransportError,
    VoiceParameter,
};

#[test]
fn test_slot_round_trips_through_panel_value() {
    let slot = Slot::new(1).unwrap();
    let value = PanelValue::from(slot);
    assert_eq!(value, PanelValue::Int(1));

    let back = Slot::try_from(value.as_int().unwrap()).unwrap();
    assert_eq!(back, slot);
}

#[test]
fn test_slot_errors_are_descriptive() {
    let err = Slot::try_from(-2i64).unwrap_err();
    assert_eq!(err, SlotError::Negative(-2));
    assert!(err.to_string().contains("negative"));
}

#[test]
fn test_every_command_has_unique_wire_name() {
    let commands = [
        PanelCommand::SetKanjiText,
        PanelCommand::GetKanjiText,
        PanelCommand::PushKoeTextGenerateButton,
        PanelCommand::SetKoeText,
        PanelCommand::GetKoeText,
        PanelCommand::PushKoeTextClearButton,
        PanelCommand::SetVoiceType,
        PanelCommand::GetVoiceType,
        PanelCommand::SetVoiceEffect,
        PanelCommand::GetVoiceEffect,
        PanelCommand::SetIntonation,
        PanelCommand::GetIntonation,
        PanelCommand::PushPlayButton,
        PanelCommand::PushStopButton,
        PanelCommand::PushSaveButton,
        PanelCommand::SetVoiceSpeed,
        PanelCommand::GetVoiceSpeed,
        PanelCommand::SetVoiceVolume,
        PanelCommand::GetVoiceVolume,
        PanelCommand::GetVersion,
        PanelCommand::IsStillPlaying,
    ];
    let names: std::collections::HashSet<_> = commands.iter().map(|c| c.as_str()).collect();
    assert_eq!(names.len(), commands.len());

    // The serde name and the wire name agree
    for command in commands {
        let json = serde_json::to_string(&command).unwrap();
        assert_eq!(json, format!("\"{}\"", command.as_str()));
    }
}

#[test]
fn test_transport_error_lifts_into_panel_error() {
    let fault = PanelFault::new(FaultCode::Failure, "save target not writable");
    let err: PanelError = TransportError::from(fault).into();
    assert!(err.is_transport());
    assert!(err.to_string().contains("save target not writable"));
}

#[test]
fn test_voice_parameter_display() {
    assert_eq!(VoiceParameter::VoiceEffect.to_string(), "voice effect");
}
