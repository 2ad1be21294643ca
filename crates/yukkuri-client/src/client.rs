//! The Panel client.
//!
//! Every operation is a thin marshal onto [`PanelTransport::invoke`]: build
//! the parameter list, make one round trip, decode the reply. Nothing the
//! Panel owns is cached here; each getter re-queries and each setter applies
//! immediately.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;
use yukkuri_core::{
    FaultCode, PanelCommand, PanelError, PanelResult, PanelTransport, PanelValue, PanelVersion,
    PlaybackPolicy, Slot, Speed, TransportError, VoiceEffect, VoiceParameter, VoiceSettings,
    VoiceType, Volume,
};

// ============================================================================
// Client
// ============================================================================

/// Client for driving a Panel through an injected transport.
///
/// Cloning is cheap and clones share the transport and its call gate, so a
/// background playback wait and foreground setters never overlap on a
/// transport that cannot take concurrent calls.
#[derive(Clone)]
pub struct PanelClient {
    transport: Arc<dyn PanelTransport>,
    gate: Arc<Mutex<()>>,
    policy: PlaybackPolicy,
}

impl std::fmt::Debug for PanelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl PanelClient {
    /// Create a client with the default playback policy.
    pub fn new(transport: Arc<dyn PanelTransport>) -> Self {
        Self {
            transport,
            gate: Arc::new(Mutex::new(())),
            policy: PlaybackPolicy::default(),
        }
    }

    /// Use `policy` for `play_sync` calls.
    #[must_use]
    pub const fn with_policy(mut self, policy: PlaybackPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The playback policy `play_sync` uses.
    #[must_use]
    pub const fn policy(&self) -> &PlaybackPolicy {
        &self.policy
    }

    // ------------------------------------------------------------------------
    // Kanji / Koe text
    // ------------------------------------------------------------------------

    /// Replace the Kanji (source) text.
    pub async fn set_kanji_text(&self, text: &str) -> PanelResult<()> {
        self.call(PanelCommand::SetKanjiText, vec![text.into()])
            .await?;
        Ok(())
    }

    /// Read the Kanji text.
    pub async fn kanji_text(&self) -> PanelResult<String> {
        let reply = self.call(PanelCommand::GetKanjiText, vec![]).await?;
        Ok(expect_text(PanelCommand::GetKanjiText, reply)?)
    }

    /// Ask the Panel to derive Koe text from the Kanji text.
    ///
    /// The conversion happens inside the Panel with no completion signal;
    /// the Koe buffer may not be updated yet when this returns.
    pub async fn trigger_koe_generation(&self) -> PanelResult<()> {
        self.call(PanelCommand::PushKoeTextGenerateButton, vec![])
            .await?;
        Ok(())
    }

    /// Replace the Koe (phonetic) text.
    pub async fn set_koe_text(&self, text: &str) -> PanelResult<()> {
        self.call(PanelCommand::SetKoeText, vec![text.into()])
            .await?;
        Ok(())
    }

    /// Read the Koe text.
    pub async fn koe_text(&self) -> PanelResult<String> {
        let reply = self.call(PanelCommand::GetKoeText, vec![]).await?;
        Ok(expect_text(PanelCommand::GetKoeText, reply)?)
    }

    /// Clear the Koe text.
    pub async fn clear_koe_text(&self) -> PanelResult<()> {
        self.call(PanelCommand::PushKoeTextClearButton, vec![])
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Per-slot voice parameters
    // ------------------------------------------------------------------------

    pub async fn set_voice_type(&self, slot: Slot, voice_type: VoiceType) -> PanelResult<()> {
        self.set_parameter(
            PanelCommand::SetVoiceType,
            VoiceParameter::VoiceType,
            slot,
            voice_type.0.into(),
        )
        .await
    }

    pub async fn voice_type(&self, slot: Slot) -> PanelResult<VoiceType> {
        let reply = self.query_slot(PanelCommand::GetVoiceType, slot).await?;
        Ok(VoiceType(expect_int(PanelCommand::GetVoiceType, reply)?))
    }

    pub async fn set_voice_effect(&self, slot: Slot, effect: VoiceEffect) -> PanelResult<()> {
        self.set_parameter(
            PanelCommand::SetVoiceEffect,
            VoiceParameter::VoiceEffect,
            slot,
            effect.0.into(),
        )
        .await
    }

    pub async fn voice_effect(&self, slot: Slot) -> PanelResult<VoiceEffect> {
        let reply = self.query_slot(PanelCommand::GetVoiceEffect, slot).await?;
        Ok(VoiceEffect(expect_int(PanelCommand::GetVoiceEffect, reply)?))
    }

    pub async fn set_intonation(&self, slot: Slot, enabled: bool) -> PanelResult<()> {
        self.set_parameter(
            PanelCommand::SetIntonation,
            VoiceParameter::Intonation,
            slot,
            enabled.into(),
        )
        .await
    }

    pub async fn intonation(&self, slot: Slot) -> PanelResult<bool> {
        let reply = self.query_slot(PanelCommand::GetIntonation, slot).await?;
        Ok(expect_bool(PanelCommand::GetIntonation, &reply)?)
    }

    pub async fn set_speed(&self, slot: Slot, speed: Speed) -> PanelResult<()> {
        self.set_parameter(
            PanelCommand::SetVoiceSpeed,
            VoiceParameter::Speed,
            slot,
            speed.0.into(),
        )
        .await
    }

    pub async fn speed(&self, slot: Slot) -> PanelResult<Speed> {
        let reply = self.query_slot(PanelCommand::GetVoiceSpeed, slot).await?;
        Ok(Speed(expect_int(PanelCommand::GetVoiceSpeed, reply)?))
    }

    pub async fn set_volume(&self, slot: Slot, volume: Volume) -> PanelResult<()> {
        self.set_parameter(
            PanelCommand::SetVoiceVolume,
            VoiceParameter::Volume,
            slot,
            volume.0.into(),
        )
        .await
    }

    pub async fn volume(&self, slot: Slot) -> PanelResult<Volume> {
        let reply = self.query_slot(PanelCommand::GetVoiceVolume, slot).await?;
        Ok(Volume(expect_int(PanelCommand::GetVoiceVolume, reply)?))
    }

    /// Read all five voice parameters of `slot`.
    ///
    /// Five round trips; the snapshot is not atomic with respect to
    /// out-of-band changes on the Panel.
    pub async fn voice_settings(&self, slot: Slot) -> PanelResult<VoiceSettings> {
        Ok(VoiceSettings {
            voice_type: self.voice_type(slot).await?,
            voice_effect: self.voice_effect(slot).await?,
            intonation: self.intonation(slot).await?,
            speed: self.speed(slot).await?,
            volume: self.volume(slot).await?,
        })
    }

    /// Apply all five voice parameters to `slot`, stopping at the first
    /// rejected value.
    pub async fn apply_voice_settings(
        &self,
        slot: Slot,
        settings: &VoiceSettings,
    ) -> PanelResult<()> {
        self.set_voice_type(slot, settings.voice_type).await?;
        self.set_voice_effect(slot, settings.voice_effect).await?;
        self.set_intonation(slot, settings.intonation).await?;
        self.set_speed(slot, settings.speed).await?;
        self.set_volume(slot, settings.volume).await
    }

    // ------------------------------------------------------------------------
    // Transport buttons
    // ------------------------------------------------------------------------

    /// Press play on `slot`.
    ///
    /// Returns once the Panel accepted the command, not when the audio ends.
    pub async fn play(&self, slot: Slot) -> PanelResult<()> {
        self.query_slot(PanelCommand::PushPlayButton, slot).await?;
        Ok(())
    }

    /// Press stop on `slot`. Stopping an idle slot is not an error.
    pub async fn stop(&self, slot: Slot) -> PanelResult<()> {
        self.query_slot(PanelCommand::PushStopButton, slot).await?;
        Ok(())
    }

    /// Press save on `slot`; the destination is chosen by the Panel.
    pub async fn save(&self, slot: Slot) -> PanelResult<()> {
        self.query_slot(PanelCommand::PushSaveButton, slot).await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Poll whether `slot` is playing right now. No retry.
    pub async fn is_still_playing(&self, slot: Slot) -> PanelResult<bool> {
        let reply = self.query_slot(PanelCommand::IsStillPlaying, slot).await?;
        Ok(expect_bool(PanelCommand::IsStillPlaying, &reply)?)
    }

    /// The Panel's API/build version.
    pub async fn version(&self) -> PanelResult<PanelVersion> {
        let reply = self.call(PanelCommand::GetVersion, vec![]).await?;
        let number = reply.into_number().ok_or_else(|| {
            TransportError::Protocol(format!("{} expected a number", PanelCommand::GetVersion))
        })?;
        Ok(PanelVersion::new(number))
    }

    /// Whether the Panel answers at all.
    ///
    /// An unreachable Panel is `Ok(false)`; any other failure means the
    /// Panel is there but misbehaving and is returned as an error.
    pub async fn is_available(&self) -> PanelResult<bool> {
        match self.version().await {
            Ok(_) => Ok(true),
            Err(err) if err.is_unreachable() => Ok(false),
            Err(err) => Err(err),
        }
    }

    // ------------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------------

    /// One round trip, serialized unless the transport allows overlap.
    async fn call(
        &self,
        command: PanelCommand,
        params: Vec<PanelValue>,
    ) -> Result<PanelValue, TransportError> {
        debug!(command = %command, params = params.len(), "Invoking panel command");
        if self.transport.supports_concurrent_calls() {
            return self.transport.invoke(command, params).await;
        }
        let _guard = self.gate.lock().await;
        self.transport.invoke(command, params).await
    }

    /// A slot command with no value parameter.
    async fn query_slot(&self, command: PanelCommand, slot: Slot) -> PanelResult<PanelValue> {
        self.call(command, vec![slot.into()])
            .await
            .map_err(|err| lift_fault(err, slot, None))
    }

    /// A slot setter: value first, slot last.
    async fn set_parameter(
        &self,
        command: PanelCommand,
        parameter: VoiceParameter,
        slot: Slot,
        value: PanelValue,
    ) -> PanelResult<()> {
        self.call(command, vec![value, slot.into()])
            .await
            .map_err(|err| lift_fault(err, slot, Some(parameter)))?;
        Ok(())
    }
}

/// Map Panel faults onto the slot/value error kinds.
///
/// An `InvalidValue` fault on a call that carried no value stays a
/// transport error; the Panel should not send one.
fn lift_fault(err: TransportError, slot: Slot, parameter: Option<VoiceParameter>) -> PanelError {
    match (err.fault(), parameter) {
        (Some(fault), _) if fault.code == FaultCode::InvalidSlot => PanelError::InvalidSlot { slot },
        (Some(fault), Some(parameter)) if fault.code == FaultCode::InvalidValue => {
            PanelError::InvalidValue {
                parameter,
                message: fault.message.clone(),
            }
        }
        _ => PanelError::Transport(err),
    }
}

// ============================================================================
// Reply decoding
// ============================================================================

fn unexpected(command: PanelCommand, wanted: &str, got: &PanelValue) -> TransportError {
    TransportError::Protocol(format!(
        "{command} expected {wanted}, got {}",
        got.type_name()
    ))
}

fn expect_text(command: PanelCommand, reply: PanelValue) -> Result<String, TransportError> {
    match reply {
        PanelValue::Text(text) => Ok(text),
        other => Err(unexpected(command, "text", &other)),
    }
}

fn expect_bool(command: PanelCommand, reply: &PanelValue) -> Result<bool, TransportError> {
    reply
        .as_bool()
        .ok_or_else(|| unexpected(command, "a boolean", reply))
}

fn expect_int<T: TryFrom<i64>>(command: PanelCommand, reply: PanelValue) -> Result<T, TransportError> {
    let value = reply
        .as_int()
        .ok_or_else(|| unexpected(command, "an integer", &reply))?;
    T::try_from(value)
        .map_err(|_| TransportError::Protocol(format!("{command} returned out-of-range {value}")))
}
