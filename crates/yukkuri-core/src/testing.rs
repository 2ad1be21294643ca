//! In-memory Panel for tests.
//!
//! `FakePanel` implements [`PanelTransport`] against local state: it keeps
//! both text buffers, per-slot voice parameters with range checks, and a
//! scripted answer sequence for `isStillPlaying`. Every call is recorded as
//! it arrives, before any simulated latency, so tests can assert exactly
//! what reached the Panel.

use std::collections::{HashMap, VecDeque};
use std::ops::RangeInclusive;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::PanelVersion;
use crate::ports::{FaultCode, PanelCommand, PanelFault, PanelTransport, PanelValue, TransportError};

/// Voice type indices the fake accepts.
pub const VOICE_TYPE_RANGE: RangeInclusive<i64> = 0..=7;
/// Voice effect indices the fake accepts.
pub const VOICE_EFFECT_RANGE: RangeInclusive<i64> = 0..=3;
/// Speed values the fake accepts.
pub const SPEED_RANGE: RangeInclusive<i64> = 50..=300;
/// Volume values the fake accepts.
pub const VOLUME_RANGE: RangeInclusive<i64> = 0..=100;

#[derive(Debug, Clone)]
struct FakeSlot {
    voice_type: i64,
    voice_effect: i64,
    intonation: bool,
    speed: i64,
    volume: i64,
    playing_script: VecDeque<bool>,
    playing_after_script: bool,
}

impl Default for FakeSlot {
    fn default() -> Self {
        Self {
            voice_type: 0,
            voice_effect: 0,
            intonation: true,
            speed: 100,
            volume: 100,
            playing_script: VecDeque::new(),
            playing_after_script: false,
        }
    }
}

#[derive(Debug)]
struct FakeState {
    kanji: String,
    koe: String,
    slots: Vec<FakeSlot>,
    version: PanelVersion,
    unreachable: bool,
    failures: HashMap<PanelCommand, VecDeque<TransportError>>,
    calls: Vec<(PanelCommand, Vec<PanelValue>)>,
}

/// Scriptable in-memory Panel.
#[derive(Debug)]
pub struct FakePanel {
    state: Mutex<FakeState>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for FakePanel {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePanel {
    /// A Panel with two slots and version 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                kanji: String::new(),
                koe: String::new(),
                slots: vec![FakeSlot::default(); 2],
                version: PanelVersion::from(1),
                unreachable: false,
                failures: HashMap::new(),
                calls: Vec::new(),
            }),
            latency: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Use `count` slots instead of two.
    #[must_use]
    pub fn with_slots(self, count: usize) -> Self {
        self.lock().slots = vec![FakeSlot::default(); count];
        self
    }

    /// Report a different version.
    #[must_use]
    pub fn with_version(self, version: PanelVersion) -> Self {
        self.lock().version = version;
        self
    }

    /// Delay every reply, to expose overlapping calls.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer the next `isStillPlaying` polls of `slot` from `script`,
    /// then `false`.
    pub fn script_playback(&self, slot: usize, script: impl IntoIterator<Item = bool>) {
        let mut state = self.lock();
        if let Some(fake) = state.slots.get_mut(slot) {
            fake.playing_script = script.into_iter().collect();
            fake.playing_after_script = false;
        }
    }

    /// Make `slot` report playing forever.
    pub fn always_playing(&self, slot: usize) {
        let mut state = self.lock();
        if let Some(fake) = state.slots.get_mut(slot) {
            fake.playing_script.clear();
            fake.playing_after_script = true;
        }
    }

    /// Fail the next call of `command` with `error`.
    ///
    /// Queued failures are consumed in order.
    pub fn fail_next(&self, command: PanelCommand, error: TransportError) {
        self.lock()
            .failures
            .entry(command)
            .or_default()
            .push_back(error);
    }

    /// Refuse every call as if the Panel process were gone.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Every call received, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(PanelCommand, Vec<PanelValue>)> {
        self.lock().calls.clone()
    }

    /// Number of calls received for `command`.
    #[must_use]
    pub fn call_count(&self, command: PanelCommand) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|(c, _)| *c == command)
            .count()
    }

    /// Current Kanji text buffer.
    #[must_use]
    pub fn kanji_text(&self) -> String {
        self.lock().kanji.clone()
    }

    /// Current Koe text buffer.
    #[must_use]
    pub fn koe_text(&self) -> String {
        self.lock().koe.clone()
    }

    /// Highest number of calls that were ever in flight at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake panel state poisoned")
    }

    fn record(&self, command: PanelCommand, params: &[PanelValue]) {
        self.lock().calls.push((command, params.to_vec()));
    }

    fn handle(
        &self,
        command: PanelCommand,
        params: Vec<PanelValue>,
    ) -> Result<PanelValue, TransportError> {
        let mut state = self.lock();
        if state.unreachable {
            return Err(TransportError::Unreachable("fake panel is offline".to_string()));
        }
        if let Some(err) = state
            .failures
            .get_mut(&command)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }

        match command {
            PanelCommand::SetKanjiText => {
                state.kanji = text_param(&params, 0)?;
                Ok(PanelValue::Unit)
            }
            PanelCommand::GetKanjiText => Ok(PanelValue::Text(state.kanji.clone())),
            PanelCommand::PushKoeTextGenerateButton => {
                state.koe = state.kanji.clone();
                Ok(PanelValue::Unit)
            }
            PanelCommand::SetKoeText => {
                state.koe = text_param(&params, 0)?;
                Ok(PanelValue::Unit)
            }
            PanelCommand::GetKoeText => Ok(PanelValue::Text(state.koe.clone())),
            PanelCommand::PushKoeTextClearButton => {
                state.koe.clear();
                Ok(PanelValue::Unit)
            }
            PanelCommand::GetVersion => Ok(PanelValue::Number(state.version.as_number().clone())),
            _ => Self::handle_slot_command(&mut state, command, &params),
        }
    }

    fn handle_slot_command(
        state: &mut FakeState,
        command: PanelCommand,
        params: &[PanelValue],
    ) -> Result<PanelValue, TransportError> {
        let slot_index = params
            .last()
            .and_then(PanelValue::as_int)
            .ok_or_else(|| TransportError::Protocol(format!("{command} needs a slot")))?;
        let slot = usize::try_from(slot_index)
            .ok()
            .and_then(|i| state.slots.get_mut(i))
            .ok_or_else(|| {
                PanelFault::new(FaultCode::InvalidSlot, format!("no slot {slot_index}"))
            })?;

        match command {
            PanelCommand::SetVoiceType => {
                slot.voice_type = ranged_param(params, &VOICE_TYPE_RANGE)?;
            }
            PanelCommand::GetVoiceType => return Ok(PanelValue::Int(slot.voice_type)),
            PanelCommand::SetVoiceEffect => {
                slot.voice_effect = ranged_param(params, &VOICE_EFFECT_RANGE)?;
            }
            PanelCommand::GetVoiceEffect => return Ok(PanelValue::Int(slot.voice_effect)),
            PanelCommand::SetIntonation => {
                slot.intonation = params
                    .first()
                    .and_then(PanelValue::as_bool)
                    .ok_or_else(|| TransportError::Protocol("intonation needs a flag".into()))?;
            }
            PanelCommand::GetIntonation => return Ok(PanelValue::Bool(slot.intonation)),
            PanelCommand::SetVoiceSpeed => slot.speed = ranged_param(params, &SPEED_RANGE)?,
            PanelCommand::GetVoiceSpeed => return Ok(PanelValue::Int(slot.speed)),
            PanelCommand::SetVoiceVolume => slot.volume = ranged_param(params, &VOLUME_RANGE)?,
            PanelCommand::GetVoiceVolume => return Ok(PanelValue::Int(slot.volume)),
            PanelCommand::PushPlayButton
            | PanelCommand::PushStopButton
            | PanelCommand::PushSaveButton => {}
            PanelCommand::IsStillPlaying => {
                let playing = slot
                    .playing_script
                    .pop_front()
                    .unwrap_or(slot.playing_after_script);
                return Ok(PanelValue::Bool(playing));
            }
            other => {
                return Err(TransportError::Protocol(format!(
                    "{other} is not a slot command"
                )));
            }
        }
        Ok(PanelValue::Unit)
    }
}

fn text_param(params: &[PanelValue], index: usize) -> Result<String, TransportError> {
    params
        .get(index)
        .and_then(PanelValue::as_text)
        .map(ToString::to_string)
        .ok_or_else(|| TransportError::Protocol("expected a text parameter".to_string()))
}

fn ranged_param(params: &[PanelValue], range: &RangeInclusive<i64>) -> Result<i64, TransportError> {
    let value = params
        .first()
        .and_then(PanelValue::as_int)
        .ok_or_else(|| TransportError::Protocol("expected an integer parameter".to_string()))?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(PanelFault::new(
            FaultCode::InvalidValue,
            format!("{value} is outside {}..={}", range.start(), range.end()),
        )
        .into())
    }
}

#[async_trait]
impl PanelTransport for FakePanel {
    async fn invoke(
        &self,
        command: PanelCommand,
        params: Vec<PanelValue>,
    ) -> Result<PanelValue, TransportError> {
        self.record(command, &params);
        let _in_flight = InFlight::enter(&self.in_flight, &self.max_in_flight);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.handle(command, params)
    }
}

/// Counts one call as in flight until dropped, including when the caller
/// abandons the call mid-latency.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, high_water: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        high_water.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
