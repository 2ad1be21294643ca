//! Read-aloud queue.
//!
//! Chat comments arrive faster than the Panel can speak them. `Speaker`
//! keeps a FIFO of pending utterances and, on every tick, hands the next one
//! to the Panel once the previous one has finished. The longer the backlog,
//! the faster the voice; past a hard threshold the backlog is dropped.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::ops::Range;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use regex::Regex;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use yukkuri_core::{PanelResult, PanelSettings, SettingsError, Slot, Speed};

use crate::client::PanelClient;
use crate::playback::PlaybackReport;

/// Default interval between dequeue attempts.
pub const DEFAULT_DEQUEUE_INTERVAL: Duration = Duration::from_millis(500);

/// Default backlog length above which the queue is dropped.
pub const DEFAULT_BACKLOG_THRESHOLD: usize = 30;

/// Chat command prefix such as `/press show yellow `.
static COMMAND_PREFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^/\w+ \w+ \w+ ").ok());

/// Strip a leading chat command from `comment` so only the words are read.
#[must_use]
pub fn clean_comment(comment: &str) -> Cow<'_, str> {
    match COMMAND_PREFIX.as_ref() {
        Some(prefix) => prefix.replace(comment, ""),
        None => Cow::Borrowed(comment),
    }
}

/// One row of the backlog-to-speed table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedStep {
    /// Backlog lengths this row applies to.
    pub backlog: Range<usize>,
    pub speed: Speed,
}

impl SpeedStep {
    #[must_use]
    pub const fn new(backlog: Range<usize>, speed: Speed) -> Self {
        Self { backlog, speed }
    }
}

/// Default speed table: 100% up to 5 pending, then +25% per 5, capped at 200%.
#[must_use]
pub fn default_speed_steps() -> Vec<SpeedStep> {
    vec![
        SpeedStep::new(0..5, Speed(100)),
        SpeedStep::new(5..10, Speed(125)),
        SpeedStep::new(10..15, Speed(150)),
        SpeedStep::new(15..20, Speed(175)),
        SpeedStep::new(20..100, Speed(200)),
    ]
}

/// Speed for the next utterance given `backlog` items still waiting.
///
/// An empty backlog returns the base step. Otherwise the voice never slows
/// down below `current` while there is still a queue to work off.
#[must_use]
pub fn adjusted_speed(steps: &[SpeedStep], backlog: usize, current: Speed) -> Speed {
    let base = steps.first().map_or(Speed::NORMAL, |step| step.speed);
    if backlog == 0 {
        return base;
    }
    let candidate = steps
        .iter()
        .find(|step| step.backlog.contains(&backlog))
        .map_or(base, |step| step.speed);
    candidate.max(current)
}

/// Speech queue configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechQueueConfig {
    /// Slot the queue speaks on.
    pub slot: Slot,
    pub dequeue_interval: Duration,
    pub backlog_threshold: usize,
    pub speed_steps: Vec<SpeedStep>,
}

impl Default for SpeechQueueConfig {
    fn default() -> Self {
        Self {
            slot: Slot::PRIMARY,
            dequeue_interval: DEFAULT_DEQUEUE_INTERVAL,
            backlog_threshold: DEFAULT_BACKLOG_THRESHOLD,
            speed_steps: default_speed_steps(),
        }
    }
}

impl SpeechQueueConfig {
    /// Default config speaking on the settings' speech slot.
    pub fn from_settings(settings: &PanelSettings) -> Result<Self, SettingsError> {
        Ok(Self {
            slot: settings.effective_speech_slot()?,
            ..Self::default()
        })
    }

    #[must_use]
    pub const fn with_slot(mut self, slot: Slot) -> Self {
        self.slot = slot;
        self
    }

    #[must_use]
    pub const fn with_dequeue_interval(mut self, interval: Duration) -> Self {
        self.dequeue_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_backlog_threshold(mut self, threshold: usize) -> Self {
        self.backlog_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_speed_steps(mut self, steps: Vec<SpeedStep>) -> Self {
        self.speed_steps = steps;
        self
    }
}

// ============================================================================
// Queue
// ============================================================================

/// FIFO of pending utterances.
#[derive(Debug)]
pub struct SpeechQueue {
    pending: Mutex<VecDeque<String>>,
    threshold: usize,
}

impl Default for SpeechQueue {
    fn default() -> Self {
        Self::new(DEFAULT_BACKLOG_THRESHOLD)
    }
}

impl SpeechQueue {
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            threshold,
        }
    }

    /// Queue `text` without its chat command prefix. Blank text is ignored.
    pub fn enqueue(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        let text = clean_comment(&text);
        if text.trim().is_empty() {
            return false;
        }
        self.lock().push_back(text.into_owned());
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Drop everything if the backlog is over the threshold.
    pub fn drain_if_backlogged(&self) -> bool {
        let mut pending = self.lock();
        if pending.len() > self.threshold {
            info!(dropped = pending.len(), "Speech backlog over threshold, dropping queue");
            pending.clear();
            true
        } else {
            false
        }
    }

    /// Take the next utterance and the backlog left behind it.
    fn pop(&self) -> Option<(String, usize)> {
        let mut pending = self.lock();
        pending.pop_front().map(|text| (text, pending.len()))
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        // Plain strings: a poisoned queue is still consistent
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Speaker
// ============================================================================

/// What one `tick` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The Panel is not running.
    Unavailable,
    /// Nothing queued.
    Idle,
    /// The previous utterance is still playing.
    Busy,
    /// Handed the next utterance to the Panel.
    Spoke { text: String, speed: Speed },
}

#[derive(Debug)]
struct SpeakerState {
    speed: Speed,
    available: Option<bool>,
}

/// Drives a [`SpeechQueue`] through a [`PanelClient`].
#[derive(Debug)]
pub struct Speaker {
    client: PanelClient,
    config: SpeechQueueConfig,
    queue: SpeechQueue,
    state: Mutex<SpeakerState>,
}

impl Speaker {
    pub fn new(client: PanelClient, config: SpeechQueueConfig) -> Self {
        let base = config.speed_steps.first().map_or(Speed::NORMAL, |s| s.speed);
        Self {
            queue: SpeechQueue::new(config.backlog_threshold),
            client,
            config,
            state: Mutex::new(SpeakerState {
                speed: base,
                available: None,
            }),
        }
    }

    #[must_use]
    pub const fn queue(&self) -> &SpeechQueue {
        &self.queue
    }

    #[must_use]
    pub const fn config(&self) -> &SpeechQueueConfig {
        &self.config
    }

    /// Queue `text`, dropping the backlog first if it has grown too long.
    pub fn enqueue(&self, text: impl Into<String>) -> bool {
        self.queue.drain_if_backlogged();
        self.queue.enqueue(text)
    }

    /// One dequeue step.
    pub async fn tick(&self) -> PanelResult<TickOutcome> {
        let available = self.client.is_available().await?;
        if self.observe_availability(available) {
            info!(available, "Panel availability changed, dropping speech queue");
            self.queue.clear();
        }
        if !available {
            return Ok(TickOutcome::Unavailable);
        }

        if self.queue.is_empty() {
            return Ok(TickOutcome::Idle);
        }
        let slot = self.config.slot;
        if self.client.is_still_playing(slot).await? {
            return Ok(TickOutcome::Busy);
        }
        let Some((text, backlog)) = self.queue.pop() else {
            return Ok(TickOutcome::Idle);
        };

        let speed = {
            let mut state = self.lock_state();
            state.speed = adjusted_speed(&self.config.speed_steps, backlog, state.speed);
            state.speed
        };
        debug!(slot = slot.index(), backlog, speed = speed.0, "Speaking next utterance");

        self.client.set_speed(slot, speed).await?;
        self.client.set_kanji_text(&text).await?;
        self.client.play(slot).await?;
        Ok(TickOutcome::Spoke { text, speed })
    }

    /// Tick on the configured interval until `cancel` fires.
    ///
    /// Failed ticks are logged and the loop carries on.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = interval(self.config.dequeue_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(slot = self.config.slot.index(), "Starting speech queue");

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!(pending = self.queue.len(), "Speech queue stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.tick().await {
                        warn!(error = %err, "Speech queue tick failed");
                    }
                }
            }
        }
    }

    /// Put `text` in the Kanji buffer and play it to the end.
    ///
    /// Bypasses the queue.
    pub async fn speak_now(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> PanelResult<PlaybackReport> {
        self.client.set_kanji_text(text).await?;
        self.client.play_sync(self.config.slot, cancel).await
    }

    /// Record `available`; true when it differs from the last observation.
    fn observe_availability(&self, available: bool) -> bool {
        let mut state = self.lock_state();
        let changed = state.available.is_some_and(|last| last != available);
        state.available = Some(available);
        changed
    }

    fn lock_state(&self) -> MutexGuard<'_, SpeakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
