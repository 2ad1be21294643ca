//! Synchronous playback on top of a poll-only Panel.
//!
//! The Panel only says whether a slot is playing *right now*. `play_sync`
//! presses play and then polls `isStillPlaying` on a fixed interval until
//! the slot goes quiet. The play request, every sleep and every in-flight
//! poll race the caller's cancellation token and the policy deadline.
//!
//! ```text
//! Idle -> Requested -> Polling -> Finished
//!             |           |
//!             +-----------+----> TimedOut | Cancelled | Failed
//! ```
//!
//! A `false` poll right after play may only mean the Panel has not started
//! yet. It is trusted as "finished" once a `true` poll was seen or once the
//! policy's start grace has elapsed since the play request.

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval, sleep_until};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};
use yukkuri_core::{PanelError, PanelResult, PlaybackPolicy, Slot};

use crate::client::PanelClient;

/// Where a playback wait currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackPhase {
    Idle,
    /// Play was sent; waiting for the Panel to accept it.
    Requested,
    /// Play accepted; polling `isStillPlaying`.
    Polling,
    Finished,
    TimedOut,
    Cancelled,
    Failed,
}

impl PlaybackPhase {
    /// Whether the wait is over.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Finished | Self::TimedOut | Self::Cancelled | Self::Failed
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requested => "requested",
            Self::Polling => "polling",
            Self::Finished => "finished",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a playback that finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackReport {
    pub slot: Slot,
    /// `isStillPlaying` calls that completed.
    pub polls: u32,
    /// Whether any poll reported the slot as playing.
    pub saw_playing: bool,
    /// Time from the play request to the finishing poll.
    pub elapsed: Duration,
}

// ============================================================================
// Client entry points
// ============================================================================

impl PanelClient {
    /// Press play on `slot` and wait until the Panel reports it finished.
    ///
    /// Uses the client's [`PlaybackPolicy`]. Firing `cancel` ends the wait
    /// promptly with [`PanelError::Cancelled`]; the Panel keeps playing
    /// unless the caller also calls [`PanelClient::stop`].
    pub async fn play_sync(
        &self,
        slot: Slot,
        cancel: &CancellationToken,
    ) -> PanelResult<PlaybackReport> {
        self.play_sync_with(slot, *self.policy(), cancel).await
    }

    /// [`play_sync`](Self::play_sync) with an explicit policy.
    pub async fn play_sync_with(
        &self,
        slot: Slot,
        policy: PlaybackPolicy,
        cancel: &CancellationToken,
    ) -> PanelResult<PlaybackReport> {
        PlaybackWait::new(self, slot, policy, None).run(cancel).await
    }

    /// Run `play_sync` on a background task.
    ///
    /// The returned handle reports the current phase, can cancel the wait,
    /// and cancels it when dropped.
    pub fn spawn_play_sync(&self, slot: Slot) -> PlaybackHandle {
        let client = self.clone();
        let policy = *self.policy();
        let cancel_token = CancellationToken::new();
        let (phase_tx, phase_rx) = watch::channel(PlaybackPhase::Idle);

        let task_cancel = cancel_token.clone();
        let join_handle = tokio::spawn(async move {
            PlaybackWait::new(&client, slot, policy, Some(phase_tx))
                .run(&task_cancel)
                .await
        });

        PlaybackHandle {
            slot,
            phase: phase_rx,
            cancel_on_drop: cancel_token.clone().drop_guard(),
            cancel_token,
            join_handle,
        }
    }
}

// ============================================================================
// Background handle
// ============================================================================

/// Handle to a playback wait running on its own task.
#[derive(Debug)]
pub struct PlaybackHandle {
    slot: Slot,
    phase: watch::Receiver<PlaybackPhase>,
    cancel_token: CancellationToken,
    cancel_on_drop: DropGuard,
    join_handle: JoinHandle<PanelResult<PlaybackReport>>,
}

impl PlaybackHandle {
    #[must_use]
    pub const fn slot(&self) -> Slot {
        self.slot
    }

    /// The most recently entered phase.
    #[must_use]
    pub fn phase(&self) -> PlaybackPhase {
        *self.phase.borrow()
    }

    /// A receiver that observes every phase change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PlaybackPhase> {
        self.phase.clone()
    }

    /// Stop waiting. The Panel is not told to stop.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Wait for the background wait to end.
    pub async fn wait(self) -> PanelResult<PlaybackReport> {
        let Self {
            slot,
            join_handle,
            cancel_on_drop: _cancel_on_drop,
            ..
        } = self;
        match join_handle.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Err(PanelError::Cancelled { slot }),
        }
    }
}

// ============================================================================
// State machine
// ============================================================================

enum Step<T> {
    Cancelled,
    Deadline,
    Done(PanelResult<T>),
}

struct PlaybackWait<'a> {
    client: &'a PanelClient,
    slot: Slot,
    policy: PlaybackPolicy,
    phase: PlaybackPhase,
    phase_tx: Option<watch::Sender<PlaybackPhase>>,
}

impl<'a> PlaybackWait<'a> {
    fn new(
        client: &'a PanelClient,
        slot: Slot,
        policy: PlaybackPolicy,
        phase_tx: Option<watch::Sender<PlaybackPhase>>,
    ) -> Self {
        Self {
            client,
            slot,
            policy,
            phase: PlaybackPhase::Idle,
            phase_tx,
        }
    }

    fn enter(&mut self, phase: PlaybackPhase) {
        debug!(
            slot = self.slot.index(),
            from = %self.phase,
            to = %phase,
            "Playback phase transition"
        );
        self.phase = phase;
        if let Some(tx) = &self.phase_tx {
            tx.send_replace(phase);
        }
    }

    async fn run(mut self, cancel: &CancellationToken) -> PanelResult<PlaybackReport> {
        let slot = self.slot;
        if cancel.is_cancelled() {
            self.enter(PlaybackPhase::Cancelled);
            return Err(PanelError::Cancelled { slot });
        }

        self.enter(PlaybackPhase::Requested);
        let requested_at = Instant::now();
        let deadline = self.policy.max_wait().map(|wait| requested_at + wait);
        let expiry = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(expiry);

        let client = self.client;
        let requested = tokio::select! {
            biased;
            () = cancel.cancelled() => Step::Cancelled,
            () = &mut expiry => Step::Deadline,
            result = client.play(slot) => Step::Done(result),
        };
        match requested {
            Step::Cancelled => return Err(self.cancelled(0)),
            Step::Deadline => return Err(self.timed_out(0, requested_at.elapsed())),
            Step::Done(Err(err)) => {
                self.enter(PlaybackPhase::Failed);
                warn!(slot = slot.index(), error = %err, "Play request failed");
                return Err(PanelError::PlaybackFailed {
                    slot,
                    source: Box::new(err),
                });
            }
            Step::Done(Ok(())) => {}
        }

        let mut ticker = interval(self.policy.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.enter(PlaybackPhase::Polling);
        let mut polls: u32 = 0;
        let mut saw_playing = false;

        loop {
            let step = tokio::select! {
                biased;
                () = cancel.cancelled() => Step::Cancelled,
                () = &mut expiry => Step::Deadline,
                result = async {
                    ticker.tick().await;
                    client.is_still_playing(slot).await
                } => Step::Done(result),
            };

            let elapsed = requested_at.elapsed();
            match step {
                Step::Cancelled => return Err(self.cancelled(polls)),
                Step::Deadline => return Err(self.timed_out(polls, elapsed)),
                Step::Done(Err(err)) => {
                    polls += 1;
                    self.enter(PlaybackPhase::Failed);
                    warn!(slot = slot.index(), polls, error = %err, "Playback poll failed");
                    return Err(PanelError::PlaybackFailed {
                        slot,
                        source: Box::new(err),
                    });
                }
                Step::Done(Ok(playing)) => {
                    polls += 1;
                    debug!(
                        slot = slot.index(),
                        polls,
                        playing,
                        elapsed_ms = elapsed.as_millis(),
                        "Polled playback state"
                    );
                    if playing {
                        saw_playing = true;
                    } else if saw_playing || elapsed >= self.policy.start_grace() {
                        self.enter(PlaybackPhase::Finished);
                        info!(
                            slot = slot.index(),
                            polls,
                            elapsed_ms = elapsed.as_millis(),
                            "Playback finished"
                        );
                        return Ok(PlaybackReport {
                            slot,
                            polls,
                            saw_playing,
                            elapsed,
                        });
                    }
                }
            }
        }
    }

    fn cancelled(&mut self, polls: u32) -> PanelError {
        self.enter(PlaybackPhase::Cancelled);
        info!(slot = self.slot.index(), polls, "Playback wait cancelled");
        PanelError::Cancelled { slot: self.slot }
    }

    fn timed_out(&mut self, polls: u32, waited: Duration) -> PanelError {
        self.enter(PlaybackPhase::TimedOut);
        warn!(
            slot = self.slot.index(),
            polls,
            elapsed_ms = waited.as_millis(),
            "Playback did not finish before the deadline"
        );
        PanelError::TimedOut {
            slot: self.slot,
            waited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use yukkuri_core::testing::FakePanel;
    use yukkuri_core::{PanelCommand, TransportError};

    fn setup() -> (Arc<FakePanel>, PanelClient) {
        let panel = Arc::new(FakePanel::new());
        let client = PanelClient::new(panel.clone());
        (panel, client)
    }

    #[test]
    fn test_terminal_phases() {
        assert!(PlaybackPhase::Finished.is_terminal());
        assert!(PlaybackPhase::Failed.is_terminal());
        assert!(!PlaybackPhase::Polling.is_terminal());
        assert!(!PlaybackPhase::Idle.is_terminal());
        assert_eq!(PlaybackPhase::TimedOut.to_string(), "timed_out");
    }

    #[tokio::test(start_paused = true)]
    async fn test_false_before_start_is_not_finish() {
        let (panel, client) = setup();
        // Panel is slow to start: two idle reads, then playing, then done
        panel.script_playback(0, [false, false, true]);

        let report = client
            .play_sync(Slot::PRIMARY, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.polls, 4);
        assert!(report.saw_playing);
        assert!(report.elapsed >= Duration::from_millis(150));
        assert!(report.elapsed < PlaybackPolicy::default().start_grace());
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_period_finishes_silent_playback() {
        let (panel, client) = setup();
        // Empty text: the slot never reports playing

        let report = client
            .play_sync(Slot::PRIMARY, &CancellationToken::new())
            .await
            .unwrap();

        assert!(!report.saw_playing);
        assert!(report.elapsed >= Duration::from_millis(500));
        assert!(report.elapsed < Duration::from_millis(550));
        assert_eq!(report.polls, 11);
        assert_eq!(panel.call_count(PanelCommand::IsStillPlaying), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_start_sends_nothing() {
        let (panel, client) = setup();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client.play_sync(Slot::PRIMARY, &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(panel.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_is_failed_not_timeout() {
        let (panel, client) = setup();
        panel.always_playing(0);
        panel.fail_next(
            PanelCommand::IsStillPlaying,
            TransportError::Io("pipe closed".to_string()),
        );

        let err = client
            .play_sync(Slot::PRIMARY, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PanelError::PlaybackFailed { .. }));
        assert!(err.is_transport());
        assert!(!err.is_timeout());
        assert_eq!(panel.call_count(PanelCommand::IsStillPlaying), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_deadline_waits_for_long_playback() {
        let (panel, client) = setup();
        panel.script_playback(0, std::iter::repeat_n(true, 5_000));
        let policy = PlaybackPolicy::default().without_deadline();

        let report = client
            .play_sync_with(Slot::PRIMARY, policy, &CancellationToken::new())
            .await
            .unwrap();

        // 5000 polls at 50ms is longer than the default deadline
        assert_eq!(report.polls, 5_001);
        assert!(report.elapsed > PlaybackPolicy::default().max_wait().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_reports_phases() {
        let (panel, client) = setup();
        panel.script_playback(0, [true, true]);

        let handle = client.spawn_play_sync(Slot::PRIMARY);
        assert_eq!(handle.slot(), Slot::PRIMARY);
        let mut phases = handle.subscribe();

        let report = handle.wait().await.unwrap();
        assert_eq!(report.polls, 3);
        assert_eq!(*phases.borrow_and_update(), PlaybackPhase::Finished);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_cancel() {
        let (panel, client) = setup();
        panel.always_playing(0);

        let handle = client.spawn_play_sync(Slot::PRIMARY);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(handle.phase(), PlaybackPhase::Polling);

        handle.cancel();
        let err = handle.wait().await.unwrap_err();
        assert!(err.is_cancelled());

        let polls = panel.call_count(PanelCommand::IsStillPlaying);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(panel.call_count(PanelCommand::IsStillPlaying), polls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_polling() {
        let (panel, client) = setup();
        panel.always_playing(0);

        let handle = client.spawn_play_sync(Slot::PRIMARY);
        tokio::time::sleep(Duration::from_millis(120)).await;
        drop(handle);

        // Let the task observe the cancellation
        tokio::time::sleep(Duration::from_millis(10)).await;
        let polls = panel.call_count(PanelCommand::IsStillPlaying);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(panel.call_count(PanelCommand::IsStillPlaying), polls);
    }
}
