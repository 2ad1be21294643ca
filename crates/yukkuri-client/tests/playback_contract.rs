//! Integration tests for the synchronous playback contract.
//!
//! Every test runs on a paused clock, so the poll schedule is exact and
//! no test actually sleeps. The Panel is either the scriptable `FakePanel`
//! or a `mockall` transport where exact call counts matter.
//!
//! # What is tested
//!
//! - N playing polls followed by an idle poll finish the wait
//! - A slot that never goes idle times out and stops polling
//! - Cancellation after the second poll ends the wait within one interval
//! - A slow play request still honours cancellation and the deadline
//! - A failed play request never polls
//! - Calls are serialized on a transport that cannot overlap them

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use tokio::time::{Instant, sleep};
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;
use yukkuri_client::PanelClient;
use yukkuri_core::testing::FakePanel;
use yukkuri_core::{
    PanelCommand, PanelError, PanelTransport, PanelValue, PlaybackPolicy, Slot, Speed,
    TransportError,
};

// ── Mock transport ─────────────────────────────────────────────────

mock! {
    pub Transport {}

    #[async_trait]
    impl PanelTransport for Transport {
        async fn invoke(
            &self,
            command: PanelCommand,
            params: Vec<PanelValue>,
        ) -> Result<PanelValue, TransportError>;

        fn supports_concurrent_calls(&self) -> bool;
    }
}

// ── Helpers ────────────────────────────────────────────────────────

const POLL: Duration = Duration::from_millis(50);

fn fake_client() -> (Arc<FakePanel>, PanelClient) {
    let panel = Arc::new(FakePanel::new());
    let client = PanelClient::new(panel.clone());
    (panel, client)
}

fn polls(panel: &FakePanel) -> usize {
    panel.call_count(PanelCommand::IsStillPlaying)
}

// ── Finish ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn finishes_after_playing_polls() {
    for playing_polls in [1usize, 3, 10] {
        let (panel, client) = fake_client();
        panel.script_playback(0, std::iter::repeat_n(true, playing_polls));

        let report = assert_ok!(
            client
                .play_sync(Slot::PRIMARY, &CancellationToken::new())
                .await
        );

        assert!(report.saw_playing);
        assert_eq!(report.polls, u32::try_from(playing_polls + 1).unwrap());
        assert_eq!(polls(&panel), playing_polls + 1);
        assert_eq!(panel.call_count(PanelCommand::PushPlayButton), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn first_idle_poll_is_not_trusted() {
    let (panel, client) = fake_client();
    // Play accepted but the engine has not started on the first read
    panel.script_playback(0, [false, true, true]);

    let report = client
        .play_sync(Slot::PRIMARY, &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.saw_playing);
    assert_eq!(report.polls, 4);
}

// ── Deadline ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn endless_playback_times_out() {
    let (panel, client) = fake_client();
    panel.always_playing(0);
    let policy = PlaybackPolicy::default()
        .with_poll_interval(POLL)
        .with_max_wait(Duration::from_secs(1));

    let err = client
        .play_sync_with(Slot::PRIMARY, policy, &CancellationToken::new())
        .await
        .unwrap_err();

    let PanelError::TimedOut { slot, waited } = err else {
        panic!("expected TimedOut, got {err:?}");
    };
    assert_eq!(slot, Slot::PRIMARY);
    assert!(waited >= Duration::from_secs(1));

    // Nothing polls once the deadline has passed
    let at_timeout = polls(&panel);
    assert!(at_timeout <= 21);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(polls(&panel), at_timeout);
}

#[tokio::test(start_paused = true)]
async fn deadline_counts_from_play_request() {
    let panel = Arc::new(FakePanel::new().with_latency(Duration::from_secs(3)));
    panel.always_playing(0);
    let client = PanelClient::new(panel.clone());
    let max_wait = Duration::from_secs(1);
    let policy = PlaybackPolicy::default().with_max_wait(max_wait);

    let started = Instant::now();
    let err = client
        .play_sync_with(Slot::PRIMARY, policy, &CancellationToken::new())
        .await
        .unwrap_err();

    // A hung play request is abandoned at the deadline; no poll is attempted
    let PanelError::TimedOut { waited, .. } = err else {
        panic!("expected TimedOut, got {err:?}");
    };
    assert!(waited >= max_wait && waited < max_wait + POLL);
    assert!(started.elapsed() < max_wait + POLL);
    assert_eq!(panel.call_count(PanelCommand::PushPlayButton), 1);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(polls(&panel), 0);
}

// ── Cancellation ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn cancel_after_second_poll() {
    let (panel, client) = fake_client();
    panel.always_playing(0);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    // Polls land at 0ms and 50ms; the signal arrives between the 2nd and 3rd
    tokio::spawn(async move {
        sleep(POLL + POLL / 2).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = client.play_sync(Slot::PRIMARY, &cancel).await.unwrap_err();

    assert!(matches!(err, PanelError::Cancelled { slot } if slot == Slot::PRIMARY));
    assert!(started.elapsed() < POLL + POLL / 2 + POLL);
    assert_eq!(polls(&panel), 2);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(polls(&panel), 2);
    // The Panel is never told to stop
    assert_eq!(panel.call_count(PanelCommand::PushStopButton), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_slow_play_request() {
    let panel = Arc::new(FakePanel::new().with_latency(Duration::from_secs(3)));
    panel.always_playing(0);
    let client = PanelClient::new(panel.clone());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = client.play_sync(Slot::PRIMARY, &cancel).await.unwrap_err();

    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_millis(100) + POLL);
    assert_eq!(panel.call_count(PanelCommand::PushPlayButton), 1);
    assert_eq!(polls(&panel), 0);

    // The abandoned call no longer counts as in flight, and the gate is free
    assert_ok!(client.version().await);
    assert_eq!(panel.max_in_flight(), 1);
}

// ── Failure ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn failed_play_never_polls() {
    let mut transport = MockTransport::new();
    transport
        .expect_supports_concurrent_calls()
        .return_const(false);
    transport
        .expect_invoke()
        .withf(|command, _| *command == PanelCommand::PushPlayButton)
        .times(1)
        .returning(|_, _| Err(TransportError::Unreachable("connection refused".to_string())));
    transport
        .expect_invoke()
        .withf(|command, _| *command == PanelCommand::IsStillPlaying)
        .never();

    let client = PanelClient::new(Arc::new(transport));
    let err = client
        .play_sync(Slot::PRIMARY, &CancellationToken::new())
        .await
        .unwrap_err();

    let PanelError::PlaybackFailed { source, .. } = &err else {
        panic!("expected PlaybackFailed, got {err:?}");
    };
    assert!(source.is_unreachable());
    assert!(!err.is_timeout());
}

#[tokio::test(start_paused = true)]
async fn play_on_missing_slot_fails() {
    let (panel, client) = fake_client();
    let missing = Slot::new(7).unwrap();

    let err = client
        .play_sync(missing, &CancellationToken::new())
        .await
        .unwrap_err();

    let PanelError::PlaybackFailed { slot, source } = err else {
        panic!("expected PlaybackFailed");
    };
    assert_eq!(slot, missing);
    assert!(matches!(*source, PanelError::InvalidSlot { .. }));
    assert_eq!(polls(&panel), 0);
}

// ── Concurrency ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn calls_are_serialized_during_playback() {
    let panel = Arc::new(FakePanel::new().with_latency(Duration::from_millis(10)));
    panel.script_playback(0, [true, true, true]);
    let client = PanelClient::new(panel.clone());
    let other = Slot::new(1).unwrap();

    let cancel = CancellationToken::new();
    let wait = client.play_sync(Slot::PRIMARY, &cancel);
    let edits = async {
        for speed in [110, 120, 130, 140] {
            client.set_speed(other, Speed(speed)).await.unwrap();
            client.set_koe_text("ゆっくり").await.unwrap();
        }
    };
    let (report, ()) = tokio::join!(wait, edits);

    assert!(report.unwrap().saw_playing);
    assert_eq!(panel.max_in_flight(), 1);
    assert_eq!(client.speed(other).await.unwrap(), Speed(140));
}

#[tokio::test(start_paused = true)]
async fn waits_on_different_slots_are_independent() {
    let (panel, client) = fake_client();
    let second = Slot::new(1).unwrap();
    panel.script_playback(0, [true, true]);
    panel.script_playback(1, [true, true, true, true, true]);

    let cancel = CancellationToken::new();
    let (first, other) = tokio::join!(
        client.play_sync(Slot::PRIMARY, &cancel),
        client.play_sync(second, &cancel),
    );

    assert_eq!(first.unwrap().polls, 3);
    assert_eq!(other.unwrap().polls, 6);
}
