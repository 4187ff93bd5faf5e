//! Integration tests for the playback controller
//!
//! These drive the controller directly with a scripted player, feeding
//! completions through the bridge the way the control loop does.

use crate::test_utils::{track, Harness};
use r_jukebox::audio::PlayerError;
use r_jukebox::player::{CommandOutcome, ControllerError};
use r_jukebox::presentation::Announcement;
use r_jukebox::session::{PlaybackState, SessionKey};
use std::time::Duration;

const KEY: SessionKey = SessionKey(42);

#[cfg(test)]
mod controller_integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_complete_skip_scenario() -> Result<(), ControllerError> {
        let mut h = Harness::new();

        let outcome = h.controller.enqueue(KEY, vec![track("A", 30)], false).await?;
        assert!(matches!(outcome, CommandOutcome::Queued { started: true, .. }));
        assert_eq!(h.current_title(KEY).await.as_deref(), Some("A"));

        let outcome = h.controller.enqueue(KEY, vec![track("B", 45)], false).await?;
        assert_eq!(outcome, CommandOutcome::Queued { title: "B".to_string(), count: 1, position: 1, started: false });
        assert_eq!(h.player.started().len(), 1);

        let results = h.finish_current().await;
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(h.current_title(KEY).await.as_deref(), Some("B"));
        assert_eq!(h.history_titles(KEY).await, vec!["A"]);
        assert!(h.pending_titles(KEY).await.is_empty());

        assert_eq!(h.controller.skip(KEY).await?, CommandOutcome::SkipRequested);
        // Skip alone does not advance; the completion does.
        assert_eq!(h.current_title(KEY).await.as_deref(), Some("B"));
        h.drain().await;

        assert_eq!(h.current_title(KEY).await, None);
        assert_eq!(h.history_titles(KEY).await, vec!["A", "B"]);
        assert_eq!(h.with_state(KEY, |s| s.playback_state()).await, PlaybackState::Idle);
        h.settle().await;
        assert_eq!(h.sink.queue_finished_count(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_resume_accumulates_play_segments() -> Result<(), ControllerError> {
        let h = Harness::new();
        h.controller.enqueue(KEY, vec![track("A", 300)], false).await?;

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(h.controller.pause(KEY).await?, CommandOutcome::Paused);
        assert_eq!(h.with_state(KEY, |s| s.elapsed()).await, Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(h.controller.resume(KEY).await?, CommandOutcome::Resumed);
        tokio::time::advance(Duration::from_secs(5)).await;
        h.controller.pause(KEY).await?;

        assert_eq!(h.with_state(KEY, |s| s.elapsed()).await, Duration::from_secs(15));
        assert_eq!(h.with_state(KEY, |s| s.playback_state()).await, PlaybackState::Paused);
        Ok(())
    }

    #[tokio::test]
    async fn test_pause_and_resume_outside_valid_states() -> Result<(), ControllerError> {
        let h = Harness::new();
        assert!(matches!(h.controller.pause(KEY).await, Err(ControllerError::InvalidOperation(_))));
        assert!(matches!(h.controller.resume(KEY).await, Err(ControllerError::InvalidOperation(_))));
        assert!(matches!(h.controller.skip(KEY).await, Err(ControllerError::InvalidOperation(_))));

        h.controller.enqueue(KEY, vec![track("A", 30)], false).await?;
        assert!(matches!(h.controller.resume(KEY).await, Err(ControllerError::InvalidOperation(_))));
        h.controller.pause(KEY).await?;
        assert!(matches!(h.controller.pause(KEY).await, Err(ControllerError::InvalidOperation(_))));
        assert_eq!(h.controller.toggle_pause(KEY).await?, CommandOutcome::Resumed);
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_completion_after_stop_is_ignored() -> Result<(), ControllerError> {
        let mut h = Harness::new();
        h.player.set_complete_on_stop(false);
        h.controller.enqueue(KEY, vec![track("A", 30), track("B", 30)], false).await?;
        let first = h.player.last_handle().expect("A started");

        assert_eq!(h.controller.stop(KEY).await?, CommandOutcome::Stopped { removed: 1 });
        assert_eq!(h.with_state(KEY, |s| s.playback_state()).await, PlaybackState::Idle);
        assert!(!h.with_state(KEY, |s| s.has_progress_task()).await);

        h.player.complete(first, None);
        let results = h.drain().await;
        assert!(matches!(results.as_slice(), [Err(ControllerError::StaleCompletion { .. })]));

        assert_eq!(h.with_state(KEY, |s| s.playback_state()).await, PlaybackState::Idle);
        assert_eq!(h.current_title(KEY).await, None);
        assert_eq!(h.player.started().len(), 1);
        h.settle().await;
        assert!(h.sink.announcements().contains(&Announcement::Stopped));
        Ok(())
    }

    #[tokio::test]
    async fn test_late_completion_does_not_disturb_newer_playback() -> Result<(), ControllerError> {
        let mut h = Harness::new();
        h.player.set_complete_on_stop(false);
        h.controller.enqueue(KEY, vec![track("A", 30)], false).await?;
        let old = h.player.last_handle().expect("A started");
        h.controller.stop(KEY).await?;

        h.controller.enqueue(KEY, vec![track("C", 30)], false).await?;
        h.player.complete(old, None);
        let results = h.drain().await;

        assert!(matches!(results.as_slice(), [Err(ControllerError::StaleCompletion { .. })]));
        assert_eq!(h.current_title(KEY).await.as_deref(), Some("C"));
        assert_eq!(h.with_state(KEY, |s| s.playback_state()).await, PlaybackState::Playing);
        Ok(())
    }

    #[tokio::test]
    async fn test_history_evicts_oldest_after_capacity() -> Result<(), ControllerError> {
        let mut h = Harness::new();
        let tracks = (0..52).map(|i| track(&format!("T{}", i), 10)).collect();
        h.controller.enqueue(KEY, tracks, false).await?;

        for _ in 0..51 {
            h.finish_current().await;
        }

        let history = h.history_titles(KEY).await;
        assert_eq!(history.len(), 50);
        assert_eq!(history.first().map(String::as_str), Some("T1"));
        assert_eq!(history.last().map(String::as_str), Some("T50"));
        assert_eq!(h.current_title(KEY).await.as_deref(), Some("T51"));
        Ok(())
    }

    #[tokio::test]
    async fn test_previous_then_completion_keeps_displaced_track() -> Result<(), ControllerError> {
        let mut h = Harness::new();
        h.controller.enqueue(KEY, vec![track("A", 30), track("B", 30)], false).await?;
        h.finish_current().await;
        assert_eq!(h.current_title(KEY).await.as_deref(), Some("B"));

        let outcome = h.controller.previous(KEY).await?;
        assert_eq!(outcome, CommandOutcome::Rewound { title: "A".to_string() });
        assert_eq!(h.pending_titles(KEY).await, vec!["B"]);
        // The replaced playback of B completes on stop; it is stale by now.
        let results = h.drain().await;
        assert!(results.iter().all(|r| matches!(r, Err(ControllerError::StaleCompletion { .. }))));
        assert_eq!(h.current_title(KEY).await.as_deref(), Some("A"));

        h.finish_current().await;
        assert_eq!(h.current_title(KEY).await.as_deref(), Some("B"));
        assert!(h.pending_titles(KEY).await.is_empty());
        assert_eq!(h.history_titles(KEY).await, vec!["A"]);
        assert_eq!(h.player.started(), vec!["src://a", "src://b", "src://a", "src://b"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_previous_with_empty_history() {
        let h = Harness::new();
        match h.controller.previous(KEY).await {
            Err(ControllerError::InvalidOperation(msg)) => assert_eq!(msg, "No history"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_looping_replays_current_track() -> Result<(), ControllerError> {
        let mut h = Harness::new();
        h.controller.set_looping(KEY, true).await?;
        h.controller.enqueue(KEY, vec![track("A", 30), track("B", 30)], false).await?;

        h.finish_current().await;
        h.finish_current().await;
        assert_eq!(h.current_title(KEY).await.as_deref(), Some("A"));
        assert_eq!(h.pending_titles(KEY).await, vec!["B"]);
        assert!(h.history_titles(KEY).await.is_empty());

        assert_eq!(h.controller.toggle_looping(KEY).await?, CommandOutcome::Looping(false));
        h.finish_current().await;
        assert_eq!(h.current_title(KEY).await.as_deref(), Some("B"));
        assert_eq!(h.history_titles(KEY).await, vec!["A"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_start_failure_advances_past_bad_track() -> Result<(), ControllerError> {
        let h = Harness::new();
        h.player.fail_source("src://broken");

        let outcome = h.controller.enqueue(KEY, vec![track("Broken", 30), track("Good", 30)], false).await?;
        assert!(matches!(outcome, CommandOutcome::Queued { ref title, started: true, .. } if title == "Good"));
        assert_eq!(h.history_titles(KEY).await, vec!["Broken"]);
        h.settle().await;
        assert!(h
            .sink
            .announcements()
            .iter()
            .any(|a| matches!(a, Announcement::TrackFailed { title, .. } if title == "Broken")));
        Ok(())
    }

    #[tokio::test]
    async fn test_enqueue_of_only_failing_tracks_reports_failure() {
        let h = Harness::new();
        h.player.fail_source("src://broken");

        let result = h.controller.enqueue(KEY, vec![track("Broken", 30)], false).await;
        assert!(matches!(result, Err(ControllerError::PlaybackStartFailed(_))));
        assert_eq!(h.with_state(KEY, |s| s.playback_state()).await, PlaybackState::Idle);
        h.settle().await;
        assert_eq!(h.sink.queue_finished_count(), 1);
    }

    #[tokio::test]
    async fn test_completion_with_error_still_advances() -> Result<(), ControllerError> {
        let mut h = Harness::new();
        h.controller.enqueue(KEY, vec![track("A", 30), track("B", 30)], false).await?;
        let handle = h.player.last_handle().expect("A started");

        h.player.complete(handle, Some(PlayerError::Playback("decoder gave up".to_string())));
        let results = h.drain().await;
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(h.current_title(KEY).await.as_deref(), Some("B"));
        h.settle().await;
        assert!(h.sink.announcements().iter().any(|a| matches!(a, Announcement::TrackFailed { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_errored_completion_of_looping_track_moves_on() -> Result<(), ControllerError> {
        let mut h = Harness::new();
        h.controller.set_looping(KEY, true).await?;
        h.controller.enqueue(KEY, vec![track("A", 30), track("B", 30)], false).await?;
        let handle = h.player.last_handle().expect("A started");

        h.player.complete(handle, Some(PlayerError::Playback("stream dropped".to_string())));
        h.drain().await;

        assert_eq!(h.current_title(KEY).await.as_deref(), Some("B"));
        assert!(h.pending_titles(KEY).await.is_empty());
        assert_eq!(h.history_titles(KEY).await, vec!["A"]);
        assert!(h.with_state(KEY, |s| s.is_looping()).await);

        // A clean completion still loops.
        h.finish_current().await;
        assert_eq!(h.current_title(KEY).await.as_deref(), Some("B"));
        assert_eq!(h.player.started(), vec!["src://a", "src://b", "src://b"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_play_next_goes_to_front() -> Result<(), ControllerError> {
        let h = Harness::new();
        h.controller.enqueue(KEY, vec![track("A", 30), track("B", 30)], false).await?;
        let outcome = h.controller.enqueue(KEY, vec![track("X", 30), track("Y", 30)], true).await?;

        assert!(matches!(outcome, CommandOutcome::Queued { position: 1, count: 2, started: false, .. }));
        assert_eq!(h.pending_titles(KEY).await, vec!["X", "Y", "B"]);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_enqueues_start_one_playback() {
        let h = Harness::new();
        let mut joins = Vec::new();
        for i in 0..10 {
            let controller = h.controller.clone();
            joins.push(tokio::spawn(async move {
                controller.enqueue(KEY, vec![track(&format!("T{}", i), 30)], false).await
            }));
        }
        for join in joins {
            assert!(join.await.expect("enqueue task panicked").is_ok());
        }

        assert_eq!(h.player.started().len(), 1);
        assert_eq!(h.player.live_count(), 1);
        assert_eq!(h.pending_titles(KEY).await.len(), 9);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() -> Result<(), ControllerError> {
        let mut h = Harness::new();
        let other = SessionKey(7);
        h.controller.enqueue(KEY, vec![track("A", 30)], false).await?;
        h.controller.enqueue(other, vec![track("Z", 30)], false).await?;

        h.controller.stop(KEY).await?;
        h.drain().await;

        assert_eq!(h.current_title(KEY).await, None);
        assert_eq!(h.current_title(other).await.as_deref(), Some("Z"));
        Ok(())
    }

    #[tokio::test]
    async fn test_shuffle_clear_and_queue_view() -> Result<(), ControllerError> {
        let h = Harness::new();
        assert!(matches!(h.controller.shuffle(KEY).await, Err(ControllerError::InvalidOperation(_))));

        let tracks = (0..13).map(|i| track(&format!("T{}", i), 60)).collect();
        h.controller.enqueue(KEY, tracks, false).await?;

        match h.controller.queue(KEY).await? {
            CommandOutcome::Queue(view) => {
                assert_eq!(view.current.as_ref().map(|t| t.title()), Some("T0"));
                assert_eq!(view.up_next.len(), 10);
                assert_eq!(view.remaining, 2);
                assert_eq!(view.total_pending_seconds, 12 * 60);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let before = {
            let mut titles = h.pending_titles(KEY).await;
            titles.sort();
            titles
        };
        assert_eq!(h.controller.shuffle(KEY).await?, CommandOutcome::Shuffled(12));
        let mut after = h.pending_titles(KEY).await;
        after.sort();
        assert_eq!(before, after);
        assert_eq!(h.current_title(KEY).await.as_deref(), Some("T0"));

        assert_eq!(h.controller.clear_queue(KEY).await?, CommandOutcome::Cleared(12));
        assert!(h.pending_titles(KEY).await.is_empty());
        assert_eq!(h.with_state(KEY, |s| s.playback_state()).await, PlaybackState::Playing);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_by_position() -> Result<(), ControllerError> {
        let h = Harness::new();
        let tracks = ["Now", "P1", "P2", "P3"].iter().map(|t| track(t, 30)).collect();
        h.controller.enqueue(KEY, tracks, false).await?;

        for position in [0, 4] {
            match h.controller.remove(KEY, position).await {
                Err(ControllerError::InvalidOperation(msg)) => assert_eq!(msg, "Invalid position! Queue has 3 songs"),
                other => panic!("unexpected result for {}: {:?}", position, other),
            }
        }

        assert_eq!(h.controller.remove(KEY, 3).await?, CommandOutcome::Removed { title: "P3".to_string() });
        assert_eq!(h.controller.remove(KEY, 1).await?, CommandOutcome::Removed { title: "P1".to_string() });
        assert_eq!(h.pending_titles(KEY).await, vec!["P2"]);
        assert_eq!(h.current_title(KEY).await.as_deref(), Some("Now"));

        h.controller.remove(KEY, 1).await?;
        assert!(matches!(h.controller.remove(KEY, 1).await, Err(ControllerError::InvalidOperation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_stats_summarize_session() -> Result<(), ControllerError> {
        let mut h = Harness::new();
        let tracks = vec![track("A", 60), track("B", 3000), track("C", 900)];
        h.controller.enqueue(KEY, tracks, false).await?;
        h.finish_current().await;
        h.controller.set_volume(KEY, 0.8).await?;

        let outcome = h.controller.stats(KEY).await?;
        assert_eq!(
            outcome,
            CommandOutcome::Stats { pending: 1, total_pending_seconds: 900, volume: 0.8, history_len: 1 }
        );

        h.controller.enqueue(KEY, vec![track("D", 3000)], false).await?;
        let text = h.controller.stats(KEY).await?.to_string();
        assert_eq!(text, "2 songs in queue | 1h 5m total | vol 80% | 1 in history");
        Ok(())
    }

    #[tokio::test]
    async fn test_volume_applies_to_active_and_new_playbacks() -> Result<(), ControllerError> {
        let mut h = Harness::new();
        h.controller.enqueue(KEY, vec![track("A", 30), track("B", 30)], false).await?;
        let first = h.player.last_handle().expect("A started");
        assert_eq!(h.player.volume(first), Some(0.5));

        assert_eq!(h.controller.set_volume(KEY, 0.3).await?, CommandOutcome::Volume(0.3));
        assert_eq!(h.player.volume(first), Some(0.3));

        assert_eq!(h.controller.adjust_volume(KEY, 2.0).await?, CommandOutcome::Volume(1.0));
        h.finish_current().await;
        let second = h.player.last_handle().expect("B started");
        assert_eq!(h.player.volume(second), Some(1.0));

        assert!(h.controller.set_volume(KEY, f32::NAN).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_now_playing_snapshot() -> Result<(), ControllerError> {
        let h = Harness::new();
        assert!(h.controller.now_playing(KEY).await.is_err());

        h.controller.enqueue(KEY, vec![track("A", 30).with_thumbnail("thumb://a"), track("B", 30)], false).await?;
        match h.controller.now_playing(KEY).await? {
            CommandOutcome::NowPlaying(snapshot) => {
                assert_eq!(snapshot.title, "A");
                assert_eq!(snapshot.queue_length, 1);
                assert_eq!(snapshot.thumbnail_ref.as_deref(), Some("thumb://a"));
                assert!(!snapshot.is_paused);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        Ok(())
    }
}
