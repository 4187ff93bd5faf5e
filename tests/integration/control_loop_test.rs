//! Integration tests for the control loop and the text command surface
//!
//! Commands travel through `ControlHandle` and completions through the
//! bridge, both consumed by the same spawned loop.

use crate::test_utils::{track, MockPlayer, RecordingSink, StalledSink};
use r_jukebox::audio::SimulatedPlayer;
use r_jukebox::player::{
    spawn_control_loop, CommandOutcome, ControlHandle, ControllerError, ControllerOptions, PlaybackController, SessionCommand,
};
use r_jukebox::presentation::Announcement;
use r_jukebox::resolver::CatalogResolver;
use r_jukebox::session::{SessionKey, SessionRegistry};
use r_jukebox::ui::{CommandReply, CommandSurface};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const KEY: SessionKey = SessionKey(1);

fn start_loop(player: Arc<MockPlayer>, sink: Arc<RecordingSink>) -> (ControlHandle, JoinHandle<()>, Arc<SessionRegistry>) {
    let registry = Arc::new(SessionRegistry::default());
    let (controller, bridge) = PlaybackController::new(registry.clone(), player, sink, ControllerOptions::default());
    let (control, join) = spawn_control_loop(Arc::new(controller), bridge);
    (control, join, registry)
}

#[cfg(test)]
mod control_loop_integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_completions_are_processed_before_next_command() -> Result<(), ControllerError> {
        let player = Arc::new(MockPlayer::new());
        let sink = Arc::new(RecordingSink::new());
        let (control, join, _registry) = start_loop(player.clone(), sink.clone());

        let tracks = vec![track("A", 30), track("B", 30)];
        control.execute(KEY, SessionCommand::Enqueue { tracks, at_front: false }).await?;
        let first = player.last_handle().expect("A started");
        player.complete(first, None);

        match control.execute(KEY, SessionCommand::ShowQueue).await? {
            CommandOutcome::Queue(view) => {
                assert_eq!(view.current.as_ref().map(|t| t.title()), Some("B"));
                assert!(view.up_next.is_empty());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        control.shutdown().await;
        join.await.expect("control loop panicked");
        Ok(())
    }

    #[tokio::test]
    async fn test_shutdown_stops_sessions_and_closes_handle() -> Result<(), ControllerError> {
        let player = Arc::new(MockPlayer::new());
        let sink = Arc::new(RecordingSink::new());
        let (control, join, registry) = start_loop(player.clone(), sink.clone());

        control.execute(KEY, SessionCommand::Enqueue { tracks: vec![track("A", 30)], at_front: false }).await?;
        control.shutdown().await;
        join.await.expect("control loop panicked");

        let session = registry.get(KEY);
        assert!(session.lock().await.current().is_none());
        assert!(sink.announcements().contains(&Announcement::Stopped));
        assert!(matches!(
            control.execute(KEY, SessionCommand::Pause).await,
            Err(ControllerError::ChannelClosed)
        ));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_sink_never_blocks_sessions() -> Result<(), ControllerError> {
        let player = Arc::new(MockPlayer::new());
        let registry = Arc::new(SessionRegistry::default());
        let (controller, bridge) =
            PlaybackController::new(registry.clone(), player.clone(), Arc::new(StalledSink), ControllerOptions::default());
        let (control, join) = spawn_control_loop(Arc::new(controller), bridge);
        let limit = Duration::from_secs(2);
        let other = SessionKey(2);

        let tracks = vec![track("A", 30), track("B", 30)];
        let enqueued = tokio::time::timeout(limit, control.execute(KEY, SessionCommand::Enqueue { tracks, at_front: false })).await;
        assert!(matches!(enqueued, Ok(Ok(CommandOutcome::Queued { started: true, .. }))));

        // Progress ticks pile up behind the stalled sink without holding anything.
        tokio::time::sleep(Duration::from_secs(3)).await;
        let first = player.last_handle().expect("A started");
        player.complete(first, None);

        let other_tracks = vec![track("Z", 30)];
        let other_enqueued =
            tokio::time::timeout(limit, control.execute(other, SessionCommand::Enqueue { tracks: other_tracks, at_front: false })).await;
        assert!(matches!(other_enqueued, Ok(Ok(_))));

        let stopped = tokio::time::timeout(limit, control.execute(KEY, SessionCommand::Stop)).await;
        assert!(matches!(stopped, Ok(Ok(CommandOutcome::Stopped { .. }))));
        assert!(registry.get(KEY).lock().await.current().is_none());
        assert_eq!(player.started(), vec!["src://a", "src://b", "src://z"]);

        control.shutdown().await;
        assert!(tokio::time::timeout(Duration::from_secs(10), join).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_command_surface_round_trip() {
        let player = Arc::new(MockPlayer::new());
        let sink = Arc::new(RecordingSink::new());
        let (control, join, _registry) = start_loop(player.clone(), sink);
        let catalog = CatalogResolver::new(vec![track("Alpha", 120), track("Beta", 90)]);
        let surface = CommandSurface::new(control.clone(), Arc::new(catalog), KEY, 0.1);

        assert_eq!(surface.handle_line("play alpha").await, CommandReply::Text("Playing Alpha".to_string()));
        assert_eq!(
            surface.handle_line("playnext beta").await,
            CommandReply::Text("Added to queue: Beta (position 1)".to_string())
        );
        match surface.handle_line("play gamma").await {
            CommandReply::Text(reply) => assert!(reply.starts_with("Could not resolve track")),
            other => panic!("unexpected reply: {:?}", other),
        }
        assert_eq!(surface.handle_line("loop queue").await, CommandReply::Text("Looping the whole queue is not supported".to_string()));
        assert_eq!(surface.handle_line("2 pause").await, CommandReply::Text("Nothing to pause".to_string()));
        assert_eq!(surface.handle_line("vol-").await, CommandReply::Text("Volume 40%".to_string()));
        assert_eq!(surface.handle_line("").await, CommandReply::Text(String::new()));
        assert_eq!(surface.handle_line("quit").await, CommandReply::Quit);

        control.shutdown().await;
        join.await.expect("control loop panicked");
    }

    #[tokio::test]
    async fn test_simulated_player_plays_queue_to_the_end() -> Result<(), ControllerError> {
        let lengths: HashMap<String, Duration> = [
            ("src://a".to_string(), Duration::from_millis(60)),
            ("src://b".to_string(), Duration::from_millis(60)),
        ]
        .into_iter()
        .collect();
        let player = Arc::new(SimulatedPlayer::new(lengths, Duration::from_secs(30)).with_tick(Duration::from_millis(5)));
        let sink = Arc::new(RecordingSink::new());
        let registry = Arc::new(SessionRegistry::default());
        let (controller, bridge) = PlaybackController::new(registry.clone(), player, sink.clone(), ControllerOptions::default());
        let (control, join) = spawn_control_loop(Arc::new(controller), bridge);

        let tracks = vec![track("A", 1), track("B", 1)];
        control.execute(KEY, SessionCommand::Enqueue { tracks, at_front: false }).await?;

        let finished = tokio::time::timeout(Duration::from_secs(5), async {
            while sink.queue_finished_count() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(finished.is_ok(), "queue never finished");

        let history: Vec<String> = {
            let session = registry.get(KEY);
            let state = session.lock().await;
            state.history().iter().map(|t| t.title().to_string()).collect()
        };
        assert_eq!(history, vec!["A", "B"]);

        control.shutdown().await;
        join.await.expect("control loop panicked");
        Ok(())
    }
}
