use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};
use crate::presentation::sink::{Announcement, PlaybackSnapshot, PresentationSink, SinkError};
use crate::session::{SessionKey, TrackDescriptor};

const REPORTER_LOG_TARGET: &str = "r_jukebox::presentation::reporter";

enum SinkMessage {
    Publish(SessionKey, PlaybackSnapshot),
    Announce(SessionKey, Announcement),
    Flush(oneshot::Sender<()>),
}

/// Pushes session updates to the presentation sink.
///
/// Reports are queued and never awaited by the caller: a forwarding task
/// delivers them to the sink in order, logging and swallowing every failure.
/// A sink that stalls only holds up later reports, never playback.
#[derive(Clone)]
pub struct SessionReporter {
    tx: mpsc::UnboundedSender<SinkMessage>,
}

impl SessionReporter {
    /// Spawns the forwarding task; must be called from within a Tokio runtime.
    /// The task ends once every clone of the reporter is dropped.
    pub fn new(sink: Arc<dyn PresentationSink>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(forward_to_sink(sink, rx));
        Self { tx }
    }

    /// Reports one progress tick.
    pub fn report_progress(&self, key: SessionKey, snapshot: PlaybackSnapshot) {
        self.send(SinkMessage::Publish(key, snapshot));
    }

    pub fn report_now_playing(&self, key: SessionKey, track: &TrackDescriptor) {
        info!(target: REPORTER_LOG_TARGET, session = %key, title = %track.title(), "Now playing.");
        self.send(SinkMessage::Announce(key, Announcement::NowPlaying(track.clone())));
    }

    pub fn report_queue_finished(&self, key: SessionKey) {
        info!(target: REPORTER_LOG_TARGET, session = %key, "Queue finished.");
        self.send(SinkMessage::Announce(key, Announcement::QueueFinished));
    }

    pub fn report_track_failed(&self, key: SessionKey, title: &str, reason: String) {
        self.send(SinkMessage::Announce(key, Announcement::TrackFailed { title: title.to_string(), reason }));
    }

    pub fn report_stopped(&self, key: SessionKey) {
        self.send(SinkMessage::Announce(key, Announcement::Stopped));
    }

    /// Waits until everything reported so far has been handed to the sink.
    /// Does not return while the sink is stalled.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(SinkMessage::Flush(done_tx));
        if done_rx.await.is_err() {
            trace!(target: REPORTER_LOG_TARGET, "Forwarding task gone before flush completed.");
        }
    }

    fn send(&self, message: SinkMessage) {
        if self.tx.send(message).is_err() {
            debug!(target: REPORTER_LOG_TARGET, "Forwarding task stopped, dropping report.");
        }
    }
}

async fn forward_to_sink(sink: Arc<dyn PresentationSink>, mut rx: mpsc::UnboundedReceiver<SinkMessage>) {
    trace!(target: REPORTER_LOG_TARGET, "Sink forwarding task started.");
    while let Some(message) = rx.recv().await {
        match message {
            SinkMessage::Publish(key, snapshot) => match sink.publish(key, snapshot).await {
                Ok(()) => trace!(target: REPORTER_LOG_TARGET, session = %key, "Published progress snapshot."),
                Err(SinkError::Unavailable(msg)) => {
                    trace!(target: REPORTER_LOG_TARGET, session = %key, "Sink unavailable for progress: {}", msg);
                }
                Err(e) => warn!(target: REPORTER_LOG_TARGET, session = %key, "Failed to publish progress: {}", e),
            },
            SinkMessage::Announce(key, announcement) => {
                if let Err(e) = sink.announce(key, announcement).await {
                    warn!(target: REPORTER_LOG_TARGET, session = %key, "Failed to deliver announcement: {}", e);
                }
            }
            SinkMessage::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    trace!(target: REPORTER_LOG_TARGET, "Sink forwarding task finished.");
}
