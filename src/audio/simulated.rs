// src/audio/simulated.rs
use crate::audio::error::PlayerError;
use crate::audio::playback::{ExternalPlayer, OnComplete, PlayHandle};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

const LOG_TARGET: &str = "r_jukebox::audio::simulated";

/// Flags shared between the player front-end and one playback thread.
#[derive(Debug, Default)]
struct PlaybackFlags {
    stop: AtomicBool,
    paused: AtomicBool,
    finished: AtomicBool,
    volume_bits: AtomicU32,
}

type PlaybackMap = Arc<Mutex<HashMap<PlayHandle, Arc<PlaybackFlags>>>>;

/// A player that renders nothing: each `start` spawns an OS thread that
/// counts play time (excluding pauses) until the track length is reached
/// or it is stopped, then fires the completion callback from that thread.
pub struct SimulatedPlayer {
    next_handle: AtomicU64,
    lengths: HashMap<String, Duration>,
    fallback_length: Duration,
    tick: Duration,
    playbacks: PlaybackMap,
}

impl SimulatedPlayer {
    /// `lengths` maps source refs to their play time; unknown sources play for `fallback_length`.
    pub fn new(lengths: HashMap<String, Duration>, fallback_length: Duration) -> Self {
        info!(target: LOG_TARGET, "Creating simulated player with {} known sources.", lengths.len());
        Self {
            next_handle: AtomicU64::new(1),
            lengths,
            fallback_length,
            tick: Duration::from_millis(50),
            playbacks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Overrides the polling granularity of playback threads.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Volume last applied to a live playback.
    pub fn volume(&self, handle: PlayHandle) -> Option<f32> {
        self.live_flags(handle)
            .ok()
            .map(|f| f32::from_bits(f.volume_bits.load(Ordering::SeqCst)))
    }

    fn flags(&self, handle: PlayHandle) -> Option<Arc<PlaybackFlags>> {
        let playbacks = match self.playbacks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        playbacks.get(&handle).cloned()
    }

    fn live_flags(&self, handle: PlayHandle) -> Result<Arc<PlaybackFlags>, PlayerError> {
        self.flags(handle)
            .filter(|f| !f.finished.load(Ordering::SeqCst))
            .ok_or(PlayerError::InvalidHandle(handle))
    }
}

#[async_trait]
impl ExternalPlayer for SimulatedPlayer {
    async fn start(&self, source_ref: &str, on_complete: OnComplete) -> Result<PlayHandle, PlayerError> {
        if source_ref.trim().is_empty() {
            return Err(PlayerError::StartFailed("empty source reference".to_string()));
        }
        let handle = PlayHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        let length = self.lengths.get(source_ref).copied().unwrap_or(self.fallback_length);
        let flags = Arc::new(PlaybackFlags::default());
        flags.volume_bits.store(1.0f32.to_bits(), Ordering::SeqCst);

        {
            let mut playbacks = match self.playbacks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            playbacks.insert(handle, flags.clone());
        }

        let playbacks = self.playbacks.clone();
        let tick = self.tick;
        let source = source_ref.to_string();
        let spawned = thread::Builder::new()
            .name(format!("sim-player-{}", handle.0))
            .spawn(move || {
                debug!(target: LOG_TARGET, %handle, source = %source, ?length, "[Playback Thread] Started.");
                let mut played = Duration::ZERO;
                while played < length && !flags.stop.load(Ordering::SeqCst) {
                    thread::sleep(tick);
                    if !flags.paused.load(Ordering::SeqCst) {
                        played += tick;
                    }
                }
                flags.finished.store(true, Ordering::SeqCst);
                {
                    let mut playbacks = match playbacks.lock() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    playbacks.remove(&handle);
                }
                trace!(target: LOG_TARGET, %handle, ?played, "[Playback Thread] Finished, signalling completion.");
                on_complete(None);
            });

        if let Err(e) = spawned {
            let mut playbacks = match self.playbacks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            playbacks.remove(&handle);
            warn!(target: LOG_TARGET, %handle, "Could not spawn playback thread: {}", e);
            return Err(PlayerError::Io(e));
        }
        Ok(handle)
    }

    async fn stop(&self, handle: PlayHandle) -> Result<(), PlayerError> {
        let flags = self.live_flags(handle)?;
        flags.stop.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&self, handle: PlayHandle) -> Result<(), PlayerError> {
        self.live_flags(handle)?.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&self, handle: PlayHandle) -> Result<(), PlayerError> {
        self.live_flags(handle)?.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_playing(&self, handle: PlayHandle) -> bool {
        self.live_flags(handle)
            .map(|f| !f.paused.load(Ordering::SeqCst) && !f.stop.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    async fn is_paused(&self, handle: PlayHandle) -> bool {
        self.live_flags(handle)
            .map(|f| f.paused.load(Ordering::SeqCst) && !f.stop.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    async fn set_volume(&self, handle: PlayHandle, volume: f32) -> Result<(), PlayerError> {
        let flags = self.live_flags(handle)?;
        flags.volume_bits.store(volume.clamp(0.0, 1.0).to_bits(), Ordering::SeqCst);
        Ok(())
    }
}
