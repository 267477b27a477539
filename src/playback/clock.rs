use super::{MediaPlayer, MediaSource};
use serde::Serialize;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Period of the playback tick.
pub const TICK_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub current_time_sec: f64,
    pub is_playing: bool,
}

struct ClockInner {
    duration_sec: f64,
    player: Arc<dyn MediaPlayer>,
    state: watch::Sender<PlaybackState>,
}

impl ClockInner {
    fn seek(&self, target_sec: f64) -> f64 {
        let clamped = clamp_position(target_sec, self.duration_sec);
        self.state.send_modify(|s| s.current_time_sec = clamped);
        self.player.set_position_sec(clamped);
        clamped
    }

    fn set_playing(&self, is_playing: bool) {
        self.state.send_modify(|s| s.is_playing = is_playing);
    }
}

/// Sole owner of [`PlaybackState`].
///
/// While playing, a tick every [`TICK_INTERVAL`] reads the player's live
/// position and routes it through [`seek`](Self::seek). At most one tick task
/// exists at a time.
pub struct PlaybackClock {
    inner: Arc<ClockInner>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackClock {
    pub fn new(source: &MediaSource, player: Arc<dyn MediaPlayer>) -> Self {
        let (state, _) = watch::channel(PlaybackState::default());
        Self {
            inner: Arc::new(ClockInner {
                duration_sec: source.duration_sec(),
                player,
                state,
            }),
            ticker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> PlaybackState {
        *self.inner.state.borrow()
    }

    pub fn duration_sec(&self) -> f64 {
        self.inner.duration_sec
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.inner.state.subscribe()
    }

    /// Start ticking. No-op when already playing. Must run inside a tokio runtime.
    pub fn play(&self) {
        let Ok(mut ticker) = self.ticker.lock() else {
            tracing::error!("Playback ticker lock poisoned");
            return;
        };
        if ticker.is_some() {
            return;
        }

        self.inner.set_playing(true);
        self.inner.player.play();
        *ticker = Some(spawn_ticker(Arc::downgrade(&self.inner)));
        tracing::debug!("Playback started at {:.1}s", self.state().current_time_sec);
    }

    /// Stop ticking. No-op when already paused.
    pub fn pause(&self) {
        let handle = match self.ticker.lock() {
            Ok(mut ticker) => ticker.take(),
            Err(_) => None,
        };
        let Some(handle) = handle else {
            return;
        };

        handle.abort();
        self.inner.set_playing(false);
        self.inner.player.pause();
        tracing::debug!("Playback paused at {:.1}s", self.state().current_time_sec);
    }

    /// Clamp `target_sec` into `[0, duration]`, store it, and push it to the
    /// player. Returns the clamped position.
    pub fn seek(&self, target_sec: f64) -> f64 {
        self.inner.seek(target_sec)
    }
}

impl Drop for PlaybackClock {
    fn drop(&mut self) {
        if let Ok(mut ticker) = self.ticker.lock() {
            if let Some(handle) = ticker.take() {
                handle.abort();
            }
        }
    }
}

fn spawn_ticker(inner: Weak<ClockInner>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            let position = inner.player.position_sec();
            inner.seek(position);
        }
    })
}

fn clamp_position(target_sec: f64, duration_sec: f64) -> f64 {
    if target_sec.is_nan() || target_sec < 0.0 {
        0.0
    } else if target_sec > duration_sec {
        duration_sec
    } else {
        target_sec
    }
}
