// playback/mod.rs - Playback Clock and Media Source seam

mod clock;
mod source;

pub use clock::{PlaybackClock, PlaybackState, TICK_INTERVAL};
pub use source::{MediaPlayer, MediaSource};

#[cfg(test)]
pub(crate) use clock::testing;
