//! Audio playback — clip decode → resample → device output.
//!
//! # Pipeline
//!
//! ```text
//! clip file → symphonia decode → mono f32 → resample to device rate
//!          → cpal output stream → blocks until drained
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use shadowing_rater::audio::{ClipPlayer, CpalPlayer};
//!
//! let player = CpalPlayer::new(None); // system default output device
//! if let Err(e) = player.play(Path::new("audio/block1/original_1.flac")) {
//!     log::warn!("clip failed to play: {e}");
//! }
//! ```

pub mod decode;
pub mod playback;

pub use decode::{decode_file, resample, DecodedClip};
pub use playback::{mix_clips, ClipPlayer, CpalPlayer, PlayerError};

// test-only re-export so the session runner tests can import MockPlayer
// without `use shadowing_rater::audio::playback::MockPlayer`.
#[cfg(test)]
pub use playback::MockPlayer;
