//! Clip playback via cpal.
//!
//! [`ClipPlayer`] is the seam the session runner talks to.  Every call
//! blocks until the clip has finished playing (the runner wraps calls in
//! `tokio::task::spawn_blocking`), which is what lets the runner sequence
//! the original and shadowing clips one after another.
//!
//! [`CpalPlayer`] is the production implementation: decode the whole clip,
//! resample to the output device rate, duplicate the mono signal across the
//! device channels, and wait for the stream to drain.  A new stream is
//! opened per call — stimuli are short and playback is never concurrent.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::decode::{decode_file, resample, DecodedClip};

// ---------------------------------------------------------------------------
// PlayerError
// ---------------------------------------------------------------------------

/// Errors that can occur while decoding or playing a clip.
///
/// The session treats all of these as non-fatal: a failed clip is logged and
/// the experiment continues without it having played.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The clip file does not exist or cannot be opened.
    #[error("clip not found: {0}")]
    ClipNotFound(PathBuf),

    /// The container/codec is not supported by this build.
    #[error("unsupported clip {path}: {detail}")]
    Unsupported { path: PathBuf, detail: String },

    /// The stream is corrupt beyond packet-level recovery.
    #[error("decode error in {path}: {detail}")]
    Decode { path: PathBuf, detail: String },

    /// No output device is available on the default audio host.
    #[error("no audio output device available")]
    NoDevice,

    /// Device enumeration failed.
    #[error("failed to enumerate output devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    /// The device cannot report a default stream configuration.
    #[error("failed to query output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    /// The platform rejected the stream configuration.
    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    /// The stream could not be started.
    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// ClipPlayer trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for clip playback.
///
/// Implementations must be `Send + Sync` so they can be held behind an
/// `Arc<dyn ClipPlayer>` and called from the blocking thread pool.
///
/// # Contract
///
/// Both methods block until playback has finished.
pub trait ClipPlayer: Send + Sync {
    /// Play the clip at `path` to completion.
    fn play(&self, path: &Path) -> Result<(), PlayerError>;

    /// Play both clips at once, mixed into a single stream.
    fn play_mixed(&self, first: &Path, second: &Path) -> Result<(), PlayerError>;
}

// Compile-time assertion: Box<dyn ClipPlayer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn ClipPlayer>) {}
};

// ---------------------------------------------------------------------------
// CpalPlayer
// ---------------------------------------------------------------------------

/// Production player built on the default cpal host.
pub struct CpalPlayer {
    /// Output device name — `None` means the system default.
    output_device: Option<String>,
}

impl CpalPlayer {
    /// Create a player targeting `output_device` (or the system default).
    pub fn new(output_device: Option<String>) -> Self {
        Self { output_device }
    }

    /// Resolve the configured output device, falling back to the system
    /// default when the named device is absent.
    fn open_device(&self) -> Result<cpal::Device, PlayerError> {
        let host = cpal::default_host();

        if let Some(name) = &self.output_device {
            let mut devices = host.output_devices()?;
            if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                return Ok(device);
            }
            log::warn!("output device {name:?} not found, falling back to default");
        }

        host.default_output_device().ok_or(PlayerError::NoDevice)
    }

    /// Play an already decoded clip and block until the stream drains.
    fn play_clip(&self, clip: DecodedClip) -> Result<(), PlayerError> {
        let device = self.open_device()?;
        let supported = device.default_output_config()?;
        let channels = supported.channels() as usize;
        let device_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        let samples = resample(&clip.samples, clip.sample_rate, device_rate);
        let total = samples.len();
        let playback_secs = total as f32 / device_rate.max(1) as f32;

        let (done_tx, done_rx) = mpsc::channel::<()>();
        let mut pos = 0usize;

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels.max(1)) {
                    let sample = samples.get(pos).copied().unwrap_or(0.0);
                    pos += 1;
                    for out in frame {
                        *out = sample;
                    }
                }
                if pos >= total {
                    // Ignore send errors; the receiver may have been dropped.
                    let _ = done_tx.send(());
                }
            },
            |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
            },
            None, // no timeout
        )?;

        stream.play()?;

        // Block until the callback reports the buffer drained; dropping the
        // stream afterwards stops the hardware.  The wait is bounded so a
        // dead stream (device unplugged mid-clip) cannot stall the session.
        let timeout = Duration::from_secs_f32(playback_secs + 2.0);
        if done_rx.recv_timeout(timeout).is_err() {
            log::warn!("playback did not finish within {:.1}s", timeout.as_secs_f32());
        }
        drop(stream);
        Ok(())
    }
}

impl ClipPlayer for CpalPlayer {
    fn play(&self, path: &Path) -> Result<(), PlayerError> {
        let clip = decode_file(path)?;
        log::debug!(
            "playing {} ({:.1}s @ {} Hz)",
            path.display(),
            clip.duration_secs(),
            clip.sample_rate
        );
        self.play_clip(clip)
    }

    fn play_mixed(&self, first: &Path, second: &Path) -> Result<(), PlayerError> {
        let a = decode_file(first)?;
        let b = decode_file(second)?;
        self.play_clip(mix_clips(a, b))
    }
}

// ---------------------------------------------------------------------------
// mix_clips
// ---------------------------------------------------------------------------

/// Mix two clips into one by summing sample-wise at the higher of the two
/// sample rates, clamped to `[-1.0, 1.0]`.  The result is as long as the
/// longer clip.
pub fn mix_clips(a: DecodedClip, b: DecodedClip) -> DecodedClip {
    let rate = a.sample_rate.max(b.sample_rate);
    let a_samples = resample(&a.samples, a.sample_rate, rate);
    let b_samples = resample(&b.samples, b.sample_rate, rate);

    let len = a_samples.len().max(b_samples.len());
    let mut samples = Vec::with_capacity(len);
    for i in 0..len {
        let sum = a_samples.get(i).copied().unwrap_or(0.0)
            + b_samples.get(i).copied().unwrap_or(0.0);
        samples.push(sum.clamp(-1.0, 1.0));
    }

    DecodedClip {
        samples,
        sample_rate: rate,
    }
}

// ---------------------------------------------------------------------------
// MockPlayer (test only)
// ---------------------------------------------------------------------------

/// Test double that records every play request instead of touching audio
/// hardware.
#[cfg(test)]
pub struct MockPlayer {
    played: std::sync::Mutex<Vec<PathBuf>>,
    fail_with_not_found: bool,
}

#[cfg(test)]
impl MockPlayer {
    /// A player whose every call succeeds instantly.
    pub fn ok() -> Self {
        Self {
            played: std::sync::Mutex::new(Vec::new()),
            fail_with_not_found: false,
        }
    }

    /// A player whose every call fails with [`PlayerError::ClipNotFound`].
    pub fn failing() -> Self {
        Self {
            played: std::sync::Mutex::new(Vec::new()),
            fail_with_not_found: true,
        }
    }

    /// Paths passed to `play` / `play_mixed`, in call order.
    pub fn played(&self) -> Vec<PathBuf> {
        self.played.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl ClipPlayer for MockPlayer {
    fn play(&self, path: &Path) -> Result<(), PlayerError> {
        if self.fail_with_not_found {
            return Err(PlayerError::ClipNotFound(path.to_path_buf()));
        }
        self.played.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn play_mixed(&self, first: &Path, second: &Path) -> Result<(), PlayerError> {
        if self.fail_with_not_found {
            return Err(PlayerError::ClipNotFound(first.to_path_buf()));
        }
        let mut played = self.played.lock().unwrap();
        played.push(first.to_path_buf());
        played.push(second.to_path_buf());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(samples: Vec<f32>, sample_rate: u32) -> DecodedClip {
        DecodedClip {
            samples,
            sample_rate,
        }
    }

    // ---- mix_clips ---------------------------------------------------------

    #[test]
    fn mixing_sums_samples() {
        let a = clip(vec![0.25, 0.25], 16_000);
        let b = clip(vec![0.5, -0.5], 16_000);
        let mixed = mix_clips(a, b);
        assert_eq!(mixed.sample_rate, 16_000);
        assert!((mixed.samples[0] - 0.75).abs() < 1e-6);
        assert!((mixed.samples[1] - -0.25).abs() < 1e-6);
    }

    #[test]
    fn mixing_pads_the_shorter_clip() {
        let a = clip(vec![0.5; 4], 16_000);
        let b = clip(vec![0.5; 2], 16_000);
        let mixed = mix_clips(a, b);
        assert_eq!(mixed.samples.len(), 4);
        assert!((mixed.samples[3] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn mixing_clamps_to_unit_range() {
        let a = clip(vec![0.9], 16_000);
        let b = clip(vec![0.9], 16_000);
        let mixed = mix_clips(a, b);
        assert_eq!(mixed.samples[0], 1.0);
    }

    #[test]
    fn mixing_resamples_to_the_higher_rate() {
        let a = clip(vec![0.5; 100], 16_000);
        let b = clip(vec![0.5; 200], 32_000);
        let mixed = mix_clips(a, b);
        assert_eq!(mixed.sample_rate, 32_000);
        assert_eq!(mixed.samples.len(), 200);
    }

    // ---- MockPlayer --------------------------------------------------------

    #[test]
    fn mock_records_played_paths() {
        let player = MockPlayer::ok();
        player.play(Path::new("a.flac")).unwrap();
        player
            .play_mixed(Path::new("b.flac"), Path::new("c.flac"))
            .unwrap();
        assert_eq!(
            player.played(),
            vec![
                PathBuf::from("a.flac"),
                PathBuf::from("b.flac"),
                PathBuf::from("c.flac")
            ]
        );
    }

    #[test]
    fn failing_mock_reports_clip_not_found() {
        let player = MockPlayer::failing();
        assert!(matches!(
            player.play(Path::new("a.flac")),
            Err(PlayerError::ClipNotFound(_))
        ));
        assert!(player.played().is_empty());
    }

    /// `CpalPlayer` must be usable as `dyn ClipPlayer`.
    #[test]
    fn cpal_player_is_object_safe() {
        let player: Box<dyn ClipPlayer> = Box::new(CpalPlayer::new(None));
        drop(player);
    }
}
