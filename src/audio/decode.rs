//! Clip decoding via symphonia.
//!
//! Clips are decoded whole — experiment stimuli are a few seconds long, so
//! there is no need for streaming decode.  Output is mono `f32` at the
//! file's native rate; [`resample`] converts to the output device rate and
//! the playback layer duplicates the mono signal across output channels.
//!
//! Supported formats follow the Cargo.toml symphonia features: FLAC, MP3,
//! Vorbis.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::playback::PlayerError;

// ---------------------------------------------------------------------------
// DecodedClip
// ---------------------------------------------------------------------------

/// A fully decoded clip: mono `f32` samples at the file's native rate.
#[derive(Debug, Clone)]
pub struct DecodedClip {
    /// Mono PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Native sample rate of the source file in Hz.
    pub sample_rate: u32,
}

impl DecodedClip {
    /// Clip length in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

// ---------------------------------------------------------------------------
// decode_file
// ---------------------------------------------------------------------------

/// Decode the audio file at `path` into a mono [`DecodedClip`].
///
/// # Errors
///
/// - [`PlayerError::ClipNotFound`] — the file does not exist / cannot be
///   opened.
/// - [`PlayerError::Unsupported`] — the container or codec is not one the
///   build supports.
/// - [`PlayerError::Decode`] — the stream is corrupt beyond recovery.
pub fn decode_file(path: &Path) -> Result<DecodedClip, PlayerError> {
    let file = File::open(path).map_err(|_| PlayerError::ClipNotFound(path.to_path_buf()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(ext.to_str().unwrap_or(""));
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlayerError::Unsupported {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| PlayerError::Unsupported {
            path: path.to_path_buf(),
            detail: "no audio track found".into(),
        })?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params.sample_rate.unwrap_or(44_100);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| PlayerError::Unsupported {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // End of stream.
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(PlayerError::Decode {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                })
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                append_mono(&mut samples, buf.samples(), spec.channels.count());
            }
            // A single bad packet is skipped; the decoder resynchronises.
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("skipping corrupt packet in {}: {e}", path.display());
            }
            Err(e) => {
                return Err(PlayerError::Decode {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                })
            }
        }
    }

    Ok(DecodedClip {
        samples,
        sample_rate,
    })
}

// ---------------------------------------------------------------------------
// Channel / rate conversion
// ---------------------------------------------------------------------------

/// Downmix interleaved multi-channel audio to mono by averaging each frame,
/// appending onto `out`.
fn append_mono(out: &mut Vec<f32>, interleaved: &[f32], channels: usize) {
    match channels {
        0 => {}
        1 => out.extend_from_slice(interleaved),
        n => out.extend(
            interleaved
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32),
        ),
    }
}

/// Resample mono `samples` from `source_rate` to `target_rate` Hz using
/// linear interpolation.
///
/// Returns the input unchanged when the rates already match.  The output
/// length is approximately `samples.len() * target_rate / source_rate`.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || samples.is_empty() || source_rate == 0 {
        return samples.to_vec();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = (src_pos - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
