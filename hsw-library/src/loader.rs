//! Audio file loading and decoding

use crate::scanner::is_audio_file;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Errors that can occur while loading a file
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("File does not exist: {0}")]
    NotFound(PathBuf),
    #[error("No read permission for file: {0}")]
    PermissionDenied(PathBuf),
    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("No audio track found in file")]
    NoAudioTrack,
    #[error("Could not load audio data from file: {0}")]
    NoAudioData(PathBuf),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Resample error: {0}")]
    Resample(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A decoded audio file
#[derive(Debug, Clone)]
pub struct LoadedAudio {
    /// Base name of the source file
    pub file_name: String,
    /// Interleaved samples (f32, normalized to -1.0 to 1.0)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
}

impl LoadedAudio {
    /// Number of sample frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Average all channels into one
    pub fn to_mono(&self) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        if channels == 1 {
            return self.samples.clone();
        }

        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

/// Audio file loader using Symphonia
///
/// Keeps the native sample rate unless a target rate is configured, in which
/// case the decoded audio is resampled with rubato.
#[derive(Debug, Clone, Default)]
pub struct AudioLoader {
    target_sample_rate: Option<u32>,
}

impl AudioLoader {
    /// Loader that keeps each file's native sample rate
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader that resamples everything to `sample_rate`
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            target_sample_rate: Some(sample_rate),
        }
    }

    /// Check that a path is something worth handing to the decoder
    ///
    /// The file must exist, carry an audio extension, be readable, and be
    /// non-empty.
    pub fn validate(path: &Path) -> Result<(), LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        if !is_audio_file(path) {
            return Err(LoadError::UnsupportedFormat(path.to_path_buf()));
        }

        let file = std::fs::File::open(path).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => LoadError::PermissionDenied(path.to_path_buf()),
            ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            _ => LoadError::Io(e),
        })?;

        if file.metadata()?.len() == 0 {
            return Err(LoadError::EmptyFile(path.to_path_buf()));
        }

        Ok(())
    }

    /// Validate, then load and decode an audio file
    pub fn load(&self, path: &Path) -> Result<LoadedAudio, LoadError> {
        Self::validate(path)?;

        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create hint from file extension
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut format = probed.format;

        // Find first audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(LoadError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
        let mut channels = codec_params.channels.map(|c| c.count() as u16).unwrap_or(0);
        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(e) => {
                    tracing::debug!("Stopping decode of {}: {}", path.display(), e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                // Corrupt packets are skipped; the rest of the stream is still usable
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::debug!("Skipping bad packet in {}: {}", path.display(), e);
                    continue;
                }
                Err(e) => return Err(LoadError::Decode(e.to_string())),
            };

            let spec = *decoded.spec();
            sample_rate = spec.rate;
            channels = spec.channels.count() as u16;

            let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(sample_buf.samples());
        }

        if samples.is_empty() || sample_rate == 0 || channels == 0 {
            return Err(LoadError::NoAudioData(path.to_path_buf()));
        }

        let samples = match self.target_sample_rate {
            Some(target) if target != sample_rate => {
                let resampled = resample(&samples, sample_rate, target, channels)?;
                sample_rate = target;
                resampled
            }
            _ => samples,
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        tracing::debug!(
            file = %file_name,
            sample_rate,
            channels,
            frames = samples.len() / channels as usize,
            "decoded"
        );

        Ok(LoadedAudio {
            file_name,
            samples,
            sample_rate,
            channels,
        })
    }
}

/// Resample interleaved audio between two rates
fn resample(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
    channels: u16,
) -> Result<Vec<f32>, LoadError> {
    use rubato::{FftFixedInOut, Resampler};

    let channel_count = channels as usize;
    let frames = samples.len() / channel_count;

    let mut resampler = FftFixedInOut::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        1024,
        channel_count,
    )
    .map_err(|e| LoadError::Resample(e.to_string()))?;

    let planar: Vec<Vec<f32>> = (0..channel_count)
        .map(|ch| samples.iter().skip(ch).step_by(channel_count).copied().collect())
        .collect();

    let chunk_size = resampler.input_frames_next();
    let expected_frames = frames * target_rate as usize / source_rate as usize;
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected_frames); channel_count];

    // Zero-pad the tail so the last chunk is full; surplus output is trimmed below
    let mut pos = 0;
    while pos < frames {
        let end = (pos + chunk_size).min(frames);
        let chunk: Vec<Vec<f32>> = planar
            .iter()
            .map(|ch| {
                let mut block = ch[pos..end].to_vec();
                block.resize(chunk_size, 0.0);
                block
            })
            .collect();

        let resampled = resampler
            .process(&chunk, None)
            .map_err(|e| LoadError::Resample(e.to_string()))?;

        for (out, data) in output.iter_mut().zip(resampled) {
            out.extend(data);
        }

        pos = end;
    }

    let out_frames = output[0].len().min(expected_frames);
    let mut interleaved = Vec::with_capacity(out_frames * channel_count);
    for frame_idx in 0..out_frames {
        for channel in &output {
            interleaved.push(channel[frame_idx]);
        }
    }

    Ok(interleaved)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::f32::consts::PI;

    /// Write a 16-bit PCM WAV with `channels` identical channels of a sine
    pub(crate) fn write_sine_wav(
        path: &Path,
        freq: f32,
        sample_rate: u32,
        channels: u16,
        seconds: f32,
    ) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..(sample_rate as f32 * seconds) as usize {
            let v = (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * 0.5;
            for _ in 0..channels {
                writer.write_sample((v * i16::MAX as f32) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_wav_native_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine_wav(&path, 440.0, 44100, 2, 1.0);

        let audio = AudioLoader::new().load(&path).unwrap();
        assert_eq!(audio.file_name, "tone.wav");
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.frames(), 44100);
        assert!((audio.duration_secs() - 1.0).abs() < 1e-6);
        assert_eq!(audio.to_mono().len(), 44100);
    }

    #[test]
    fn test_load_with_resampling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine_wav(&path, 440.0, 44100, 1, 2.0);

        let audio = AudioLoader::with_sample_rate(22050).load(&path).unwrap();
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.channels, 1);
        assert!((audio.duration_secs() - 2.0).abs() < 0.05);
    }

    #[test]
    fn test_validation_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.wav");
        assert!(matches!(
            AudioLoader::validate(&missing),
            Err(LoadError::NotFound(_))
        ));

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, b"not audio").unwrap();
        assert!(matches!(
            AudioLoader::validate(&text),
            Err(LoadError::UnsupportedFormat(_))
        ));

        let empty = dir.path().join("empty.wav");
        std::fs::write(&empty, b"").unwrap();
        assert!(matches!(
            AudioLoader::validate(&empty),
            Err(LoadError::EmptyFile(_))
        ));
    }

    #[test]
    fn test_garbage_file_fails_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.mp3");
        std::fs::write(&path, vec![0x42u8; 64]).unwrap();

        assert!(AudioLoader::new().load(&path).is_err());
    }

    #[test]
    fn test_to_mono_averages_channels() {
        let audio = LoadedAudio {
            file_name: "x.wav".into(),
            samples: vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0],
            sample_rate: 10,
            channels: 2,
        };
        assert_eq!(audio.to_mono(), vec![0.5, 0.5, 0.0]);
    }
}
