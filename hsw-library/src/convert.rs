//! Audio format conversion
//!
//! WAV is written with hound, FLAC with flacenc and Ogg Vorbis with
//! vorbis_rs. There is no MP3 encoder.

use crate::loader::{AudioLoader, LoadError, LoadedAudio};
use crate::scanner::{discover_or_empty, ScanConfig};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::num::{NonZeroU32, NonZeroU8};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use vorbis_rs::{VorbisEncoderBuilder, VorbisError};

/// Bit depth of WAV and FLAC output
const OUTPUT_BITS: u32 = 16;

/// Frames handed to the Vorbis encoder per call
const VORBIS_BLOCK_FRAMES: usize = 4096;

/// Output container for a conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TargetFormat {
    #[default]
    Wav,
    Mp3,
    Flac,
    Ogg,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 4] = [Self::Wav, Self::Mp3, Self::Flac, Self::Ogg];

    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
        }
    }

    /// Whether files of this format can be written
    pub fn has_encoder(&self) -> bool {
        !matches!(self, Self::Mp3)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown audio format '{}' (expected wav, mp3, flac or ogg)", s))
    }
}

/// Errors that can occur while converting one file
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("No {0} encoder available")]
    EncoderUnavailable(TargetFormat),
    #[error("Output would overwrite the source file: {0}")]
    SameFile(PathBuf),
    #[error("Cannot encode {channels} channel(s) at {sample_rate} Hz")]
    UnsupportedLayout { channels: u16, sample_rate: u32 },
    #[error("WAV encode error: {0}")]
    Wav(#[from] hound::Error),
    #[error("FLAC encode error: {0}")]
    Flac(String),
    #[error("Vorbis encode error: {0}")]
    Vorbis(#[from] VorbisError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of converting a folder
#[derive(Debug, Default)]
pub struct ConvertSummary {
    /// Files written, in discovery order
    pub converted: Vec<PathBuf>,
    /// Files that could not be converted
    pub failed: usize,
}

/// `<output_dir>/<stem>.<ext>`
pub fn output_path(path: &Path, output_dir: &Path, format: TargetFormat) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio".to_string());

    output_dir.join(format!("{}.{}", stem, format.extension()))
}

/// Decode `path` at its native rate and write it to `output_dir` in `format`
///
/// Output keeps the source's sample rate and channel count. WAV and FLAC
/// are 16-bit.
pub fn convert_audio(
    path: &Path,
    output_dir: &Path,
    format: TargetFormat,
) -> Result<PathBuf, ConvertError> {
    if !format.has_encoder() {
        return Err(ConvertError::EncoderUnavailable(format));
    }

    let out = output_path(path, output_dir, format);
    if is_same_file(path, &out) {
        return Err(ConvertError::SameFile(out));
    }

    let audio = AudioLoader::new().load(path)?;
    std::fs::create_dir_all(output_dir)?;

    match format {
        TargetFormat::Wav => write_wav(&audio, &out)?,
        TargetFormat::Flac => write_flac(&audio, &out)?,
        TargetFormat::Ogg => write_ogg(&audio, &out)?,
        TargetFormat::Mp3 => return Err(ConvertError::EncoderUnavailable(format)),
    }

    tracing::info!("Converted {} -> {}", audio.file_name, out.display());
    Ok(out)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Scale to 16-bit integers, clamping overs
fn to_i16(sample: f32) -> i16 {
    let max_val = i16::MAX as f32;
    (sample * max_val).clamp(-max_val - 1.0, max_val) as i16
}

fn write_wav(audio: &LoadedAudio, out: &Path) -> Result<(), ConvertError> {
    let spec = WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: OUTPUT_BITS as u16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(out, spec)?;
    for &sample in &audio.samples {
        writer.write_sample(to_i16(sample))?;
    }
    writer.finalize()?;
    Ok(())
}

fn write_flac(audio: &LoadedAudio, out: &Path) -> Result<(), ConvertError> {
    use flacenc::component::BitRepr;
    use flacenc::error::Verify;

    let config = flacenc::config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| ConvertError::Flac(format!("{:?}", e)))?;

    let samples: Vec<i32> = audio.samples.iter().map(|&s| to_i16(s) as i32).collect();
    let source = flacenc::source::MemSource::from_samples(
        &samples,
        audio.channels as usize,
        OUTPUT_BITS as usize,
        audio.sample_rate as usize,
    );

    let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| ConvertError::Flac(format!("{:?}", e)))?;

    let mut sink = flacenc::bitsink::ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|e| ConvertError::Flac(format!("{:?}", e)))?;

    std::fs::write(out, sink.as_slice())?;
    Ok(())
}

fn write_ogg(audio: &LoadedAudio, out: &Path) -> Result<(), ConvertError> {
    let layout_error = || ConvertError::UnsupportedLayout {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
    };
    let sample_rate = NonZeroU32::new(audio.sample_rate).ok_or_else(layout_error)?;
    let channels = u8::try_from(audio.channels)
        .ok()
        .and_then(NonZeroU8::new)
        .ok_or_else(layout_error)?;

    let sink = BufWriter::new(File::create(out)?);
    let mut encoder = VorbisEncoderBuilder::new(sample_rate, channels, sink)?.build()?;

    // Vorbis takes planar blocks, one slice per channel
    let channel_count = audio.channels as usize;
    for frames in audio.samples.chunks(VORBIS_BLOCK_FRAMES * channel_count) {
        let block: Vec<Vec<f32>> = (0..channel_count)
            .map(|ch| frames.iter().skip(ch).step_by(channel_count).copied().collect())
            .collect();
        encoder.encode_audio_block(&block)?;
    }
    encoder.finish()?;
    Ok(())
}

/// Convert every audio file in `folder`, continuing past failures
///
/// The output directory is created up front; failing to create it is the
/// only error.
pub fn convert_folder(
    folder: &Path,
    output_dir: &Path,
    format: TargetFormat,
) -> Result<ConvertSummary, ConvertError> {
    std::fs::create_dir_all(output_dir)?;

    let mut summary = ConvertSummary::default();
    for path in &discover_or_empty(&ScanConfig::new(folder)) {
        match convert_audio(path, output_dir, format) {
            Ok(out) => summary.converted.push(out),
            Err(e) => {
                tracing::warn!("Failed to convert {}: {}", path.display(), e);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}
