use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use log::info;
use std::path::Path;

pub fn normalize_i16(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Average interleaved channels down to mono, one value per frame.
///
/// A trailing partial frame is dropped.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Decoded mono audio held in memory, addressed by playhead time.
///
/// This is the transport side of the pipeline: it only hands out windows
/// and reports when a window would run off the end of the stream.
#[derive(Debug, Clone)]
pub struct SampleSource {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SampleSource {
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: u32) -> Self {
        Self::from_mono(downmix(interleaved, channels), sample_rate)
    }

    pub fn from_interleaved_i16(interleaved: &[i16], channels: usize, sample_rate: u32) -> Self {
        let normalized: Vec<f32> = interleaved.iter().map(|&s| normalize_i16(s)).collect();
        Self::from_interleaved(&normalized, channels, sample_rate)
    }

    /// Load a WAV file and mix it to mono.
    pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = WavReader::open(path)
            .with_context(|| format!("failed to open WAV file {}", path.display()))?;
        let spec = reader.spec();
        let channels = spec.channels as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .context("failed to read float samples")?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()
                    .context("failed to read integer samples")?
            }
        };

        let source = Self::from_interleaved(&interleaved, channels, spec.sample_rate);
        info!(
            "Loaded {} ({} Hz, {} channels, {:.2}s)",
            path.display(),
            spec.sample_rate,
            channels,
            source.duration_seconds()
        );
        Ok(source)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Window of `len` samples starting at the playhead, or `None` when the
    /// window would read past the end of the stream.
    pub fn window_at(&self, seconds: f32, len: usize) -> Option<&[f32]> {
        if !seconds.is_finite() || seconds < 0.0 {
            return None;
        }

        let start = (seconds as f64 * self.sample_rate as f64).floor() as usize;
        let end = start.checked_add(len)?;
        if end > self.samples.len() {
            return None;
        }
        Some(&self.samples[start..end])
    }
}
