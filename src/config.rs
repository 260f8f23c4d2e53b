use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::BandStrategy;
use crate::error::ConfigError;
use crate::smoothing::SmoothingMode;

/// Every tunable of the frame pipeline, fixed at construction.
///
/// Defaults reproduce the classic bar visualizer: 1024-point transform,
/// 256 bars up to 600 px tall, heavy per-band damping and a loudness-driven
/// highlight ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // Analysis
    pub fft_size: usize,
    pub band_count: usize,
    pub band_strategy: BandStrategy,
    pub sample_rate: u32,
    /// Samples fed to the loudness estimator, taken from the start of the window.
    pub loudness_window: usize,

    // Temporal damping
    pub damping: f32,
    pub compression_gain: f32,
    /// Multiplier from compressed energy to bar height, as a fraction of `max_height`.
    pub height_scale: f32,
    pub min_height: f32,
    pub max_height: f32,
    /// Largest target change per 1/60 s, as a fraction of `max_height`.
    pub rate_limit: Option<f32>,
    /// Factor applied to held band energies on frames with no audio.
    pub silence_decay: f32,

    // Smoothing
    pub smoothing_mode: SmoothingMode,
    pub bar_rate: f32,
    pub bar_initial: f32,
    pub loudness_rate: f32,
    pub highlight_rate: f32,
    pub highlight_scale: f32,
    pub highlight_max: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            band_count: 256,
            band_strategy: BandStrategy::Piecewise,
            sample_rate: 44100,
            loudness_window: 1024,

            damping: 0.95,
            compression_gain: 99.0,
            height_scale: 1.3,
            min_height: 7.0,
            max_height: 600.0,
            rate_limit: Some(0.1),
            silence_decay: 0.9,

            smoothing_mode: SmoothingMode::Exponential,
            bar_rate: 20.0,
            bar_initial: 10.0,
            loudness_rate: 5.0,
            highlight_rate: 10.0,
            highlight_scale: 2200.0,
            highlight_max: 400.0,
        }
    }
}

impl PipelineConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fft_size.is_power_of_two() {
            return Err(ConfigError::FftSizeNotPowerOfTwo(self.fft_size));
        }
        if self.band_count == 0 {
            return Err(ConfigError::ZeroBandCount);
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if let BandStrategy::Logarithmic { min_frequency, max_frequency } = self.band_strategy {
            if !(min_frequency.is_finite() && min_frequency > 0.0 && max_frequency > min_frequency && max_frequency.is_finite()) {
                return Err(ConfigError::InvalidFrequencyRange {
                    min: min_frequency,
                    max: max_frequency,
                });
            }
        }
        if !(self.damping > 0.0 && self.damping < 1.0) {
            return Err(ConfigError::InvalidDamping(self.damping));
        }
        if !(self.compression_gain.is_finite() && self.compression_gain > 0.0) {
            return Err(ConfigError::InvalidGain(self.compression_gain));
        }
        if !(self.min_height >= 0.0 && self.max_height.is_finite() && self.min_height < self.max_height) {
            return Err(ConfigError::InvalidHeightRange {
                min: self.min_height,
                max: self.max_height,
            });
        }
        if let Some(limit) = self.rate_limit {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(ConfigError::InvalidRateLimit(limit));
            }
        }
        if !(self.silence_decay >= 0.0 && self.silence_decay < 1.0) {
            return Err(ConfigError::InvalidDecayFactor(self.silence_decay));
        }

        for (name, rate) in [
            ("bar_rate", self.bar_rate),
            ("loudness_rate", self.loudness_rate),
            ("highlight_rate", self.highlight_rate),
        ] {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(ConfigError::NonPositiveRate { name, rate });
            }
        }

        Ok(())
    }

    /// Load from a JSON file; missing fields keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        Ok(())
    }
}
