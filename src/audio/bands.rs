use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How a magnitude spectrum is folded into visual bands.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BandStrategy {
    /// Band edges spaced evenly in log-frequency between `min_frequency`
    /// and `max_frequency`; bin index = frequency * spectrum_len / max_frequency.
    Logarithmic { min_frequency: f32, max_frequency: f32 },

    /// Four index regions with growing bin spans (1-2 bins, then 2, then 4,
    /// then an even split of what is left) and a low-band gain boost.
    #[default]
    Piecewise,
}

impl BandStrategy {
    pub fn logarithmic() -> Self {
        BandStrategy::Logarithmic {
            min_frequency: 20.0,
            max_frequency: 20000.0,
        }
    }
}

/// Reduces a magnitude spectrum to a fixed number of band energies.
#[derive(Debug, Clone)]
pub struct BandMapper {
    band_count: usize,
    strategy: BandStrategy,
}

impl BandMapper {
    pub fn new(band_count: usize, strategy: BandStrategy) -> Result<Self, ConfigError> {
        if band_count == 0 {
            return Err(ConfigError::ZeroBandCount);
        }
        if let BandStrategy::Logarithmic { min_frequency, max_frequency } = strategy {
            let valid = min_frequency.is_finite()
                && max_frequency.is_finite()
                && min_frequency > 0.0
                && max_frequency > min_frequency;
            if !valid {
                return Err(ConfigError::InvalidFrequencyRange {
                    min: min_frequency,
                    max: max_frequency,
                });
            }
        }

        Ok(Self { band_count, strategy })
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    pub fn strategy(&self) -> BandStrategy {
        self.strategy
    }

    /// Always returns exactly `band_count` values, all zero for an empty spectrum.
    pub fn map(&self, spectrum: &[f32]) -> Vec<f32> {
        let mut energies = vec![0.0; self.band_count];
        if spectrum.is_empty() {
            return energies;
        }

        for (band, energy) in energies.iter_mut().enumerate() {
            *energy = match self.strategy {
                BandStrategy::Logarithmic { min_frequency, max_frequency } => {
                    let (start, end) =
                        self.log_bin_range(band, spectrum.len(), min_frequency, max_frequency);
                    average_range(spectrum, start, end)
                }
                BandStrategy::Piecewise => {
                    let (start, end) = self.piecewise_bin_range(band, spectrum.len());
                    average_range(spectrum, start, end) * self.piecewise_gain(band)
                }
            };
        }

        energies
    }

    /// Inclusive bin range, or `start > end` when the band is empty.
    fn log_bin_range(&self, band: usize, spectrum_len: usize, min_freq: f32, max_freq: f32) -> (i64, i64) {
        let log_min = min_freq.ln();
        let log_span = max_freq.ln() - log_min;
        let bands = self.band_count as f32;
        let bin_scale = spectrum_len as f32 / max_freq;

        let low = (log_min + log_span * band as f32 / bands).exp();
        let high = (log_min + log_span * (band + 1) as f32 / bands).exp();

        let start = (low * bin_scale).floor() as i64;
        let end_exclusive = (high * bin_scale).floor() as i64;
        if end_exclusive <= start {
            return (1, 0);
        }

        let last = spectrum_len as i64 - 1;
        (start.clamp(0, last), (end_exclusive - 1).clamp(0, last))
    }

    /// Inclusive bin range; never empty after clamping.
    fn piecewise_bin_range(&self, band: usize, spectrum_len: usize) -> (i64, i64) {
        let bands = self.band_count as i64;
        let band = band as i64;
        let len = spectrum_len as i64;
        let quarter = bands / 4;
        let half = bands / 2;

        let (start, end) = if band == 0 {
            (0, 1)
        } else if band < quarter {
            let start = (band - 1) * 2;
            (start, start + 2)
        } else if band < half {
            let start = (quarter - 1) * 2 + (band - quarter) * 4;
            (start, start + 4)
        } else {
            let base = (quarter - 1) * 2 + quarter * 4;
            let upper_bands = bands - half;
            let span = (len - base) / upper_bands;
            let start = base + (band - half) * (len - base) / upper_bands;
            let end = if band == bands - 1 { len - 1 } else { start + span };
            (start, end)
        };

        let last = len - 1;
        let start = start.clamp(0, last);
        (start, end.clamp(start, last))
    }

    fn piecewise_gain(&self, band: usize) -> f32 {
        let bands = self.band_count;
        if band < bands / 8 {
            1.5
        } else if band < bands / 4 {
            1.3
        } else if band < bands / 2 {
            1.1
        } else {
            1.0
        }
    }
}

/// Mean of `data[start..=end]`, zero when the range is empty.
fn average_range(data: &[f32], start: i64, end: i64) -> f32 {
    if start > end || start < 0 || start as usize >= data.len() {
        return 0.0;
    }

    let start = start as usize;
    let end = (end as usize).min(data.len() - 1);
    let slice = &data[start..=end];
    slice.iter().sum::<f32>() / slice.len() as f32
}
