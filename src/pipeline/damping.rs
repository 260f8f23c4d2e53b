use crate::config::PipelineConfig;

/// Per-band temporal damping and dynamic-range compression.
///
/// Owns the EMA history for every band; it lives as long as the pipeline and
/// is cleared explicitly on `reset`.
#[derive(Debug, Clone)]
pub struct BandDamper {
    previous: Vec<f32>,
    damping: f32,
    compression_gain: f32,
    height_scale: f32,
    min_height: f32,
    max_height: f32,
    rate_limit: Option<f32>,
}

impl BandDamper {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            previous: vec![0.0; config.band_count],
            damping: config.damping,
            compression_gain: config.compression_gain,
            height_scale: config.height_scale,
            min_height: config.min_height,
            max_height: config.max_height,
            rate_limit: config.rate_limit,
        }
    }

    /// Turn raw band energies into clamped visual targets, updating history.
    ///
    /// Bands missing from `raw` are treated as silent.
    pub fn process(&mut self, raw: &[f32]) -> Vec<f32> {
        self.previous
            .iter_mut()
            .enumerate()
            .map(|(band, previous)| {
                let energy = raw.get(band).copied().unwrap_or(0.0).max(0.0);
                let smoothed = *previous * self.damping + energy * (1.0 - self.damping);
                *previous = smoothed;

                let compressed = (1.0 + smoothed * self.compression_gain).log10();
                (compressed * self.max_height * self.height_scale).clamp(self.min_height, self.max_height)
            })
            .collect()
    }

    /// Bound how far a target may move away from `current` in `dt` seconds.
    pub fn limit_target(&self, current: f32, target: f32, dt: f32) -> f32 {
        match self.rate_limit {
            Some(fraction) => {
                let max_change = self.max_height * fraction * dt.max(0.0) * 60.0;
                current + (target - current).clamp(-max_change, max_change)
            }
            None => target,
        }
    }

    pub fn history(&self) -> &[f32] {
        &self.previous
    }

    pub fn reset(&mut self) {
        self.previous.iter_mut().for_each(|p| *p = 0.0);
    }
}
