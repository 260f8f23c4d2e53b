//! Per-frame orchestration: window → loudness → spectrum → bands → damping →
//! smoothed visual parameters.
//!
//! The pipeline is driven synchronously from the host's render loop. A frame
//! without enough audio never fails; it decays the previous outputs instead.

pub mod damping;

use log::{debug, info, warn};
use serde::Serialize;

use crate::audio::{loudness, BandMapper, SpectralTransform};
use crate::color::{hsb_to_rgb, Rgb};
use crate::config::PipelineConfig;
use crate::error::ConfigError;
use crate::smoothing::SmoothedValue;

pub use damping::BandDamper;

/// What one call to [`FramePipeline::analyze_frame`] measured.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameAnalysis {
    /// Instantaneous RMS of the window; zero on frames without audio.
    pub loudness: f32,
    pub band_energies: Vec<f32>,
    /// False when the frame was held/decayed instead of analyzed.
    pub has_data: bool,
}

/// Smoothed state a renderer draws from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualFrame {
    pub frame: u64,
    pub bar_heights: Vec<f32>,
    pub bar_colors: Vec<Rgb>,
    pub loudness: f32,
    pub highlight_radius: f32,
}

pub struct FramePipeline {
    config: PipelineConfig,
    transform: SpectralTransform,
    mapper: BandMapper,
    damper: BandDamper,

    /// Last band energies, decayed on frames without audio.
    held_energies: Vec<f32>,

    bars: Vec<SmoothedValue<f32>>,
    loudness: SmoothedValue<f32>,
    highlight: SmoothedValue<f32>,

    frame_count: u64,
}

impl FramePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let transform = SpectralTransform::new(config.fft_size)?;
        let mapper = BandMapper::new(config.band_count, config.band_strategy)?;
        let damper = BandDamper::new(&config);

        let mode = config.smoothing_mode;
        let bar = SmoothedValue::with_mode(config.bar_initial, config.bar_rate, mode)?;
        let loudness = SmoothedValue::with_mode(0.0, config.loudness_rate, mode)?;
        let highlight = SmoothedValue::with_mode(0.0, config.highlight_rate, mode)?;

        info!(
            "Frame pipeline ready: fft_size={}, bands={}, strategy={:?}",
            config.fft_size, config.band_count, config.band_strategy
        );

        Ok(Self {
            held_energies: vec![0.0; config.band_count],
            bars: vec![bar; config.band_count],
            transform,
            mapper,
            damper,
            loudness,
            highlight,
            frame_count: 0,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Width of one spectrum bin in Hz at the configured sample rate.
    pub fn bin_width_hz(&self) -> f32 {
        self.config.sample_rate as f32 / self.config.fft_size as f32
    }

    /// Analyze one frame's window and advance every smoother by `elapsed_seconds`.
    ///
    /// A window shorter than the transform size counts as "no data" and is
    /// handled like [`FramePipeline::hold_frame`]. With no elapsed time the
    /// window is measured but nothing is committed: damping history, bar
    /// targets and the frame counter stay as they were.
    pub fn analyze_frame(&mut self, sample_window: &[f32], elapsed_seconds: f32) -> FrameAnalysis {
        if sample_window.len() < self.config.fft_size {
            return self.hold_frame(elapsed_seconds);
        }

        let loudness_len = self.config.loudness_window.min(sample_window.len());
        let loudness = loudness::rms(&sample_window[..loudness_len]);

        let spectrum = self.transform.process(sample_window);
        let band_energies = self.mapper.map(&spectrum);

        if let Some(dt) = frame_step(elapsed_seconds) {
            self.held_energies.clone_from(&band_energies);
            self.loudness.set_target(loudness);
            self.advance(&band_energies, dt);
        }

        FrameAnalysis {
            loudness,
            band_energies,
            has_data: true,
        }
    }

    /// Frame with no audio available: decay held energies toward zero and
    /// pull loudness toward silence.
    pub fn hold_frame(&mut self, elapsed_seconds: f32) -> FrameAnalysis {
        if let Some(dt) = frame_step(elapsed_seconds) {
            let decay = self.config.silence_decay;
            self.held_energies.iter_mut().for_each(|e| *e *= decay);

            self.loudness.set_target(0.0);
            let band_energies = self.held_energies.clone();
            self.advance(&band_energies, dt);
        }

        FrameAnalysis {
            loudness: 0.0,
            band_energies: self.held_energies.clone(),
            has_data: false,
        }
    }

    fn advance(&mut self, band_energies: &[f32], dt: f32) {
        self.frame_count += 1;
        self.loudness.update(dt);

        let targets = self.damper.process(band_energies);
        for (bar, &target) in self.bars.iter_mut().zip(&targets) {
            let limited = self.damper.limit_target(bar.get(), target, dt);
            bar.set_target(limited);
            bar.update(dt);
        }

        let radius = (self.loudness.get() * self.config.highlight_scale).min(self.config.highlight_max);
        self.highlight.set_target(radius);
        self.highlight.update(dt);

        if self.frame_count % 120 == 0 {
            debug!(
                "frame {}: loudness={:.4}, highlight={:.1}, bar0={:.1}",
                self.frame_count,
                self.loudness.get(),
                self.highlight.get(),
                self.bars.first().map_or(0.0, |b| b.get())
            );
        }
    }

    /// Forget all history, as after a restart or seek.
    pub fn reset(&mut self) {
        self.damper.reset();
        self.held_energies.iter_mut().for_each(|e| *e = 0.0);
        self.bars.iter_mut().for_each(SmoothedValue::reset);
        self.loudness.reset();
        self.highlight.reset();
        self.frame_count = 0;
        info!("Frame pipeline reset");
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn smoothed_loudness(&self) -> f32 {
        self.loudness.get()
    }

    pub fn highlight_radius(&self) -> f32 {
        self.highlight.get()
    }

    pub fn bar_heights(&self) -> Vec<f32> {
        self.bars.iter().map(SmoothedValue::get).collect()
    }

    /// Rainbow that drifts with the frame counter.
    pub fn bar_colors(&self) -> Vec<Rgb> {
        // Hue drift repeats every 720 frames; keep the counter small before going to f32.
        let phase = (self.frame_count % 720) as f32 * 0.5;
        (0..self.bars.len())
            .map(|i| hsb_to_rgb(i as f32 * 1.5 + phase, 80.0, 100.0))
            .collect()
    }

    pub fn visuals(&self) -> VisualFrame {
        VisualFrame {
            frame: self.frame_count,
            bar_heights: self.bar_heights(),
            bar_colors: self.bar_colors(),
            loudness: self.smoothed_loudness(),
            highlight_radius: self.highlight_radius(),
        }
    }
}

/// Seconds to advance by, or `None` when the frame carries no time.
///
/// Negative and non-finite values are logged once here and count as zero.
fn frame_step(elapsed_seconds: f32) -> Option<f32> {
    if !elapsed_seconds.is_finite() || elapsed_seconds < 0.0 {
        warn!("ignoring invalid frame time elapsed_seconds={}", elapsed_seconds);
        return None;
    }
    (elapsed_seconds > 0.0).then_some(elapsed_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::BandStrategy;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::PI;

    const DT: f32 = 1.0 / 60.0;

    fn sine(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / 44100.0).sin())
            .collect()
    }

    fn log_pipeline(bands: usize) -> FramePipeline {
        FramePipeline::new(PipelineConfig {
            band_count: bands,
            band_strategy: BandStrategy::logarithmic(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(FramePipeline::new(PipelineConfig { fft_size: 1000, ..Default::default() }).is_err());
        assert!(FramePipeline::new(PipelineConfig { band_count: 0, ..Default::default() }).is_err());
        assert!(FramePipeline::new(PipelineConfig { highlight_rate: 0.0, ..Default::default() }).is_err());
    }

    #[test]
    fn test_end_to_end_kilohertz_sine() {
        let mut pipeline = log_pipeline(8);
        let analysis = pipeline.analyze_frame(&sine(1000.0, 0.5, 1024), DT);

        assert!(analysis.has_data);
        assert_abs_diff_eq!(analysis.loudness, 0.3535, epsilon = 2e-3);
        assert_eq!(analysis.band_energies.len(), 8);

        let loudest = analysis
            .band_energies
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, &e)| if e > best.1 { (i, e) } else { best })
            .0;
        assert_eq!(loudest, 4);
    }

    #[test]
    fn test_output_lengths_match_band_count() {
        for bands in [1usize, 64, 256] {
            let mut pipeline = FramePipeline::new(PipelineConfig { band_count: bands, ..Default::default() }).unwrap();
            let analysis = pipeline.analyze_frame(&sine(440.0, 0.3, 2048), DT);
            assert_eq!(analysis.band_energies.len(), bands);
            assert_eq!(pipeline.bar_heights().len(), bands);
            assert_eq!(pipeline.bar_colors().len(), bands);
        }
    }

    #[test]
    fn test_short_window_holds_instead_of_failing() {
        let mut pipeline = log_pipeline(8);
        let loud = pipeline.analyze_frame(&sine(1000.0, 0.5, 1024), DT);

        let held = pipeline.analyze_frame(&[0.1; 100], DT);
        assert!(!held.has_data);
        assert_eq!(held.loudness, 0.0);
        for (h, l) in held.band_energies.iter().zip(&loud.band_energies) {
            assert_abs_diff_eq!(*h, l * 0.9, epsilon = 1e-6);
        }

        let empty = pipeline.analyze_frame(&[], DT);
        assert!(!empty.has_data);
        assert_eq!(empty.band_energies.len(), 8);
    }

    #[test]
    fn test_loudness_decays_to_silence() {
        let mut pipeline = log_pipeline(8);
        let tone = sine(1000.0, 0.5, 1024);
        for _ in 0..120 {
            pipeline.analyze_frame(&tone, DT);
        }
        let peak = pipeline.smoothed_loudness();
        assert!(peak > 0.3);

        for _ in 0..10 {
            pipeline.hold_frame(DT);
        }
        assert!(pipeline.smoothed_loudness() < peak);

        // rate 5 => rate * t passes 5 after 60 frames at 60 fps
        for _ in 0..60 {
            pipeline.hold_frame(DT);
        }
        assert!(pipeline.smoothed_loudness() <= peak * 0.01);
        assert!(pipeline.held_energies.iter().all(|&e| e < 1e-3));
    }

    #[test]
    fn test_bars_rise_smoothly_and_stay_in_range() {
        let mut pipeline = FramePipeline::new(PipelineConfig::default()).unwrap();
        let noise: Vec<f32> = (0..1024).map(|i| ((i * 7919) % 200) as f32 / 100.0 - 1.0).collect();

        let mut previous = pipeline.bar_heights();
        for _ in 0..30 {
            pipeline.analyze_frame(&noise, DT);
            let heights = pipeline.bar_heights();
            for (h, p) in heights.iter().zip(&previous) {
                assert!(*h <= 600.0);
                // rate limit caps each step at 60 px per 1/60 s
                assert!((h - p).abs() <= 60.0 + 1e-3);
            }
            previous = heights;
        }
    }

    #[test]
    fn test_highlight_follows_loudness() {
        let mut pipeline = log_pipeline(8);
        let tone = sine(1000.0, 0.5, 1024);
        for _ in 0..300 {
            pipeline.analyze_frame(&tone, DT);
        }
        // 0.35 * 2200 is well past the 400 px cap.
        assert_abs_diff_eq!(pipeline.highlight_radius(), 400.0, epsilon = 1.0);
    }

    #[test]
    fn test_zero_dt_changes_nothing_visible() {
        let mut pipeline = log_pipeline(8);
        let before = pipeline.bar_heights();
        pipeline.analyze_frame(&sine(1000.0, 0.5, 1024), 0.0);
        assert_eq!(pipeline.bar_heights(), before);
        assert_eq!(pipeline.smoothed_loudness(), 0.0);
    }

    #[test]
    fn test_invalid_frame_time_commits_nothing() {
        let mut pipeline = FramePipeline::new(PipelineConfig::default()).unwrap();
        let tone = sine(1000.0, 0.5, 1024);
        pipeline.analyze_frame(&tone, DT);

        let heights = pipeline.bar_heights();
        let targets: Vec<f32> = pipeline.bars.iter().map(|b| *b.target()).collect();
        let history = pipeline.damper.history().to_vec();
        let held = pipeline.held_energies.clone();

        for bad in [-0.01, f32::NAN, f32::INFINITY] {
            let analysis = pipeline.analyze_frame(&tone, bad);
            assert!(analysis.has_data);
            assert_eq!(analysis.band_energies.len(), 256);
            pipeline.hold_frame(bad);

            assert_eq!(pipeline.frame_count(), 1);
            assert_eq!(pipeline.bar_heights(), heights);
            let after: Vec<f32> = pipeline.bars.iter().map(|b| *b.target()).collect();
            assert_eq!(after, targets);
            assert_eq!(pipeline.damper.history(), history.as_slice());
            assert_eq!(pipeline.held_energies, held);
        }

        // A valid frame afterwards picks up where the last one left off.
        pipeline.analyze_frame(&tone, DT);
        assert_eq!(pipeline.frame_count(), 2);
    }

    #[test]
    fn test_hue_drift_wraps_with_frame_count() {
        let mut pipeline = log_pipeline(4);
        pipeline.frame_count = 720 * 40_000 + 3;
        assert_eq!(pipeline.bar_colors()[0], hsb_to_rgb(1.5, 80.0, 100.0));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut pipeline = log_pipeline(8);
        for _ in 0..20 {
            pipeline.analyze_frame(&sine(1000.0, 0.5, 1024), DT);
        }
        pipeline.reset();

        assert_eq!(pipeline.frame_count(), 0);
        assert_eq!(pipeline.smoothed_loudness(), 0.0);
        assert_eq!(pipeline.highlight_radius(), 0.0);
        assert!(pipeline.bar_heights().iter().all(|&h| h == 10.0));
        assert!(pipeline.damper.history().iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_bin_width() {
        let pipeline = log_pipeline(8);
        assert_abs_diff_eq!(pipeline.bin_width_hz(), 44100.0 / 1024.0);
    }

    #[test]
    fn test_visual_frame_snapshot() {
        let mut pipeline = log_pipeline(4);
        pipeline.analyze_frame(&sine(1000.0, 0.5, 1024), DT);
        let visuals = pipeline.visuals();
        assert_eq!(visuals.frame, 1);
        assert_eq!(visuals.bar_heights.len(), 4);
        assert_eq!(visuals.bar_colors[0], hsb_to_rgb(0.5, 80.0, 100.0));
    }
}
