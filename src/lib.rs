//! Real-time audio analysis for music visualizers.
//!
//! A [`FramePipeline`] takes a window of mono samples once per rendered
//! frame and produces band energies, loudness and smoothed visual parameters
//! that move continuously regardless of frame rate.

pub mod audio;
pub mod color;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod smoothing;
pub mod timeline;

pub use audio::{BandMapper, BandStrategy, SampleSource, SpectralTransform};
pub use config::PipelineConfig;
pub use error::ConfigError;
pub use pipeline::{FrameAnalysis, FramePipeline, VisualFrame};
pub use smoothing::{Interpolate, SmoothedValue, SmoothingMode};
pub use timeline::{DispatchTable, EventKind, Timeline, TimelineEvent, VisualEvent};
