use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;

use spectrum_pulse::{
    BandStrategy, DispatchTable, EventKind, FramePipeline, PipelineConfig,
    SampleSource, Timeline, TimelineEvent, VisualEvent,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Piecewise,
    Logarithmic,
}

#[derive(Parser)]
#[command(name = "spectrum-pulse")]
#[command(about = "Run the visualizer analysis pipeline over a WAV file and dump per-frame output")]
struct Args {
    /// WAV file to analyze
    audio_file: String,

    /// Pipeline configuration (JSON); flags below override it
    #[arg(long)]
    config: Option<String>,

    /// Transform size (power of two)
    #[arg(long)]
    fft_size: Option<usize>,

    /// Number of visual bands
    #[arg(long)]
    bands: Option<usize>,

    /// Band mapping strategy
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Simulated display frame rate
    #[arg(long, default_value = "60")]
    fps: f32,

    /// Cue timeline (JSON), or "new-world" for the built-in cue sheet
    #[arg(long)]
    timeline: Option<String>,

    /// Output JSON file path
    #[arg(long, short, default_value = "frames.json")]
    output: String,
}

#[derive(Debug, Serialize)]
struct FrameRecord {
    time: f32,
    has_data: bool,
    loudness: f32,
    smoothed_loudness: f32,
    highlight_radius: f32,
    bands: Vec<f32>,
    bar_heights: Vec<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cues: Vec<String>,
}

#[derive(Debug, Serialize)]
struct AnalysisDump<'a> {
    audio_file: &'a str,
    sample_rate: u32,
    duration_seconds: f32,
    fps: f32,
    config: &'a PipelineConfig,
    frames: Vec<FrameRecord>,
}

/// Cues fired during the current frame.
#[derive(Default)]
struct CueLog {
    fired: Vec<String>,
}

fn log_cue(event: &TimelineEvent, cues: &mut CueLog) {
    cues.fired.push(event.description.clone());
}

fn log_explosion(event: &TimelineEvent, cues: &mut CueLog) {
    if let VisualEvent::EpicExplosion { intensity, duration } = event.event {
        cues.fired.push(format!("{} (intensity {intensity}, {duration}s)", event.description));
    }
}

fn build_config(args: &Args, sample_rate: u32) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    config.sample_rate = sample_rate;
    if let Some(fft_size) = args.fft_size {
        config.fft_size = fft_size;
    }
    if let Some(bands) = args.bands {
        config.band_count = bands;
    }
    match args.strategy {
        Some(StrategyArg::Piecewise) => config.band_strategy = BandStrategy::Piecewise,
        Some(StrategyArg::Logarithmic) => config.band_strategy = BandStrategy::logarithmic(),
        None => {}
    }

    config.validate().context("invalid pipeline configuration")?;
    Ok(config)
}

fn load_timeline(arg: Option<&str>) -> Result<Timeline> {
    match arg {
        None => Ok(Timeline::new()),
        Some("new-world") => Ok(Timeline::new_world_symphony()),
        Some(path) => Timeline::load(path),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !(args.fps.is_finite() && args.fps > 0.0) {
        anyhow::bail!("--fps must be positive, got {}", args.fps);
    }

    info!("Spectrum Pulse analysis");
    let source = SampleSource::load_wav(&args.audio_file)?;
    let config = build_config(&args, source.sample_rate())?;
    let mut pipeline = FramePipeline::new(config.clone())?;
    info!("Bin width: {:.2} Hz", pipeline.bin_width_hz());

    let mut timeline = load_timeline(args.timeline.as_deref())?;
    let mut table: DispatchTable<CueLog> = DispatchTable::new();
    for kind in [
        EventKind::CurtainRise,
        EventKind::ParticlesAppear,
        EventKind::FrequencyPeaks,
        EventKind::ScreenShake,
        EventKind::ViolinSolo,
        EventKind::LayerTransition,
        EventKind::ColorChange,
        EventKind::BackgroundChange,
        EventKind::MelodyHighlight,
    ] {
        table.register(kind, log_cue);
    }
    table.register(EventKind::EpicExplosion, log_explosion);
    timeline.play();

    // Run one second past the end so the decay path shows up in the dump.
    let dt = 1.0 / args.fps;
    let total_frames = ((source.duration_seconds() + 1.0) * args.fps).ceil() as usize;
    let mut frames = Vec::with_capacity(total_frames);
    let mut held_frames = 0usize;
    let mut peak_loudness = 0.0f32;
    let mut cue_count = 0usize;

    for index in 0..total_frames {
        let time = index as f32 * dt;
        let analysis = match source.window_at(time, config.fft_size) {
            Some(window) => pipeline.analyze_frame(window, dt),
            None => pipeline.hold_frame(dt),
        };

        let mut cues = CueLog::default();
        cue_count += timeline.dispatch(time, &table, &mut cues);

        if !analysis.has_data {
            held_frames += 1;
        }
        peak_loudness = peak_loudness.max(analysis.loudness);

        frames.push(FrameRecord {
            time,
            has_data: analysis.has_data,
            loudness: analysis.loudness,
            smoothed_loudness: pipeline.smoothed_loudness(),
            highlight_radius: pipeline.highlight_radius(),
            bands: analysis.band_energies,
            bar_heights: pipeline.bar_heights(),
            cues: cues.fired,
        });
    }

    info!("=== ANALYSIS SUMMARY ===");
    info!("Frames: {} ({} without audio)", frames.len(), held_frames);
    info!("Peak loudness: {:.4}", peak_loudness);
    info!("Final smoothed loudness: {:.6}", pipeline.smoothed_loudness());
    info!("Timeline cues fired: {}", cue_count);

    let dump = AnalysisDump {
        audio_file: &args.audio_file,
        sample_rate: source.sample_rate(),
        duration_seconds: source.duration_seconds(),
        fps: args.fps,
        config: &config,
        frames,
    };
    let file = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &dump)?;
    info!("Frame data saved to {}", args.output);

    Ok(())
}
