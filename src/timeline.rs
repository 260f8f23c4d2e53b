//! Scripted visual cues fired at fixed playback times.
//!
//! Events sit in time order and move one way, untriggered → triggered, as
//! playback advances. `reset`/`seek` are the only ways back. Handling is a
//! plain table from [`EventKind`] to function pointers.

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VisualEvent {
    CurtainRise,
    ParticlesAppear,
    FrequencyPeaks,
    EpicExplosion { intensity: f32, duration: f32 },
    ScreenShake,
    ViolinSolo,
    LayerTransition,
    ColorChange,
    BackgroundChange,
    MelodyHighlight,
}

/// Payload-free discriminant of [`VisualEvent`], used as the dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CurtainRise,
    ParticlesAppear,
    FrequencyPeaks,
    EpicExplosion,
    ScreenShake,
    ViolinSolo,
    LayerTransition,
    ColorChange,
    BackgroundChange,
    MelodyHighlight,
}

impl VisualEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            VisualEvent::CurtainRise => EventKind::CurtainRise,
            VisualEvent::ParticlesAppear => EventKind::ParticlesAppear,
            VisualEvent::FrequencyPeaks => EventKind::FrequencyPeaks,
            VisualEvent::EpicExplosion { .. } => EventKind::EpicExplosion,
            VisualEvent::ScreenShake => EventKind::ScreenShake,
            VisualEvent::ViolinSolo => EventKind::ViolinSolo,
            VisualEvent::LayerTransition => EventKind::LayerTransition,
            VisualEvent::ColorChange => EventKind::ColorChange,
            VisualEvent::BackgroundChange => EventKind::BackgroundChange,
            VisualEvent::MelodyHighlight => EventKind::MelodyHighlight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Playback time in seconds.
    pub time: f32,
    pub event: VisualEvent,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, f32>,
    #[serde(skip)]
    triggered: bool,
}

impl TimelineEvent {
    pub fn new(time: f32, event: VisualEvent, description: impl Into<String>) -> Self {
        Self {
            time,
            event,
            description: description.into(),
            parameters: BTreeMap::new(),
            triggered: false,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: f32) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn param(&self, key: &str, default: f32) -> f32 {
        self.parameters.get(key).copied().unwrap_or(default)
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }
}

/// Handler table keyed by event kind. Kinds without a handler are ignored.
pub struct DispatchTable<C> {
    handlers: HashMap<EventKind, fn(&TimelineEvent, &mut C)>,
}

impl<C> DispatchTable<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: EventKind, handler: fn(&TimelineEvent, &mut C)) {
        self.handlers.insert(kind, handler);
    }

    /// Returns whether a handler ran.
    pub fn dispatch(&self, event: &TimelineEvent, ctx: &mut C) -> bool {
        match self.handlers.get(&event.event.kind()) {
            Some(handler) => {
                handler(event, ctx);
                true
            }
            None => false,
        }
    }
}

impl<C> Default for DispatchTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TimelineFile {
    events: Vec<TimelineEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    events: Vec<TimelineEvent>,
    current_time: f32,
    playing: bool,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: impl IntoIterator<Item = TimelineEvent>) -> Self {
        let mut timeline = Self::new();
        for event in events {
            timeline.add_event(event);
        }
        timeline
    }

    /// Insert keeping time order; equal times keep insertion order.
    pub fn add_event(&mut self, event: TimelineEvent) {
        let index = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(index, event);
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.reset();
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn reset(&mut self) {
        self.current_time = 0.0;
        self.events.iter_mut().for_each(|e| e.triggered = false);
    }

    /// Jump to `time`: everything at or before it counts as already fired.
    pub fn seek(&mut self, time: f32) {
        self.current_time = time;
        for event in &mut self.events {
            event.triggered = event.time <= time;
        }
    }

    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    pub fn next_event_time(&self) -> Option<f32> {
        self.events.iter().find(|e| !e.triggered).map(|e| e.time)
    }

    /// Advance to `audio_time` and return the events that fired, in time order.
    pub fn update(&mut self, audio_time: f32) -> Vec<TimelineEvent> {
        if !self.playing {
            return Vec::new();
        }
        self.current_time = audio_time;

        let mut fired = Vec::new();
        for event in &mut self.events {
            if !event.triggered && audio_time >= event.time {
                event.triggered = true;
                fired.push(event.clone());
            }
        }
        fired
    }

    /// `update` followed by handing each fired event to `table`.
    pub fn dispatch<C>(&mut self, audio_time: f32, table: &DispatchTable<C>, ctx: &mut C) -> usize {
        let fired = self.update(audio_time);
        for event in &fired {
            info!("[timeline] {:.2}s: {:?} {}", event.time, event.event.kind(), event.description);
            table.dispatch(event, ctx);
        }
        fired.len()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read timeline {}", path.display()))?;
        let file: TimelineFile = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse timeline {}", path.display()))?;
        Ok(Self::from_events(file.events))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = TimelineFile {
            events: self.events.clone(),
        };
        std::fs::write(path.as_ref(), serde_json::to_string_pretty(&file)?)
            .with_context(|| format!("failed to write timeline {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Cue sheet for Dvořák's "New World" symphony finale.
    pub fn new_world_symphony() -> Self {
        Self::from_events([
            TimelineEvent::new(0.0, VisualEvent::CurtainRise, "curtain rises over a dark background"),
            TimelineEvent::new(0.5, VisualEvent::ParticlesAppear, "golden particles emerge"),
            TimelineEvent::new(8.0, VisualEvent::FrequencyPeaks, "second string pass, peaks intensify"),
            TimelineEvent::new(
                17.0,
                VisualEvent::EpicExplosion { intensity: 1.0, duration: 2.0 },
                "main theme bursts in",
            ),
            TimelineEvent::new(17.1, VisualEvent::ScreenShake, "screen shake"),
            TimelineEvent::new(44.0, VisualEvent::ViolinSolo, "violin solo"),
            TimelineEvent::new(56.0, VisualEvent::ColorChange, "palette shifts to deep gold"),
            TimelineEvent::new(73.0, VisualEvent::BackgroundChange, "blinds turn bright gold"),
            TimelineEvent::new(17.5, VisualEvent::MelodyHighlight, "highlight main melody"),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(events: &[TimelineEvent]) -> Vec<EventKind> {
        events.iter().map(|e| e.event.kind()).collect()
    }

    #[test]
    fn test_events_sorted_on_insert() {
        let timeline = Timeline::new_world_symphony();
        let times: Vec<f32> = timeline.events().iter().map(|e| e.time).collect();
        assert_eq!(times, vec![0.0, 0.5, 8.0, 17.0, 17.1, 17.5, 44.0, 56.0, 73.0]);
    }

    #[test]
    fn test_equal_times_keep_insertion_order() {
        let timeline = Timeline::from_events([
            TimelineEvent::new(1.0, VisualEvent::ColorChange, ""),
            TimelineEvent::new(1.0, VisualEvent::ScreenShake, ""),
        ]);
        assert_eq!(kinds(timeline.events()), vec![EventKind::ColorChange, EventKind::ScreenShake]);
    }

    #[test]
    fn test_paused_timeline_does_not_fire() {
        let mut timeline = Timeline::new_world_symphony();
        assert!(timeline.update(100.0).is_empty());
        assert_eq!(timeline.next_event_time(), Some(0.0));
    }

    #[test]
    fn test_events_fire_once_in_order() {
        let mut timeline = Timeline::new_world_symphony();
        timeline.play();

        assert_eq!(kinds(&timeline.update(0.6)), vec![EventKind::CurtainRise, EventKind::ParticlesAppear]);
        assert!(timeline.update(0.7).is_empty());
        assert_eq!(timeline.next_event_time(), Some(8.0));

        let fired = timeline.update(17.2);
        assert_eq!(
            kinds(&fired),
            vec![EventKind::FrequencyPeaks, EventKind::EpicExplosion, EventKind::ScreenShake]
        );
        assert_eq!(fired[1].event, VisualEvent::EpicExplosion { intensity: 1.0, duration: 2.0 });
        assert!(fired[1].parameters.is_empty());
    }

    #[test]
    fn test_free_form_parameters() {
        let event = TimelineEvent::new(3.0, VisualEvent::ColorChange, "tint").with_param("hue", 42.0);
        assert_eq!(event.param("hue", 0.0), 42.0);
        assert_eq!(event.param("missing", 3.0), 3.0);
    }

    #[test]
    fn test_explosion_payload_read_from_variant() {
        let json = r#"{"events": [
            {"time": 2.0, "event": {"type": "epic_explosion", "intensity": 0.4, "duration": 1.5}}
        ]}"#;
        let file: TimelineFile = serde_json::from_str(json).unwrap();
        let timeline = Timeline::from_events(file.events);

        let event = &timeline.events()[0];
        assert_eq!(event.event, VisualEvent::EpicExplosion { intensity: 0.4, duration: 1.5 });
        assert!(event.parameters.is_empty());

        let missing = r#"{"events": [{"time": 2.0, "event": {"type": "epic_explosion", "intensity": 0.4}}]}"#;
        assert!(serde_json::from_str::<TimelineFile>(missing).is_err());
    }

    #[test]
    fn test_reset_and_stop() {
        let mut timeline = Timeline::new_world_symphony();
        timeline.play();
        timeline.update(80.0);
        assert_eq!(timeline.next_event_time(), None);

        timeline.reset();
        assert_eq!(timeline.current_time(), 0.0);
        assert!(timeline.events().iter().all(|e| !e.is_triggered()));
        assert_eq!(timeline.update(1.0).len(), 2);

        timeline.stop();
        assert!(!timeline.is_playing());
        assert_eq!(timeline.next_event_time(), Some(0.0));
    }

    #[test]
    fn test_seek_marks_past_events() {
        let mut timeline = Timeline::new_world_symphony();
        timeline.play();
        timeline.seek(17.0);
        assert_eq!(timeline.next_event_time(), Some(17.1));

        timeline.seek(5.0);
        assert_eq!(timeline.next_event_time(), Some(8.0));
        assert_eq!(kinds(&timeline.update(9.0)), vec![EventKind::FrequencyPeaks]);
    }

    #[derive(Default)]
    struct Stage {
        shakes: u32,
        explosion_intensity: f32,
    }

    fn on_shake(_: &TimelineEvent, stage: &mut Stage) {
        stage.shakes += 1;
    }

    fn on_explosion(event: &TimelineEvent, stage: &mut Stage) {
        if let VisualEvent::EpicExplosion { intensity, .. } = event.event {
            stage.explosion_intensity = intensity;
        }
    }

    #[test]
    fn test_dispatch_table() {
        let mut table: DispatchTable<Stage> = DispatchTable::new();
        table.register(EventKind::ScreenShake, on_shake);
        table.register(EventKind::EpicExplosion, on_explosion);

        let mut timeline = Timeline::new_world_symphony();
        timeline.play();
        let mut stage = Stage::default();

        assert_eq!(timeline.dispatch(20.0, &table, &mut stage), 6);
        assert_eq!(stage.shakes, 1);
        assert_eq!(stage.explosion_intensity, 1.0);

        assert_eq!(timeline.dispatch(21.0, &table, &mut stage), 0);
        assert_eq!(stage.shakes, 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cues.json");
        let timeline = Timeline::new_world_symphony();
        timeline.save(&path).unwrap();

        let loaded = Timeline::load(&path).unwrap();
        assert_eq!(loaded.events(), timeline.events());
    }
}
