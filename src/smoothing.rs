//! Frame-rate independent approach-to-target smoothing.
//!
//! A [`SmoothedValue`] turns stepwise targets (one per analysis frame) into
//! continuous motion: `set_target` only records where to go, and `update(dt)`
//! moves `current` a time-scaled fraction of the remaining distance.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Values that can be blended channel by channel.
pub trait Interpolate: Clone {
    /// Move `fraction` (0.0..=1.0) of the way from `self` to `target`.
    fn lerp(&self, target: &Self, fraction: f32) -> Self;

    /// Largest per-channel distance, used to decide when motion has settled.
    fn distance(&self, other: &Self) -> f32;
}

impl Interpolate for f32 {
    fn lerp(&self, target: &Self, fraction: f32) -> Self {
        let next = self + (target - self) * fraction;
        // Rounding must never carry the value past the target.
        if (target - self) * (target - next) < 0.0 {
            *target
        } else {
            next
        }
    }

    fn distance(&self, other: &Self) -> f32 {
        (self - other).abs()
    }
}

impl Interpolate for f64 {
    fn lerp(&self, target: &Self, fraction: f32) -> Self {
        let next = self + (target - self) * fraction as f64;
        if (target - self) * (target - next) < 0.0 {
            *target
        } else {
            next
        }
    }

    fn distance(&self, other: &Self) -> f32 {
        (self - other).abs() as f32
    }
}

/// How `update` converts elapsed time into a blend fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMode {
    /// `f = 1 - exp(-rate * dt)`: converges asymptotically.
    #[default]
    Exponential,
    /// `f = min(1, rate * dt)`: a linear approximation of the exponential
    /// form that lands exactly on the target once `rate * dt >= 1`.
    ClampedLinear,
}

impl SmoothingMode {
    pub fn fraction(self, rate: f32, dt: f32) -> f32 {
        match self {
            SmoothingMode::Exponential => 1.0 - (-rate * dt).exp(),
            SmoothingMode::ClampedLinear => (rate * dt).min(1.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmoothedValue<T: Interpolate> {
    current: T,
    target: T,
    initial: T,
    rate: f32,
    mode: SmoothingMode,
}

impl<T: Interpolate> SmoothedValue<T> {
    /// `rate` is in 1/seconds; it must be positive and finite.
    pub fn new(initial: T, rate: f32) -> Result<Self, ConfigError> {
        Self::with_mode(initial, rate, SmoothingMode::default())
    }

    pub fn with_mode(initial: T, rate: f32, mode: SmoothingMode) -> Result<Self, ConfigError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(ConfigError::NonPositiveRate { name: "smoothed value", rate });
        }

        Ok(Self {
            current: initial.clone(),
            target: initial.clone(),
            initial,
            rate,
            mode,
        })
    }

    pub fn set_target(&mut self, target: T) {
        self.target = target;
    }

    /// Advance toward the target by the fraction of the gap that `dt` seconds buys.
    ///
    /// Zero, negative and non-finite `dt` leave `current` untouched.
    pub fn update(&mut self, dt: f32) {
        if !dt.is_finite() || dt < 0.0 {
            log::warn!("ignoring invalid smoothing step dt={}", dt);
            return;
        }
        if dt == 0.0 {
            return;
        }

        let fraction = self.mode.fraction(self.rate, dt);
        if fraction >= 1.0 {
            self.current = self.target.clone();
        } else {
            self.current = self.current.lerp(&self.target, fraction);
        }
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn mode(&self) -> SmoothingMode {
        self.mode
    }

    /// Jump straight to `value`, discarding any motion in progress.
    pub fn snap(&mut self, value: T) {
        self.current = value.clone();
        self.target = value;
    }

    /// Snap back to the value the smoother was built with.
    pub fn reset(&mut self) {
        self.snap(self.initial.clone());
    }

    pub fn is_settled(&self, epsilon: f32) -> bool {
        self.current.distance(&self.target) <= epsilon
    }
}

impl<T: Interpolate + Copy> SmoothedValue<T> {
    pub fn get(&self) -> T {
        self.current
    }
}
