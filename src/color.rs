use serde::{Deserialize, Serialize};

use crate::smoothing::Interpolate;

/// Linear RGB colour with channels in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Quantize to 8-bit channels the way a renderer expects.
    pub fn to_rgb8(self) -> [u8; 3] {
        let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0) as u8;
        [quantize(self.r), quantize(self.g), quantize(self.b)]
    }
}

impl Interpolate for Rgb {
    fn lerp(&self, target: &Self, fraction: f32) -> Self {
        Rgb {
            r: Interpolate::lerp(&self.r, &target.r, fraction),
            g: Interpolate::lerp(&self.g, &target.g, fraction),
            b: Interpolate::lerp(&self.b, &target.b, fraction),
        }
    }

    fn distance(&self, other: &Self) -> f32 {
        self.r
            .distance(&other.r)
            .max(self.g.distance(&other.g))
            .max(self.b.distance(&other.b))
    }
}

/// Hue in degrees (wrapped into 0..360), saturation and brightness in percent.
pub fn hsb_to_rgb(hue: f32, saturation: f32, brightness: f32) -> Rgb {
    let hue = hue.rem_euclid(360.0);
    let saturation = saturation.clamp(0.0, 100.0) / 100.0;
    let brightness = brightness.clamp(0.0, 100.0) / 100.0;

    let c = brightness * saturation;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = brightness - c;

    let (r, g, b) = match (hue / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Rgb::new(r + m, g + m, b + m)
}
