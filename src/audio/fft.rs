use num_complex::Complex;
use std::f32::consts::PI;

use crate::error::ConfigError;

/// Windowed radix-2 transform producing a normalized magnitude spectrum.
///
/// The Hann window is computed once at construction. `process` always
/// returns exactly `size / 2` magnitudes.
pub struct SpectralTransform {
    fft_size: usize,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl SpectralTransform {
    pub fn new(fft_size: usize) -> Result<Self, ConfigError> {
        if !fft_size.is_power_of_two() {
            return Err(ConfigError::FftSizeNotPowerOfTwo(fft_size));
        }

        Ok(Self {
            fft_size,
            window: hann_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn spectrum_len(&self) -> usize {
        self.fft_size / 2
    }

    /// Transform the first `fft_size` samples of `samples`.
    ///
    /// An undersized window yields an all-zero spectrum of the usual length
    /// rather than reading past the end of the input.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        if samples.len() < self.fft_size {
            log::debug!(
                "transform input too short ({} < {}), returning silence",
                samples.len(),
                self.fft_size
            );
            return vec![0.0; self.spectrum_len()];
        }

        for ((slot, &sample), &w) in self.buffer.iter_mut().zip(samples).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }

        radix2_in_place(&mut self.buffer);
        magnitudes(&self.buffer)
    }
}

/// One-shot helper for callers that do not keep a `SpectralTransform` around.
///
/// The input length must be a power of two; an empty input gives an empty
/// spectrum and any other length gives an empty result as well.
pub fn magnitude_spectrum(samples: &[f32]) -> Vec<f32> {
    let n = samples.len();
    if n == 0 || !n.is_power_of_two() {
        return Vec::new();
    }

    let window = hann_window(n);
    let mut data: Vec<Complex<f32>> = samples
        .iter()
        .zip(&window)
        .map(|(&x, &w)| Complex::new(x * w, 0.0))
        .collect();

    radix2_in_place(&mut data);
    magnitudes(&data)
}

pub fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        // (N - 1) is zero for a single sample; leave it unscaled.
        return vec![1.0; size];
    }

    (0..size)
        .map(|i| {
            let phase = 2.0 * PI * i as f32 / (size - 1) as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

/// Iterative decimation-in-time FFT. `data.len()` must be a power of two.
fn radix2_in_place(data: &mut [Complex<f32>]) {
    let n = data.len();
    if n < 2 {
        return;
    }
    let bits = n.trailing_zeros();

    for i in 0..n {
        let j = reverse_bits(i, bits);
        if j > i {
            data.swap(i, j);
        }
    }

    for stage in 1..=bits {
        let m = 1usize << stage;
        let half = m / 2;
        let theta = -2.0 * PI / m as f32;
        let twiddle = Complex::new(theta.cos(), theta.sin());

        for start in (0..n).step_by(m) {
            let mut w = Complex::new(1.0f32, 0.0);
            for j in 0..half {
                let u = data[start + j];
                let t = w * data[start + j + half];
                data[start + j] = u + t;
                data[start + j + half] = u - t;
                w *= twiddle;
            }
        }
    }
}

fn reverse_bits(index: usize, bits: u32) -> usize {
    if bits == 0 {
        return 0;
    }
    index.reverse_bits() >> (usize::BITS - bits)
}

fn magnitudes(data: &[Complex<f32>]) -> Vec<f32> {
    let half = data.len() / 2;
    if half == 0 {
        return Vec::new();
    }
    let scale = half as f32;
    data[..half].iter().map(|c| c.norm() / scale).collect()
}
