/// Root-mean-square energy of a window of normalized samples.
///
/// Stateless; an empty window is silent.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|&x| x * x).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// RMS of raw 16-bit PCM, normalizing each sample to [-1, 1) first.
pub fn rms_i16(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples
        .iter()
        .map(|&s| {
            let x = super::source::normalize_i16(s);
            x * x
        })
        .sum();
    (sum_squares / samples.len() as f32).sqrt()
}
