use thiserror::Error;

/// Construction-time configuration problems.
///
/// These are programmer errors: every constructor that takes tunables checks
/// them up front and refuses to build, so nothing downstream has to handle a
/// half-valid analyzer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("transform size {0} is not a power of two")]
    FftSizeNotPowerOfTwo(usize),

    #[error("band count must be at least 1")]
    ZeroBandCount,

    #[error("smoothing rate for {name} must be positive and finite, got {rate}")]
    NonPositiveRate { name: &'static str, rate: f32 },

    #[error("damping coefficient must lie strictly between 0 and 1, got {0}")]
    InvalidDamping(f32),

    #[error("compression gain must be positive and finite, got {0}")]
    InvalidGain(f32),

    #[error("height range is invalid: min {min} must be >= 0 and below max {max}")]
    InvalidHeightRange { min: f32, max: f32 },

    #[error("frequency range is invalid: {min} Hz .. {max} Hz")]
    InvalidFrequencyRange { min: f32, max: f32 },

    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(u32),

    #[error("silence decay factor must lie in [0, 1), got {0}")]
    InvalidDecayFactor(f32),

    #[error("rate limit fraction must be positive and finite, got {0}")]
    InvalidRateLimit(f32),
}
