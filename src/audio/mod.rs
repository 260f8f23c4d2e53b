pub mod bands;
pub mod fft;
pub mod loudness;
pub mod source;

pub use bands::{BandMapper, BandStrategy};
pub use fft::SpectralTransform;
pub use source::SampleSource;
