//! Quantization from the engine's mix to device sample formats.
//!
//! The mix is a plain `f32` sum of voice amplitudes in 16-bit units, so a
//! ceiling of 12000 leaves headroom below `i16::MAX`. Each format saturates
//! instead of wrapping; NaN becomes silence.

/// Full-scale value of the mix; `f32` output is normalized against it.
pub const FULL_SCALE: f32 = 32_768.0;

/// A device sample type the render callback can write.
pub trait OutputSample: Copy + Send + 'static {
    const SILENCE: Self;

    fn from_mix(mix: f32) -> Self;

    /// Back to [-1, 1], for metering and scopes.
    fn to_unit(self) -> f32;
}

impl OutputSample for i16 {
    const SILENCE: Self = 0;

    #[inline]
    fn from_mix(mix: f32) -> Self {
        if mix.is_nan() {
            return 0;
        }
        mix.clamp(i16::MIN as f32, i16::MAX as f32) as i16
    }

    fn to_unit(self) -> f32 {
        self as f32 / FULL_SCALE
    }
}

impl OutputSample for f32 {
    const SILENCE: Self = 0.0;

    #[inline]
    fn from_mix(mix: f32) -> Self {
        if mix.is_nan() {
            return 0.0;
        }
        (mix / FULL_SCALE).clamp(-1.0, 1.0)
    }

    fn to_unit(self) -> f32 {
        self
    }
}

impl OutputSample for u16 {
    const SILENCE: Self = 0x8000;

    #[inline]
    fn from_mix(mix: f32) -> Self {
        (i16::from_mix(mix) as i32 + 0x8000) as u16
    }

    fn to_unit(self) -> f32 {
        (self as i32 - 0x8000) as f32 / FULL_SCALE
    }
}
