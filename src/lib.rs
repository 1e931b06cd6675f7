pub mod config;
pub mod dsp;
pub mod error;
pub mod io; // Device sample formats
pub mod synth; // Voice pool, normalization, render callback

pub use config::{SynthConfig, VoiceCounting};
pub use error::{ConfigError, VoiceError};

/// Upper bound on `voice_count`; sizes the fixed meter snapshot.
pub const MAX_VOICES: usize = 16;
