//! Error types for voice control and configuration.

#[cfg(feature = "serde")]
use std::path::PathBuf;
use thiserror::Error;

/// Rejected voice operations.
///
/// None of these are fatal: the voice is left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VoiceError {
    /// Index outside the voice pool
    #[error("voice index {index} out of range (pool has {len} voices)")]
    InvalidIndex { index: usize, len: usize },

    /// Start requested on a voice that is already sounding
    #[error("voice {0} is already active")]
    AlreadyActive(usize),

    /// Stop requested on a voice that is silent or already fading out
    #[error("voice {0} is not sounding")]
    NotSounding(usize),

    /// The control ring is full; the render thread has fallen behind
    #[error("control queue is full")]
    QueueFull,
}

/// Errors that can occur while loading or validating a `SynthConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a config file
    #[cfg(feature = "serde")]
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[cfg(feature = "serde")]
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A field holds a value the engine cannot run with
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },

    /// The highest key would alias
    #[error("highest pitch {pitch_hz:.2} Hz is at or above Nyquist for {sample_rate} Hz")]
    AboveNyquist { pitch_hz: f32, sample_rate: f32 },

    /// More voices than the meter snapshot can carry
    #[error("voice_count {requested} exceeds the maximum of {max}")]
    TooManyVoices { requested: usize, max: usize },
}
