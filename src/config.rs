//! Engine configuration.
//!
//! Every tunable constant of the synth lives in [`SynthConfig`]. Defaults
//! reproduce the reference build: 13 keys starting at middle C, 44.1 kHz,
//! 150 ms fades and a 12000 peak ceiling for 16-bit output.
//!
//! With the `serde` feature the config can be read from TOML; missing fields
//! fall back to their defaults:
//!
//! ```toml
//! sample_rate = 48000.0
//! waveform = "triangle"
//! attack_seconds = 0.05
//! voice_counting = "on-key-up"
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use std::path::Path;

use crate::{
    dsp::{envelope::EnvelopeConfig, oscillator::Waveform},
    error::ConfigError,
    MAX_VOICES,
};

/// Which voices count toward the fair-share divisor.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceCounting {
    /// A voice stops counting when its key goes up. The remaining voices
    /// grow immediately while the released one is still fading out.
    OnKeyUp,
    /// A voice keeps counting until its release reaches silence, so the
    /// summed peak never exceeds the ceiling.
    #[default]
    OnSilence,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    /// Output sample rate in Hz
    pub sample_rate: f32,
    /// Pitch of voice 0 in Hz
    pub base_pitch_hz: f32,
    /// Pitch ratio between neighbouring voices (2^(1/12) for semitones)
    pub semitone_ratio: f32,
    pub voice_count: usize,
    /// Summed peak of all voices, in output-sample units
    pub amplitude_ceiling: f32,
    pub attack_seconds: f32,
    pub release_seconds: f32,
    pub waveform: Waveform,
    pub voice_counting: VoiceCounting,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            base_pitch_hz: 261.63,
            semitone_ratio: 1.059_463_1,
            voice_count: 13,
            amplitude_ceiling: 12_000.0,
            attack_seconds: 0.15,
            release_seconds: 0.15,
            waveform: Waveform::Sine,
            voice_counting: VoiceCounting::OnSilence,
        }
    }
}

impl SynthConfig {
    /// Parse a TOML document and validate it.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: SynthConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    #[cfg(feature = "serde")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "loaded synth config");
        Ok(config)
    }

    /// Same config at a different sample rate (e.g. the device's native rate).
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("sample_rate", self.sample_rate)?;
        positive("base_pitch_hz", self.base_pitch_hz)?;
        positive("amplitude_ceiling", self.amplitude_ceiling)?;
        positive("attack_seconds", self.attack_seconds)?;
        positive("release_seconds", self.release_seconds)?;

        if !(self.semitone_ratio.is_finite() && self.semitone_ratio >= 1.0) {
            return Err(ConfigError::Invalid {
                field: "semitone_ratio",
                reason: format!("must be finite and at least 1.0, got {}", self.semitone_ratio),
            });
        }

        if self.voice_count == 0 {
            return Err(ConfigError::Invalid {
                field: "voice_count",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.voice_count > MAX_VOICES {
            return Err(ConfigError::TooManyVoices {
                requested: self.voice_count,
                max: MAX_VOICES,
            });
        }

        let highest = self.pitches().last().unwrap_or(self.base_pitch_hz);
        if highest >= self.sample_rate / 2.0 {
            return Err(ConfigError::AboveNyquist {
                pitch_hz: highest,
                sample_rate: self.sample_rate,
            });
        }

        Ok(())
    }

    /// Pitch of every voice, each one `semitone_ratio` above the last.
    pub fn pitches(&self) -> impl Iterator<Item = f32> + '_ {
        let ratio = self.semitone_ratio;
        std::iter::successors(Some(self.base_pitch_hz), move |p| Some(p * ratio))
            .take(self.voice_count)
    }

    pub fn envelope(&self) -> EnvelopeConfig {
        EnvelopeConfig::new(
            self.sample_rate,
            self.attack_seconds,
            self.release_seconds,
            self.amplitude_ceiling,
        )
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be a positive number, got {value}"),
        })
    }
}
