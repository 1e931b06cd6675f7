//! Low-level DSP primitives used by the voice pool.
//!
//! These components are allocation-free and realtime-safe, making them safe to
//! embed directly inside voice structs. They stay focused on the signal math;
//! the `synth` layer decides when notes start, stop, and re-balance.

/// Fade-in/fade-out/renormalization envelope state machine.
pub mod envelope;
/// Waveform shapes and the phase accumulator.
pub mod oscillator;

pub use envelope::{EnvelopeConfig, EnvelopePhase, EnvelopeState};
pub use oscillator::{PhaseAccumulator, Waveform};
