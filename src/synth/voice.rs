use crate::dsp::{
    envelope::{EnvelopeConfig, EnvelopePhase, EnvelopeState},
    oscillator::{PhaseAccumulator, Waveform},
};

/// One key's oscillator and envelope.
///
/// The pitch is fixed when the pool is built; everything else is rewritten
/// sample by sample on the render thread.
#[derive(Debug, Clone, Copy)]
pub struct Voice {
    pitch_hz: f32,
    accumulator: PhaseAccumulator,
    envelope: EnvelopeState,
}

impl Voice {
    pub fn new(pitch_hz: f32, sample_rate: f32) -> Self {
        Self {
            pitch_hz,
            accumulator: PhaseAccumulator::from_freq(pitch_hz, sample_rate),
            envelope: EnvelopeState::SILENT,
        }
    }

    /// Advance envelope and oscillator one sample and return the voice's
    /// contribution to the mix. A stopped voice returns 0 and does not move.
    #[inline]
    pub fn tick(&mut self, waveform: Waveform, cfg: &EnvelopeConfig) -> f32 {
        if self.envelope.is_silent() {
            return 0.0;
        }

        self.envelope = self.envelope.advance(cfg);
        let out = self.envelope.amplitude() * waveform.sample(self.accumulator.value());

        if self.envelope.is_silent() {
            // Next note on this key starts at the top of the wave.
            self.accumulator.reset();
        } else {
            self.accumulator.advance();
        }

        out
    }

    pub(crate) fn set_envelope(&mut self, envelope: EnvelopeState) {
        self.envelope = envelope;
    }

    pub fn envelope(&self) -> EnvelopeState {
        self.envelope
    }

    pub fn pitch_hz(&self) -> f32 {
        self.pitch_hz
    }

    pub fn phase(&self) -> EnvelopePhase {
        self.envelope.phase()
    }

    pub fn amplitude(&self) -> f32 {
        self.envelope.amplitude()
    }

    pub fn target(&self) -> f32 {
        self.envelope.target()
    }

    pub fn phase_accumulator(&self) -> f32 {
        self.accumulator.value()
    }

    pub fn is_silent(&self) -> bool {
        self.envelope.is_silent()
    }

    pub fn is_releasing(&self) -> bool {
        self.envelope.is_releasing()
    }
}
