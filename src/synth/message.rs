#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::{
    dsp::{envelope::EnvelopePhase, oscillator::Waveform},
    MAX_VOICES,
};

/// Control events sent from the input thread to the render thread.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum KeyMessage {
    Start(usize),
    Stop(usize),
    StopAll,
    SetWaveform(Waveform),
    SetFades {
        attack_seconds: f32,
        release_seconds: f32,
    },
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<KeyMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<KeyMessage> {
    fn pop(&mut self) -> Option<KeyMessage> {
        Consumer::pop(self).ok()
    }
}

/// Receiver with nothing to say, for offline rendering and tests.
pub struct NoMessages;

impl MessageReceiver for NoMessages {
    fn pop(&mut self) -> Option<KeyMessage> {
        None
    }
}

/// Meter state of one voice (Copy, no allocations)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VoiceMeter {
    pub phase: EnvelopePhase,
    pub amplitude: f32,
    pub target: f32,
}

/// Snapshot sent from the render thread after each block (Copy, fixed size)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PoolSnapshot {
    /// Per-voice state, first `num_voices` entries are valid
    pub voices: [VoiceMeter; MAX_VOICES],
    pub num_voices: u8,
    /// Voices counted toward the fair share
    pub active: u8,
    pub waveform: Waveform,
    /// Messages the pool refused since startup (double starts, stray stops)
    pub rejected_events: u32,
}

impl PoolSnapshot {
    /// Meters of the voices in use. A `num_voices` past the array is clamped.
    pub fn meters(&self) -> &[VoiceMeter] {
        let len = (self.num_voices as usize).min(MAX_VOICES);
        &self.voices[..len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meters_never_slice_past_the_array() {
        let snapshot = PoolSnapshot {
            num_voices: 200,
            ..PoolSnapshot::default()
        };
        assert_eq!(snapshot.meters().len(), MAX_VOICES);
    }

    #[test]
    fn meters_cover_only_voices_in_use() {
        let snapshot = PoolSnapshot {
            num_voices: 13,
            ..PoolSnapshot::default()
        };
        assert_eq!(snapshot.meters().len(), 13);
        assert!(snapshot.meters().iter().all(|m| m.phase == EnvelopePhase::Stop));
    }
}
