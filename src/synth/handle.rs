use rtrb::{Consumer, Producer, RingBuffer};

use crate::{
    dsp::oscillator::Waveform,
    error::VoiceError,
    synth::message::{KeyMessage, PoolSnapshot},
};

const CONTROL_QUEUE_SIZE: usize = 256;
const METER_QUEUE_SIZE: usize = 8;

/// Input-side endpoint of the synth.
///
/// Lives on the UI thread. Every call is a wait-free push onto the control
/// ring; the render thread applies it at the start of its next block.
pub struct KeyboardHandle {
    tx: Producer<KeyMessage>,
    voice_count: usize,
}

/// Render-side ends of the rings created by [`channel`].
pub struct RenderEnds {
    pub rx: Consumer<KeyMessage>,
    pub meter_tx: Producer<PoolSnapshot>,
}

/// Create the control and meter rings for a pool of `voice_count` voices.
///
/// Returns the input handle, the render-side ends, and the meter receiver
/// for the UI.
pub fn channel(voice_count: usize) -> (KeyboardHandle, RenderEnds, Consumer<PoolSnapshot>) {
    let (tx, rx) = RingBuffer::<KeyMessage>::new(CONTROL_QUEUE_SIZE);
    let (meter_tx, meter_rx) = RingBuffer::<PoolSnapshot>::new(METER_QUEUE_SIZE);

    let handle = KeyboardHandle { tx, voice_count };
    (handle, RenderEnds { rx, meter_tx }, meter_rx)
}

impl KeyboardHandle {
    pub fn start(&mut self, index: usize) -> Result<(), VoiceError> {
        self.check(index)?;
        self.send(KeyMessage::Start(index))
    }

    pub fn stop(&mut self, index: usize) -> Result<(), VoiceError> {
        self.check(index)?;
        self.send(KeyMessage::Stop(index))
    }

    pub fn stop_all(&mut self) -> Result<(), VoiceError> {
        self.send(KeyMessage::StopAll)
    }

    pub fn set_waveform(&mut self, waveform: Waveform) -> Result<(), VoiceError> {
        self.send(KeyMessage::SetWaveform(waveform))
    }

    pub fn set_fades(&mut self, attack_seconds: f32, release_seconds: f32) -> Result<(), VoiceError> {
        self.send(KeyMessage::SetFades {
            attack_seconds,
            release_seconds,
        })
    }

    pub fn voice_count(&self) -> usize {
        self.voice_count
    }

    fn check(&self, index: usize) -> Result<(), VoiceError> {
        if index < self.voice_count {
            Ok(())
        } else {
            Err(VoiceError::InvalidIndex {
                index,
                len: self.voice_count,
            })
        }
    }

    fn send(&mut self, msg: KeyMessage) -> Result<(), VoiceError> {
        self.tx.push(msg).map_err(|_| VoiceError::QueueFull)
    }
}
