#[cfg(feature = "rtrb")]
use rtrb::Producer;

use crate::{
    config::SynthConfig,
    error::ConfigError,
    io::OutputSample,
    synth::{
        message::{KeyMessage, MessageReceiver, PoolSnapshot},
        pool::VoicePool,
        voice::Voice,
    },
};

/// The render side of the keyboard synth.
///
/// Owns the voice pool outright; the input thread only reaches it through
/// the message receiver. `render` is the audio callback body: it applies
/// queued key events, then produces the block one frame at a time. Nothing
/// on this path locks or allocates.
pub struct KeySynth<R: MessageReceiver> {
    pool: VoicePool,
    rx: R,
    sample_rate: f32,
    rejected_events: u32,
    #[cfg(feature = "rtrb")]
    meter_tx: Option<Producer<PoolSnapshot>>,
}

impl<R: MessageReceiver> KeySynth<R> {
    /// Fails if `config` does not validate; nothing reaches the audio
    /// thread that the meter snapshot or the normalizer cannot handle.
    pub fn new(config: &SynthConfig, rx: R) -> Result<Self, ConfigError> {
        Ok(Self {
            pool: VoicePool::new(config)?,
            rx,
            sample_rate: config.sample_rate,
            rejected_events: 0,
            #[cfg(feature = "rtrb")]
            meter_tx: None,
        })
    }

    /// Publish a `PoolSnapshot` after every block. Snapshots are dropped
    /// while the ring is full.
    #[cfg(feature = "rtrb")]
    pub fn with_meter(mut self, meter_tx: Producer<PoolSnapshot>) -> Self {
        self.meter_tx = Some(meter_tx);
        self
    }

    /// Fill an interleaved buffer of `channels`-sample frames.
    ///
    /// Every channel of a frame gets the same mono mix. A trailing partial
    /// frame is written as silence.
    pub fn render<S: OutputSample>(&mut self, out: &mut [S], channels: usize) {
        self.process_messages();

        let channels = channels.max(1);
        let mut frames = out.chunks_exact_mut(channels);
        for frame in &mut frames {
            let sample = S::from_mix(self.pool.mix_sample());
            frame.fill(sample);
        }
        frames.into_remainder().fill(S::SILENCE);

        self.publish_meter();
    }

    /// Apply every queued control message.
    pub fn process_messages(&mut self) {
        while let Some(msg) = self.rx.pop() {
            let applied = match msg {
                KeyMessage::Start(index) if index < self.pool.len() => {
                    self.pool.start_voice(index).is_ok()
                }
                KeyMessage::Stop(index) if index < self.pool.len() => {
                    self.pool.stop_voice(index).is_ok()
                }
                KeyMessage::Start(_) | KeyMessage::Stop(_) => false,
                KeyMessage::StopAll => {
                    self.pool.release_all();
                    true
                }
                KeyMessage::SetWaveform(waveform) => {
                    self.pool.set_waveform(waveform);
                    true
                }
                KeyMessage::SetFades {
                    attack_seconds,
                    release_seconds,
                } => {
                    if attack_seconds > 0.0 && release_seconds > 0.0 {
                        self.pool
                            .set_fades(self.sample_rate, attack_seconds, release_seconds);
                        true
                    } else {
                        false
                    }
                }
            };

            if !applied {
                self.rejected_events = self.rejected_events.saturating_add(1);
            }
        }
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            rejected_events: self.rejected_events,
            ..self.pool.snapshot()
        }
    }

    #[cfg(feature = "rtrb")]
    fn publish_meter(&mut self) {
        let snapshot = self.snapshot();
        if let Some(tx) = self.meter_tx.as_mut() {
            let _ = tx.push(snapshot);
        }
    }

    #[cfg(not(feature = "rtrb"))]
    fn publish_meter(&mut self) {}

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    /// Direct access for callers that drive the pool without messages.
    pub fn pool_mut(&mut self) -> &mut VoicePool {
        &mut self.pool
    }

    pub fn voices(&self) -> &[Voice] {
        self.pool.voices()
    }

    pub fn rejected_events(&self) -> u32 {
        self.rejected_events
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}
