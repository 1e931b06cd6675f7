use crate::{
    config::{SynthConfig, VoiceCounting},
    dsp::{
        envelope::{EnvelopeConfig, EnvelopePhase},
        oscillator::Waveform,
    },
    error::{ConfigError, VoiceError},
    synth::{
        message::{PoolSnapshot, VoiceMeter},
        normalizer::renormalize,
        voice::Voice,
    },
    MAX_VOICES,
};

/// Fixed set of voices, one per key, plus the count that drives the fair
/// share.
///
/// All voices are allocated up front; starting and stopping keys only moves
/// them between envelope phases. Nothing here allocates after `new`.
pub struct VoicePool {
    voices: Vec<Voice>,
    active: usize,
    counting: VoiceCounting,
    waveform: Waveform,
    envelope: EnvelopeConfig,
}

impl VoicePool {
    /// Build one voice per key. The config is validated first, so the pool
    /// never holds more voices than a `PoolSnapshot` can carry.
    pub fn new(config: &SynthConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let voices = config
            .pitches()
            .map(|pitch| Voice::new(pitch, config.sample_rate))
            .collect();

        Ok(Self {
            voices,
            active: 0,
            counting: config.voice_counting,
            waveform: config.waveform,
            envelope: config.envelope(),
        })
    }

    /// Key down on voice `index`.
    ///
    /// A silent voice fades in from zero. A voice that is still fading out
    /// is re-triggered from its current level. Any other voice is already
    /// sounding and the call is rejected.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn start_voice(&mut self, index: usize) -> Result<(), VoiceError> {
        let voice = &self.voices[index];
        let was_counted = self.is_counted(voice.phase());

        match voice.phase() {
            EnvelopePhase::Stop | EnvelopePhase::Release => {}
            _ => return Err(VoiceError::AlreadyActive(index)),
        }

        if !was_counted {
            self.active += 1;
        }

        self.rebalance(Some(index));
        self.debug_check_count();
        Ok(())
    }

    /// Key up on voice `index`: the voice fades out from where it is.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn stop_voice(&mut self, index: usize) -> Result<(), VoiceError> {
        let voice = &mut self.voices[index];
        if voice.is_silent() || voice.is_releasing() {
            return Err(VoiceError::NotSounding(index));
        }

        voice.set_envelope(voice.envelope().note_off(&self.envelope));

        if self.counting == VoiceCounting::OnKeyUp {
            self.active -= 1;
        }
        // The survivors' plan assumed this voice would keep its share; its
        // fade-out changes the sum, so plan again.
        self.rebalance(None);
        self.debug_check_count();
        Ok(())
    }

    /// Release every voice that is sounding and not already fading out.
    pub fn release_all(&mut self) {
        for index in 0..self.voices.len() {
            let voice = &self.voices[index];
            if !voice.is_silent() && !voice.is_releasing() {
                let stopped = self.stop_voice(index);
                debug_assert!(stopped.is_ok());
            }
        }
    }

    /// One sample of voice `index`: envelope step, oscillator step, waveform.
    ///
    /// # Panics
    /// If `index` is out of range.
    #[inline]
    pub fn tick_voice(&mut self, index: usize) -> f32 {
        let (out, finished) = self.advance_voice(index);
        if finished {
            self.settle_finished(1);
        }
        out
    }

    /// Sum of every sounding voice for one output sample.
    ///
    /// Releases that end during the sample are settled once every voice has
    /// ticked, so all voices are re-planned from the same instant.
    #[inline]
    pub fn mix_sample(&mut self) -> f32 {
        let mut sum = 0.0;
        let mut finished = 0;
        for index in 0..self.voices.len() {
            if !self.voices[index].is_silent() {
                let (out, done) = self.advance_voice(index);
                sum += out;
                finished += usize::from(done);
            }
        }
        if finished > 0 {
            self.settle_finished(finished);
        }
        sum
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Change fade lengths. Ramps already in flight keep their length.
    pub fn set_fades(&mut self, sample_rate: f32, attack_seconds: f32, release_seconds: f32) {
        self.envelope = EnvelopeConfig::new(
            sample_rate,
            attack_seconds,
            release_seconds,
            self.envelope.ceiling,
        );
    }

    pub fn active_voice_count(&self) -> usize {
        self.active
    }

    pub fn voice(&self, index: usize) -> &Voice {
        &self.voices[index]
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn envelope_config(&self) -> EnvelopeConfig {
        self.envelope
    }

    pub fn counting(&self) -> VoiceCounting {
        self.counting
    }

    /// Copy of every voice's meter state (no allocation).
    pub fn snapshot(&self) -> PoolSnapshot {
        let mut snapshot = PoolSnapshot {
            active: self.active.min(MAX_VOICES) as u8,
            num_voices: self.voices.len().min(MAX_VOICES) as u8,
            waveform: self.waveform,
            ..PoolSnapshot::default()
        };
        for (meter, voice) in snapshot.voices.iter_mut().zip(&self.voices) {
            *meter = VoiceMeter {
                phase: voice.phase(),
                amplitude: voice.amplitude(),
                target: voice.target(),
            };
        }
        snapshot
    }

    /// Tick one voice. Also reports whether its release just ended.
    #[inline]
    fn advance_voice(&mut self, index: usize) -> (f32, bool) {
        let voice = &mut self.voices[index];
        if voice.is_silent() {
            return (0.0, false);
        }
        let out = voice.tick(self.waveform, &self.envelope);
        (out, voice.is_silent())
    }

    /// `finished` voices fell silent this sample.
    fn settle_finished(&mut self, finished: usize) {
        if self.counting == VoiceCounting::OnSilence {
            self.active -= finished;
            self.rebalance(None);
        }
        self.debug_check_count();
    }

    fn rebalance(&mut self, started: Option<usize>) {
        renormalize(
            &mut self.voices,
            self.active,
            started,
            self.counting,
            &self.envelope,
        );
    }

    fn is_counted(&self, phase: EnvelopePhase) -> bool {
        match phase {
            EnvelopePhase::Stop => false,
            EnvelopePhase::Release => self.counting == VoiceCounting::OnSilence,
            _ => true,
        }
    }

    fn counted(&self) -> usize {
        self.voices
            .iter()
            .filter(|v| self.is_counted(v.phase()))
            .count()
    }

    #[inline]
    fn debug_check_count(&self) {
        debug_assert_eq!(self.active, self.counted(), "active voice count out of sync");
    }
}
