/*
Keyboard Envelope Implementation
================================

This module implements the per-voice amplitude envelope of the keyboard
synth: a linear fade-in when a key goes down, a linear fade-out when it goes
up, and short "renormalization" ramps in between whenever the number of
sounding keys changes and every voice has to get a little louder or quieter.

Vocabulary
----------

  amplitude   The envelope's current output, in output-sample units
              (0 to the engine ceiling, e.g. 12000 for 16-bit output).

  target      The amplitude the voice is heading for or holding. Assigned on
              note-on and by the polyphony normalizer.

  phase       Which part of the envelope we are in. One tagged value,
              `EnvelopePhase`, governs how amplitude moves this sample.

  ramp        A straight line from `start` to `end` lasting `len` samples.
              Every moving phase (Attack, Release, RampUp, RampDown) is a ramp.

  step        The largest amplitude change allowed per sample for a phase.
              Ramp length is derived from it: len = ceil(distance / step).


The Shape
---------

  Amplitude
   A/1 ┐     ╱‾‾‾‾‾‾╲                      one key held
       │    ╱        ╲____________          second key joins: RampDown
   A/2 │   ╱                      ╲         second key leaves: RampUp
       │  ╱                        ‾‾‾‾‾╲
     0 └─╱───────────────────────────────╲──→ time
        Attack  Sustain RampDown  Sustain  Release


Time-Driven Ramps
-----------------

Instead of adding `step` to the amplitude every sample and checking whether
we crossed the target (which accumulates rounding error and may land one
sample early or late), each ramp counts elapsed samples and recomputes

    amplitude = start + (end - start) * elapsed / len

When `elapsed == len` the amplitude is snapped exactly to `end` and the phase
ends. An attack from silence therefore lasts exactly `attack_samples` ticks,
no matter how the floats round.

Step sizes:

    Attack     target / attack_samples
    Release    max(target, amplitude) / release_samples
    Ramp*      (target / attack_samples) / max(active - 1, 1)

Releasing in the middle of an attack reuses the attack slope in reverse, so a
voice that had faded in for k samples fades out in about k samples instead of
starting a full-length release from a partial level.

The renormalization step is divided across the other voices that are being
re-targeted at the same moment. From a settled chord the whole re-balance
then finishes in one attack time regardless of how many keys are held.

When the polyphony normalizer re-balances, it does not let each voice pick
its own ramp length. It measures the longest ramp any voice needs under the
step above, never less than one attack, and moves every voice with
`ramp_to` over that one length. Ramps that start and end together sum to a
straight line, so the summed level of the chord slides from where it is to
where it is going without bulging past either end. `level_after` lets the
normalizer look ahead along a release it does not control.


The State Machine
-----------------

            start                 elapsed = len
    ┌──────┐ ────→ ┌────────┐ ─────────────────→ ┌─────────┐
    │ Stop │       │ Attack │                    │ Sustain │ ←──┐
    └──────┘       └────────┘                    └─────────┘    │
       ↑               │ stop      retarget up/down │           │ elapsed = len
       │               ↓                            ↓           │
       │         ┌─────────┐  stop          ┌──────────────────┐│
       └──────── │ Release │ ←───────────── │ RampUp/RampDown  │┘
    elapsed=len  └─────────┘                └──────────────────┘

Stop is absorbing: advancing a stopped envelope changes nothing.
*/

const RAMP_TOLERANCE: f64 = 1e-5;

/// The current phase of the envelope state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopePhase {
    #[default]
    Stop, // silent, slot free
    Attack,   // fading in from the note-on level
    Release,  // fading out to silence
    RampUp,   // moving up to a larger fair share
    RampDown, // moving down to a smaller fair share
    Sustain,  // holding at target
}

impl EnvelopePhase {
    pub fn label(self) -> &'static str {
        match self {
            EnvelopePhase::Stop => "stop",
            EnvelopePhase::Attack => "attack",
            EnvelopePhase::Release => "release",
            EnvelopePhase::RampUp => "ramp-up",
            EnvelopePhase::RampDown => "ramp-down",
            EnvelopePhase::Sustain => "sustain",
        }
    }
}

/// Fixed timing and range parameters shared by every voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeConfig {
    pub attack_samples: u32,
    pub release_samples: u32,
    pub ceiling: f32,
}

impl EnvelopeConfig {
    pub fn new(sample_rate: f32, attack_seconds: f32, release_seconds: f32, ceiling: f32) -> Self {
        Self {
            attack_samples: fade_samples(sample_rate, attack_seconds),
            release_samples: fade_samples(sample_rate, release_seconds),
            ceiling,
        }
    }
}

/// Convert a fade time to a whole number of samples, never less than one.
pub fn fade_samples(sample_rate: f32, seconds: f32) -> u32 {
    let samples = (sample_rate as f64 * seconds as f64).round();
    if samples.is_finite() {
        samples.clamp(1.0, u32::MAX as f64) as u32
    } else {
        1
    }
}

/// Samples needed to cover `distance` without exceeding `step` per sample.
fn ramp_len(distance: f32, step: f64) -> u32 {
    let distance = distance.abs() as f64;
    if distance == 0.0 || step.is_nan() || step <= 0.0 {
        return 0;
    }
    let samples = (distance / step) * (1.0 - RAMP_TOLERANCE);
    samples.ceil().clamp(0.0, u32::MAX as f64) as u32
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Ramp {
    start: f32,
    end: f32,
    len: u32,
    elapsed: u32,
}

impl Ramp {
    const IDLE: Ramp = Ramp {
        start: 0.0,
        end: 0.0,
        len: 0,
        elapsed: 0,
    };

    fn new(start: f32, end: f32, len: u32) -> Self {
        Self {
            start,
            end,
            len,
            elapsed: 0,
        }
    }

    fn with_step(start: f32, end: f32, step: f64) -> Self {
        Self::new(start, end, ramp_len(end - start, step))
    }

    fn tick(&mut self) -> f32 {
        self.elapsed = (self.elapsed + 1).min(self.len);
        self.value_at(self.elapsed)
    }

    fn value_at(&self, elapsed: u32) -> f32 {
        if elapsed >= self.len {
            self.end
        } else {
            let progress = elapsed as f32 / self.len as f32;
            self.start + (self.end - self.start) * progress
        }
    }

    fn is_done(&self) -> bool {
        self.elapsed >= self.len
    }
}

/// One voice's envelope, advanced by pure value-to-value transitions.
///
/// Every method consumes the state and returns the next one, so the machine
/// can be driven and inspected without any audio I/O around it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeState {
    phase: EnvelopePhase,
    amplitude: f32,
    target: f32,
    ramp: Ramp,
}

impl Default for EnvelopeState {
    fn default() -> Self {
        Self::SILENT
    }
}

impl EnvelopeState {
    pub const SILENT: EnvelopeState = EnvelopeState {
        phase: EnvelopePhase::Stop,
        amplitude: 0.0,
        target: 0.0,
        ramp: Ramp::IDLE,
    };

    /// Key down: head for `target`.
    ///
    /// From Stop this is a full attack from silence. From any other phase
    /// (a re-trigger during release) the voice continues from its current
    /// amplitude, fading in, ramping down, or holding depending on where it
    /// sits relative to `target`.
    pub fn note_on(self, target: f32, cfg: &EnvelopeConfig) -> Self {
        let attack = cfg.attack_samples.max(1);

        if self.phase == EnvelopePhase::Stop {
            return Self {
                phase: EnvelopePhase::Attack,
                amplitude: 0.0,
                target,
                ramp: Ramp::new(0.0, target, attack),
            };
        }

        let step = target as f64 / attack as f64;
        let phase = if self.amplitude < target {
            EnvelopePhase::Attack
        } else if self.amplitude > target {
            EnvelopePhase::RampDown
        } else {
            EnvelopePhase::Sustain
        };

        Self {
            phase,
            amplitude: self.amplitude,
            target,
            ramp: Ramp::with_step(self.amplitude, target, step),
        }
    }

    /// Key up: fade from the current amplitude to silence.
    pub fn note_off(self, cfg: &EnvelopeConfig) -> Self {
        if matches!(self.phase, EnvelopePhase::Stop | EnvelopePhase::Release) {
            return self;
        }

        let step = self.target.max(self.amplitude) as f64 / cfg.release_samples.max(1) as f64;
        Self {
            phase: EnvelopePhase::Release,
            ramp: Ramp::with_step(self.amplitude, 0.0, step),
            ..self
        }
    }

    /// Redirect a sounding voice toward a new fair share.
    ///
    /// `active` is the number of voices counted at the moment of the change;
    /// the step is divided across the `active - 1` peers being re-targeted
    /// together. Stopped and releasing voices are left alone. When the new
    /// target equals the current amplitude the phase does not change.
    pub fn retarget(self, target: f32, active: usize, cfg: &EnvelopeConfig) -> Self {
        if matches!(self.phase, EnvelopePhase::Stop | EnvelopePhase::Release) {
            return self;
        }

        let step = renormalize_step(target, active, cfg);

        let phase = if self.amplitude > target {
            EnvelopePhase::RampDown
        } else if self.amplitude < target {
            EnvelopePhase::RampUp
        } else {
            self.phase
        };

        let ramp = if phase == EnvelopePhase::Sustain {
            Ramp::IDLE
        } else {
            Ramp::with_step(self.amplitude, target, step)
        };

        Self {
            phase,
            target,
            ramp,
            ..self
        }
    }

    /// Samples a renormalization ramp from here to `target` needs so that no
    /// sample moves further than the shared step for `active` voices.
    pub fn samples_to(&self, target: f32, active: usize, cfg: &EnvelopeConfig) -> u32 {
        ramp_len(target - self.amplitude, renormalize_step(target, active, cfg))
    }

    /// Head for `target` along a straight line lasting exactly `len` samples.
    ///
    /// This is the primitive the normalizer uses to move several voices in
    /// lockstep. A stopped envelope fades in from silence and a releasing one
    /// resumes from its current level. Any other phase becomes RampUp or
    /// RampDown. When `target` equals the current amplitude the phase is kept
    /// and the envelope settles on the next sample.
    pub fn ramp_to(self, target: f32, len: u32) -> Self {
        let amplitude = match self.phase {
            EnvelopePhase::Stop => 0.0,
            _ => self.amplitude,
        };

        let phase = match self.phase {
            EnvelopePhase::Stop | EnvelopePhase::Release if amplitude < target => {
                EnvelopePhase::Attack
            }
            _ if amplitude < target => EnvelopePhase::RampUp,
            _ if amplitude > target => EnvelopePhase::RampDown,
            EnvelopePhase::Stop | EnvelopePhase::Release => EnvelopePhase::Sustain,
            phase => phase,
        };

        let ramp = match phase {
            EnvelopePhase::Sustain => Ramp::IDLE,
            _ if amplitude == target => Ramp::new(amplitude, target, 0),
            _ => Ramp::new(amplitude, target, len.max(1)),
        };

        Self {
            phase,
            amplitude,
            target,
            ramp,
        }
    }

    /// Amplitude `samples` ticks from now if nothing else happens to this
    /// envelope.
    pub fn level_after(&self, samples: u32) -> f32 {
        match self.phase {
            EnvelopePhase::Stop => 0.0,
            EnvelopePhase::Sustain => self.amplitude,
            _ => self.ramp.value_at(self.ramp.elapsed.saturating_add(samples)),
        }
    }

    /// Ticks left in the current ramp (0 while holding or stopped).
    pub fn remaining_samples(&self) -> u32 {
        self.ramp.len.saturating_sub(self.ramp.elapsed)
    }

    /// Advance by exactly one sample.
    pub fn advance(self, cfg: &EnvelopeConfig) -> Self {
        let mut next = self;

        match self.phase {
            EnvelopePhase::Stop => return self,

            EnvelopePhase::Sustain => {
                next.amplitude = self.target;
            }

            EnvelopePhase::Attack | EnvelopePhase::RampUp | EnvelopePhase::RampDown => {
                next.amplitude = next.ramp.tick();
                if next.ramp.is_done() {
                    next.amplitude = next.target;
                    next.phase = EnvelopePhase::Sustain;
                    next.ramp = Ramp::IDLE;
                }
            }

            EnvelopePhase::Release => {
                next.amplitude = next.ramp.tick();
                if next.ramp.is_done() {
                    return Self::SILENT;
                }
            }
        }

        next.amplitude = sanitize(next.amplitude, cfg.ceiling);
        next
    }

    pub fn phase(&self) -> EnvelopePhase {
        self.phase
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Samples elapsed in the current ramp (0 while holding or stopped).
    pub fn ticks_in_phase(&self) -> u32 {
        self.ramp.elapsed
    }

    /// Total length of the current ramp in samples (0 while holding or stopped).
    pub fn phase_len(&self) -> u32 {
        self.ramp.len
    }

    pub fn is_silent(&self) -> bool {
        self.phase == EnvelopePhase::Stop
    }

    pub fn is_releasing(&self) -> bool {
        self.phase == EnvelopePhase::Release
    }
}

/// Largest per-sample change of a renormalization ramp toward `target`: the
/// attack slope, divided across the `active - 1` peers re-targeted with it.
fn renormalize_step(target: f32, active: usize, cfg: &EnvelopeConfig) -> f64 {
    let peers = active.saturating_sub(1).max(1) as f64;
    (target as f64 / cfg.attack_samples.max(1) as f64) / peers
}

/// Keep amplitude inside [0, ceiling]; NaN collapses to silence.
#[inline]
fn sanitize(amplitude: f32, ceiling: f32) -> f32 {
    if amplitude.is_nan() {
        0.0
    } else {
        amplitude.clamp(0.0, ceiling.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44_100.0;
    const CEILING: f32 = 12_000.0;

    fn reference() -> EnvelopeConfig {
        EnvelopeConfig::new(SAMPLE_RATE, 0.15, 0.15, CEILING)
    }

    fn run(mut env: EnvelopeState, cfg: &EnvelopeConfig, samples: usize) -> EnvelopeState {
        for _ in 0..samples {
            env = env.advance(cfg);
        }
        env
    }

    #[test]
    fn fade_sample_count_matches_reference() {
        assert_eq!(reference().attack_samples, 6615);
        assert_eq!(reference().release_samples, 6615);
    }

    #[test]
    fn attack_lands_on_target_after_exact_sample_count() {
        let cfg = reference();
        let env = EnvelopeState::SILENT.note_on(CEILING, &cfg);

        let almost = run(env, &cfg, 6614);
        assert!(almost.amplitude() < CEILING);
        assert_eq!(almost.phase(), EnvelopePhase::Attack);

        let done = almost.advance(&cfg);
        assert_eq!(done.amplitude(), CEILING);
        assert_eq!(done.phase(), EnvelopePhase::Sustain);
    }

    #[test]
    fn stop_is_absorbing() {
        let cfg = reference();
        let env = run(EnvelopeState::SILENT, &cfg, 1000);
        assert_eq!(env, EnvelopeState::SILENT);
    }

    #[test]
    fn release_from_sustain_reaches_silence() {
        let cfg = reference();
        let env = run(EnvelopeState::SILENT.note_on(CEILING, &cfg), &cfg, 7000);
        let env = env.note_off(&cfg);
        assert_eq!(env.phase(), EnvelopePhase::Release);

        let almost = run(env, &cfg, 6614);
        assert!(almost.amplitude() > 0.0);
        let done = almost.advance(&cfg);
        assert!(done.is_silent());
        assert_eq!(done.amplitude(), 0.0);
    }

    #[test]
    fn release_mid_attack_inverts_elapsed_time() {
        let cfg = EnvelopeConfig::new(1_000.0, 0.1, 0.1, CEILING);
        let env = run(EnvelopeState::SILENT.note_on(CEILING, &cfg), &cfg, 30);
        assert!((env.amplitude() - 3_600.0).abs() < 1e-2);

        let env = env.note_off(&cfg);
        assert_eq!(env.phase_len(), 30);

        // First release sample continues from the partial level, no jump.
        let first = env.advance(&cfg);
        assert!((env.amplitude() - first.amplitude()).abs() <= CEILING / 100.0 + 1e-2);
        assert!(run(env, &cfg, 30).is_silent());
    }

    #[test]
    fn immediate_release_stops_on_next_tick() {
        let cfg = reference();
        let env = EnvelopeState::SILENT.note_on(CEILING, &cfg).note_off(&cfg);
        let env = env.advance(&cfg);
        assert!(env.is_silent());
    }

    #[test]
    fn retarget_down_ramps_then_sustains() {
        let cfg = reference();
        let env = run(EnvelopeState::SILENT.note_on(CEILING, &cfg), &cfg, 6615);
        let env = env.retarget(CEILING / 2.0, 2, &cfg);
        assert_eq!(env.phase(), EnvelopePhase::RampDown);
        assert_eq!(env.phase_len(), 6615);

        let done = run(env, &cfg, 6615);
        assert_eq!(done.phase(), EnvelopePhase::Sustain);
        assert_eq!(done.amplitude(), CEILING / 2.0);
    }

    #[test]
    fn retarget_up_from_smaller_share() {
        let cfg = reference();
        let share = CEILING / 3.0;
        let env = run(EnvelopeState::SILENT.note_on(share, &cfg), &cfg, 6615);
        let env = env.retarget(CEILING / 2.0, 2, &cfg);
        assert_eq!(env.phase(), EnvelopePhase::RampUp);
        let done = run(env, &cfg, env.phase_len() as usize);
        assert_eq!(done.amplitude(), CEILING / 2.0);
    }

    #[test]
    fn retarget_to_current_amplitude_keeps_phase() {
        let cfg = EnvelopeConfig::new(1_000.0, 0.1, 0.1, CEILING);
        let env = run(EnvelopeState::SILENT.note_on(CEILING, &cfg), &cfg, 50);
        assert_eq!(env.amplitude(), 6_000.0);

        let env = env.retarget(6_000.0, 2, &cfg);
        assert_eq!(env.phase(), EnvelopePhase::Attack);
        assert_eq!(env.target(), 6_000.0);

        let env = env.advance(&cfg);
        assert_eq!(env.phase(), EnvelopePhase::Sustain);
        assert_eq!(env.amplitude(), 6_000.0);
    }

    #[test]
    fn retarget_ignores_releasing_and_stopped_voices() {
        let cfg = reference();
        assert_eq!(
            EnvelopeState::SILENT.retarget(100.0, 3, &cfg),
            EnvelopeState::SILENT
        );

        let releasing = run(EnvelopeState::SILENT.note_on(CEILING, &cfg), &cfg, 100).note_off(&cfg);
        assert_eq!(releasing.retarget(100.0, 3, &cfg), releasing);
    }

    #[test]
    fn ramp_step_is_shared_across_peers() {
        let cfg = reference();
        let env = run(EnvelopeState::SILENT.note_on(CEILING / 3.0, &cfg), &cfg, 6615);
        let env = env.retarget(CEILING / 4.0, 4, &cfg);
        let bound = (CEILING / cfg.attack_samples as f32) / 3.0;

        let mut prev = env;
        for _ in 0..env.phase_len() {
            let next = prev.advance(&cfg);
            assert!((next.amplitude() - prev.amplitude()).abs() <= bound * 1.0001);
            prev = next;
        }
        assert_eq!(prev.phase(), EnvelopePhase::Sustain);
    }

    #[test]
    fn retrigger_during_release_resumes_from_partial_level() {
        let cfg = reference();
        let env = run(EnvelopeState::SILENT.note_on(CEILING, &cfg), &cfg, 7000).note_off(&cfg);
        let env = run(env, &cfg, 3000);
        let level = env.amplitude();

        let env = env.note_on(CEILING, &cfg);
        assert_eq!(env.phase(), EnvelopePhase::Attack);
        assert_eq!(env.amplitude(), level);
        let next = env.advance(&cfg);
        assert!(next.amplitude() > level);
    }

    #[test]
    fn ramps_of_one_length_land_together() {
        let cfg = EnvelopeConfig::new(1_000.0, 0.1, 0.1, CEILING);
        let high = run(EnvelopeState::SILENT.note_on(CEILING, &cfg), &cfg, 80);
        let low = EnvelopeState::SILENT;

        let high = high.ramp_to(4_000.0, 170);
        let low = low.ramp_to(4_000.0, 170);
        assert_eq!(high.phase(), EnvelopePhase::RampDown);
        assert_eq!(low.phase(), EnvelopePhase::Attack);

        let (mut high, mut low) = (high, low);
        let start = high.amplitude() + low.amplitude();
        for tick in 1..=170u32 {
            high = high.advance(&cfg);
            low = low.advance(&cfg);
            let expected = start + (8_000.0 - start) * tick as f32 / 170.0;
            assert!((high.amplitude() + low.amplitude() - expected).abs() < 0.01);
        }
        assert_eq!(high.phase(), EnvelopePhase::Sustain);
        assert_eq!(low.phase(), EnvelopePhase::Sustain);
    }

    #[test]
    fn ramp_to_resumes_a_release() {
        let cfg = reference();
        let env = run(EnvelopeState::SILENT.note_on(CEILING, &cfg), &cfg, 7000).note_off(&cfg);
        let env = run(env, &cfg, 5000);
        let level = env.amplitude();

        let up = env.ramp_to(CEILING, 100);
        assert_eq!(up.phase(), EnvelopePhase::Attack);
        assert_eq!(up.amplitude(), level);

        let down = env.ramp_to(level / 2.0, 100);
        assert_eq!(down.phase(), EnvelopePhase::RampDown);
    }

    #[test]
    fn level_after_follows_the_release() {
        let cfg = EnvelopeConfig::new(1_000.0, 0.1, 0.4, CEILING);
        let env = run(EnvelopeState::SILENT.note_on(CEILING, &cfg), &cfg, 100).note_off(&cfg);
        assert_eq!(env.remaining_samples(), 400);

        assert_eq!(env.level_after(0), CEILING);
        assert_eq!(env.level_after(200), CEILING / 2.0);
        assert_eq!(env.level_after(400), 0.0);
        assert_eq!(env.level_after(u32::MAX), 0.0);
        assert_eq!(run(env, &cfg, 100).amplitude(), env.level_after(100));

        assert_eq!(EnvelopeState::SILENT.level_after(10), 0.0);
    }

    #[test]
    fn nan_amplitude_is_contained() {
        assert_eq!(sanitize(f32::NAN, CEILING), 0.0);
        assert_eq!(sanitize(-5.0, CEILING), 0.0);
        assert_eq!(sanitize(CEILING * 2.0, CEILING), CEILING);
    }
}
