#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::f32::consts::TAU;

/*
Keyboard Oscillator
===================

Every key owns one oscillator running at a fixed pitch. The oscillator is
split into two independent pieces:

  phase accumulator   Where we are inside one period, as a fraction in
                      [0, 1). Advanced once per sample by

                          increment = pitch_hz / sample_rate

                      and wrapped back into range when it crosses 1.0.

  waveform            A pure function from that fraction to a sample in
                      [-1, 1]. No state, so the same shape table can be
                      shared by every voice and swapped between blocks.


Shapes (one period, phase 0 → 1)
--------------------------------

  Sine       sin(2π·p)              0 at p=0 and p=0.5, +1 at p=0.25

  Triangle   1 − 2·|2·p − 1|        −1 at p=0, +1 at p=0.5,
                                    zero crossings at p=0.25 and p=0.75

  Square     +1 for p < 0.5         hard edge at p=0.5
             −1 otherwise


Why reset the phase?
--------------------

When a voice finishes its release we put the accumulator back to 0. The next
note on that key then always starts at the same point of the wave, so two
presses of the same key sound identical instead of starting at whatever
phase the previous note happened to stop on.
*/

/// The periodic shape rendered by every voice of an engine.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Triangle,
    Square,
}

impl Waveform {
    pub const ALL: [Waveform; 3] = [Waveform::Sine, Waveform::Triangle, Waveform::Square];

    /// Evaluate the shape at `phase` (expected in [0, 1)).
    #[inline]
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Triangle => 1.0 - 2.0 * (2.0 * phase - 1.0).abs(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }

    /// The shape after this one, wrapping around. Used by the UI to cycle shapes.
    pub fn next(self) -> Self {
        match self {
            Waveform::Sine => Waveform::Triangle,
            Waveform::Triangle => Waveform::Square,
            Waveform::Square => Waveform::Sine,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Triangle => "triangle",
            Waveform::Square => "square",
        }
    }
}

/// Running fractional position within one waveform period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseAccumulator {
    value: f32,
    increment: f32,
}

impl PhaseAccumulator {
    pub fn new(increment: f32) -> Self {
        Self {
            value: 0.0,
            increment,
        }
    }

    /// Accumulator for a tone of `frequency` Hz at `sample_rate`.
    pub fn from_freq(frequency: f32, sample_rate: f32) -> Self {
        Self::new(frequency / sample_rate)
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn increment(&self) -> f32 {
        self.increment
    }

    /// Step forward one sample, wrapping into [0, 1).
    #[inline]
    pub fn advance(&mut self) {
        self.value += self.increment;
        if self.value >= 1.0 {
            self.value -= self.value.floor();
        }
        // A NaN or negative value can only come from a corrupt increment.
        if !(0.0..1.0).contains(&self.value) {
            self.value = 0.0;
        }
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}
