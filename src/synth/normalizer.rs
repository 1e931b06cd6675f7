//! Equal-share polyphony normalization.
//!
//! The summed peak of every counted voice stays at or below the ceiling by
//! giving each of them `ceiling / count`. When the count changes, sounding
//! voices are steered to the new share with a ramp instead of a jump.
//!
//! Every steered voice ramps over the same number of samples, so their sum
//! is a straight line from its current value to `share * steered`. Releasing
//! voices only fall, and a falling straight line that stops at zero is
//! convex. The total is therefore highest at one end of the plan. It starts
//! under the ceiling, and the plan length is chosen so it also ends there.

use crate::{
    config::VoiceCounting,
    dsp::envelope::EnvelopeConfig,
    synth::voice::Voice,
};

/// Per-voice peak for `active` counted voices. Never divides by zero.
#[inline]
pub fn fair_share(ceiling: f32, active: usize) -> f32 {
    ceiling / active.max(1) as f32
}

/// Redirect every sounding, non-releasing voice, plus the just-pressed
/// `started` voice, to the fair share for `active` voices.
///
/// All of them ramp over one common length: at least one attack, and long
/// enough that no voice moves faster than its renormalization step. Under
/// [`VoiceCounting::OnSilence`] releasing voices still hold a share, so the
/// length also stretches until their remaining level fits inside it.
///
/// Returns the plan length in samples.
pub fn renormalize(
    voices: &mut [Voice],
    active: usize,
    started: Option<usize>,
    counting: VoiceCounting,
    cfg: &EnvelopeConfig,
) -> u32 {
    let share = fair_share(cfg.ceiling, active);
    let steered = |index: usize, voice: &Voice| {
        Some(index) == started || !(voice.is_silent() || voice.is_releasing())
    };

    let mut len = cfg.attack_samples.max(1);
    for (index, voice) in voices.iter().enumerate() {
        if steered(index, voice) && !voice.is_silent() {
            len = len.max(voice.envelope().samples_to(share, active, cfg));
        }
    }

    if counting == VoiceCounting::OnSilence {
        len = release_clearance(voices, started, share, len);
    }

    for (index, voice) in voices.iter_mut().enumerate() {
        if steered(index, &*voice) {
            voice.set_envelope(voice.envelope().ramp_to(share, len));
        }
    }
    len
}

/// Shortest plan length, not below `min_len`, after which the voices still
/// releasing sit at or below their combined share.
fn release_clearance(voices: &[Voice], started: Option<usize>, share: f32, min_len: u32) -> u32 {
    let releasing = move || {
        voices
            .iter()
            .enumerate()
            .filter(move |&(index, voice)| voice.is_releasing() && Some(index) != started)
            .map(|(_, voice)| voice.envelope())
    };
    let budget = share * releasing().count() as f32;
    let level = |len: u32| releasing().map(|env| env.level_after(len)).sum::<f32>();

    if level(min_len) <= budget {
        return min_len;
    }

    // level(lo) is over budget; every release has finished by hi.
    let mut lo = min_len;
    let mut hi = releasing()
        .map(|env| env.remaining_samples())
        .max()
        .unwrap_or(min_len)
        .max(min_len);
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if level(mid) <= budget {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    hi
}
