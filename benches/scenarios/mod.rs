//! Real-world scenario benchmarks.
//!
//! These render whole blocks through `KeySynth` the way the audio callback
//! does, with a growing number of held keys.

mod voices;

pub use voices::bench_voices;
