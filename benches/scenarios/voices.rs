//! Benchmarks for rendering with held chords.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use keytone::{
    dsp::Waveform,
    synth::{KeySynth, NoMessages},
    SynthConfig,
};

use crate::BLOCK_SIZES;

const HELD_KEYS: &[usize] = &[1, 4, 13];

fn synth_with(keys: usize, waveform: Waveform) -> KeySynth<NoMessages> {
    let config = SynthConfig {
        waveform,
        ..Default::default()
    };
    let mut synth = KeySynth::new(&config, NoMessages).expect("default config is valid");
    for key in 0..keys {
        let _ = synth.pool_mut().start_voice(key);
    }
    synth
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");

    for &size in BLOCK_SIZES {
        // Stereo i16, the common device format
        let mut buffer = vec![0i16; size * 2];

        for &keys in HELD_KEYS {
            let mut synth = synth_with(keys, Waveform::Sine);
            let id = format!("sine_{keys}_keys");
            group.bench_with_input(BenchmarkId::new(id, size), &size, |b, _| {
                b.iter(|| {
                    synth.render(black_box(&mut buffer), 2);
                })
            });
        }

        // Square is branch-only; isolates the envelope/mix cost
        let mut synth = synth_with(13, Waveform::Square);
        group.bench_with_input(BenchmarkId::new("square_13_keys", size), &size, |b, _| {
            b.iter(|| {
                synth.render(black_box(&mut buffer), 2);
            })
        });

        // Mono f32 output path
        let mut mono = vec![0.0f32; size];
        let mut synth = synth_with(4, Waveform::Triangle);
        group.bench_with_input(BenchmarkId::new("triangle_4_keys_f32", size), &size, |b, _| {
            b.iter(|| {
                synth.render(black_box(&mut mono), 1);
            })
        });
    }

    group.finish();
}
