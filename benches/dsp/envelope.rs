//! Benchmarks for the envelope state machine.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use keytone::dsp::{EnvelopeConfig, EnvelopePhase, EnvelopeState};

use crate::BLOCK_SIZES;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");
    let cfg = EnvelopeConfig::new(44_100.0, 0.15, 0.15, 12_000.0);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Attack phase (ramping up); reset once the ramp completes
        let mut env = EnvelopeState::SILENT.note_on(12_000.0, &cfg);
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| {
                for out in buffer.iter_mut() {
                    env = env.advance(black_box(&cfg));
                    *out = env.amplitude();
                }
                if env.phase() == EnvelopePhase::Sustain {
                    env = EnvelopeState::SILENT.note_on(12_000.0, &cfg);
                }
            })
        });

        // Sustain phase (holding steady)
        let mut env = EnvelopeState::SILENT.note_on(12_000.0, &cfg);
        for _ in 0..cfg.attack_samples {
            env = env.advance(&cfg);
        }
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| {
                for out in buffer.iter_mut() {
                    env = env.advance(black_box(&cfg));
                    *out = env.amplitude();
                }
            })
        });

        // Re-targeting a held voice, as happens on every key press
        group.bench_with_input(BenchmarkId::new("retarget", size), &size, |b, _| {
            b.iter(|| {
                for (i, out) in buffer.iter_mut().enumerate() {
                    let target = if i % 2 == 0 { 6_000.0 } else { 4_000.0 };
                    *out = black_box(env)
                        .retarget(target, 3, &cfg)
                        .advance(&cfg)
                        .amplitude();
                }
            })
        });
    }

    group.finish();
}
