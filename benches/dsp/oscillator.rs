//! Benchmarks for waveform evaluation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use keytone::dsp::{PhaseAccumulator, Waveform};

use crate::BLOCK_SIZES;

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for waveform in Waveform::ALL {
            let mut acc = PhaseAccumulator::from_freq(440.0, 44_100.0);
            group.bench_with_input(BenchmarkId::new(waveform.name(), size), &size, |b, _| {
                b.iter(|| {
                    for out in buffer.iter_mut() {
                        *out = black_box(waveform).sample(acc.value());
                        acc.advance();
                    }
                    black_box(&buffer);
                })
            });
        }
    }

    group.finish();
}
