//! Benchmarks for the analysis hot paths.

use criterion::{Criterion, criterion_group, criterion_main};
use pulso_analysis::{detect_key, detect_tempo};
use std::f32::consts::PI;

fn test_signal(seconds: f32) -> Vec<f32> {
    let sample_rate = 44100.0;
    let len = (sample_rate * seconds) as usize;
    let beat = (sample_rate * 0.5) as usize;
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate;
            let chord = (2.0 * PI * 220.0 * t).sin() * 0.3;
            let click = if i % beat < 441 { 0.6 } else { 0.0 };
            chord + click
        })
        .collect()
}

fn bench_analysis(c: &mut Criterion) {
    let signal = test_signal(30.0);

    c.bench_function("tempo_30s", |b| {
        b.iter(|| detect_tempo(&signal, 44100.0));
    });

    c.bench_function("key_30s", |b| {
        b.iter(|| detect_key(&signal, 44100.0));
    });
}

criterion_group!(benches, bench_analysis);
criterion_main!(benches);
