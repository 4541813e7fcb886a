//! Full-pipeline analysis scenarios.

use pulso_analysis::{AnalysisCache, analyze};
use pulso_core::PcmBuffer;
use std::f32::consts::PI;

/// Click track plus a sustained chord, the shape of a minimal dance loop.
fn synthetic_track(bpm: f32, sample_rate: f32, seconds: f32) -> PcmBuffer {
    let len = (sample_rate * seconds) as usize;
    let beat = (sample_rate * 60.0 / bpm) as usize;
    let click_len = (sample_rate * 0.01) as usize;

    let mut left = vec![0.0f32; len];
    for (i, sample) in left.iter_mut().enumerate() {
        let t = i as f32 / sample_rate;
        // A minor chord bed, tonic emphasized.
        *sample = (2.0 * PI * 220.0 * t).sin() * 0.25
            + (2.0 * PI * 261.63 * t).sin() * 0.15
            + (2.0 * PI * 329.63 * t).sin() * 0.15;
    }
    let mut pos = 0;
    while pos < len {
        for i in 0..click_len.min(len - pos) {
            left[pos + i] += 0.7;
        }
        pos += beat;
    }
    let right = left.clone();
    PcmBuffer::stereo(sample_rate, left, right)
}

#[test]
fn full_report_on_synthetic_track() {
    let buffer = synthetic_track(120.0, 44100.0, 12.0);
    let report = analyze(&buffer);

    assert!(report.analyzed);
    assert!(
        (report.bpm as i64 - 120).unsigned_abs() <= 1,
        "bpm {}",
        report.bpm
    );
    assert_eq!(report.key, "Am");
    assert_eq!(report.camelot_key, "8A");
    assert!((1..=10).contains(&report.energy));
    assert!(report.error.is_none());
    assert!(!report.bpm_candidates.is_empty());
}

#[test]
fn flat_track_degrades_gracefully() {
    let buffer = PcmBuffer::mono(48000.0, vec![0.2; 48000 * 6]);
    let report = analyze(&buffer);

    assert!(report.analyzed);
    assert_eq!(report.bpm, 120, "fallback tempo expected");
    assert!(report.bpm_confidence < 0.2);
}

#[test]
fn cache_round_trip() {
    let buffer = synthetic_track(120.0, 44100.0, 8.0);
    let mut cache = AnalysisCache::new();

    let first = cache
        .get_or_insert_with("tracks/demo.wav", || analyze(&buffer))
        .clone();
    // Second lookup must not recompute.
    let second = cache
        .get_or_insert_with("tracks/demo.wav", || panic!("cache miss"))
        .clone();
    assert_eq!(first, second);
}

#[test]
fn stereo_and_mono_fold_agree() {
    let stereo = synthetic_track(128.0, 44100.0, 8.0);
    let mono = PcmBuffer::mono(44100.0, stereo.fold_mono());
    let a = analyze(&stereo);
    let b = analyze(&mono);
    assert_eq!(a.bpm, b.bpm);
    assert_eq!(a.key, b.key);
}
