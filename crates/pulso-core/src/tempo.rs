//! Beat-length math for BPM-synced effects.

/// Musical subdivision of a beat, used by synced delay times and loop
/// lengths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoteDivision {
    /// Whole note (4 beats).
    Whole,
    /// Half note (2 beats).
    Half,
    /// Quarter note (1 beat).
    #[default]
    Quarter,
    /// Eighth note (1/2 beat).
    Eighth,
    /// Sixteenth note (1/4 beat).
    Sixteenth,
    /// Dotted eighth (3/4 beat), the classic DJ delay setting.
    DottedEighth,
    /// Triplet eighth (1/3 beat).
    TripletEighth,
}

impl NoteDivision {
    /// Number of beats this division spans.
    pub fn beats(self) -> f32 {
        match self {
            NoteDivision::Whole => 4.0,
            NoteDivision::Half => 2.0,
            NoteDivision::Quarter => 1.0,
            NoteDivision::Eighth => 0.5,
            NoteDivision::Sixteenth => 0.25,
            NoteDivision::DottedEighth => 0.75,
            NoteDivision::TripletEighth => 1.0 / 3.0,
        }
    }

    /// Duration in milliseconds at the given tempo.
    pub fn to_ms(self, bpm: f32) -> f32 {
        self.beats() * 60000.0 / bpm.max(1.0)
    }

    /// Duration in samples at the given tempo and sample rate.
    pub fn to_samples(self, bpm: f32, sample_rate: f32) -> f32 {
        self.to_ms(bpm) * 1e-3 * sample_rate
    }

    /// Map a subdivision count (1 = quarter, 2 = eighth, 4 = sixteenth…)
    /// onto a division. Used when a controller sends a raw subdivision.
    pub fn from_subdivision(subdivision: u32) -> Self {
        match subdivision {
            0 | 1 => NoteDivision::Quarter,
            2 => NoteDivision::Eighth,
            3 => NoteDivision::TripletEighth,
            4 => NoteDivision::Sixteenth,
            _ => NoteDivision::Sixteenth,
        }
    }
}

/// Shared tempo state for the chain engine.
///
/// Holds the global BPM and answers beat-length queries. A plain value
/// object passed where needed; tempo changes are broadcast to synced effects
/// by the chain engine, not observed through globals.
#[derive(Debug, Clone)]
pub struct TempoClock {
    bpm: f32,
    sample_rate: f32,
}

impl TempoClock {
    /// Create a clock at the given tempo.
    pub fn new(sample_rate: f32, bpm: f32) -> Self {
        Self {
            bpm: bpm.max(1.0),
            sample_rate,
        }
    }

    /// Set the tempo in BPM (floored at 1).
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm.max(1.0);
    }

    /// Current tempo.
    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// One beat in milliseconds.
    pub fn beat_ms(&self) -> f32 {
        60000.0 / self.bpm
    }

    /// One beat in samples.
    pub fn beat_samples(&self) -> f32 {
        self.beat_ms() * 1e-3 * self.sample_rate
    }

    /// A division's length in milliseconds at the current tempo.
    pub fn division_ms(&self, division: NoteDivision) -> f32 {
        division.to_ms(self.bpm)
    }

    /// A division's length in samples at the current tempo.
    pub fn division_samples(&self, division: NoteDivision) -> f32 {
        division.to_samples(self.bpm, self.sample_rate)
    }
}

impl Default for TempoClock {
    fn default() -> Self {
        Self::new(48000.0, 120.0)
    }
}
