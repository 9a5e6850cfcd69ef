use crate::error::ConfigError;
use crate::game::chart::HoldSpan;

/// Track scroll derived from note spacing and tempo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackScroll {
    distance_per_beat: f64,
    bpm: f64,
    spawn_adjuster: f64,
    spawn_delay: f64,
}

impl TrackScroll {
    pub fn new(
        distance_per_beat: f64,
        bpm: f64,
        spawn_adjuster: f64,
        spawn_delay: f64,
    ) -> Result<Self, ConfigError> {
        if !distance_per_beat.is_finite() || distance_per_beat <= 0.0 {
            return Err(ConfigError::NonPositiveDistancePerBeat(distance_per_beat));
        }
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(ConfigError::NonPositiveBpm(bpm));
        }
        if !spawn_adjuster.is_finite() {
            return Err(ConfigError::NonFinite { key: "NoteSpawnAdjuster", value: spawn_adjuster });
        }
        if !spawn_delay.is_finite() {
            return Err(ConfigError::NonFinite { key: "NoteSpawnDelay", value: spawn_delay });
        }
        Ok(Self { distance_per_beat, bpm, spawn_adjuster, spawn_delay })
    }

    /// Units per second the track moves at.
    #[inline(always)]
    pub fn speed(&self) -> f64 {
        self.distance_per_beat * self.bpm / 60.0
    }

    pub fn distance_per_beat(&self) -> f64 {
        self.distance_per_beat
    }

    /// Extra distance covered during the pre-roll, plus the fixed adjuster.
    pub fn spawn_offset(&self) -> f64 {
        self.spawn_adjuster + self.spawn_delay * self.speed()
    }

    /// Track coordinate at which a note for `beat` is placed.
    pub fn note_x(&self, beat: f64) -> f64 {
        -self.distance_per_beat * beat - self.spawn_offset()
    }

    /// Holds are placed at their center beat.
    pub fn hold_x(&self, span: &HoldSpan) -> f64 {
        self.note_x(span.center())
    }

    pub fn hold_length(&self, span: &HoldSpan) -> f64 {
        self.distance_per_beat * span.duration_beats()
    }
}
