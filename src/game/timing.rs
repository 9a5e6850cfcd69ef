use log::info;

use crate::error::ConfigError;

/// Converts audio clock readings into a continuous song position in beats.
///
/// Pauses are compensated by shifting `song_start` forward by the paused
/// duration, so the beat read right after `resume` equals the beat read right
/// before `pause`.
#[derive(Debug, Clone)]
pub struct BeatClock {
    bpm: f64,
    sec_per_beat: f64,
    first_beat_offset: f64,
    song_start: Option<f64>,
    paused_at: Option<f64>,
    paused_accumulated: f64,
    current_beat: f64,
}

impl BeatClock {
    pub fn new(bpm: f64, first_beat_offset: f64) -> Result<Self, ConfigError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(ConfigError::NonPositiveBpm(bpm));
        }
        if !first_beat_offset.is_finite() {
            return Err(ConfigError::NonFinite { key: "FirstBeatOffset", value: first_beat_offset });
        }
        Ok(Self {
            bpm,
            sec_per_beat: 60.0 / bpm,
            first_beat_offset,
            song_start: None,
            paused_at: None,
            paused_accumulated: 0.0,
            current_beat: 0.0,
        })
    }

    /// Marks the start of playback. Calling it twice is a no-op.
    pub fn start(&mut self, clock_now: f64) {
        if self.song_start.is_some() {
            return;
        }
        let start = clock_now - self.first_beat_offset;
        self.song_start = Some(start);
        self.current_beat = self.beat_at(clock_now);
        info!(
            "Beat clock started at dsp {:.4} (BPM {:.2}, {:.4}s per beat).",
            clock_now, self.bpm, self.sec_per_beat
        );
    }

    /// Samples the clock for this frame and returns the current beat.
    pub fn advance(&mut self, clock_now: f64) -> f64 {
        if self.paused_at.is_none() {
            self.current_beat = self.beat_at(clock_now);
        }
        self.current_beat
    }

    /// Beat position of an arbitrary clock time, e.g. an input timestamp.
    /// Frozen while paused and 0 before playback.
    pub fn beat_at(&self, clock_time: f64) -> f64 {
        match (self.song_start, self.paused_at) {
            (None, _) => 0.0,
            (Some(_), Some(_)) => self.current_beat,
            (Some(start), None) => (clock_time - start) / self.sec_per_beat,
        }
    }

    pub fn pause(&mut self, clock_now: f64) {
        if self.song_start.is_none() || self.paused_at.is_some() {
            return;
        }
        self.current_beat = self.beat_at(clock_now);
        self.paused_at = Some(clock_now);
        info!("Beat clock paused at beat {:.3}.", self.current_beat);
    }

    pub fn resume(&mut self, clock_now: f64) {
        let (Some(paused_at), Some(start)) = (self.paused_at.take(), self.song_start) else {
            return;
        };
        let pause_duration = (clock_now - paused_at).max(0.0);
        self.song_start = Some(start + pause_duration);
        self.paused_accumulated += pause_duration;
        info!(
            "Beat clock resumed after {:.3}s pause (total paused {:.3}s).",
            pause_duration, self.paused_accumulated
        );
    }

    #[inline(always)]
    pub fn current_beat(&self) -> f64 {
        self.current_beat
    }

    #[inline(always)]
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    #[inline(always)]
    pub fn sec_per_beat(&self) -> f64 {
        self.sec_per_beat
    }

    pub fn seconds_to_beats(&self, seconds: f64) -> f64 {
        seconds / self.sec_per_beat
    }

    pub fn is_started(&self) -> bool {
        self.song_start.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn paused_accumulated(&self) -> f64 {
        self.paused_accumulated
    }

    pub fn song_start(&self) -> Option<f64> {
        self.song_start
    }
}
