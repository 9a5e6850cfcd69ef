use log::debug;
use serde::Serialize;

use crate::core::input::LaneId;
use crate::error::ConfigError;
use crate::game::hold::HoldMiss;
use crate::game::note::{BEAT_FLASH_WINDOW, Note, NoteId};

/// Timing band a note currently overlaps, judged in beats from the hit line.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Zone {
    #[default]
    None,
    Early,
    Perfect,
    Late,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum JudgeGrade {
    Early,
    Perfect,
    Late,
    Miss,
}

impl JudgeGrade {
    pub fn from_zone(zone: Zone) -> Option<JudgeGrade> {
        match zone {
            Zone::None => None,
            Zone::Early => Some(JudgeGrade::Early),
            Zone::Perfect => Some(JudgeGrade::Perfect),
            Zone::Late => Some(JudgeGrade::Late),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum NoteState {
    #[default]
    Spawned,
    Struck,
    Missed,
}

/// Window sizes in beats. Zones narrow towards the hit line: the Early and
/// Late bands surround the Perfect band, and the hit-zone covers all three.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JudgmentWindows {
    pub hit_zone_lead: f64,
    pub hit_zone_trail: f64,
    pub early: f64,
    pub perfect: f64,
    pub late: f64,
}

impl Default for JudgmentWindows {
    fn default() -> Self {
        Self { hit_zone_lead: 0.5, hit_zone_trail: 0.5, early: 0.35, perfect: 0.05, late: 0.35 }
    }
}

impl JudgmentWindows {
    pub fn new(
        hit_zone_lead: f64,
        hit_zone_trail: f64,
        early: f64,
        perfect: f64,
        late: f64,
    ) -> Result<Self, ConfigError> {
        let windows = Self { hit_zone_lead, hit_zone_trail, early, perfect, late };
        windows.validate()?;
        Ok(windows)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let all = [self.hit_zone_lead, self.hit_zone_trail, self.early, self.perfect, self.late];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::InvalidWindows(format!(
                "every window must be finite and non-negative: {self:?}"
            )));
        }
        if self.perfect <= 0.0 {
            return Err(ConfigError::InvalidWindows("perfect window must be wider than zero".into()));
        }
        if self.early < self.perfect || self.late < self.perfect {
            return Err(ConfigError::InvalidWindows(format!(
                "early ({}) and late ({}) must enclose perfect ({})",
                self.early, self.late, self.perfect
            )));
        }
        if self.hit_zone_lead < self.early || self.hit_zone_trail < self.late {
            return Err(ConfigError::InvalidWindows(format!(
                "hit-zone ({} / {}) must enclose early ({}) and late ({})",
                self.hit_zone_lead, self.hit_zone_trail, self.early, self.late
            )));
        }
        Ok(())
    }

    /// `delta` is `beat - note_beat`. A delta exactly on a boundary belongs to
    /// the inner band.
    pub fn zone_for(&self, delta: f64) -> Zone {
        if delta.abs() <= self.perfect {
            Zone::Perfect
        } else if delta < 0.0 && -delta <= self.early {
            Zone::Early
        } else if delta > 0.0 && delta <= self.late {
            Zone::Late
        } else {
            Zone::None
        }
    }

    #[inline(always)]
    pub fn in_hit_zone(&self, delta: f64) -> bool {
        delta >= -self.hit_zone_lead && delta <= self.hit_zone_trail
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Judgment {
    pub note: NoteId,
    pub lane: LaneId,
    pub grade: JudgeGrade,
    /// `(event_beat - input_lag_beats) - note_beat`.
    pub offbeat: f64,
    /// Zone shown as feedback. For holds this is the zone the hold started in.
    pub feedback: Zone,
}

/// Everything the judgment phase hands to scoring, in the order it happened.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum JudgeEvent {
    Hit(Judgment),
    Miss { note: NoteId, lane: LaneId },
    HoldTick { note: NoteId, lane: LaneId },
    HoldCompleted(Judgment),
    HoldMissed { note: NoteId, lane: LaneId, reason: HoldMiss },
    BeatFlash { note: NoteId, lane: LaneId },
}

impl JudgeEvent {
    pub fn is_miss(&self) -> bool {
        matches!(self, JudgeEvent::Miss { .. } | JudgeEvent::HoldMissed { .. })
    }
}

impl Note {
    /// Per-tick zone tracking. Emits the beat cue once and a Miss when the
    /// note leaves the hit-zone unstruck.
    pub fn update_zone(&mut self, beat: f64, windows: &JudgmentWindows, out: &mut Vec<JudgeEvent>) {
        if self.is_resolved() {
            return;
        }
        let delta = beat - self.beat;
        self.zone = windows.zone_for(delta);
        self.can_be_struck = windows.in_hit_zone(delta);

        if !self.flashed && delta.abs() <= BEAT_FLASH_WINDOW {
            self.flashed = true;
            out.push(JudgeEvent::BeatFlash { note: self.id, lane: self.lane });
        }

        if delta > windows.hit_zone_trail {
            self.state = NoteState::Missed;
            self.can_be_struck = false;
            self.zone = Zone::None;
            out.push(JudgeEvent::Miss { note: self.id, lane: self.lane });
        }
    }

    /// Judges a strike at `event_beat`. `None` means the strike did nothing:
    /// outside the hit-zone or between timing bands.
    pub fn strike(
        &mut self,
        event_beat: f64,
        input_lag_beats: f64,
        windows: &JudgmentWindows,
    ) -> Option<Judgment> {
        debug_assert!(!self.is_resolved(), "strike on resolved note {:?}", self.id);
        if self.is_resolved() {
            return None;
        }
        let delta = event_beat - self.beat;
        if !windows.in_hit_zone(delta) {
            return None;
        }
        let zone = windows.zone_for(delta);
        let grade = JudgeGrade::from_zone(zone)?;

        self.state = NoteState::Struck;
        self.zone = zone;
        self.can_be_struck = false;
        let offbeat = (event_beat - input_lag_beats) - self.beat;
        debug!("Note {:?} struck: {:?} ({:+.4} beats).", self.id, grade, offbeat);
        Some(Judgment { note: self.id, lane: self.lane, grade, offbeat, feedback: zone })
    }
}
