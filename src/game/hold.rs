use log::{debug, info};

use crate::game::judgment::{JudgeEvent, JudgeGrade, Judgment, JudgmentWindows, Zone};
use crate::game::note::HoldNote;

pub const HOLD_TICK_FRACTION: f64 = 0.25;
/// Finest tick spacing accepted, in beats.
pub const MIN_HOLD_TICK_FRACTION: f64 = 0.01;
pub const HOLD_RELEASE_GRACE_BEATS: f64 = 1.5;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HoldMiss {
    /// Let go before the hold's full length.
    ReleasedEarly,
    /// Held past the end without letting go inside the grace window.
    ReleaseTimeout,
    /// Left the hit-zone without ever resolving.
    ExitedZone,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HoldState {
    Approaching,
    InZone,
    Holding,
    WaitingForRelease,
    Completed,
    Missed(HoldMiss),
}

impl HoldState {
    pub fn is_resolved(self) -> bool {
        matches!(self, HoldState::Completed | HoldState::Missed(_))
    }
}

/// Hold-specific timing: tick spacing and release grace, both in beats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HoldRules {
    pub tick_fraction: f64,
    pub release_grace: f64,
}

impl Default for HoldRules {
    fn default() -> Self {
        Self { tick_fraction: HOLD_TICK_FRACTION, release_grace: HOLD_RELEASE_GRACE_BEATS }
    }
}

/// Context shared by every hold transition in a frame.
#[derive(Clone, Copy, Debug)]
pub struct HoldJudge<'a> {
    pub windows: &'a JudgmentWindows,
    pub rules: &'a HoldRules,
    pub input_lag_beats: f64,
}

impl HoldJudge<'_> {
    /// Last beat at which the hold is still inside its hit-zone.
    fn zone_end(&self, hold: &HoldNote) -> f64 {
        hold.span.end + self.windows.hit_zone_trail + self.rules.release_grace
    }

    /// Zone tracking and entry. `key_down` is the lane's key state at the
    /// start of the frame.
    pub fn update_zone(&self, hold: &mut HoldNote, beat: f64, key_down: bool) {
        if hold.state.is_resolved() {
            return;
        }
        let entry = hold.span.start - self.windows.hit_zone_lead;
        hold.can_be_struck = beat >= entry && beat <= self.zone_end(hold);

        if hold.state == HoldState::Approaching && beat >= entry {
            hold.state = HoldState::InZone;
            hold.can_start_hold = !key_down;
            if key_down {
                debug!("Hold {:?} entered with key already down; hold locked until release.", hold.id);
            }
        }
        if matches!(hold.state, HoldState::Approaching | HoldState::InZone) {
            hold.zone = self.windows.zone_for(beat - hold.span.start);
        }
    }

    pub fn press(&self, hold: &mut HoldNote, event_beat: f64) -> bool {
        if hold.state != HoldState::InZone || !hold.can_start_hold {
            return false;
        }
        hold.state = HoldState::Holding;
        hold.hold_started_at = Some(event_beat);
        hold.start_zone = self.windows.zone_for(event_beat - hold.span.start);
        hold.held_beats = 0.0;
        hold.ticks_awarded = 0;
        debug!("Hold {:?} started at beat {:.3} in {:?}.", hold.id, event_beat, hold.start_zone);
        true
    }

    pub fn release(&self, hold: &mut HoldNote, event_beat: f64, out: &mut Vec<JudgeEvent>) {
        match hold.state {
            HoldState::InZone | HoldState::Approaching => {
                hold.can_start_hold = true;
            }
            HoldState::Holding => {
                let Some(started) = hold.hold_started_at else { return; };
                let held = event_beat - started;
                if held < hold.expected_beats() {
                    hold.held_beats = held;
                    self.miss(hold, HoldMiss::ReleasedEarly, out);
                } else {
                    let expected = hold.expected_beats();
                    self.award_ticks(hold, expected, out);
                    hold.wait_started_at = Some(started + expected);
                    self.finish_release(hold, event_beat, out);
                }
            }
            HoldState::WaitingForRelease => self.finish_release(hold, event_beat, out),
            HoldState::Completed | HoldState::Missed(_) => {}
        }
    }

    /// Progress, ticks, release timeout and zone exit.
    pub fn update(&self, hold: &mut HoldNote, beat: f64, out: &mut Vec<JudgeEvent>) {
        match hold.state {
            HoldState::Holding => {
                let Some(started) = hold.hold_started_at else { return; };
                let expected = hold.expected_beats();
                let held = (beat - started).max(0.0);
                hold.held_beats = held;
                self.award_ticks(hold, held.min(expected), out);
                if held >= expected {
                    hold.state = HoldState::WaitingForRelease;
                    hold.wait_started_at = Some(started + expected);
                    debug!("Hold {:?} reached full length; waiting for release.", hold.id);
                } else if beat > self.zone_end(hold) {
                    self.miss(hold, HoldMiss::ExitedZone, out);
                    return;
                }
                if hold.state == HoldState::WaitingForRelease {
                    self.check_timeout(hold, beat, out);
                }
            }
            HoldState::WaitingForRelease => self.check_timeout(hold, beat, out),
            HoldState::Approaching | HoldState::InZone => {
                if beat > self.zone_end(hold) {
                    self.miss(hold, HoldMiss::ExitedZone, out);
                }
            }
            HoldState::Completed | HoldState::Missed(_) => {}
        }
    }

    fn award_ticks(&self, hold: &mut HoldNote, progress: f64, out: &mut Vec<JudgeEvent>) {
        let step = self.rules.tick_fraction;
        if step.is_nan() || step < MIN_HOLD_TICK_FRACTION {
            return;
        }
        while f64::from(hold.ticks_awarded + 1) * step <= progress + 1e-9 {
            hold.ticks_awarded = hold.ticks_awarded.saturating_add(1);
            out.push(JudgeEvent::HoldTick { note: hold.id, lane: hold.lane });
        }
    }

    fn check_timeout(&self, hold: &mut HoldNote, beat: f64, out: &mut Vec<JudgeEvent>) {
        let Some(wait_start) = hold.wait_started_at else { return; };
        if (beat - self.input_lag_beats) - wait_start >= self.rules.release_grace {
            self.miss(hold, HoldMiss::ReleaseTimeout, out);
        }
    }

    fn finish_release(&self, hold: &mut HoldNote, event_beat: f64, out: &mut Vec<JudgeEvent>) {
        let Some(wait_start) = hold.wait_started_at else { return; };
        if (event_beat - self.input_lag_beats) - wait_start >= self.rules.release_grace {
            self.miss(hold, HoldMiss::ReleaseTimeout, out);
            return;
        }
        hold.state = HoldState::Completed;
        hold.can_be_struck = false;
        hold.can_start_hold = false;
        let offbeat = (event_beat - self.input_lag_beats) - hold.span.end;
        info!(
            "Hold {:?} completed in lane {} ({:+.4} beats, started {:?}).",
            hold.id, hold.lane, offbeat, hold.start_zone
        );
        out.push(JudgeEvent::HoldCompleted(Judgment {
            note: hold.id,
            lane: hold.lane,
            grade: JudgeGrade::Perfect,
            offbeat,
            feedback: hold.start_zone,
        }));
    }

    fn miss(&self, hold: &mut HoldNote, reason: HoldMiss, out: &mut Vec<JudgeEvent>) {
        hold.state = HoldState::Missed(reason);
        hold.can_be_struck = false;
        hold.zone = Zone::None;
        info!("Hold {:?} missed in lane {}: {:?}.", hold.id, hold.lane, reason);
        out.push(JudgeEvent::HoldMissed { note: hold.id, lane: hold.lane, reason });
    }
}
