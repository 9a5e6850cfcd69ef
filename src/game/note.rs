use cgmath::{InnerSpace, Vector2};

use crate::core::input::LaneId;
use crate::game::chart::HoldSpan;
use crate::game::graph::MovementDirection;
use crate::game::hold::HoldState;
use crate::game::judgment::{NoteState, Zone};

/// Stable, never reused identifier. Breaks ties between notes on the same beat.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoteId(pub u64);

/// Notes never sink below this height while moving.
pub const TRACK_FLOOR_HEIGHT: f64 = 5.0;
pub const NOTE_SPAWN_HEIGHT: f64 = 10.0;
pub const HOLD_SPAWN_HEIGHT: f64 = 5.0;
/// Half-width, in beats, of the window in which a note raises its beat cue.
pub const BEAT_FLASH_WINDOW: f64 = 0.05;

#[derive(Clone, Copy, Debug)]
pub struct Motion {
    pub direction: MovementDirection,
    pub speed: f64,
    pub distance: f64,
    pub traveled: f64,
    pub offset: Vector2<f64>,
    heading: f64,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            direction: MovementDirection::None,
            speed: 0.0,
            distance: 0.0,
            traveled: 0.0,
            offset: Vector2::new(0.0, 0.0),
            heading: 1.0,
        }
    }
}

impl Motion {
    pub fn new(direction: MovementDirection, speed: f64, distance: f64) -> Self {
        Self { direction, speed, distance, ..Self::default() }
    }

    /// Moves back and forth along the direction, turning around after
    /// `distance` units or when the floor is reached.
    pub fn step(&mut self, dt: f64, base_height: f64) {
        if dt <= 0.0 || self.direction == MovementDirection::None || self.speed <= 0.0 {
            return;
        }
        let velocity = self.direction.vector() * (self.heading * self.speed);
        let delta = velocity * dt;
        self.offset += delta;
        self.traveled += delta.magnitude();

        if self.traveled >= self.distance {
            self.heading = -self.heading;
            self.traveled = 0.0;
        }

        let floor_offset = TRACK_FLOOR_HEIGHT - base_height;
        if self.offset.y < floor_offset {
            self.offset.y = floor_offset;
            if self.is_descending() {
                self.heading = -self.heading;
                self.traveled = 0.0;
            }
        }
    }

    /// True while the note is moving towards the floor.
    pub fn is_descending(&self) -> bool {
        self.heading * self.direction.vector().y < 0.0
    }
}

#[derive(Clone, Debug)]
pub struct Note {
    pub id: NoteId,
    pub lane: LaneId,
    pub beat: f64,
    pub zone: Zone,
    pub can_be_struck: bool,
    pub state: NoteState,
    pub motion: Motion,
    pub spawn_position: Vector2<f64>,
    pub flashed: bool,
}

impl Default for Note {
    fn default() -> Self {
        Self {
            id: NoteId::default(),
            lane: 0,
            beat: 0.0,
            zone: Zone::None,
            can_be_struck: false,
            state: NoteState::Spawned,
            motion: Motion::default(),
            spawn_position: Vector2::new(0.0, NOTE_SPAWN_HEIGHT),
            flashed: false,
        }
    }
}

impl Note {
    pub fn position(&self) -> Vector2<f64> {
        self.spawn_position + self.motion.offset
    }

    pub fn is_resolved(&self) -> bool {
        self.state != NoteState::Spawned
    }
}

#[derive(Clone, Debug)]
pub struct HoldNote {
    pub id: NoteId,
    pub lane: LaneId,
    pub span: HoldSpan,
    pub zone: Zone,
    pub can_be_struck: bool,
    pub state: HoldState,
    /// False when the key was already down as the hold reached the hit line.
    pub can_start_hold: bool,
    pub hold_started_at: Option<f64>,
    pub start_zone: Zone,
    pub held_beats: f64,
    pub ticks_awarded: u32,
    pub wait_started_at: Option<f64>,
    /// Holds do not move; they sit centered on their span.
    pub spawn_position: Vector2<f64>,
    pub length: f64,
}

impl Default for HoldNote {
    fn default() -> Self {
        Self {
            id: NoteId::default(),
            lane: 0,
            span: HoldSpan { start: 0.0, end: 0.0 },
            zone: Zone::None,
            can_be_struck: false,
            state: HoldState::Approaching,
            can_start_hold: true,
            hold_started_at: None,
            start_zone: Zone::None,
            held_beats: 0.0,
            ticks_awarded: 0,
            wait_started_at: None,
            spawn_position: Vector2::new(0.0, HOLD_SPAWN_HEIGHT),
            length: 0.0,
        }
    }
}

impl HoldNote {
    pub fn expected_beats(&self) -> f64 {
        self.span.duration_beats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motion_reverses_after_distance() {
        let mut motion = Motion::new(MovementDirection::Right, 1.0, 0.5);
        motion.step(0.25, NOTE_SPAWN_HEIGHT);
        assert!((motion.offset.x - 0.25).abs() < 1e-9);
        motion.step(0.25, NOTE_SPAWN_HEIGHT);
        assert!((motion.offset.x - 0.5).abs() < 1e-9);
        // Turned around.
        motion.step(0.1, NOTE_SPAWN_HEIGHT);
        assert!((motion.offset.x - 0.4).abs() < 1e-9);
    }

    #[test]
    fn motion_never_drops_below_floor() {
        let mut motion = Motion::new(MovementDirection::Down, 10.0, 100.0);
        motion.step(1.0, NOTE_SPAWN_HEIGHT);
        assert!((NOTE_SPAWN_HEIGHT + motion.offset.y - TRACK_FLOOR_HEIGHT).abs() < 1e-9);
        assert!(!motion.is_descending());
        motion.step(0.1, NOTE_SPAWN_HEIGHT);
        assert!(NOTE_SPAWN_HEIGHT + motion.offset.y > TRACK_FLOOR_HEIGHT);
    }

    #[test]
    fn no_direction_means_no_motion() {
        let mut motion = Motion::new(MovementDirection::None, 3.0, 1.0);
        motion.step(1.0, NOTE_SPAWN_HEIGHT);
        assert_eq!(motion.offset, Vector2::new(0.0, 0.0));
    }
}
