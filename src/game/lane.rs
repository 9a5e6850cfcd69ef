use cgmath::Vector2;
use log::{debug, warn};

use crate::core::input::LaneId;
use crate::core::pool::{Handle, Pool};
use crate::game::chart::LaneChart;
use crate::game::difficulty::DifficultyModel;
use crate::game::hold::HoldJudge;
use crate::game::judgment::{JudgeEvent, JudgmentWindows};
use crate::game::note::{HOLD_SPAWN_HEIGHT, HoldNote, Motion, NOTE_SPAWN_HEIGHT, Note, NoteId};
use crate::game::pattern::MovementPatternGenerator;
use crate::game::scores::ComboState;
use crate::game::scroll::TrackScroll;
use crate::game::targets::TargetSet;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpawnKind {
    Note,
    Hold { end: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spawn {
    pub id: NoteId,
    pub lane: LaneId,
    pub beat: f64,
    pub kind: SpawnKind,
}

/// Everything a lane needs to turn a timestamp into a live entity.
pub struct SpawnContext<'a> {
    pub notes: &'a mut Pool<Note>,
    pub holds: &'a mut Pool<HoldNote>,
    pub targets: &'a mut TargetSet,
    pub generator: &'a mut MovementPatternGenerator,
    pub difficulty: &'a DifficultyModel,
    pub combo: &'a ComboState,
    pub scroll: &'a TrackScroll,
    pub lookahead: f64,
    pub next_id: &'a mut u64,
}

impl SpawnContext<'_> {
    fn allocate_id(&mut self) -> NoteId {
        let id = NoteId(*self.next_id);
        *self.next_id += 1;
        id
    }
}

/// One lane's schedule plus the entities it currently owns.
#[derive(Debug)]
pub struct Lane {
    id: LaneId,
    chart: LaneChart,
    next_note: usize,
    next_hold: usize,
    active_notes: Vec<Handle>,
    active_holds: Vec<Handle>,
}

impl Lane {
    pub fn new(id: LaneId, chart: LaneChart) -> Self {
        Self {
            id,
            chart,
            next_note: 0,
            next_hold: 0,
            active_notes: Vec::new(),
            active_holds: Vec::new(),
        }
    }

    pub fn id(&self) -> LaneId {
        self.id
    }

    /// Spawns every timestamp that has come within the lookahead window.
    /// Cursors only move forward, so nothing is spawned twice. A timestamp
    /// whose spawn fails for lack of pooled entities is skipped for good.
    pub fn schedule(&mut self, beat: f64, ctx: &mut SpawnContext<'_>, spawned: &mut Vec<Spawn>) {
        let horizon = beat + ctx.lookahead;

        while let Some(&ts) = self.chart.notes.get(self.next_note) {
            if ts >= horizon {
                break;
            }
            self.next_note += 1;
            if let Some(spawn) = self.spawn_note(ts, ctx) {
                spawned.push(spawn);
            }
        }

        while let Some(&span) = self.chart.holds.get(self.next_hold) {
            if span.start >= horizon {
                break;
            }
            self.next_hold += 1;
            let Some(handle) = ctx.holds.acquire() else {
                continue;
            };
            let id = ctx.allocate_id();
            let Some(hold) = ctx.holds.get_mut(handle) else {
                continue;
            };
            hold.id = id;
            hold.lane = self.id;
            hold.span = span;
            hold.spawn_position = Vector2::new(ctx.scroll.hold_x(&span), HOLD_SPAWN_HEIGHT);
            hold.length = ctx.scroll.hold_length(&span);
            self.active_holds.push(handle);
            debug!("Lane {}: spawned hold {:?} {:.3}..{:.3}.", self.id, id, span.start, span.end);
            spawned.push(Spawn { id, lane: self.id, beat: span.start, kind: SpawnKind::Hold { end: span.end } });
        }
    }

    fn spawn_note(&mut self, beat: f64, ctx: &mut SpawnContext<'_>) -> Option<Spawn> {
        let handle = ctx.notes.acquire()?;
        let id = ctx.allocate_id();
        let direction = ctx.generator.next_direction();
        let speed = ctx.difficulty.movement_speed(ctx.combo);
        let distance = ctx.difficulty.movement_distance(ctx.combo);
        let note = ctx.notes.get_mut(handle)?;
        note.id = id;
        note.lane = self.id;
        note.beat = beat;
        note.motion = Motion::new(direction, speed, distance);
        note.spawn_position = Vector2::new(ctx.scroll.note_x(beat), NOTE_SPAWN_HEIGHT);
        ctx.targets.insert(id, beat, self.id, handle);
        self.active_notes.push(handle);
        debug!(
            "Lane {}: spawned note {:?} at beat {:.3} ({:?}, speed {:.3}, distance {:.3}).",
            self.id, id, beat, direction, speed, distance
        );
        Some(Spawn { id, lane: self.id, beat, kind: SpawnKind::Note })
    }

    /// Motion and zone tracking for regular notes. Notes that leave the
    /// hit-zone unstruck are missed and stop being strike candidates.
    pub fn update_notes(
        &self,
        beat: f64,
        dt: f64,
        windows: &JudgmentWindows,
        notes: &mut Pool<Note>,
        targets: &mut TargetSet,
        out: &mut Vec<JudgeEvent>,
    ) {
        for &handle in &self.active_notes {
            let Some(note) = notes.get_mut(handle) else { continue; };
            if note.is_resolved() {
                continue;
            }
            note.motion.step(dt, NOTE_SPAWN_HEIGHT);
            note.update_zone(beat, windows, out);
            if note.is_resolved() {
                targets.remove(note.id, note.beat);
            }
        }
    }

    pub fn update_hold_zones(&self, beat: f64, judge: &HoldJudge<'_>, holds: &mut Pool<HoldNote>, key_down: bool) {
        for &handle in &self.active_holds {
            if let Some(hold) = holds.get_mut(handle) {
                judge.update_zone(hold, beat, key_down);
            }
        }
    }

    /// Starts the earliest hold that accepts a press. Returns whether one did.
    pub fn press(&self, event_beat: f64, judge: &HoldJudge<'_>, holds: &mut Pool<HoldNote>) -> bool {
        for &handle in &self.active_holds {
            if let Some(hold) = holds.get_mut(handle) {
                if judge.press(hold, event_beat) {
                    return true;
                }
            }
        }
        false
    }

    pub fn release(
        &self,
        event_beat: f64,
        judge: &HoldJudge<'_>,
        holds: &mut Pool<HoldNote>,
        out: &mut Vec<JudgeEvent>,
    ) {
        for &handle in &self.active_holds {
            if let Some(hold) = holds.get_mut(handle) {
                judge.release(hold, event_beat, out);
            }
        }
    }

    pub fn update_holds(
        &self,
        beat: f64,
        judge: &HoldJudge<'_>,
        holds: &mut Pool<HoldNote>,
        out: &mut Vec<JudgeEvent>,
    ) {
        for &handle in &self.active_holds {
            if let Some(hold) = holds.get_mut(handle) {
                judge.update(hold, beat, out);
            }
        }
    }

    /// Hands resolved entities back to their pools. Returns how many went back.
    pub fn sweep(&mut self, notes: &mut Pool<Note>, holds: &mut Pool<HoldNote>) -> usize {
        let mut released = 0;
        self.active_notes.retain(|&handle| {
            let resolved = notes.get(handle).is_none_or(|n| n.is_resolved());
            if resolved {
                match notes.release(handle) {
                    Ok(()) => released += 1,
                    Err(e) => warn!("Lane {}: could not return note: {}", self.id, e),
                }
            }
            !resolved
        });
        self.active_holds.retain(|&handle| {
            let resolved = holds.get(handle).is_none_or(|h| h.state.is_resolved());
            if resolved {
                match holds.release(handle) {
                    Ok(()) => released += 1,
                    Err(e) => warn!("Lane {}: could not return hold: {}", self.id, e),
                }
            }
            !resolved
        });
        released
    }

    pub fn active_count(&self) -> usize {
        self.active_notes.len() + self.active_holds.len()
    }

    pub fn active_notes(&self) -> &[Handle] {
        &self.active_notes
    }

    pub fn active_holds(&self) -> &[Handle] {
        &self.active_holds
    }

    /// Every timestamp spawned and every spawned entity resolved.
    pub fn is_finished(&self) -> bool {
        self.next_note >= self.chart.notes.len()
            && self.next_hold >= self.chart.holds.len()
            && self.active_notes.is_empty()
            && self.active_holds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::chart::HoldSpan;
    use crate::game::difficulty::DifficultyTier;

    struct Rig {
        notes: Pool<Note>,
        holds: Pool<HoldNote>,
        targets: TargetSet,
        generator: MovementPatternGenerator,
        difficulty: DifficultyModel,
        combo: ComboState,
        scroll: TrackScroll,
        next_id: u64,
    }

    impl Rig {
        fn new(note_capacity: usize) -> Self {
            Self {
                notes: Pool::new("notes", note_capacity).unwrap(),
                holds: Pool::new("holds", 4).unwrap(),
                targets: TargetSet::default(),
                generator: MovementPatternGenerator::new(1),
                difficulty: DifficultyModel::new(DifficultyTier::Normal),
                combo: ComboState::default(),
                scroll: TrackScroll::new(2.0, 120.0, 0.0, 5.0).unwrap(),
                next_id: 0,
            }
        }

        fn schedule(&mut self, lane: &mut Lane, beat: f64) -> Vec<Spawn> {
            let mut ctx = SpawnContext {
                notes: &mut self.notes,
                holds: &mut self.holds,
                targets: &mut self.targets,
                generator: &mut self.generator,
                difficulty: &self.difficulty,
                combo: &self.combo,
                scroll: &self.scroll,
                lookahead: 4.0,
                next_id: &mut self.next_id,
            };
            let mut out = Vec::new();
            lane.schedule(beat, &mut ctx, &mut out);
            out
        }
    }

    fn chart(notes: &[f64], holds: &[(f64, f64)]) -> LaneChart {
        LaneChart {
            notes: notes.to_vec(),
            holds: holds.iter().map(|&(start, end)| HoldSpan { start, end }).collect(),
        }
    }

    #[test]
    fn spawns_within_lookahead_once() {
        let mut rig = Rig::new(8);
        let mut lane = Lane::new(0, chart(&[2.0, 6.0, 10.0], &[(5.0, 7.0)]));

        let first = rig.schedule(&mut lane, 0.0);
        assert_eq!(first.iter().map(|s| s.beat).collect::<Vec<_>>(), vec![2.0]);

        let second = rig.schedule(&mut lane, 2.5);
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].beat, 6.0);
        assert_eq!(second[1].kind, SpawnKind::Hold { end: 7.0 });

        assert!(rig.schedule(&mut lane, 2.5).is_empty());
        // Strictly below the horizon: beat 10 needs current beat > 6.
        assert!(rig.schedule(&mut lane, 6.0).is_empty());
        assert_eq!(rig.schedule(&mut lane, 6.01).len(), 1);
        assert_eq!(rig.targets.len(), 3);
    }

    #[test]
    fn exhausted_pool_skips_without_stalling() {
        let mut rig = Rig::new(1);
        let mut lane = Lane::new(0, chart(&[1.0, 1.5, 2.0], &[]));
        let spawned = rig.schedule(&mut lane, 0.0);
        assert_eq!(spawned.len(), 1);
        assert_eq!(rig.notes.in_use(), 1);
        // The skipped timestamps are not retried.
        assert!(rig.schedule(&mut lane, 0.5).is_empty());
    }

    #[test]
    fn missed_notes_are_swept_back_to_the_pool() {
        let mut rig = Rig::new(4);
        let windows = JudgmentWindows::default();
        let mut lane = Lane::new(0, chart(&[1.0], &[]));
        rig.schedule(&mut lane, 0.0);
        assert_eq!(rig.notes.available(), 3);

        let mut events = Vec::new();
        lane.update_notes(1.6, 0.1, &windows, &mut rig.notes, &mut rig.targets, &mut events);
        assert!(events.iter().any(|e| e.is_miss()));
        assert!(rig.targets.is_empty());

        assert_eq!(lane.sweep(&mut rig.notes, &mut rig.holds), 1);
        assert_eq!(rig.notes.available(), 4);
        assert!(lane.is_finished());
    }
}
