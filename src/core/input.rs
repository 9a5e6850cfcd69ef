use std::collections::VecDeque;

use crate::game::note::NoteId;

pub type LaneId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputAction {
    /// A strike aimed at a note. The device resolves the target by asking
    /// the session for its closest active candidate.
    Strike { target: NoteId },
    /// Hold key went down on a lane.
    Press { lane: LaneId },
    /// Hold key came up on a lane.
    Release { lane: LaneId },
}

#[derive(Clone, Copy, Debug)]
pub struct InputEdge {
    pub action: InputAction,
    /// Audio clock time at which the edge happened.
    pub timestamp: f64,
}

impl InputEdge {
    pub fn strike(target: NoteId, timestamp: f64) -> Self {
        Self { action: InputAction::Strike { target }, timestamp }
    }

    pub fn press(lane: LaneId, timestamp: f64) -> Self {
        Self { action: InputAction::Press { lane }, timestamp }
    }

    pub fn release(lane: LaneId, timestamp: f64) -> Self {
        Self { action: InputAction::Release { lane }, timestamp }
    }
}

/// Edges waiting for the next frame. Drained in arrival order.
#[derive(Default, Debug)]
pub struct InputQueue {
    pending: VecDeque<InputEdge>,
}

impl InputQueue {
    pub fn push(&mut self, edge: InputEdge) {
        self.pending.push_back(edge);
    }

    pub fn pop(&mut self) -> Option<InputEdge> {
        self.pending.pop_front()
    }

    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Which hold keys are currently down, one flag per lane.
#[derive(Clone, Debug)]
pub struct KeyState {
    down: Vec<bool>,
}

impl KeyState {
    pub fn new(lanes: usize) -> Self {
        Self { down: vec![false; lanes] }
    }

    pub fn set(&mut self, lane: LaneId, pressed: bool) {
        if let Some(slot) = self.down.get_mut(lane) {
            *slot = pressed;
        }
    }

    #[inline(always)]
    pub fn is_down(&self, lane: LaneId) -> bool {
        self.down.get(lane).copied().unwrap_or(false)
    }
}
