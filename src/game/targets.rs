use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::core::input::LaneId;
use crate::core::pool::Handle;
use crate::game::note::NoteId;

/// Beat wrapper with a total order so it can key a `BTreeMap`.
#[derive(Clone, Copy, Debug)]
pub struct BeatKey(pub f64);

impl PartialEq for BeatKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BeatKey {}

impl PartialOrd for BeatKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BeatKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub id: NoteId,
    pub beat: f64,
    pub lane: LaneId,
    pub handle: Handle,
}

/// Active regular notes ordered by `(beat, id)`. The first entry is the
/// closest candidate for a strike.
#[derive(Debug, Default)]
pub struct TargetSet {
    entries: BTreeMap<(BeatKey, NoteId), (LaneId, Handle)>,
}

impl TargetSet {
    pub fn insert(&mut self, id: NoteId, beat: f64, lane: LaneId, handle: Handle) {
        self.entries.insert((BeatKey(beat), id), (lane, handle));
    }

    pub fn remove(&mut self, id: NoteId, beat: f64) -> bool {
        self.entries.remove(&(BeatKey(beat), id)).is_some()
    }

    pub fn closest(&self) -> Option<Target> {
        self.entries
            .first_key_value()
            .map(|(&(BeatKey(beat), id), &(lane, handle))| Target { id, beat, lane, handle })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
