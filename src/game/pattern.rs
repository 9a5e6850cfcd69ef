use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::game::graph::{MOVEMENT_GRAPH, MovementDirection, MovementGraph, NodeId};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PatternKind {
    Spiral,
    Zigzag,
    Diagonal,
    BackSpiral,
}

const SPIRAL: [NodeId; 20] = [0, 1, 19, 5, 21, 2, 17, 7, 23, 3, 20, 8, 24, 4, 18, 6, 22, 1, 19, 0];
const ZIGZAG: [NodeId; 13] = [0, 17, 2, 10, 2, 17, 0, 18, 4, 12, 4, 18, 0];
const DIAGONAL: [NodeId; 13] = [0, 22, 6, 14, 6, 22, 0, 24, 7, 15, 7, 24, 0];
const BACK_SPIRAL: [NodeId; 23] =
    [0, 21, 1, 6, 4, 3, 10, 9, 12, 11, 7, 2, 7, 11, 12, 9, 10, 3, 4, 6, 1, 21, 0];

impl PatternKind {
    pub const ALL: [PatternKind; 4] =
        [PatternKind::Spiral, PatternKind::Zigzag, PatternKind::Diagonal, PatternKind::BackSpiral];

    /// The hand-authored walk for this pattern, as node ids.
    pub fn nodes(self) -> &'static [NodeId] {
        match self {
            PatternKind::Spiral => &SPIRAL,
            PatternKind::Zigzag => &ZIGZAG,
            PatternKind::Diagonal => &DIAGONAL,
            PatternKind::BackSpiral => &BACK_SPIRAL,
        }
    }
}

/// Endless stream of movement directions. A path of N nodes yields N-1
/// directions, then a new path is drawn at random. The stream can only be
/// restarted as a whole via [`MovementPatternGenerator::reset`].
#[derive(Clone, Debug)]
pub struct MovementPatternGenerator {
    graph: &'static MovementGraph,
    seed: u64,
    rng: StdRng,
    kind: PatternKind,
    index: usize,
}

impl MovementPatternGenerator {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let kind = draw_pattern(&mut rng);
        Self { graph: &*MOVEMENT_GRAPH, seed, rng, kind, index: 0 }
    }

    pub fn next_direction(&mut self) -> MovementDirection {
        let path = self.kind.nodes();
        if self.index + 1 >= path.len() {
            self.kind = draw_pattern(&mut self.rng);
            self.index = 0;
        }
        let path = self.kind.nodes();
        let (from, to) = (path[self.index], path[self.index + 1]);
        self.index += 1;

        let direction = self.graph.direction_between(from, to);
        if direction == MovementDirection::None {
            warn!(
                "{:?} path step {} -> {} is not a compass direction; note will not move.",
                self.kind, from, to
            );
        }
        direction
    }

    /// Replays the stream from the beginning.
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.kind = draw_pattern(&mut self.rng);
        self.index = 0;
    }

    pub fn current_pattern(&self) -> PatternKind {
        self.kind
    }
}

impl Iterator for MovementPatternGenerator {
    type Item = MovementDirection;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_direction())
    }
}

fn draw_pattern(rng: &mut StdRng) -> PatternKind {
    let kind = PatternKind::ALL[rng.random_range(0..PatternKind::ALL.len())];
    debug!("Drew {:?} movement path.", kind);
    kind
}
