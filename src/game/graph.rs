use cgmath::{InnerSpace, Vector2};
use once_cell::sync::Lazy;
use std::f64::consts::FRAC_1_SQRT_2;

pub type NodeId = usize;

const DIRECTION_TOLERANCE: f64 = 1e-4;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum MovementDirection {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
    UpRight,
    UpLeft,
    DownRight,
    DownLeft,
}

impl MovementDirection {
    const CANONICAL: [MovementDirection; 8] = [
        MovementDirection::Up,
        MovementDirection::Down,
        MovementDirection::Left,
        MovementDirection::Right,
        MovementDirection::UpRight,
        MovementDirection::UpLeft,
        MovementDirection::DownRight,
        MovementDirection::DownLeft,
    ];

    /// Unit vector for the direction. `None` is the zero vector.
    pub fn vector(self) -> Vector2<f64> {
        match self {
            MovementDirection::None => Vector2::new(0.0, 0.0),
            MovementDirection::Up => Vector2::new(0.0, 1.0),
            MovementDirection::Down => Vector2::new(0.0, -1.0),
            MovementDirection::Left => Vector2::new(-1.0, 0.0),
            MovementDirection::Right => Vector2::new(1.0, 0.0),
            MovementDirection::UpRight => Vector2::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2),
            MovementDirection::UpLeft => Vector2::new(-FRAC_1_SQRT_2, FRAC_1_SQRT_2),
            MovementDirection::DownRight => Vector2::new(FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
            MovementDirection::DownLeft => Vector2::new(-FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
        }
    }

    /// Matches a displacement against the 8 compass directions. Anything
    /// else, including the zero vector, is `None`.
    pub fn from_vector(v: Vector2<f64>) -> MovementDirection {
        let len = v.magnitude();
        if !len.is_finite() || len < DIRECTION_TOLERANCE {
            return MovementDirection::None;
        }
        let unit = v / len;
        Self::CANONICAL
            .into_iter()
            .find(|d| (d.vector() - unit).magnitude() < DIRECTION_TOLERANCE)
            .unwrap_or(MovementDirection::None)
    }
}

#[derive(Clone, Debug)]
pub struct GraphNode {
    pub id: NodeId,
    pub position: Vector2<f64>,
    pub direction: MovementDirection,
    neighbors: Vec<NodeId>,
}

impl GraphNode {
    fn new(id: NodeId, x: f64, y: f64) -> Self {
        let position = Vector2::new(x, y);
        Self { id, position, direction: MovementDirection::from_vector(position), neighbors: Vec::new() }
    }

    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }
}

/// Fixed undirected graph of positions around an origin. Built once.
#[derive(Clone, Debug)]
pub struct MovementGraph {
    nodes: Vec<GraphNode>,
}

pub static MOVEMENT_GRAPH: Lazy<MovementGraph> = Lazy::new(MovementGraph::build);

// Positions indexed by node id: origin, radius 1, radius 2, radius 0.5.
const NODE_POSITIONS: [(f64, f64); 25] = [
    (0.0, 0.0),
    (1.0, 0.0),
    (0.0, 1.0),
    (-1.0, 0.0),
    (0.0, -1.0),
    (1.0, 1.0),
    (1.0, -1.0),
    (-1.0, 1.0),
    (-1.0, -1.0),
    (2.0, 0.0),
    (0.0, 2.0),
    (-2.0, 0.0),
    (0.0, -2.0),
    (2.0, 2.0),
    (2.0, -2.0),
    (-2.0, 2.0),
    (-2.0, -2.0),
    (0.0, 0.5),
    (0.0, -0.5),
    (0.5, 0.0),
    (-0.5, 0.0),
    (0.5, 0.5),
    (0.5, -0.5),
    (-0.5, 0.5),
    (-0.5, -0.5),
];

const SPIRAL_INNER_EDGES: [(NodeId, NodeId); 9] =
    [(0, 1), (1, 5), (5, 2), (2, 7), (7, 3), (3, 8), (8, 4), (4, 6), (6, 1)];

const SPIRAL_OUTER_EDGES: [(NodeId, NodeId); 9] =
    [(1, 9), (9, 13), (13, 10), (10, 15), (15, 11), (11, 16), (16, 12), (12, 14), (14, 9)];

const LAYER_CONNECTOR_EDGES: [(NodeId, NodeId); 7] =
    [(5, 13), (2, 10), (7, 15), (3, 11), (8, 16), (4, 12), (6, 14)];

// Both pattern listings repeat edges; add_edge drops the repeats.
const ZIGZAG_EDGES: [(NodeId, NodeId); 12] = [
    (0, 2),
    (2, 17),
    (17, 0),
    (0, 4),
    (4, 18),
    (18, 0),
    (0, 2),
    (2, 17),
    (17, 0),
    (0, 4),
    (4, 18),
    (18, 0),
];

const DIAGONAL_EDGES: [(NodeId, NodeId); 7] =
    [(0, 5), (5, 21), (21, 8), (8, 24), (24, 5), (5, 21), (21, 0)];

impl MovementGraph {
    fn build() -> Self {
        let nodes = NODE_POSITIONS
            .iter()
            .enumerate()
            .map(|(id, &(x, y))| GraphNode::new(id, x, y))
            .collect();
        let mut graph = Self { nodes };

        for &(a, b) in SPIRAL_INNER_EDGES
            .iter()
            .chain(&SPIRAL_OUTER_EDGES)
            .chain(&LAYER_CONNECTOR_EDGES)
            .chain(&ZIGZAG_EDGES)
            .chain(&DIAGONAL_EDGES)
        {
            graph.add_edge(a, b);
        }
        graph
    }

    fn add_edge(&mut self, a: NodeId, b: NodeId) {
        if !self.nodes[a].neighbors.contains(&b) {
            self.nodes[a].neighbors.push(b);
        }
        if !self.nodes[b].neighbors.contains(&a) {
            self.nodes[b].neighbors.push(a);
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn origin(&self) -> &GraphNode {
        &self.nodes[0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.node(a).is_some_and(|n| n.neighbors.contains(&b))
    }

    /// Direction of travel from one node to another.
    pub fn direction_between(&self, from: NodeId, to: NodeId) -> MovementDirection {
        match (self.node(from), self.node(to)) {
            (Some(a), Some(b)) => MovementDirection::from_vector(b.position - a.position),
            _ => MovementDirection::None,
        }
    }
}
