pub mod enumerate;

use glam::Vec3;

use crate::graph::{Color, NodeId};
use crate::sight::Hit;

/// Ordered segment endpoints. Matching is usually side-independent, see
/// [`SegmentKey::matches_sides`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SegmentKey {
    pub start: NodeId,
    pub end: NodeId,
}

impl SegmentKey {
    pub fn new(start: NodeId, end: NodeId) -> Self {
        Self { start, end }
    }

    pub fn reversed(self) -> Self {
        Self {
            start: self.end,
            end: self.start,
        }
    }

    pub fn matches_sides(self, other: Self) -> bool {
        self == other || self == other.reversed()
    }

    pub fn shares_endpoint(self, other: Self) -> bool {
        self.start == other.start
            || self.start == other.end
            || self.end == other.start
            || self.end == other.end
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentState {
    Free,
    PhysicalBlocker,
    Conflict,
    Blocker,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub start: NodeId,
    pub end: NodeId,
    pub start_point: Vec3,
    pub end_point: Vec3,
    pub color: Color,
    pub state: SegmentState,
    pub block: Option<Hit>,
}

impl Segment {
    pub fn free(start: NodeId, end: NodeId, start_point: Vec3, end_point: Vec3, color: Color) -> Self {
        Self {
            start,
            end,
            start_point,
            end_point,
            color,
            state: SegmentState::Free,
            block: None,
        }
    }

    pub fn key(&self) -> SegmentKey {
        SegmentKey::new(self.start, self.end)
    }

    pub fn length(&self) -> f32 {
        self.start_point.distance(self.end_point)
    }

    pub fn set_block(&mut self, state: SegmentState, hit: Hit) {
        self.state = state;
        self.block = Some(hit);
    }

    pub fn matches_sides(&self, other: &Segment) -> bool {
        self.key().matches_sides(other.key())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathStatus {
    Complete,
    Incomplete,
    Blocked,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockReason {
    None,
    PhysicalObstacle,
    LineIntersection,
    LogicalConflict,
    LogicalBlock,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub source: NodeId,
    pub segments: Vec<Segment>,
    pub status: PathStatus,
    pub block_reason: BlockReason,
}

impl Path {
    pub fn mark_blocked(&mut self, reason: BlockReason) {
        self.status = PathStatus::Blocked;
        self.block_reason = reason;
    }

    pub fn last_node(&self) -> Option<NodeId> {
        self.segments.last().map(|segment| segment.end)
    }

    /// Far terminal of a complete path (the target or opposing source it
    /// reached), `None` otherwise.
    pub fn terminal(&self) -> Option<NodeId> {
        if self.status == PathStatus::Complete {
            self.last_node()
        } else {
            None
        }
    }
}

/// True when `needle` appears as a contiguous sub-chain of `haystack`,
/// compared side-independently segment by segment.
pub fn chain_contains(haystack: &[Segment], needle: &[Segment]) -> bool {
    if needle.is_empty() {
        return true;
    }
    if haystack.len() < needle.len() {
        return false;
    }

    for offset in 0..=(haystack.len() - needle.len()) {
        if needle
            .iter()
            .enumerate()
            .all(|(i, segment)| haystack[offset + i].matches_sides(segment))
        {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Color, NodeGraph};
    use glam::vec3;

    fn chain(graph: &NodeGraph, nodes: &[NodeId]) -> Vec<Segment> {
        nodes
            .windows(2)
            .map(|pair| {
                Segment::free(
                    pair[0],
                    pair[1],
                    graph.position(pair[0]),
                    graph.position(pair[1]),
                    Color::Red,
                )
            })
            .collect()
    }

    #[test]
    fn segment_matching_is_side_independent() {
        let mut graph = NodeGraph::new();
        let a = graph.add_connector(vec3(0.0, 0.0, 0.0));
        let b = graph.add_connector(vec3(1.0, 0.0, 0.0));

        let forward = Segment::free(a, b, graph.position(a), graph.position(b), Color::Red);
        let backward = Segment::free(b, a, graph.position(b), graph.position(a), Color::Blue);

        assert!(forward.matches_sides(&backward));
        assert!(SegmentKey::new(a, b).matches_sides(SegmentKey::new(b, a)));
        assert!(!SegmentKey::new(a, b).shares_endpoint(SegmentKey::new(
            graph.add_connector(vec3(2.0, 0.0, 0.0)),
            graph.add_connector(vec3(3.0, 0.0, 0.0)),
        )));
    }

    #[test]
    fn chain_containment_ignores_direction() {
        let mut graph = NodeGraph::new();
        let nodes: Vec<_> = (0..4)
            .map(|i| graph.add_connector(vec3(i as f32, 0.0, 0.0)))
            .collect();

        let long = chain(&graph, &nodes);
        let mid_reversed = chain(&graph, &[nodes[2], nodes[1]]);

        assert!(chain_contains(&long, &mid_reversed));
        assert!(chain_contains(&long, &[]));
        assert!(!chain_contains(&mid_reversed, &long));

        let far_a = graph.add_connector(vec3(9.0, 0.0, 0.0));
        let far_b = graph.add_connector(vec3(10.0, 0.0, 0.0));
        let elsewhere = chain(&graph, &[far_a, far_b]);
        assert!(!chain_contains(&long, &elsewhere));
    }
}
