//! Logical conflicts: two differently-colored beams meeting head-on over
//! one connected chain cannot share the middle position. An odd chain
//! blocks its middle node, an even chain blocks its middle segment.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use crate::graph::{NodeGraph, NodeId, NodeKind};
use crate::interception::InterceptionInfo;
use crate::path::SegmentKey;
use crate::path::enumerate::paths_between;
use crate::sight::SightCache;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConflictSets {
    pub blocked_nodes: BTreeSet<NodeId>,
    pub blocked_segments: Vec<SegmentKey>,
}

impl ConflictSets {
    pub fn segment_blocked(&self, key: SegmentKey) -> bool {
        self.blocked_segments
            .iter()
            .any(|blocked| blocked.matches_sides(key))
    }
}

/// Walk every simple chain between each differently-colored source pair,
/// shortest first, and block its midpoint. A chain routed through another
/// terminal is no candidate: both beams end there and never meet beyond it.
/// Chains already cut somewhere (physically, by an interception, or by an
/// earlier conflict) are left alone for the same reason.
pub fn detect_conflicts(
    graph: &NodeGraph,
    sources: &[NodeId],
    interceptions: &HashMap<SegmentKey, InterceptionInfo>,
    sight: &mut SightCache,
) -> ConflictSets {
    let mut sets = ConflictSets::default();

    for (index, &a) in sources.iter().enumerate() {
        for &b in &sources[index + 1..] {
            let color_a = graph.node(a).and_then(|node| node.source_color());
            let color_b = graph.node(b).and_then(|node| node.source_color());
            let (Some(color_a), Some(color_b)) = (color_a, color_b) else {
                continue;
            };
            if color_a == color_b {
                continue;
            }

            let mut chains = paths_between(graph, a, b);
            chains.sort_by_key(|chain| chain.len());

            for chain in &chains {
                if passes_through_terminal(graph, chain) {
                    continue;
                }
                if chain_is_cut(graph, chain, interceptions, sight, &sets) {
                    continue;
                }
                block_midpoint(chain, &mut sets);
            }
        }
    }

    sets
}

fn passes_through_terminal(graph: &NodeGraph, chain: &[NodeId]) -> bool {
    chain.len() > 2
        && chain[1..chain.len() - 1].iter().any(|&node| {
            graph
                .node(node)
                .is_some_and(|node| !matches!(node.kind, NodeKind::Connector))
        })
}

fn chain_is_cut(
    graph: &NodeGraph,
    chain: &[NodeId],
    interceptions: &HashMap<SegmentKey, InterceptionInfo>,
    sight: &mut SightCache,
    sets: &ConflictSets,
) -> bool {
    if chain.iter().any(|node| sets.blocked_nodes.contains(node)) {
        return true;
    }

    for pair in chain.windows(2) {
        let key = SegmentKey::new(pair[0], pair[1]);
        if sight.check(graph, pair[0], pair[1]).is_some() {
            return true;
        }
        if interceptions.contains_key(&key) || interceptions.contains_key(&key.reversed()) {
            return true;
        }
        if sets.segment_blocked(key) {
            return true;
        }
    }

    false
}

fn block_midpoint(chain: &[NodeId], sets: &mut ConflictSets) {
    if chain.len() < 2 {
        return;
    }

    if chain.len() % 2 == 1 {
        let middle = chain[chain.len() / 2];
        debug!("logical block at node {middle:?}");
        sets.blocked_nodes.insert(middle);
    } else {
        let key = SegmentKey::new(chain[chain.len() / 2 - 1], chain[chain.len() / 2]);
        debug!("logical conflict on segment {:?} -> {:?}", key.start, key.end);
        sets.blocked_segments.push(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Color, NodeGraph};
    use crate::sight::{Hit, LineOfSight, NoObstacles};
    use glam::{Vec3, vec3};

    fn chain_graph(colors: (Color, Color), connectors: usize) -> (NodeGraph, Vec<NodeId>) {
        let mut graph = NodeGraph::new();
        let mut nodes = Vec::new();
        nodes.push(graph.add_source(vec3(0.0, 0.0, 0.0), colors.0));
        for i in 0..connectors {
            nodes.push(graph.add_connector(vec3(1.0 + i as f32, 0.0, 0.0)));
        }
        nodes.push(graph.add_source(vec3(1.0 + connectors as f32, 0.0, 0.0), colors.1));
        for pair in nodes.windows(2) {
            graph.connect(pair[0], pair[1]);
        }
        (graph, nodes)
    }

    #[test]
    fn odd_chain_blocks_middle_node() {
        let (graph, nodes) = chain_graph((Color::Red, Color::Blue), 3);
        let sources = vec![nodes[0], nodes[4]];
        let mut sight = SightCache::new(&NoObstacles);

        let sets = detect_conflicts(&graph, &sources, &HashMap::new(), &mut sight);

        assert_eq!(sets.blocked_nodes.iter().copied().collect::<Vec<_>>(), vec![nodes[2]]);
        assert!(sets.blocked_segments.is_empty());
    }

    #[test]
    fn even_chain_blocks_middle_segment() {
        let (graph, nodes) = chain_graph((Color::Red, Color::Blue), 2);
        let sources = vec![nodes[0], nodes[3]];
        let mut sight = SightCache::new(&NoObstacles);

        let sets = detect_conflicts(&graph, &sources, &HashMap::new(), &mut sight);

        assert!(sets.blocked_nodes.is_empty());
        assert_eq!(sets.blocked_segments.len(), 1);
        assert!(sets.segment_blocked(SegmentKey::new(nodes[1], nodes[2])));
        assert!(sets.segment_blocked(SegmentKey::new(nodes[2], nodes[1])));
    }

    #[test]
    fn same_color_pair_is_ignored() {
        let (graph, nodes) = chain_graph((Color::Red, Color::Red), 3);
        let sources = vec![nodes[0], nodes[4]];
        let mut sight = SightCache::new(&NoObstacles);

        let sets = detect_conflicts(&graph, &sources, &HashMap::new(), &mut sight);
        assert_eq!(sets, ConflictSets::default());
    }

    /// A chain routed through a third source is never a candidate: each
    /// beam stops at that source. The per-side chains conflict instead, so
    /// the interposed source must not end up blocked itself.
    #[test]
    fn chain_through_a_third_source_is_no_candidate() {
        let mut graph = NodeGraph::new();
        let red = graph.add_source(vec3(0.0, 0.0, 0.0), Color::Red);
        let c1 = graph.add_connector(vec3(1.0, 0.0, 0.0));
        let green = graph.add_source(vec3(2.0, 0.0, 0.0), Color::Green);
        let c2 = graph.add_connector(vec3(3.0, 0.0, 0.0));
        let blue = graph.add_source(vec3(4.0, 0.0, 0.0), Color::Blue);
        for pair in [(red, c1), (c1, green), (green, c2), (c2, blue)] {
            graph.connect(pair.0, pair.1);
        }

        let sources = vec![red, green, blue];
        let mut sight = SightCache::new(&NoObstacles);
        let sets = detect_conflicts(&graph, &sources, &HashMap::new(), &mut sight);

        assert_eq!(
            sets.blocked_nodes.iter().copied().collect::<Vec<_>>(),
            vec![c1, c2]
        );
        assert!(sets.blocked_segments.is_empty());
    }

    /// Targets on the way likewise end both beams.
    #[test]
    fn chain_through_a_target_is_no_candidate() {
        let mut graph = NodeGraph::new();
        let red = graph.add_source(vec3(0.0, 0.0, 0.0), Color::Red);
        let door = graph.add_target(vec3(1.0, 0.0, 0.0), Color::Red);
        let blue = graph.add_source(vec3(2.0, 0.0, 0.0), Color::Blue);
        graph.connect(red, door);
        graph.connect(door, blue);

        let sources = vec![red, blue];
        let mut sight = SightCache::new(&NoObstacles);
        let sets = detect_conflicts(&graph, &sources, &HashMap::new(), &mut sight);
        assert_eq!(sets, ConflictSets::default());
    }

    struct WallBetween {
        min_x: f32,
        max_x: f32,
    }

    impl LineOfSight for WallBetween {
        fn blocked(&self, from: Vec3, to: Vec3) -> Option<Hit> {
            let lo = from.x.min(to.x);
            let hi = from.x.max(to.x);
            let wall = (self.min_x + self.max_x) * 0.5;
            if lo < wall && hi > wall {
                let t = (wall - from.x) / (to.x - from.x);
                let point = from + (to - from) * t;
                Some(Hit {
                    point,
                    distance: from.distance(point),
                })
            } else {
                None
            }
        }
    }

    #[test]
    fn physically_cut_chain_raises_no_conflict() {
        let (graph, nodes) = chain_graph((Color::Red, Color::Blue), 3);
        let sources = vec![nodes[0], nodes[4]];
        let wall = WallBetween { min_x: 1.4, max_x: 1.6 };
        let mut sight = SightCache::new(&wall);

        let sets = detect_conflicts(&graph, &sources, &HashMap::new(), &mut sight);
        assert_eq!(sets, ConflictSets::default());
    }

    /// Three sources meeting through one junction: the first pair claims
    /// the middle, later pairs find their chains already cut.
    #[test]
    fn first_conflict_wins_at_a_shared_junction() {
        let mut graph = NodeGraph::new();
        let red = graph.add_source(vec3(-2.0, 0.0, 0.0), Color::Red);
        let left = graph.add_connector(vec3(-1.0, 0.0, 0.0));
        let hub = graph.add_connector(vec3(0.0, 0.0, 0.0));
        let right = graph.add_connector(vec3(1.0, 0.0, 0.0));
        let blue = graph.add_source(vec3(2.0, 0.0, 0.0), Color::Blue);
        let below = graph.add_connector(vec3(0.0, 0.0, 1.0));
        let green = graph.add_source(vec3(0.0, 0.0, 2.0), Color::Green);
        graph.connect(red, left);
        graph.connect(left, hub);
        graph.connect(hub, right);
        graph.connect(right, blue);
        graph.connect(green, below);
        graph.connect(below, hub);

        let sources = vec![red, blue, green];
        let mut sight = SightCache::new(&NoObstacles);
        let sets = detect_conflicts(&graph, &sources, &HashMap::new(), &mut sight);

        // red-blue (5 nodes) claims the hub; red-green and blue-green pass
        // through the hub and are no-ops.
        assert_eq!(sets.blocked_nodes.iter().copied().collect::<Vec<_>>(), vec![hub]);
        assert!(sets.blocked_segments.is_empty());
    }
}
