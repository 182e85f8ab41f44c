//! Graph search over the node arena. All three operations walk with a
//! visited stack so every produced path is simple (no repeated node).

use std::collections::VecDeque;

use log::warn;

use crate::graph::{Color, NodeGraph, NodeId};
use crate::path::{BlockReason, Path, PathStatus, Segment, SegmentState, chain_contains};
use crate::sight::SightCache;

/// All simple paths connecting two nodes, as ordered node chains.
pub fn paths_between(graph: &NodeGraph, start: NodeId, target: NodeId) -> Vec<Vec<NodeId>> {
    if graph.node(start).is_none() || graph.node(target).is_none() {
        warn!("paths_between with unknown node");
        return Vec::new();
    }

    let mut visited = vec![false; graph.node_count()];
    let mut current = Vec::new();
    let mut found = Vec::new();
    visit_between(graph, start, target, &mut visited, &mut current, &mut found);
    found
}

fn visit_between(
    graph: &NodeGraph,
    node: NodeId,
    target: NodeId,
    visited: &mut [bool],
    current: &mut Vec<NodeId>,
    found: &mut Vec<Vec<NodeId>>,
) {
    visited[node.index()] = true;
    current.push(node);

    if node == target {
        found.push(current.clone());
    } else {
        for next in graph.neighbors(node) {
            if !visited[next.index()] {
                visit_between(graph, next, target, visited, current, found);
            }
        }
    }

    visited[node.index()] = false;
    current.pop();
}

/// All maximal simple paths from `start` that dead-end without reaching a
/// terminal node. Used to light inert branches.
pub fn open_paths(graph: &NodeGraph, start: NodeId) -> Vec<Vec<NodeId>> {
    if graph.node(start).is_none() {
        warn!("open_paths with unknown node");
        return Vec::new();
    }

    let mut visited = vec![false; graph.node_count()];
    let mut current = Vec::new();
    let mut found = Vec::new();
    visit_open(graph, start, start, &mut visited, &mut current, &mut found);
    found
}

fn visit_open(
    graph: &NodeGraph,
    node: NodeId,
    root: NodeId,
    visited: &mut [bool],
    current: &mut Vec<NodeId>,
    found: &mut Vec<Vec<NodeId>>,
) {
    visited[node.index()] = true;
    current.push(node);

    let mut has_unvisited = false;
    for next in graph.neighbors(node) {
        if !visited[next.index()] {
            has_unvisited = true;
            visit_open(graph, next, root, visited, current, found);
        }
    }

    let is_dead_end = !has_unvisited && current.len() > 1;
    let reached_terminal = graph
        .node(node)
        .is_some_and(|last| last.is_terminal_for(root));
    if is_dead_end && !reached_terminal {
        found.push(current.clone());
    }

    visited[node.index()] = false;
    current.pop();
}

/// Every simple path from one source, as ordered segment lists with
/// physical line-of-sight truncation applied while building. Incomplete
/// paths already covered by a complete path's chain are discarded; the
/// result keeps complete and blocked paths first, then ascending length.
pub fn rooted_path_forest(graph: &NodeGraph, start: NodeId, sight: &mut SightCache) -> Vec<Path> {
    let Some(color) = graph.node(start).and_then(|node| node.source_color()) else {
        warn!("rooted_path_forest on a node that is not a source");
        return Vec::new();
    };

    let mut paths = Vec::new();
    let mut queue = VecDeque::from([vec![start]]);

    while let Some(chain) = queue.pop_front() {
        let path = build_segment_path(graph, start, color, &chain, sight);
        let expandable = path.status == PathStatus::Incomplete;
        if !path.segments.is_empty() {
            paths.push(path);
        }
        if !expandable {
            continue;
        }

        let current = chain[chain.len() - 1];
        for next in graph.neighbors(current) {
            if !chain.contains(&next) {
                let mut extended = chain.clone();
                extended.push(next);
                queue.push_back(extended);
            }
        }
    }

    discard_covered_incomplete(&mut paths);
    paths.sort_by_key(|path| (status_rank(path.status), path.segments.len()));
    paths
}

fn status_rank(status: PathStatus) -> u8 {
    match status {
        PathStatus::Complete => 0,
        PathStatus::Blocked => 1,
        PathStatus::Incomplete => 2,
    }
}

fn build_segment_path(
    graph: &NodeGraph,
    root: NodeId,
    color: Color,
    chain: &[NodeId],
    sight: &mut SightCache,
) -> Path {
    let mut segments = Vec::with_capacity(chain.len().saturating_sub(1));
    let mut status = PathStatus::Incomplete;
    let mut block_reason = BlockReason::None;

    for pair in chain.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let mut segment = Segment::free(from, to, graph.position(from), graph.position(to), color);

        if let Some(hit) = sight.check(graph, from, to) {
            segment.set_block(SegmentState::PhysicalBlocker, hit);
            segments.push(segment);
            status = PathStatus::Blocked;
            block_reason = BlockReason::PhysicalObstacle;
            break;
        }

        segments.push(segment);
    }

    if status != PathStatus::Blocked {
        let last = chain[chain.len() - 1];
        let reached_terminal = graph
            .node(last)
            .is_some_and(|node| node.is_terminal_for(root));
        status = if reached_terminal {
            PathStatus::Complete
        } else {
            PathStatus::Incomplete
        };
    }

    Path {
        source: root,
        segments,
        status,
        block_reason,
    }
}

/// An incomplete path is redundant when a complete path walks the
/// identical chain (side-independently).
fn discard_covered_incomplete(paths: &mut Vec<Path>) {
    let complete: Vec<Vec<Segment>> = paths
        .iter()
        .filter(|path| path.status == PathStatus::Complete)
        .map(|path| path.segments.clone())
        .collect();

    paths.retain(|path| {
        path.status != PathStatus::Incomplete
            || !complete
                .iter()
                .any(|segments| chain_contains(segments, &path.segments))
    });
}
