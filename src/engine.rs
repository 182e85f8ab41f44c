//! Orchestration: one full recompute pass per trigger. The pass resets
//! per-node accumulated state, enumerates paths, resolves interceptions and
//! logical conflicts, then walks every path applying colors and emitting
//! draw instructions to the rendering boundary.

use std::collections::{BTreeSet, HashMap, HashSet};

use glam::Vec3;
use log::debug;

use crate::conflict::{ConflictSets, detect_conflicts};
use crate::graph::{Color, NodeGraph, NodeId};
use crate::interception::{self, InterceptionInfo};
use crate::path::enumerate::rooted_path_forest;
use crate::path::{BlockReason, Path, SegmentKey, SegmentState};
use crate::sight::{LineOfSight, SightCache};

/// Rendering boundary. Invoked once per applied segment or block per pass;
/// the core keeps no rendering state of its own.
pub trait BeamRenderer {
    fn clear_frame(&mut self);
    fn draw_beam(&mut self, color: Color, from: Vec3, to: Vec3);
    fn draw_truncated_beam(&mut self, color: Color, from: Vec3, block_point: Vec3);
    fn draw_hit_mark(&mut self, point: Vec3);
}

pub struct NullRenderer;

impl BeamRenderer for NullRenderer {
    fn clear_frame(&mut self) {}
    fn draw_beam(&mut self, _color: Color, _from: Vec3, _to: Vec3) {}
    fn draw_truncated_beam(&mut self, _color: Color, _from: Vec3, _block_point: Vec3) {}
    fn draw_hit_mark(&mut self, _point: Vec3) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassPhase {
    Idle,
    Resetting,
    Enumerating,
    Resolving,
    Applying,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecomputeResult {
    pub paths_by_source: Vec<(NodeId, Vec<Path>)>,
    pub blocked_nodes: BTreeSet<NodeId>,
    pub blocked_segments: Vec<SegmentKey>,
}

pub struct LaserEngine {
    graph: NodeGraph,
    phase: PassPhase,
    dirty: bool,
    touched: HashSet<NodeId>,
    prev_touched: HashSet<NodeId>,
}

impl LaserEngine {
    pub fn new(graph: NodeGraph) -> Self {
        Self {
            graph,
            phase: PassPhase::Idle,
            dirty: true,
            touched: HashSet::new(),
            prev_touched: HashSet::new(),
        }
    }

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    /// Direct graph access between passes. Any mutation marks the engine
    /// dirty; the caller schedules the next recompute.
    pub fn graph_mut(&mut self) -> &mut NodeGraph {
        self.dirty = true;
        &mut self.graph
    }

    pub fn phase(&self) -> PassPhase {
        self.phase
    }

    pub fn needs_recompute(&self) -> bool {
        self.dirty
    }

    /// Place a connector tool: drop its old edges, wire it to the nodes it
    /// was aimed at.
    pub fn attach(&mut self, tool: NodeId, targets: &[NodeId]) {
        self.graph.clear_connections(tool);
        for &target in targets {
            self.graph.connect(tool, target);
        }
        self.dirty = true;
    }

    /// Pick a connector tool back up.
    pub fn detach(&mut self, tool: NodeId) {
        self.graph.clear_connections(tool);
        self.dirty = true;
    }

    pub fn recompute(
        &mut self,
        sight: &dyn LineOfSight,
        renderer: &mut dyn BeamRenderer,
    ) -> RecomputeResult {
        self.phase = PassPhase::Resetting;
        debug!("pass: resetting");
        let current = std::mem::take(&mut self.touched);
        for &node in &self.prev_touched {
            if !current.contains(&node) {
                self.graph.reset(node);
            }
        }
        self.prev_touched = current;
        renderer.clear_frame();

        self.phase = PassPhase::Enumerating;
        debug!("pass: enumerating");
        let mut cache = SightCache::new(sight);
        let sources = self.graph.sources();
        let mut paths_by_source: Vec<(NodeId, Vec<Path>)> = Vec::with_capacity(sources.len());
        for &source in &sources {
            let forest = rooted_path_forest(&self.graph, source, &mut cache);
            paths_by_source.push((source, forest));
        }

        self.phase = PassPhase::Resolving;
        debug!("pass: resolving");
        let interceptions = interception::resolve(&paths_by_source);
        apply_interceptions(&mut paths_by_source, &interceptions);
        let conflicts = detect_conflicts(&self.graph, &sources, &interceptions, &mut cache);
        truncate_at_conflicts(&mut paths_by_source, &conflicts);

        self.phase = PassPhase::Applying;
        debug!("pass: applying");
        self.apply(&paths_by_source, renderer);

        self.phase = PassPhase::Idle;
        self.dirty = false;

        RecomputeResult {
            paths_by_source,
            blocked_nodes: conflicts.blocked_nodes,
            blocked_segments: conflicts.blocked_segments,
        }
    }

    /// Walk each path in order: the first non-free segment ends the beam at
    /// its block point; free segments light their end node.
    fn apply(&mut self, paths_by_source: &[(NodeId, Vec<Path>)], renderer: &mut dyn BeamRenderer) {
        for (_, paths) in paths_by_source {
            for path in paths {
                for segment in &path.segments {
                    if segment.state != SegmentState::Free {
                        if let Some(hit) = segment.block {
                            renderer.draw_truncated_beam(segment.color, segment.start_point, hit.point);
                            renderer.draw_hit_mark(hit.point);
                        }
                        break;
                    }

                    self.graph.add_input_color(segment.end, segment.color);
                    self.touched.insert(segment.end);
                    renderer.draw_beam(segment.color, segment.start_point, segment.end_point);
                }
            }
        }
    }
}

fn apply_interceptions(
    paths_by_source: &mut [(NodeId, Vec<Path>)],
    interceptions: &HashMap<SegmentKey, InterceptionInfo>,
) {
    for (_, paths) in paths_by_source.iter_mut() {
        for path in paths {
            let mut any = false;
            for segment in &mut path.segments {
                let info = interceptions.get(&segment.key()).copied().or_else(|| {
                    // Map entries are directional; a reversed match needs
                    // its distance re-measured from this side.
                    interceptions.get(&segment.key().reversed()).map(|info| InterceptionInfo {
                        distance: segment.start_point.distance(info.point),
                        ..*info
                    })
                });
                if let Some(info) = info {
                    segment.set_block(
                        SegmentState::Blocker,
                        crate::sight::Hit {
                            point: info.point,
                            distance: info.distance,
                        },
                    );
                    any = true;
                }
            }
            if any {
                path.mark_blocked(BlockReason::LineIntersection);
            }
        }
    }
}

fn truncate_at_conflicts(paths_by_source: &mut [(NodeId, Vec<Path>)], conflicts: &ConflictSets) {
    for (_, paths) in paths_by_source.iter_mut() {
        for path in paths {
            let mut cut = None;
            for (index, segment) in path.segments.iter().enumerate() {
                if index == 0 && conflicts.blocked_nodes.contains(&segment.start) {
                    cut = Some((index, BlockReason::LogicalBlock, false));
                    break;
                }
                if conflicts.segment_blocked(segment.key()) {
                    cut = Some((index, BlockReason::LogicalConflict, true));
                    break;
                }
                if conflicts.blocked_nodes.contains(&segment.end) {
                    cut = Some((index, BlockReason::LogicalBlock, true));
                    break;
                }
            }

            let Some((index, reason, keep_segment)) = cut else {
                continue;
            };

            if keep_segment {
                path.segments.truncate(index + 1);
                if reason == BlockReason::LogicalConflict {
                    let segment = &mut path.segments[index];
                    let midpoint = (segment.start_point + segment.end_point) * 0.5;
                    let distance = segment.length() * 0.5;
                    segment.set_block(
                        SegmentState::Conflict,
                        crate::sight::Hit {
                            point: midpoint,
                            distance,
                        },
                    );
                }
            } else {
                path.segments.truncate(index);
            }
            path.mark_blocked(reason);
        }
    }
}
