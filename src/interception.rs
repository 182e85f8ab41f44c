//! Cross-beam interception. Beams of different colors that cross in space
//! cut each other short at the crossing point. Blocking is mutual, so the
//! resolver iterates to a fixed point: each round rebuilds the blocking map
//! from scratch against the previous round's distances, then compares.

use std::collections::{HashMap, HashSet};

use glam::Vec3;
use log::debug;

use crate::geometry;
use crate::graph::{Color, NodeId};
use crate::path::{Path, SegmentKey, SegmentState};

pub const MAX_ITERATIONS: usize = 15;

const DISTANCE_EPSILON: f32 = 1e-5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterceptionInfo {
    pub found: bool,
    /// The crossing segment for a beam-on-beam block; `None` for physical
    /// obstructions.
    pub segment: Option<SegmentKey>,
    pub point: Vec3,
    pub distance: f32,
}

/// One path segment flattened for pairwise testing, with enough of its
/// owning path's identity to apply the skip rules.
struct SegmentEntry {
    key: SegmentKey,
    color: Color,
    source: NodeId,
    terminal: Option<NodeId>,
    start_point: Vec3,
    end_point: Vec3,
    physical_block: Option<f32>,
}

/// Resolve every beam-on-beam interception across the current path set.
/// Returns the stable (or best-effort, at the iteration cap) mapping from
/// segment to its nearest block.
pub fn resolve(paths_by_source: &[(NodeId, Vec<Path>)]) -> HashMap<SegmentKey, InterceptionInfo> {
    let entries = collect_entries(paths_by_source);
    if entries.is_empty() {
        return HashMap::new();
    }

    let mut index_by_key: HashMap<SegmentKey, usize> = HashMap::new();
    for (index, entry) in entries.iter().enumerate() {
        index_by_key.entry(entry.key).or_insert(index);
    }

    let mut distances: HashMap<SegmentKey, f32> = HashMap::new();
    let mut infos: HashMap<SegmentKey, InterceptionInfo> = HashMap::new();

    for iteration in 0..MAX_ITERATIONS {
        let mut round = Round {
            blocked: HashSet::new(),
            distances: HashMap::new(),
            infos: HashMap::new(),
        };

        for current in &entries {
            if round.blocked.contains(&current.key) {
                continue;
            }

            let natural = current.start_point.distance(current.end_point);
            let mut best = InterceptionInfo {
                found: false,
                segment: None,
                point: current.start_point,
                distance: natural,
            };
            scan_crossings(current, &entries, &distances, &mut best);

            if !best.found {
                continue;
            }
            let Some(conflict_key) = best.segment else {
                continue;
            };
            if round.blocked.contains(&conflict_key) {
                continue;
            }
            let Some(&conflict_index) = index_by_key.get(&conflict_key) else {
                continue;
            };

            commit(current, &entries[conflict_index], best, &entries, &index_by_key, &mut round);
        }

        let changed = mappings_differ(&distances, &round.distances);
        distances = round.distances;
        infos = round.infos;
        debug!(
            "interception iteration {iteration}: {} blocked segments",
            infos.len()
        );
        if !changed {
            break;
        }
    }

    infos
}

struct Round {
    blocked: HashSet<SegmentKey>,
    distances: HashMap<SegmentKey, f32>,
    infos: HashMap<SegmentKey, InterceptionInfo>,
}

fn collect_entries(paths_by_source: &[(NodeId, Vec<Path>)]) -> Vec<SegmentEntry> {
    let mut entries = Vec::new();
    for (source, paths) in paths_by_source {
        for path in paths {
            let terminal = path.terminal();
            for segment in &path.segments {
                entries.push(SegmentEntry {
                    key: segment.key(),
                    color: segment.color,
                    source: *source,
                    terminal,
                    start_point: segment.start_point,
                    end_point: segment.end_point,
                    physical_block: if segment.state == SegmentState::PhysicalBlocker {
                        segment.block.map(|hit| hit.distance)
                    } else {
                        None
                    },
                });
            }
        }
    }
    entries
}

/// Complete paths between the same unordered source pair are one connected
/// chain; their meeting is the conflict detector's business, never a
/// geometric crossing.
fn linked_by_topology(a: &SegmentEntry, b: &SegmentEntry) -> bool {
    let (Some(term_a), Some(term_b)) = (a.terminal, b.terminal) else {
        return false;
    };
    unordered(a.source, term_a) == unordered(b.source, term_b)
}

fn unordered(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b { (a, b) } else { (b, a) }
}

fn scan_crossings(
    current: &SegmentEntry,
    entries: &[SegmentEntry],
    previous: &HashMap<SegmentKey, f32>,
    best: &mut InterceptionInfo,
) {
    for other in entries {
        if other.color == current.color {
            continue;
        }
        // Adjacent segments never conflict; membership, not geometry.
        if current.key.shares_endpoint(other.key) {
            continue;
        }
        if linked_by_topology(current, other) {
            continue;
        }
        if !geometry::segments_intersect(
            current.start_point,
            current.end_point,
            other.start_point,
            other.end_point,
        ) {
            continue;
        }
        let Some(point) = geometry::intersection_point(
            current.start_point,
            current.end_point,
            other.start_point,
            other.end_point,
        ) else {
            continue;
        };

        let from_current = current.start_point.distance(point);
        let from_other = other.start_point.distance(point);

        // A strictly closer block already recorded on the other segment
        // wins: that beam never reaches this crossing.
        let prior = previous
            .get(&other.key)
            .or_else(|| previous.get(&other.key.reversed()))
            .copied();
        if prior.is_some_and(|d| d < from_other - DISTANCE_EPSILON) {
            continue;
        }

        if from_current < best.distance {
            *best = InterceptionInfo {
                found: true,
                segment: Some(other.key),
                point,
                distance: from_current,
            };
        }
    }
}

fn commit(
    current: &SegmentEntry,
    conflict: &SegmentEntry,
    info: InterceptionInfo,
    entries: &[SegmentEntry],
    index_by_key: &HashMap<SegmentKey, usize>,
    round: &mut Round,
) {
    let to_conflict = conflict.start_point.distance(info.point);

    // A physical obstruction closer than the crossing means the beam never
    // gets there; the crossing claim is void on that side.
    let current_priority = current
        .physical_block
        .is_none_or(|d| info.distance < d - DISTANCE_EPSILON);
    let conflict_priority = conflict
        .physical_block
        .is_none_or(|d| to_conflict < d - DISTANCE_EPSILON);

    if current_priority && conflict_priority {
        let current_now = round
            .distances
            .get(&current.key)
            .is_none_or(|&d| info.distance < d - DISTANCE_EPSILON);
        let conflict_now = round
            .distances
            .get(&conflict.key)
            .is_none_or(|&d| to_conflict < d - DISTANCE_EPSILON);

        if current_now && conflict_now {
            let mirrored = InterceptionInfo {
                found: true,
                segment: Some(current.key),
                point: info.point,
                distance: to_conflict,
            };
            add_interception(current.key, info, entries, index_by_key, round);
            add_interception(conflict.key, mirrored, entries, index_by_key, round);
        }
    } else {
        remove_interception(current.key, round);
        remove_interception(conflict.key, round);
    }
}

fn add_interception(
    key: SegmentKey,
    info: InterceptionInfo,
    entries: &[SegmentEntry],
    index_by_key: &HashMap<SegmentKey, usize>,
    round: &mut Round,
) {
    round.distances.insert(key, info.distance);
    round.infos.insert(key, info);
    round.blocked.insert(key);

    // The same physical segment may be traversed the other way in another
    // path; mirror the block onto that orientation.
    let reverse_key = key.reversed();
    if round.blocked.contains(&reverse_key) {
        return;
    }
    let Some(&reverse_index) = index_by_key.get(&reverse_key) else {
        return;
    };

    let reverse = &entries[reverse_index];
    let reverse_distance = reverse.start_point.distance(info.point);
    if reverse
        .physical_block
        .is_none_or(|d| reverse_distance < d - DISTANCE_EPSILON)
    {
        let reverse_info = InterceptionInfo {
            found: true,
            segment: info.segment,
            point: info.point,
            distance: reverse_distance,
        };
        round.distances.insert(reverse_key, reverse_distance);
        round.infos.insert(reverse_key, reverse_info);
        round.blocked.insert(reverse_key);
    }
}

fn remove_interception(key: SegmentKey, round: &mut Round) {
    round.distances.remove(&key);
    round.infos.remove(&key);
    round.blocked.remove(&key);
    round.blocked.remove(&key.reversed());
}

fn mappings_differ(old: &HashMap<SegmentKey, f32>, new: &HashMap<SegmentKey, f32>) -> bool {
    if old.len() != new.len() {
        return true;
    }
    new.iter().any(|(key, &distance)| {
        old.get(key)
            .is_none_or(|&previous| (previous - distance).abs() > DISTANCE_EPSILON)
    })
}
