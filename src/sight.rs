use std::collections::HashMap;

use glam::Vec3;

use crate::graph::{NodeGraph, NodeId};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub point: Vec3,
    pub distance: f32,
}

/// Physical obstruction query, backed by a world raycast in the host
/// environment. The core only ever sees the nearest hit.
pub trait LineOfSight {
    fn blocked(&self, from: Vec3, to: Vec3) -> Option<Hit>;
}

pub struct NoObstacles;

impl LineOfSight for NoObstacles {
    fn blocked(&self, _from: Vec3, _to: Vec3) -> Option<Hit> {
        None
    }
}

/// Per-pass raycast cache keyed by node pair. Queries are directional: the
/// hit point for A to B differs from B to A on thick obstacles.
pub struct SightCache<'a> {
    sight: &'a dyn LineOfSight,
    cache: HashMap<(NodeId, NodeId), Option<Hit>>,
}

impl<'a> SightCache<'a> {
    pub fn new(sight: &'a dyn LineOfSight) -> Self {
        Self {
            sight,
            cache: HashMap::new(),
        }
    }

    pub fn check(&mut self, graph: &NodeGraph, from: NodeId, to: NodeId) -> Option<Hit> {
        if let Some(cached) = self.cache.get(&(from, to)) {
            return *cached;
        }

        let result = self.sight.blocked(graph.position(from), graph.position(to));
        self.cache.insert((from, to), result);
        result
    }
}
