//! Core of a laser-routing puzzle: enumerate beam paths over a node graph,
//! resolve geometric interceptions between beams of different colors, detect
//! head-on logical conflicts, and apply the result back onto the graph.

pub mod conflict;
pub mod engine;
pub mod geometry;
pub mod graph;
pub mod interception;
pub mod path;
pub mod scenario;
pub mod sight;
