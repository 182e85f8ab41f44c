//! Scenario files: a JSON description of nodes, links and sphere obstacles
//! that can be loaded into a graph for offline runs.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use glam::Vec3;
use serde::Deserialize;

use crate::graph::{Color, NodeGraph, NodeId};
use crate::sight::{Hit, LineOfSight};

#[derive(Debug, Deserialize)]
struct RawScenario {
    name: String,
    nodes: Vec<RawNode>,
    #[serde(default)]
    links: Vec<[String; 2]>,
    #[serde(default)]
    obstacles: Vec<RawObstacle>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    name: String,
    kind: String,
    #[serde(default)]
    color: Option<String>,
    position: [f32; 3],
}

#[derive(Debug, Deserialize)]
struct RawObstacle {
    center: [f32; 3],
    radius: f32,
}

pub struct Scenario {
    pub name: String,
    pub graph: NodeGraph,
    pub obstacles: ObstacleField,
    pub ids_by_name: HashMap<String, NodeId>,
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario {}", path.display()))?;
    parse_scenario(&text).with_context(|| format!("invalid scenario {}", path.display()))
}

pub fn parse_scenario(text: &str) -> Result<Scenario> {
    let raw: RawScenario = serde_json::from_str(text).context("malformed scenario json")?;

    let mut graph = NodeGraph::new();
    let mut ids_by_name = HashMap::new();

    for node in &raw.nodes {
        let position = Vec3::from_array(node.position);
        let id = match node.kind.as_str() {
            "source" => {
                let color = required_color(node)?;
                graph.add_source(position, color)
            }
            "connector" => graph.add_connector(position),
            "target" => {
                let required = required_color(node)?;
                graph.add_target(position, required)
            }
            other => bail!("node '{}' has unknown kind '{other}'", node.name),
        };
        if ids_by_name.insert(node.name.clone(), id).is_some() {
            bail!("duplicate node name '{}'", node.name);
        }
    }

    for [a, b] in &raw.links {
        let id_a = lookup(&ids_by_name, a)?;
        let id_b = lookup(&ids_by_name, b)?;
        graph.connect(id_a, id_b);
    }

    let obstacles = ObstacleField {
        spheres: raw
            .obstacles
            .iter()
            .map(|sphere| SphereObstacle {
                center: Vec3::from_array(sphere.center),
                radius: sphere.radius,
            })
            .collect(),
    };

    Ok(Scenario {
        name: raw.name,
        graph,
        obstacles,
        ids_by_name,
    })
}

fn required_color(node: &RawNode) -> Result<Color> {
    let Some(color) = &node.color else {
        bail!("node '{}' of kind '{}' needs a color", node.name, node.kind);
    };
    parse_color(color).with_context(|| format!("node '{}'", node.name))
}

fn parse_color(text: &str) -> Result<Color> {
    match text {
        "red" => Ok(Color::Red),
        "blue" => Ok(Color::Blue),
        "green" => Ok(Color::Green),
        other => bail!("unknown color '{other}'"),
    }
}

fn lookup(ids_by_name: &HashMap<String, NodeId>, name: &str) -> Result<NodeId> {
    ids_by_name
        .get(name)
        .copied()
        .with_context(|| format!("link references unknown node '{name}'"))
}

#[derive(Clone, Copy, Debug)]
struct SphereObstacle {
    center: Vec3,
    radius: f32,
}

impl SphereObstacle {
    /// Nearest ray-sphere entry point along the segment, if any.
    fn hit(&self, from: Vec3, dir: Vec3, len: f32) -> Option<f32> {
        let oc = from - self.center;
        let b = oc.dot(dir);
        let c = oc.length_squared() - self.radius * self.radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let t = -b - disc.sqrt();
        // Ignore hits at the very start of the segment so a beam leaving a
        // node embedded in an obstacle surface still escapes.
        if t > 1e-4 && t < len { Some(t) } else { None }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ObstacleField {
    spheres: Vec<SphereObstacle>,
}

impl LineOfSight for ObstacleField {
    fn blocked(&self, from: Vec3, to: Vec3) -> Option<Hit> {
        let len = from.distance(to);
        if len <= f32::EPSILON {
            return None;
        }
        let dir = (to - from) / len;

        let mut nearest: Option<f32> = None;
        for sphere in &self.spheres {
            if let Some(t) = sphere.hit(from, dir, len) {
                if nearest.is_none_or(|best| t < best) {
                    nearest = Some(t);
                }
            }
        }

        nearest.map(|t| Hit {
            point: from + dir * t,
            distance: t,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use glam::vec3;

    const SCENARIO: &str = r#"{
        "name": "crossing",
        "nodes": [
            { "name": "emitter", "kind": "source", "color": "red", "position": [0, 0, 0] },
            { "name": "relay", "kind": "connector", "position": [1, 0, 0] },
            { "name": "door", "kind": "target", "color": "red", "position": [2, 0, 0] }
        ],
        "links": [["emitter", "relay"], ["relay", "door"]],
        "obstacles": [{ "center": [0.5, 0, 5], "radius": 0.25 }]
    }"#;

    #[test]
    fn parses_nodes_links_and_obstacles() {
        let scenario = parse_scenario(SCENARIO).unwrap();
        assert_eq!(scenario.name, "crossing");
        assert_eq!(scenario.graph.node_count(), 3);

        let emitter = scenario.ids_by_name["emitter"];
        let relay = scenario.ids_by_name["relay"];
        let door = scenario.ids_by_name["door"];

        assert_eq!(
            scenario.graph.node(emitter).unwrap().kind,
            NodeKind::Source { color: Color::Red }
        );
        assert_eq!(
            scenario.graph.node(door).unwrap().kind,
            NodeKind::Target { required: Color::Red }
        );
        assert_eq!(scenario.graph.neighbors(relay), vec![emitter, door]);
        assert_eq!(scenario.graph.position(relay), vec3(1.0, 0.0, 0.0));
    }

    #[test]
    fn rejects_unknown_color_and_unknown_link_target() {
        let bad_color = SCENARIO.replace("\"red\"", "\"purple\"");
        assert!(parse_scenario(&bad_color).is_err());

        let bad_link = SCENARIO.replace("[\"relay\", \"door\"]", "[\"relay\", \"missing\"]");
        assert!(parse_scenario(&bad_link).is_err());
    }

    #[test]
    fn source_without_color_is_rejected() {
        let text = r#"{
            "name": "broken",
            "nodes": [{ "name": "s", "kind": "source", "position": [0, 0, 0] }]
        }"#;
        assert!(parse_scenario(text).is_err());
    }

    #[test]
    fn sphere_blocks_a_segment_through_its_center() {
        let field = ObstacleField {
            spheres: vec![SphereObstacle {
                center: vec3(2.0, 0.0, 0.0),
                radius: 0.5,
            }],
        };

        let hit = field
            .blocked(vec3(0.0, 0.0, 0.0), vec3(4.0, 0.0, 0.0))
            .unwrap();
        assert!((hit.distance - 1.5).abs() < 1e-5);
        assert!((hit.point - vec3(1.5, 0.0, 0.0)).length() < 1e-5);

        // A segment passing beside the sphere is clear.
        assert!(field
            .blocked(vec3(0.0, 0.0, 1.0), vec3(4.0, 0.0, 1.0))
            .is_none());

        // A segment ending before the sphere is clear.
        assert!(field
            .blocked(vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0))
            .is_none());
    }
}
