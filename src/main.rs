use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use glam::Vec3;
use log::info;

use beamgraph::engine::{BeamRenderer, LaserEngine};
use beamgraph::graph::{Color, NodeKind};
use beamgraph::path::PathStatus;
use beamgraph::scenario::load_scenario;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Scenario file to run.
    scenario: PathBuf,

    /// Recompute passes to execute.
    #[arg(long, default_value_t = 1)]
    passes: usize,
}

struct LogRenderer;

impl BeamRenderer for LogRenderer {
    fn clear_frame(&mut self) {}

    fn draw_beam(&mut self, color: Color, from: Vec3, to: Vec3) {
        info!("{} beam {from} -> {to}", color.label());
    }

    fn draw_truncated_beam(&mut self, color: Color, from: Vec3, block_point: Vec3) {
        info!("{} beam {from} cut at {block_point}", color.label());
    }

    fn draw_hit_mark(&mut self, point: Vec3) {
        info!("hit mark at {point}");
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let scenario = load_scenario(&args.scenario)?;
    info!(
        "loaded scenario '{}' with {} nodes",
        scenario.name,
        scenario.graph.node_count()
    );

    let names_by_id: std::collections::HashMap<_, _> = scenario
        .ids_by_name
        .iter()
        .map(|(name, &id)| (id, name.clone()))
        .collect();

    let mut engine = LaserEngine::new(scenario.graph);
    let mut renderer = LogRenderer;
    let mut result = engine.recompute(&scenario.obstacles, &mut renderer);
    for _ in 1..args.passes {
        result = engine.recompute(&scenario.obstacles, &mut renderer);
    }

    for (source, paths) in &result.paths_by_source {
        let name = &names_by_id[source];
        let complete = paths
            .iter()
            .filter(|path| path.status == PathStatus::Complete)
            .count();
        println!("{name}: {} paths, {complete} complete", paths.len());
    }
    println!(
        "blocked: {} nodes, {} segments",
        result.blocked_nodes.len(),
        result.blocked_segments.len()
    );

    for node in engine.graph().nodes() {
        if let NodeKind::Target { required } = node.kind {
            let name = &names_by_id[&node.id];
            let state = if node.is_active() { "active" } else { "inactive" };
            println!("target {name} ({}): {state}", required.label());
        }
    }

    Ok(())
}
