//! Pattern analyzer
//!
//! Summarizes the shape of an interaction pattern: reachability from the
//! start state, cycles, dead ends and the longest shortest path.

use super::{PatternGraph, StateMachinePattern};
use petgraph::Direction;
use petgraph::visit::Bfs;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PatternShape {
    /// A -> B -> C
    Linear,

    /// A -> B
    ///   -> C
    Branching,

    /// A -> B -> A
    Cyclic,

    /// No transitions at all
    Empty,
}

impl PatternShape {
    pub fn display_name(&self) -> &'static str {
        match self {
            PatternShape::Linear => "Linear",
            PatternShape::Branching => "Branching",
            PatternShape::Cyclic => "Cyclic",
            PatternShape::Empty => "Empty",
        }
    }
}

/// Analysis report for one pattern
#[derive(Debug, Clone, Serialize)]
pub struct PatternReport {
    pub name: String,
    pub start_state: String,
    pub shape: PatternShape,
    pub state_count: usize,
    pub transition_count: usize,
    pub branching_factor: f64,
    /// Transitions needed to reach the farthest reachable state
    pub max_depth: usize,
    pub has_cycles: bool,
    pub unreachable: Vec<String>,
    pub dead_ends: Vec<String>,
}

/// Analyze a connected pattern
pub fn analyze(pattern: &StateMachinePattern) -> PatternReport {
    let view = PatternGraph::from_pattern(pattern);
    let graph = &view.graph;
    let node_count = graph.node_count();

    let has_cycles = petgraph::algo::is_cyclic_directed(graph);
    let max_out = graph
        .node_indices()
        .map(|idx| graph.edges_directed(idx, Direction::Outgoing).count())
        .max()
        .unwrap_or(0);
    let branching_factor = if node_count > 0 {
        graph.edge_count() as f64 / node_count as f64
    } else {
        0.0
    };

    let shape = if graph.edge_count() == 0 {
        PatternShape::Empty
    } else if has_cycles {
        PatternShape::Cyclic
    } else if max_out <= 1 {
        PatternShape::Linear
    } else {
        PatternShape::Branching
    };

    PatternReport {
        name: pattern.name().to_string(),
        start_state: pattern.start_state().name.clone(),
        shape,
        state_count: pattern.state_count(),
        transition_count: pattern.transition_count(),
        branching_factor,
        max_depth: max_depth(&view),
        has_cycles,
        unreachable: pattern
            .unreachable_states()
            .into_iter()
            .map(|s| s.name.clone())
            .collect(),
        dead_ends: view
            .dead_end_states()
            .into_iter()
            .map(|n| n.name.clone())
            .collect(),
    }
}

fn max_depth(view: &PatternGraph) -> usize {
    let Some(start) = view.start_node() else {
        return 0;
    };
    let mut depth = HashMap::from([(start, 0usize)]);
    let mut bfs = Bfs::new(&view.graph, start);
    while let Some(node) = bfs.next(&view.graph) {
        let here = depth.get(&node).copied().unwrap_or(0);
        for next in view.graph.neighbors_directed(node, Direction::Outgoing) {
            depth.entry(next).or_insert(here + 1);
        }
    }
    depth.values().copied().max().unwrap_or(0)
}
