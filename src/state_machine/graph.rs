use crate::event::EventId;
use crate::state_machine::{ActionId, StateId, StateIndex, StateMachinePattern};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use serde::Serialize;
use std::collections::HashMap;

/// Node weight: a state of the pattern
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateNode {
    pub index: StateIndex,
    pub id: StateId,
    pub name: String,
    pub start: bool,
}

/// Edge weight: the transition between two states
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionEdge {
    pub event_id: EventId,
    pub label: String,
    pub actions: Vec<ActionId>,
}

/// A petgraph view of one pattern, used for analysis and rendering.
///
/// The pattern itself stays the source of truth; this view is rebuilt on
/// demand and never used while dispatching.
pub struct PatternGraph {
    pub graph: StableGraph<StateNode, TransitionEdge>,

    /// Pattern state index to graph node
    pub node_index: HashMap<StateIndex, NodeIndex>,

    pub name: String,
}

impl PatternGraph {
    pub fn from_pattern(pattern: &StateMachinePattern) -> Self {
        let mut graph = StableGraph::new();
        let mut node_index = HashMap::with_capacity(pattern.state_count());

        for (index, state) in pattern.states() {
            let node = graph.add_node(StateNode {
                index,
                id: state.id,
                name: state.name.clone(),
                start: index == pattern.start_index(),
            });
            node_index.insert(index, node);
        }

        for (index, state) in pattern.states() {
            for transition in state.transitions() {
                if let (Some(&from), Some(&to)) = (
                    node_index.get(&index),
                    transition.next_state().and_then(|next| node_index.get(&next)),
                ) {
                    graph.add_edge(
                        from,
                        to,
                        TransitionEdge {
                            event_id: transition.event_id,
                            label: transition.display_label(),
                            actions: transition.actions.iter().map(|a| a.id).collect(),
                        },
                    );
                }
            }
        }

        Self {
            graph,
            node_index,
            name: pattern.name().to_string(),
        }
    }

    pub fn start_node(&self) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&idx| self.graph.node_weight(idx).is_some_and(|n| n.start))
    }

    /// States without outgoing transitions
    pub fn dead_end_states(&self) -> Vec<&StateNode> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.edges_directed(idx, Direction::Outgoing).count() == 0)
            .filter_map(|idx| self.graph.node_weight(idx))
            .collect()
    }

    /// States no transition leads into
    pub fn entry_only_states(&self) -> Vec<&StateNode> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.edges_directed(idx, Direction::Incoming).count() == 0)
            .filter_map(|idx| self.graph.node_weight(idx))
            .collect()
    }

    /// Export to DOT format for Graphviz
    pub fn to_dot(&self) -> String {
        let mut dot = format!("digraph \"{}\" {{\n", escape(&self.name));
        dot.push_str("  rankdir=LR;\n");
        dot.push_str("  node [shape=box, style=filled];\n\n");

        let mut nodes: Vec<&StateNode> = self
            .graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx))
            .collect();
        nodes.sort_by_key(|n| n.index);
        for node in nodes {
            let color = if node.start { "lightblue" } else { "white" };
            dot.push_str(&format!(
                "  s{} [label=\"{} [{}]\", fillcolor=\"{}\"];\n",
                node.index.0,
                escape(&node.name),
                node.id,
                color
            ));
        }

        dot.push('\n');

        for edge_idx in self.graph.edge_indices() {
            if let Some((from_idx, to_idx)) = self.graph.edge_endpoints(edge_idx)
                && let (Some(from), Some(to), Some(edge)) = (
                    self.graph.node_weight(from_idx),
                    self.graph.node_weight(to_idx),
                    self.graph.edge_weight(edge_idx),
                )
            {
                dot.push_str(&format!(
                    "  s{} -> s{} [label=\"{}\"];\n",
                    from.index.0,
                    to.index.0,
                    escape(&edge.label)
                ));
            }
        }

        dot.push_str("}\n");
        dot
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            total_states: self.graph.node_count(),
            total_transitions: self.graph.edge_count(),
            dead_end_states: self.dead_end_states().len(),
            entry_only_states: self.entry_only_states().len(),
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub total_states: usize,
    pub total_transitions: usize,
    pub dead_end_states: usize,
    pub entry_only_states: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{Action, State, Transition};

    fn pattern() -> StateMachinePattern {
        let mut idle = State::new("Idle", 0);
        idle.add_transition(Transition::new("arm", 10, 1).with_action(Action::new(1)));
        let mut armed = State::new("Armed", 1);
        armed.add_transition(Transition::new("fire", 12, 2));
        let done = State::new("Done \"final\"", 2);
        StateMachinePattern::from_states("trigger", vec![idle, armed, done], 0).unwrap()
    }

    #[test]
    fn test_graph_mirrors_pattern() {
        let graph = PatternGraph::from_pattern(&pattern());
        let stats = graph.stats();

        assert_eq!(stats.total_states, 3);
        assert_eq!(stats.total_transitions, 2);
        assert_eq!(stats.dead_end_states, 1);
        assert_eq!(graph.entry_only_states()[0].name, "Idle");
        assert!(graph.start_node().is_some());
    }

    #[test]
    fn test_to_dot_output() {
        let dot = PatternGraph::from_pattern(&pattern()).to_dot();

        assert!(dot.starts_with("digraph \"trigger\""));
        assert!(dot.contains("s0 -> s1 [label=\"arm (10)\"]"));
        assert!(dot.contains("lightblue"));
        assert!(dot.contains("Done \\\"final\\\" [2]"));
    }
}
