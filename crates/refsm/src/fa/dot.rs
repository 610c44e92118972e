// graph export: a petgraph view of an automaton and Graphviz source built
// from it. layout and rendering are left to graphviz

use std::collections::BTreeSet;
use std::fmt::Write;

use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;

use super::subset::TRAP_LABEL;
use super::FiniteAutomaton;

/// Text shown inside each state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StateNames {
    /// The construction's own labels (`a[1]`, `{q0}`, ...).
    #[default]
    Labels,
    /// Short `q0..qn` names, see [`FiniteAutomaton::aliases`].
    Aliases,
    /// Nothing, except for dead states which are all shown as `∅`.
    Blank,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DotOptions {
    pub names: StateNames,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphNode {
    pub name: String,
    pub start: bool,
    pub accepting: bool,
}

/// Node `i` of the graph is state `i`; parallel edges are merged with
/// comma-separated labels.
pub fn to_graph<A: FiniteAutomaton + ?Sized>(fa: &A, names: StateNames) -> DiGraph<GraphNode, String> {
    let aliases = match names {
        StateNames::Aliases => fa.aliases(),
        _ => Vec::new(),
    };
    let dead = match names {
        StateNames::Blank => fa.dead_states(),
        _ => BTreeSet::new(),
    };

    let mut graph = DiGraph::with_capacity(fa.states().len(), fa.states().len());
    let nodes: Vec<_> = fa
        .states()
        .iter()
        .map(|state| {
            let name = match names {
                StateNames::Labels => state.label.clone(),
                StateNames::Aliases => aliases[state.id.index()].clone(),
                StateNames::Blank if dead.contains(&state.id) => TRAP_LABEL.to_string(),
                StateNames::Blank => String::new(),
            };
            graph.add_node(GraphNode {
                name,
                start: state.id == fa.start(),
                accepting: fa.is_accepting(state.id),
            })
        })
        .collect();

    for transition in fa.aggregated_transitions() {
        graph.add_edge(
            nodes[transition.source.index()],
            nodes[transition.target.index()],
            transition.label(),
        );
    }

    graph
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Graphviz source: left-to-right, accepting states doubly circled, and an
/// invisible node pointing at the start state.
pub fn to_dot<A: FiniteAutomaton + ?Sized>(fa: &A, options: &DotOptions) -> String {
    let graph = to_graph(fa, options.names);
    let content = Dot::with_attr_getters(
        &graph,
        &[Config::GraphContentOnly, Config::NodeNoLabel, Config::EdgeNoLabel],
        &|_, edge| format!("label = \"{}\" ", escape(edge.weight())),
        &|_, (_, node)| {
            let shape = if node.accepting { "doublecircle" } else { "circle" };
            format!("label = \"{}\" shape = {} ", escape(&node.name), shape)
        },
    );

    let mut out = String::new();
    // writing into a String cannot fail
    _ = writeln!(out, "digraph {{");
    _ = writeln!(out, "    rankdir = LR");
    _ = writeln!(out, "    entry [ label = \"\" shape = none width = 0 ]");
    _ = writeln!(out, "    entry -> {}", fa.start());
    _ = write!(out, "{:?}", content);
    _ = writeln!(out, "}}");
    out
}
