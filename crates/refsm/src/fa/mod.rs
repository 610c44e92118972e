//! Finite automata built from regular expressions.
//!
//! Both kinds of automata are produced whole by a construction
//! ([`Nfa::from_glushkov`], [`Nfa::from_thompson`], [`Dfa::from_nfa`],
//! [`Dfa::minimize`]) and are read-only afterwards. State ids are dense indices
//! into [`FiniteAutomaton::states`].

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use bit_set::BitSet;
use petgraph::graph::DiGraph;
use refsm_util::make_type_idx;
use serde::{Deserialize, Serialize};

use crate::regex::Regex;
use crate::trace::{self, Trace};

mod dot;
mod glushkov;
mod minimize;
mod subset;
mod table;
mod thompson;

pub use dot::{DotOptions, GraphNode, StateNames};
pub use table::TransitionTable;

/// A state: its id and a human readable label. The label is display text only,
/// equality of subset states is decided on member ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    pub id: StateId,
    pub label: String,
}

make_type_idx!(
    #[derive(Serialize, Deserialize)]
    #[serde(transparent)]
    pub StateId,
    State
);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Symbol {
    Epsilon,
    Char(char),
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Epsilon => write!(f, "ε"),
            Symbol::Char(c) => write!(f, "{}", c),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Transition {
    pub source: StateId,
    pub symbol: Symbol,
    pub target: StateId,
}

/// All parallel edges from `source` to `target`, merged into one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AggregatedTransition {
    pub source: StateId,
    pub symbols: Vec<Symbol>,
    pub target: StateId,
}

impl AggregatedTransition {
    pub fn label(&self) -> String {
        self.symbols
            .iter()
            .map(Symbol::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Construction {
    #[default]
    Glushkov,
    Thompson,
}

/// Serializable snapshot of an automaton's formal definition.
#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub kind: &'static str,
    pub states: &'a [State],
    pub alphabet: &'a BTreeSet<char>,
    pub start: StateId,
    pub accepting: &'a BTreeSet<StateId>,
    pub transitions: Vec<Transition>,
}

pub trait FiniteAutomaton {
    fn kind(&self) -> &'static str;
    fn states(&self) -> &[State];
    /// Input symbols, never epsilon.
    fn alphabet(&self) -> &BTreeSet<char>;
    fn start(&self) -> StateId;
    fn accepting(&self) -> &BTreeSet<StateId>;
    /// Every edge, ordered by source, then symbol, then target.
    fn transitions(&self) -> Vec<Transition>;
    fn accepts(&self, input: &str) -> bool;
    /// Precomputes the recognition of `input` as a list of steps.
    fn trace(&self, input: &str) -> Trace;

    fn state(&self, id: StateId) -> &State {
        &self.states()[id]
    }

    fn is_accepting(&self, id: StateId) -> bool {
        self.accepting().contains(&id)
    }

    fn aggregated_transitions(&self) -> Vec<AggregatedTransition> {
        let mut merged: BTreeMap<(StateId, StateId), Vec<Symbol>> = BTreeMap::new();
        for transition in self.transitions() {
            merged
                .entry((transition.source, transition.target))
                .or_default()
                .push(transition.symbol);
        }
        merged
            .into_iter()
            .map(|((source, target), symbols)| AggregatedTransition {
                source,
                symbols,
                target,
            })
            .collect()
    }

    /// States from which no accepting state can be reached, such as a
    /// materialized trap state.
    fn dead_states(&self) -> BTreeSet<StateId> {
        let count = self.states().len();
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); count];
        for transition in self.transitions() {
            predecessors[transition.target.index()].push(transition.source.index());
        }

        let mut alive = BitSet::with_capacity(count);
        let mut stack: Vec<usize> = self.accepting().iter().map(|s| s.index()).collect();
        while let Some(state) = stack.pop() {
            if alive.insert(state) {
                stack.extend(predecessors[state].iter().copied());
            }
        }

        (0..count).filter(|&i| !alive.contains(i)).map(StateId::new).collect()
    }

    /// Short names `q0, q1, ...` handed out breadth-first from the start state,
    /// indexed by state id. Unreachable states are named last.
    fn aliases(&self) -> Vec<String> {
        let count = self.states().len();
        let mut successors: Vec<Vec<StateId>> = vec![Vec::new(); count];
        for transition in self.transitions() {
            successors[transition.source.index()].push(transition.target);
        }

        let mut order: Vec<StateId> = Vec::with_capacity(count);
        let mut visited = BitSet::with_capacity(count);
        let mut queue = VecDeque::from([self.start()]);
        visited.insert(self.start().index());
        while let Some(state) = queue.pop_front() {
            order.push(state);
            for &next in &successors[state.index()] {
                if visited.insert(next.index()) {
                    queue.push_back(next);
                }
            }
        }
        order.extend((0..count).filter(|&i| !visited.contains(i)).map(StateId::new));

        let mut aliases = vec![String::new(); count];
        for (i, state) in order.into_iter().enumerate() {
            aliases[state.index()] = format!("q{}", i);
        }
        aliases
    }

    fn to_graph(&self, names: StateNames) -> DiGraph<GraphNode, String> {
        dot::to_graph(self, names)
    }

    fn to_dot(&self, options: &DotOptions) -> String {
        dot::to_dot(self, options)
    }

    fn summary(&self) -> Summary<'_> {
        Summary {
            kind: self.kind(),
            states: self.states(),
            alphabet: self.alphabet(),
            start: self.start(),
            accepting: self.accepting(),
            transitions: self.transitions(),
        }
    }
}

pub(crate) fn state_set(bits: &BitSet) -> BTreeSet<StateId> {
    bits.iter().map(StateId::new).collect()
}

// label of a set of states: "{a, b}" with members in id order
pub(crate) fn set_label<'a>(labels: impl Iterator<Item = &'a str>) -> String {
    format!("{{{}}}", labels.collect::<Vec<_>>().join(", "))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nfa {
    states: Vec<State>,
    alphabet: BTreeSet<char>,
    transitions: Vec<BTreeMap<Symbol, BTreeSet<StateId>>>,
    start: StateId,
    accepting: BTreeSet<StateId>,
}

impl Nfa {
    pub fn from_regex(regex: &Regex, construction: Construction) -> Nfa {
        match construction {
            Construction::Glushkov => Nfa::from_glushkov(regex),
            Construction::Thompson => Nfa::from_thompson(regex),
        }
    }

    pub fn edges(&self, state: StateId) -> &BTreeMap<Symbol, BTreeSet<StateId>> {
        &self.transitions[state.index()]
    }

    pub fn targets(&self, state: StateId, symbol: Symbol) -> impl Iterator<Item = StateId> + '_ {
        self.transitions[state.index()]
            .get(&symbol)
            .into_iter()
            .flatten()
            .copied()
    }

    pub fn has_epsilon_transitions(&self) -> bool {
        self.transitions
            .iter()
            .any(|edges| edges.contains_key(&Symbol::Epsilon))
    }

    /// A state that only routes epsilon edges onwards: it has no symbol edges
    /// and is not accepting, so it adds nothing to a closure on its own.
    pub fn is_intermediate(&self, state: StateId) -> bool {
        let edges = &self.transitions[state.index()];
        edges.len() == 1 && edges.contains_key(&Symbol::Epsilon) && !self.is_accepting(state)
    }

    /// The states reachable from `states` through epsilon edges, including
    /// `states` themselves, minus intermediate states.
    pub fn epsilon_closure(&self, states: &BitSet) -> BitSet {
        let mut closure = BitSet::with_capacity(self.states.len());
        let mut seen = BitSet::with_capacity(self.states.len());
        let mut stack: Vec<usize> = states.iter().collect();

        while let Some(current) = stack.pop() {
            let current = StateId::new(current);
            if !self.is_intermediate(current) {
                closure.insert(current.index());
            }
            for target in self.targets(current, Symbol::Epsilon) {
                if seen.insert(target.index()) {
                    if !self.is_intermediate(target) {
                        closure.insert(target.index());
                    }
                    stack.push(target.index());
                }
            }
        }

        closure
    }

    /// Epsilon closure of the `symbol` successors of one state.
    pub fn transition_from(&self, state: StateId, symbol: char) -> BitSet {
        let reached: BitSet = self
            .targets(state, Symbol::Char(symbol))
            .map(StateId::index)
            .collect();
        self.epsilon_closure(&reached)
    }

    pub(crate) fn step(&self, states: &BitSet, symbol: char) -> BitSet {
        let mut next = BitSet::with_capacity(self.states.len());
        for state in states.iter() {
            next.union_with(&self.transition_from(StateId::new(state), symbol));
        }
        next
    }

    pub(crate) fn start_closure(&self) -> BitSet {
        let mut start = BitSet::with_capacity(self.states.len());
        start.insert(self.start.index());
        self.epsilon_closure(&start)
    }

    /// Runs the automaton over `input`, returning acceptance and the states
    /// active at the end.
    pub fn simulate(&self, input: &str) -> (bool, BTreeSet<StateId>) {
        let mut current = self.start_closure();
        for c in input.chars() {
            current = self.step(&current, c);
        }
        let accepted = current.iter().any(|i| self.is_accepting(StateId::new(i)));
        (accepted, state_set(&current))
    }
}

impl FiniteAutomaton for Nfa {
    fn kind(&self) -> &'static str {
        "nfa"
    }

    fn states(&self) -> &[State] {
        &self.states
    }

    fn alphabet(&self) -> &BTreeSet<char> {
        &self.alphabet
    }

    fn start(&self) -> StateId {
        self.start
    }

    fn accepting(&self) -> &BTreeSet<StateId> {
        &self.accepting
    }

    fn transitions(&self) -> Vec<Transition> {
        let mut transitions = Vec::new();
        for (i, edges) in self.transitions.iter().enumerate() {
            for (&symbol, targets) in edges {
                transitions.extend(targets.iter().map(|&target| Transition {
                    source: StateId::new(i),
                    symbol,
                    target,
                }));
            }
        }
        transitions
    }

    fn accepts(&self, input: &str) -> bool {
        self.simulate(input).0
    }

    fn trace(&self, input: &str) -> Trace {
        trace::trace_nfa(self, input)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dfa {
    states: Vec<State>,
    alphabet: BTreeSet<char>,
    transitions: Vec<BTreeMap<char, StateId>>,
    start: StateId,
    accepting: BTreeSet<StateId>,
}

impl Dfa {
    pub fn next(&self, state: StateId, symbol: char) -> Option<StateId> {
        self.transitions[state.index()].get(&symbol).copied()
    }

    pub fn edges(&self, state: StateId) -> &BTreeMap<char, StateId> {
        &self.transitions[state.index()]
    }

    /// Whether every state has an edge for every symbol.
    pub fn is_complete(&self) -> bool {
        self.transitions
            .iter()
            .all(|edges| edges.len() == self.alphabet.len())
    }

    /// Runs the automaton over `input`. The state is `None` once an undefined
    /// edge has been taken.
    pub fn simulate(&self, input: &str) -> (bool, Option<StateId>) {
        let mut state = self.start;
        for c in input.chars() {
            match self.next(state, c) {
                Some(next) => state = next,
                None => return (false, None),
            }
        }
        (self.is_accepting(state), Some(state))
    }
}

impl FiniteAutomaton for Dfa {
    fn kind(&self) -> &'static str {
        "dfa"
    }

    fn states(&self) -> &[State] {
        &self.states
    }

    fn alphabet(&self) -> &BTreeSet<char> {
        &self.alphabet
    }

    fn start(&self) -> StateId {
        self.start
    }

    fn accepting(&self) -> &BTreeSet<StateId> {
        &self.accepting
    }

    fn transitions(&self) -> Vec<Transition> {
        let mut transitions = Vec::new();
        for (i, edges) in self.transitions.iter().enumerate() {
            transitions.extend(edges.iter().map(|(&c, &target)| Transition {
                source: StateId::new(i),
                symbol: Symbol::Char(c),
                target,
            }));
        }
        transitions
    }

    fn accepts(&self, input: &str) -> bool {
        self.simulate(input).0
    }

    fn trace(&self, input: &str) -> Trace {
        trace::trace_dfa(self, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Regex {
        text.parse().expect("failed to parse regex")
    }

    #[test]
    fn aggregated_transitions_merge_parallel_edges() {
        let dfa = Dfa::from_nfa(&Nfa::from_glushkov(&parse("(a|b)c")), false).minimize();
        let aggregated = dfa.aggregated_transitions();

        // {a[1]} and {b[2]} merge, so the a and b edges share a target
        assert_eq!(aggregated.len(), 2);
        assert_eq!(aggregated[0].symbols, vec![Symbol::Char('a'), Symbol::Char('b')]);
        assert_eq!(aggregated[0].label(), "a, b");
    }

    #[test]
    fn aliases_follow_breadth_first_order() {
        let nfa = Nfa::from_thompson(&parse("ab"));
        let aliases = nfa.aliases();

        assert_eq!(aliases[nfa.start().index()], "q0");
        let mut sorted = aliases.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), nfa.states().len());
    }

    #[test]
    fn dead_states_of_materialized_trap() {
        let dfa = Dfa::from_nfa(&Nfa::from_glushkov(&parse("ab")), true);
        let dead = dfa.dead_states();

        assert_eq!(dead.len(), 1);
        let trap = *dead.iter().next().expect("trap state");
        assert_eq!(dfa.state(trap).label, "∅");
        assert!(dfa.is_complete());
    }

    #[test]
    fn simulate_reports_final_states() {
        let nfa = Nfa::from_glushkov(&parse("ab*"));
        let (accepted, states) = nfa.simulate("abb");
        assert!(accepted);
        assert_eq!(
            states.iter().map(|&s| nfa.state(s).label.as_str()).collect::<Vec<_>>(),
            vec!["b[2]"]
        );

        let dfa = Dfa::from_nfa(&nfa, false);
        assert_eq!(dfa.simulate("b"), (false, None));
    }

    #[test]
    fn summary_serializes() {
        let nfa = Nfa::from_glushkov(&parse("a"));
        let json = serde_json::to_value(nfa.summary()).expect("serializable");

        assert_eq!(json["kind"], "nfa");
        assert_eq!(json["start"], 0);
        assert_eq!(json["transitions"][0]["symbol"]["Char"], "a");
    }
}
