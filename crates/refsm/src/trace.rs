//! Step-by-step recognition of an input string.
//!
//! A [`Trace`] is computed once, up front, and then replayed: moving the
//! cursor never re-runs the automaton.

use std::collections::{BTreeSet, VecDeque};

use bit_set::BitSet;
use serde::{Deserialize, Serialize};

use crate::fa::{state_set, Dfa, FiniteAutomaton, Nfa, StateId, Symbol, Transition};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Recognized,
    NotRecognized,
    /// The automaton ran out of states before the input ended.
    ImmatureAbort,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Step {
    /// The start configuration and the epsilon edges walked to reach it.
    Initial {
        states: BTreeSet<StateId>,
        edges: Vec<Transition>,
    },
    /// Active states after consuming the symbol at `index` (`None` before the
    /// first symbol).
    State {
        index: Option<usize>,
        states: BTreeSet<StateId>,
    },
    /// Edges taken while consuming the symbol at `index`: symbol edges first,
    /// then epsilon edges in breadth-first order. Empty when a DFA has no
    /// edge for the symbol.
    Transition {
        index: usize,
        symbol: char,
        edges: Vec<Transition>,
    },
    /// The symbol at `index` is not in the alphabet.
    Error { index: usize, symbol: char },
    Complete {
        status: Status,
        states: BTreeSet<StateId>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    input: String,
    steps: Vec<Step>,
    cursor: usize,
}

impl Trace {
    fn new(input: &str, steps: Vec<Step>) -> Trace {
        Trace {
            input: input.to_string(),
            steps,
            cursor: 0,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    // never zero: a trace always holds its initial step
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> &Step {
        &self.steps[self.cursor]
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor + 1 == self.steps.len()
    }

    /// Advances the cursor. Returns `None` (and stays put) on the last step.
    pub fn step_forward(&mut self) -> Option<&Step> {
        if self.is_at_end() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }

    /// Moves the cursor back. Returns `None` (and stays put) on the first step.
    pub fn step_back(&mut self) -> Option<&Step> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    pub fn seek(&mut self, position: usize) -> Option<&Step> {
        if position >= self.steps.len() {
            return None;
        }
        self.cursor = position;
        Some(self.current())
    }

    /// Outcome of the run; `None` when it stopped on an unknown symbol.
    pub fn status(&self) -> Option<Status> {
        match self.steps.last() {
            Some(Step::Complete { status, .. }) => Some(*status),
            _ => None,
        }
    }

    pub fn accepted(&self) -> bool {
        self.status() == Some(Status::Recognized)
    }
}

// epsilon edges reachable from `from`, breadth first
fn epsilon_edges(nfa: &Nfa, from: &BitSet) -> Vec<Transition> {
    let mut edges = Vec::new();
    let mut seen = from.clone();
    let mut queue: VecDeque<usize> = from.iter().collect();

    while let Some(source) = queue.pop_front() {
        let source = StateId::new(source);
        for target in nfa.targets(source, Symbol::Epsilon) {
            edges.push(Transition {
                source,
                symbol: Symbol::Epsilon,
                target,
            });
            if seen.insert(target.index()) {
                queue.push_back(target.index());
            }
        }
    }

    edges
}

pub(crate) fn trace_nfa(nfa: &Nfa, input: &str) -> Trace {
    let mut start = BitSet::new();
    start.insert(nfa.start().index());
    let mut current = nfa.start_closure();

    let mut steps = vec![
        Step::Initial {
            states: state_set(&current),
            edges: epsilon_edges(nfa, &start),
        },
        Step::State {
            index: None,
            states: state_set(&current),
        },
    ];

    for (index, symbol) in input.chars().enumerate() {
        if !nfa.alphabet().contains(&symbol) {
            steps.push(Step::Error { index, symbol });
            return Trace::new(input, steps);
        }

        let mut edges = Vec::new();
        let mut reached = BitSet::new();
        for source in current.iter().map(StateId::new) {
            for target in nfa.targets(source, Symbol::Char(symbol)) {
                reached.insert(target.index());
                edges.push(Transition {
                    source,
                    symbol: Symbol::Char(symbol),
                    target,
                });
            }
        }
        edges.extend(epsilon_edges(nfa, &reached));

        current = nfa.step(&current, symbol);
        steps.push(Step::Transition {
            index,
            symbol,
            edges,
        });
        steps.push(Step::State {
            index: Some(index),
            states: state_set(&current),
        });

        if current.is_empty() {
            steps.push(Step::Complete {
                status: Status::ImmatureAbort,
                states: BTreeSet::new(),
            });
            return Trace::new(input, steps);
        }
    }

    let states = state_set(&current);
    let status = if states.iter().any(|&s| nfa.is_accepting(s)) {
        Status::Recognized
    } else {
        Status::NotRecognized
    };
    steps.push(Step::Complete { status, states });
    Trace::new(input, steps)
}

pub(crate) fn trace_dfa(dfa: &Dfa, input: &str) -> Trace {
    let mut state = dfa.start();
    let mut steps = vec![
        Step::Initial {
            states: BTreeSet::from([state]),
            edges: Vec::new(),
        },
        Step::State {
            index: None,
            states: BTreeSet::from([state]),
        },
    ];

    for (index, symbol) in input.chars().enumerate() {
        if !dfa.alphabet().contains(&symbol) {
            steps.push(Step::Error { index, symbol });
            return Trace::new(input, steps);
        }

        let Some(next) = dfa.next(state, symbol) else {
            steps.push(Step::Transition {
                index,
                symbol,
                edges: Vec::new(),
            });
            steps.push(Step::Complete {
                status: Status::ImmatureAbort,
                states: BTreeSet::new(),
            });
            return Trace::new(input, steps);
        };

        steps.push(Step::Transition {
            index,
            symbol,
            edges: vec![Transition {
                source: state,
                symbol: Symbol::Char(symbol),
                target: next,
            }],
        });
        steps.push(Step::State {
            index: Some(index),
            states: BTreeSet::from([next]),
        });
        state = next;
    }

    let status = if dfa.is_accepting(state) {
        Status::Recognized
    } else {
        Status::NotRecognized
    };
    steps.push(Step::Complete {
        status,
        states: BTreeSet::from([state]),
    });
    Trace::new(input, steps)
}
