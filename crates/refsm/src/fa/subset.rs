use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use bit_set::BitSet;
use log::{debug, trace};

use super::{set_label, Dfa, FiniteAutomaton, Nfa, State, StateId};

pub(crate) const TRAP_LABEL: &str = "∅";

struct SubsetBuilder<'a> {
    nfa: &'a Nfa,
    states: Vec<State>,
    transitions: Vec<BTreeMap<char, StateId>>,
    accepting: BTreeSet<StateId>,
    // configuration -> id
    subsets: HashMap<BitSet, StateId>,
    work_queue: VecDeque<(BitSet, StateId)>,
}

impl SubsetBuilder<'_> {
    // returns the id of `configuration`, creating and enqueueing it if new
    fn intern(&mut self, configuration: BitSet) -> StateId {
        if let Some(&id) = self.subsets.get(&configuration) {
            return id;
        }

        let label = if configuration.is_empty() {
            TRAP_LABEL.to_string()
        } else {
            set_label(configuration.iter().map(|i| self.nfa.states[i].label.as_str()))
        };
        let id = StateId::new(self.states.len());
        self.states.push(State { id, label });
        self.transitions.push(BTreeMap::new());
        if configuration.iter().any(|i| self.nfa.is_accepting(StateId::new(i))) {
            self.accepting.insert(id);
        }
        trace!("new dfa state {} = {}", id, self.states[id].label);

        self.subsets.insert(configuration.clone(), id);
        self.work_queue.push_back((configuration, id));
        id
    }
}

impl Dfa {
    /// Subset construction. Each DFA state stands for an epsilon-closed set
    /// of NFA states; states are numbered in breadth-first discovery order.
    ///
    /// With `include_dead_state`, a missing successor becomes an explicit,
    /// non-accepting trap state labeled `∅` instead of an absent edge.
    pub fn from_nfa(nfa: &Nfa, include_dead_state: bool) -> Dfa {
        let mut builder = SubsetBuilder {
            nfa,
            states: Vec::new(),
            transitions: Vec::new(),
            accepting: BTreeSet::new(),
            subsets: HashMap::new(),
            work_queue: VecDeque::new(),
        };

        let start = builder.intern(nfa.start_closure());

        while let Some((q, from)) = builder.work_queue.pop_front() {
            for &c in nfa.alphabet() {
                let t = nfa.step(&q, c);
                if t.is_empty() && !include_dead_state {
                    continue;
                }

                let to = builder.intern(t);
                builder.transitions[from.index()].insert(c, to);
            }
        }

        debug!(
            "subset construction: {} nfa states -> {} dfa states{}",
            nfa.states.len(),
            builder.states.len(),
            if include_dead_state { " (with trap)" } else { "" }
        );

        Dfa {
            states: builder.states,
            alphabet: nfa.alphabet.clone(),
            transitions: builder.transitions,
            start,
            accepting: builder.accepting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::Regex;

    fn parse(text: &str) -> Regex {
        text.parse().expect("failed to parse regex")
    }

    fn labels(dfa: &Dfa) -> Vec<&str> {
        dfa.states().iter().map(|s| s.label.as_str()).collect()
    }

    #[test]
    fn glushkov_subsets() {
        let dfa = Dfa::from_nfa(&Nfa::from_glushkov(&parse("(a|b)*abb")), false);

        assert_eq!(
            labels(&dfa),
            vec!["{q0}", "{a[1], a[3]}", "{b[2]}", "{b[2], b[4]}", "{b[2], b[5]}"]
        );
        assert_eq!(dfa.start(), StateId::new(0));
        assert_eq!(dfa.accepting(), &BTreeSet::from([StateId::new(4)]));
        assert!(dfa.is_complete());
        assert!(dfa.accepts("babbaabb"));
        assert!(!dfa.accepts("babbaabbb"));
    }

    #[test]
    fn intermediate_states_are_collapsed() {
        let nfa = Nfa::from_thompson(&parse("a|b"));
        let dfa = Dfa::from_nfa(&nfa, false);

        // the choice start and both fragment ends only have epsilon edges and
        // never become members: {2, 4} reaches {1} on either letter
        assert_eq!(dfa.states().len(), 2);
        assert_eq!(dfa.state(dfa.start()).label, "{2, 4}");
        assert!(!dfa.state(dfa.start()).label.contains(&nfa.state(nfa.start()).label));
        assert!(dfa.accepts("a"));
        assert!(dfa.accepts("b"));
        assert!(!dfa.accepts(""));
    }

    #[test]
    fn missing_edges_without_trap() {
        let dfa = Dfa::from_nfa(&Nfa::from_glushkov(&parse("ab")), false);

        assert_eq!(labels(&dfa), vec!["{q0}", "{a[1]}", "{b[2]}"]);
        assert!(!dfa.is_complete());
        assert_eq!(dfa.next(StateId::new(0), 'b'), None);
    }

    #[test]
    fn trap_is_materialized_once() {
        let dfa = Dfa::from_nfa(&Nfa::from_glushkov(&parse("ab")), true);

        assert_eq!(labels(&dfa), vec!["{q0}", "{a[1]}", "∅", "{b[2]}"]);
        let trap = StateId::new(2);
        assert!(!dfa.is_accepting(trap));
        assert_eq!(dfa.next(trap, 'a'), Some(trap));
        assert_eq!(dfa.next(trap, 'b'), Some(trap));
        assert!(dfa.is_complete());
    }

    #[test]
    fn nullable_start_is_accepting() {
        let dfa = Dfa::from_nfa(&Nfa::from_thompson(&parse("a*")), false);

        assert!(dfa.is_accepting(dfa.start()));
        assert!(dfa.accepts(""));
        assert!(dfa.accepts("aaaa"));
    }
}
