use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, trace};

use super::{Nfa, State, StateId, Symbol};
use crate::regex::{Letter, Regex};

impl Nfa {
    /// Glushkov's position automaton: one state per letter occurrence plus a
    /// start state, and no epsilon edges.
    pub fn from_glushkov(re: &Regex) -> Nfa {
        let linear = re.linearized();

        let mut states = vec![State {
            id: StateId::new(0),
            label: "q0".to_string(),
        }];
        let mut position_states: HashMap<Letter, StateId> = HashMap::new();
        for letter in linear.letters() {
            let id = StateId::new(states.len());
            position_states.insert(letter, id);
            states.push(State {
                id,
                label: letter.to_string(),
            });
        }

        let start = StateId::new(0);
        let mut transitions: Vec<BTreeMap<Symbol, BTreeSet<StateId>>> = vec![BTreeMap::new(); states.len()];
        let mut add = |from: StateId, letter: &Letter| {
            let to = position_states[letter];
            trace!("glushkov edge {} --{}--> {}", from, letter.symbol, to);
            transitions[from.index()]
                .entry(Symbol::Char(letter.symbol))
                .or_default()
                .insert(to);
        };

        for prefix in &linear.prefixes() {
            add(start, prefix);
        }
        for (from, to) in &linear.pairs() {
            add(position_states[from], to);
        }

        let mut accepting: BTreeSet<StateId> = linear
            .suffixes()
            .iter()
            .map(|letter| position_states[letter])
            .collect();
        if linear.nullable() {
            accepting.insert(start);
        }

        debug!(
            "glushkov nfa for {}: {} states, {} accepting",
            linear,
            states.len(),
            accepting.len()
        );

        Nfa {
            states,
            alphabet: re.alphabet(),
            transitions,
            start,
            accepting,
        }
    }
}
