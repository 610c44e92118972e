use std::collections::{BTreeMap, BTreeSet};

use bit_set::BitSet;
use log::debug;

use super::{Nfa, State, StateId, Symbol};
use crate::regex::Regex;

// arena node; ids are positions in the arena until the nfa is frozen
#[derive(Debug, Clone, Default)]
struct ThompsonNode {
    transitions: Vec<(Symbol, usize)>,
}

// invariant: a fragment's accept state has no outgoing edges and its start
// state has no incoming edges, so both can be glued without copying
fn fragment(re: &Regex, nodes: &mut Vec<ThompsonNode>, eliminated: &mut BitSet) -> (usize, usize) {
    match re {
        Regex::Letter(letter) => atom(Symbol::Char(letter.symbol), nodes),
        Regex::Epsilon(_) => atom(Symbol::Epsilon, nodes),
        Regex::Choice(left, right) => {
            let start = push(nodes);
            let end = push(nodes);

            let (left_start, left_end) = fragment(left, nodes, eliminated);
            let (right_start, right_end) = fragment(right, nodes, eliminated);

            nodes[start].transitions.push((Symbol::Epsilon, left_start));
            nodes[start].transitions.push((Symbol::Epsilon, right_start));
            nodes[left_end].transitions.push((Symbol::Epsilon, end));
            nodes[right_end].transitions.push((Symbol::Epsilon, end));

            (start, end)
        }
        Regex::Concatenation(left, right) => {
            let (left_start, left_end) = fragment(left, nodes, eliminated);
            let (right_start, right_end) = fragment(right, nodes, eliminated);

            // left's accept state disappears; whatever led into it now
            // leads into right's start
            for node in nodes.iter_mut() {
                for (_, target) in node.transitions.iter_mut() {
                    if *target == left_end {
                        *target = right_start;
                    }
                }
            }
            eliminated.insert(left_end);

            (left_start, right_end)
        }
        Regex::Optional(inner) => {
            let (inner_start, inner_end) = fragment(inner, nodes, eliminated);
            nodes[inner_start].transitions.push((Symbol::Epsilon, inner_end));
            (inner_start, inner_end)
        }
        Regex::KleeneStar(inner) => {
            let start = push(nodes);
            let end = push(nodes);

            let (inner_start, inner_end) = fragment(inner, nodes, eliminated);
            nodes[start].transitions.push((Symbol::Epsilon, inner_start));
            nodes[start].transitions.push((Symbol::Epsilon, end));
            nodes[inner_end].transitions.push((Symbol::Epsilon, inner_start));
            nodes[inner_end].transitions.push((Symbol::Epsilon, end));

            (start, end)
        }
        Regex::KleenePlus(inner) => {
            let start = push(nodes);
            let end = push(nodes);

            let (inner_start, inner_end) = fragment(inner, nodes, eliminated);
            nodes[start].transitions.push((Symbol::Epsilon, inner_start));
            nodes[inner_end].transitions.push((Symbol::Epsilon, inner_start));
            nodes[inner_end].transitions.push((Symbol::Epsilon, end));

            (start, end)
        }
    }
}

fn push(nodes: &mut Vec<ThompsonNode>) -> usize {
    nodes.push(ThompsonNode::default());
    nodes.len() - 1
}

fn atom(symbol: Symbol, nodes: &mut Vec<ThompsonNode>) -> (usize, usize) {
    let start = push(nodes);
    let end = push(nodes);
    nodes[start].transitions.push((symbol, end));
    (start, end)
}

impl Nfa {
    /// Thompson's construction: one fragment per tree node, glued together
    /// with epsilon edges. The result has exactly one accepting state.
    pub fn from_thompson(re: &Regex) -> Nfa {
        let mut nodes: Vec<ThompsonNode> = Vec::new();
        let mut eliminated = BitSet::new();
        let (start, end) = fragment(re, &mut nodes, &mut eliminated);

        // freeze: surviving nodes are renumbered densely in creation order
        let mut renumbered: Vec<Option<StateId>> = vec![None; nodes.len()];
        let mut states: Vec<State> = Vec::new();
        for i in (0..nodes.len()).filter(|&i| !eliminated.contains(i)) {
            let id = StateId::new(states.len());
            renumbered[i] = Some(id);
            states.push(State {
                id,
                label: id.to_string(),
            });
        }
        let new_id = |i: usize| renumbered[i].unwrap_or_else(|| unreachable!("edge into eliminated state {}", i));

        let mut transitions: Vec<BTreeMap<Symbol, BTreeSet<StateId>>> = vec![BTreeMap::new(); states.len()];
        for (i, node) in nodes.iter().enumerate() {
            let Some(source) = renumbered[i] else { continue };
            for &(symbol, target) in &node.transitions {
                transitions[source.index()]
                    .entry(symbol)
                    .or_default()
                    .insert(new_id(target));
            }
        }

        let nfa = Nfa {
            states,
            alphabet: re.alphabet(),
            transitions,
            start: new_id(start),
            accepting: BTreeSet::from([new_id(end)]),
        };
        debug!(
            "thompson nfa: {} states ({} eliminated), {} edges",
            nfa.states.len(),
            eliminated.len(),
            nfa.transitions.iter().flat_map(|edges| edges.values()).map(BTreeSet::len).sum::<usize>()
        );
        nfa
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fa::FiniteAutomaton;

    fn parse(text: &str) -> Regex {
        text.parse().expect("failed to parse regex")
    }

    #[test]
    fn letter_is_two_states() {
        let nfa = Nfa::from_thompson(&parse("a"));

        assert_eq!(nfa.states().len(), 2);
        assert_eq!(nfa.start(), StateId::new(0));
        assert_eq!(nfa.accepting(), &BTreeSet::from([StateId::new(1)]));
        assert_eq!(nfa.state(StateId::new(1)).label, "1");
    }

    #[test]
    fn concatenation_eliminates_a_state() {
        // 2 + 2 states, one of them merged away
        let nfa = Nfa::from_thompson(&parse("ab"));

        assert_eq!(nfa.states().len(), 3);
        assert!(!nfa.has_epsilon_transitions());
        assert!(nfa.accepts("ab"));
        assert!(!nfa.accepts("a"));
    }

    #[test]
    fn single_accepting_state() {
        for text in ["a|b", "(ab)*", "a+b?", "(a|ε)+", "a?b*c+"] {
            let nfa = Nfa::from_thompson(&parse(text));
            assert_eq!(nfa.accepting().len(), 1, "{}", text);

            let accept = *nfa.accepting().iter().next().expect("accept state");
            assert!(nfa.edges(accept).is_empty(), "{}", text);
        }
    }

    #[test]
    fn star_shape() {
        let nfa = Nfa::from_thompson(&parse("a*"));

        // start, end, and the letter fragment
        assert_eq!(nfa.states().len(), 4);
        assert!(nfa.has_epsilon_transitions());
        assert!(nfa.accepts(""));
        assert!(nfa.accepts("aaa"));
        assert!(!nfa.alphabet().contains(&'ε'));
    }

    #[test]
    fn plus_requires_one_iteration() {
        let nfa = Nfa::from_thompson(&parse("(ab)+"));

        assert!(!nfa.accepts(""));
        assert!(nfa.accepts("ab"));
        assert!(nfa.accepts("abab"));
        assert!(!nfa.accepts("aba"));
    }

    #[test]
    fn ids_are_dense() {
        let nfa = Nfa::from_thompson(&parse("(a|b)*abb"));

        for (i, state) in nfa.states().iter().enumerate() {
            assert_eq!(state.id.index(), i);
        }
        assert!(nfa.transitions().iter().all(|t| t.target.index() < nfa.states().len()));
    }
}
