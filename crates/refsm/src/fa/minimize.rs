use std::collections::{BTreeMap, BTreeSet};

use bit_set::BitSet;
use log::{debug, trace};

use super::{set_label, Dfa, State, StateId};

impl Dfa {
    // successor of `state` on `c`; a partial dfa is completed by a virtual
    // trap state numbered `self.states.len()`
    fn total_next(&self, state: usize, c: char) -> usize {
        let trap = self.states.len();
        if state == trap {
            return trap;
        }
        self.transitions[state].get(&c).map_or(trap, |next| next.index())
    }

    // inverse[c][t]: the states whose c-edge leads to t, virtual trap included
    fn inverse_transitions(&self, total: usize) -> Vec<Vec<Vec<usize>>> {
        self.alphabet
            .iter()
            .map(|&c| {
                let mut sources = vec![Vec::new(); total];
                for state in 0..total {
                    sources[self.total_next(state, c)].push(state);
                }
                sources
            })
            .collect()
    }

    /// Hopcroft's partition refinement. Each block of equivalent states
    /// becomes one state; blocks are ordered by their smallest member.
    pub fn minimize(&self) -> Dfa {
        let real = self.states.len();
        let total = if self.is_complete() { real } else { real + 1 };
        let inverse = self.inverse_transitions(total);

        let accept: BitSet = self.accepting.iter().map(|s| s.index()).collect();
        let mut nonaccept: BitSet = (0..total).collect();
        nonaccept.difference_with(&accept);

        let mut partition: Vec<BitSet> = [accept, nonaccept]
            .into_iter()
            .filter(|block| !block.is_empty())
            .collect();
        let mut block_of: Vec<usize> = vec![0; total];
        for (i, block) in partition.iter().enumerate() {
            for state in block.iter() {
                block_of[state] = i;
            }
        }
        let mut work_list: Vec<usize> = (0..partition.len()).collect();

        while let Some(a) = work_list.pop() {
            let splitter = partition[a].clone();
            for sources in &inverse {
                // states whose edge on this symbol leads into the splitter
                let x: BitSet = splitter
                    .iter()
                    .flat_map(|target| sources[target].iter().copied())
                    .collect();
                let touched: BTreeSet<usize> = x.iter().map(|state| block_of[state]).collect();

                for y in touched {
                    let outside: BitSet = partition[y].difference(&x).collect();
                    if outside.is_empty() {
                        continue;
                    }
                    let inside: BitSet = partition[y].intersection(&x).collect();
                    trace!("splitting {:?} into {:?} / {:?}", partition[y], inside, outside);

                    // the smaller half becomes a new block and is always
                    // queued; if y was waiting, its remainder still is
                    let (kept, moved) = if inside.len() <= outside.len() {
                        (outside, inside)
                    } else {
                        (inside, outside)
                    };
                    let new_block = partition.len();
                    for state in moved.iter() {
                        block_of[state] = new_block;
                    }
                    partition[y] = kept;
                    partition.push(moved);
                    work_list.push(new_block);
                }
            }
        }

        // the virtual trap only survives inside a block with real states
        let mut blocks: Vec<BitSet> = partition
            .into_iter()
            .map(|mut block| {
                block.remove(real);
                block
            })
            .filter(|block| !block.is_empty())
            .collect();
        blocks.sort_by_key(|block| block.iter().next());

        let mut block_of: Vec<StateId> = vec![StateId::new(0); real];
        let mut states: Vec<State> = Vec::with_capacity(blocks.len());
        for (i, block) in blocks.iter().enumerate() {
            let id = StateId::new(i);
            for member in block.iter() {
                block_of[member] = id;
            }
            let label = if block.len() == 1 {
                block
                    .iter()
                    .map(|member| self.states[member].label.clone())
                    .collect()
            } else {
                set_label(block.iter().map(|member| self.states[member].label.as_str()))
            };
            states.push(State { id, label });
        }

        let mut transitions: Vec<BTreeMap<char, StateId>> = vec![BTreeMap::new(); states.len()];
        for (source, edges) in self.transitions.iter().enumerate() {
            for (&c, target) in edges {
                transitions[block_of[source].index()].insert(c, block_of[target.index()]);
            }
        }

        let accepting: BTreeSet<StateId> = self.accepting.iter().map(|s| block_of[s.index()]).collect();

        debug!("minimized dfa: {} states -> {} states", real, states.len());

        Dfa {
            states,
            alphabet: self.alphabet.clone(),
            transitions,
            start: block_of[self.start.index()],
            accepting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fa::{FiniteAutomaton, Nfa};
    use crate::regex::Regex;

    fn dfa(text: &str, include_dead_state: bool) -> Dfa {
        let re: Regex = text.parse().expect("failed to parse regex");
        Dfa::from_nfa(&Nfa::from_thompson(&re), include_dead_state)
    }

    #[test]
    fn textbook_example() {
        let minimal = dfa("(a|b)*abb", false).minimize();

        assert_eq!(minimal.states().len(), 4);
        assert_eq!(minimal.accepting().len(), 1);
        assert!(minimal.accepts("abb"));
        assert!(minimal.accepts("babbaabb"));
        assert!(!minimal.accepts("babbaabbb"));
        assert!(!minimal.accepts(""));
    }

    #[test]
    fn glushkov_subsets_merge() {
        let re: Regex = "(a|b)*abb".parse().expect("failed to parse regex");
        let minimal = Dfa::from_nfa(&Nfa::from_glushkov(&re), false).minimize();

        // {q0} and {b[2]} behave the same
        assert_eq!(
            minimal.states().iter().map(|s| s.label.as_str()).collect::<Vec<_>>(),
            vec!["{{q0}, {b[2]}}", "{a[1], a[3]}", "{b[2], b[4]}", "{b[2], b[5]}"]
        );
        assert_eq!(minimal.start(), StateId::new(0));
    }

    #[test]
    fn idempotent() {
        for text in ["(a|b)*abb", "a?b+|ε", "(ab|a)*", "a|b|c"] {
            for include_dead_state in [false, true] {
                let once = dfa(text, include_dead_state).minimize();
                let twice = once.minimize();
                assert_eq!(once.states().len(), twice.states().len(), "{}", text);
            }
        }
    }

    #[test]
    fn partial_dfa_stays_partial() {
        let minimal = dfa("ab", false).minimize();

        assert_eq!(minimal.states().len(), 3);
        assert!(!minimal.is_complete());
        assert!(minimal.dead_states().is_empty());
    }

    #[test]
    fn trap_state_is_kept_when_materialized() {
        let minimal = dfa("ab", true).minimize();

        assert_eq!(minimal.states().len(), 4);
        assert!(minimal.is_complete());
        assert_eq!(minimal.dead_states().len(), 1);
    }

    #[test]
    fn equivalent_accepting_states_merge() {
        // {a[1]} and {b[2]} both accept with only the trap after them
        let re: Regex = "a|b".parse().expect("failed to parse regex");
        let dfa = Dfa::from_nfa(&Nfa::from_glushkov(&re), true);
        let minimal = dfa.minimize();

        assert_eq!(dfa.states().len(), 4);
        assert_eq!(minimal.states().len(), 3);
        assert_eq!(minimal.accepting().len(), 1);
        assert_eq!(minimal.state(StateId::new(1)).label, "{{a[1]}, {b[2]}}");
    }

    #[test]
    fn inverse_includes_virtual_trap() {
        let partial = dfa("ab", false);
        let after_a = partial.next(StateId::new(0), 'a').expect("edge on a").index();
        let after_ab = partial.next(StateId::new(after_a), 'b').expect("edge on b").index();
        let trap = partial.states().len();

        let inverse = partial.inverse_transitions(trap + 1);
        // alphabet order: a, b
        assert_eq!(inverse[0][after_a], vec![0]);
        assert_eq!(inverse[1][after_ab], vec![after_a]);
        let mut into_trap_on_a = inverse[0][trap].clone();
        into_trap_on_a.sort();
        let mut expected = vec![after_a, after_ab, trap];
        expected.sort();
        assert_eq!(into_trap_on_a, expected);
        // every state has exactly one successor per symbol
        for sources in &inverse {
            assert_eq!(sources.iter().map(Vec::len).sum::<usize>(), trap + 1);
        }
    }

    #[test]
    fn fourth_symbol_from_the_end() {
        let text = "(a|b)*a(a|b)(a|b)(a|b)";
        let re: Regex = text.parse().expect("failed to parse regex");
        let from_glushkov = Dfa::from_nfa(&Nfa::from_glushkov(&re), false).minimize();
        let from_thompson = dfa(text, false).minimize();

        // one state per window of the last four symbols
        assert_eq!(from_glushkov.states().len(), 16);
        assert_eq!(from_thompson.states().len(), 16);
        for minimal in [&from_glushkov, &from_thompson] {
            assert!(minimal.is_complete());
            assert!(minimal.accepts("abbb"));
            assert!(minimal.accepts("bbabab"));
            assert!(!minimal.accepts("abbbb"));
            assert!(!minimal.accepts("aaa"));
        }
    }

    #[test]
    fn long_chain_keeps_every_state() {
        let text = "ab".repeat(200);
        let minimal = dfa(&text, false).minimize();

        assert_eq!(minimal.states().len(), 401);
        assert!(minimal.accepts(&text));
        assert!(!minimal.accepts(&text[1..]));
    }

    #[test]
    fn no_accepting_states() {
        // everything lands in one block
        let start_only = Dfa {
            states: vec![State {
                id: StateId::new(0),
                label: "{q0}".to_string(),
            }],
            alphabet: BTreeSet::from(['a']),
            transitions: vec![BTreeMap::new()],
            start: StateId::new(0),
            accepting: BTreeSet::new(),
        };

        let minimized = start_only.minimize();
        assert_eq!(minimized.states().len(), 1);
        assert!(!minimized.accepts(""));
        assert!(!minimized.accepts("a"));
    }
}
