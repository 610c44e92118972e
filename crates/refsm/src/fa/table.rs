use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::{set_label, FiniteAutomaton, StateId, Symbol};
use super::subset::TRAP_LABEL;

/// The formal definition (Q, Σ, δ, q0, F) of an automaton, printable as text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionTable {
    names: Vec<String>,
    alphabet: Vec<Symbol>,
    start: StateId,
    accepting: BTreeSet<StateId>,
    // one row per state, one cell per alphabet column
    cells: Vec<Vec<BTreeSet<StateId>>>,
    deterministic: bool,
}

impl TransitionTable {
    pub fn new<A: FiniteAutomaton + ?Sized>(fa: &A) -> TransitionTable {
        let names = fa.states().iter().map(|state| state.label.clone()).collect();
        Self::with_names(fa, names)
    }

    pub fn with_aliases<A: FiniteAutomaton + ?Sized>(fa: &A) -> TransitionTable {
        Self::with_names(fa, fa.aliases())
    }

    fn with_names<A: FiniteAutomaton + ?Sized>(fa: &A, names: Vec<String>) -> TransitionTable {
        let transitions = fa.transitions();

        let mut alphabet: Vec<Symbol> = fa.alphabet().iter().map(|&c| Symbol::Char(c)).collect();
        if transitions.iter().any(|t| t.symbol == Symbol::Epsilon) {
            alphabet.push(Symbol::Epsilon);
        }
        let column: BTreeMap<Symbol, usize> = alphabet.iter().enumerate().map(|(i, &s)| (s, i)).collect();

        let mut cells = vec![vec![BTreeSet::new(); alphabet.len()]; fa.states().len()];
        for transition in transitions {
            cells[transition.source.index()][column[&transition.symbol]].insert(transition.target);
        }

        TransitionTable {
            names,
            alphabet,
            start: fa.start(),
            accepting: fa.accepting().clone(),
            cells,
            deterministic: fa.kind() == "dfa",
        }
    }

    pub fn targets(&self, state: StateId, symbol: Symbol) -> Option<&BTreeSet<StateId>> {
        let column = self.alphabet.iter().position(|&s| s == symbol)?;
        Some(&self.cells[state.index()][column])
    }

    fn name_set(&self, ids: &BTreeSet<StateId>) -> String {
        set_label(ids.iter().map(|id| self.names[id.index()].as_str()))
    }

    fn cell(&self, targets: &BTreeSet<StateId>) -> String {
        match targets.iter().next() {
            None => TRAP_LABEL.to_string(),
            Some(&only) if self.deterministic => self.names[only.index()].clone(),
            Some(_) => self.name_set(targets),
        }
    }
}

fn column_width<'a>(column: impl Iterator<Item = &'a String>) -> usize {
    column.map(|text| text.chars().count()).max().unwrap_or(0)
}

impl fmt::Display for TransitionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let all: BTreeSet<StateId> = (0..self.names.len()).map(StateId::new).collect();
        let letters = self
            .alphabet
            .iter()
            .filter(|&&s| s != Symbol::Epsilon)
            .map(Symbol::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        writeln!(f, "Q  = {}", self.name_set(&all))?;
        writeln!(f, "Σ  = {{{}}}", letters)?;
        writeln!(f, "q0 = {}", self.names[self.start.index()])?;
        writeln!(f, "F  = {}", self.name_set(&self.accepting))?;
        writeln!(f, "δ:")?;

        // rows are prefixed with -> for the start state and * for accepting ones
        let rows: Vec<(String, Vec<String>)> = (0..self.names.len())
            .map(|i| {
                let id = StateId::new(i);
                let marker = match (id == self.start, self.accepting.contains(&id)) {
                    (true, true) => "->*",
                    (true, false) => "-> ",
                    (false, true) => "  *",
                    (false, false) => "   ",
                };
                let cells = self.cells[i].iter().map(|targets| self.cell(targets)).collect();
                (format!("{} {}", marker, self.names[i]), cells)
            })
            .collect();

        let header: Vec<String> = self.alphabet.iter().map(Symbol::to_string).collect();
        let first_width = column_width(rows.iter().map(|(name, _)| name));
        let widths: Vec<usize> = (0..self.alphabet.len())
            .map(|c| column_width(rows.iter().map(|(_, cells)| &cells[c]).chain(std::iter::once(&header[c]))))
            .collect();

        write!(f, "{:first_width$}", "")?;
        for (name, &w) in header.iter().zip(&widths) {
            write!(f, " | {:w$}", name)?;
        }
        writeln!(f)?;
        for (name, cells) in &rows {
            write!(f, "{:first_width$}", name)?;
            for (cell, &w) in cells.iter().zip(&widths) {
                write!(f, " | {:w$}", cell)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fa::{Dfa, Nfa};
    use crate::regex::Regex;

    fn parse(text: &str) -> Regex {
        text.parse().expect("failed to parse regex")
    }

    #[test]
    fn nfa_cells_are_sets() {
        let nfa = Nfa::from_glushkov(&parse("a|ab"));
        let table = TransitionTable::new(&nfa);
        let text = table.to_string();

        assert!(text.contains("Q  = {q0, a[1], a[2], b[3]}"));
        assert!(text.contains("Σ  = {a, b}"));
        assert!(text.contains("F  = {a[1], b[3]}"));
        assert!(text.contains("{a[1], a[2]}"));
        assert_eq!(
            table.targets(StateId::new(2), Symbol::Char('b')),
            Some(&BTreeSet::from([StateId::new(3)]))
        );
    }

    #[test]
    fn epsilon_column_only_when_used() {
        let thompson = TransitionTable::new(&Nfa::from_thompson(&parse("a*")));
        assert!(thompson.targets(StateId::new(0), Symbol::Epsilon).is_some());

        let glushkov = TransitionTable::new(&Nfa::from_glushkov(&parse("a*")));
        assert!(glushkov.targets(StateId::new(0), Symbol::Epsilon).is_none());
    }

    #[test]
    fn dfa_cells_are_single_states() {
        let dfa = Dfa::from_nfa(&Nfa::from_glushkov(&parse("ab")), false);
        let text = TransitionTable::with_aliases(&dfa).to_string();

        assert!(text.contains("q0 = q0"));
        assert!(text.contains("F  = {q2}"));
        let start_row = text
            .lines()
            .find(|line| line.starts_with("->"))
            .expect("start row");
        // q0 goes to q1 on a and nowhere on b
        assert!(start_row.contains("q0"));
        assert_eq!(
            start_row.split('|').skip(1).map(str::trim).collect::<Vec<_>>(),
            vec!["q1", "∅"]
        );
    }
}
