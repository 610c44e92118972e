use log::debug;
use serde::{Deserialize, Serialize};

use crate::fa::{Dfa, FiniteAutomaton, Nfa};
use crate::regex::{Regex, RegexError};

/// Whether each DFA materializes its trap state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    pub dfa_dead_state: bool,
    pub minimal_dead_state: bool,
}

/// Every automaton derived from one expression.
#[derive(Clone, Debug)]
pub struct Compiled {
    pub regex: Regex,
    pub glushkov: Nfa,
    pub thompson: Nfa,
    /// Determinized from the Glushkov automaton.
    pub dfa: Dfa,
    /// Minimized from the determinized Thompson automaton.
    pub minimal: Dfa,
}

impl Compiled {
    pub fn compile(text: &str, options: &CompileOptions) -> Result<Compiled, RegexError> {
        let regex: Regex = text.parse()?;
        Ok(Self::from_regex(regex, options))
    }

    pub fn from_regex(regex: Regex, options: &CompileOptions) -> Compiled {
        let glushkov = Nfa::from_glushkov(&regex);
        let thompson = Nfa::from_thompson(&regex);
        let dfa = Dfa::from_nfa(&glushkov, options.dfa_dead_state);
        let minimal = Dfa::from_nfa(&thompson, options.minimal_dead_state).minimize();

        debug!(
            "compiled {}: glushkov {}, thompson {}, dfa {}, minimal {} states",
            regex,
            glushkov.states().len(),
            thompson.states().len(),
            dfa.states().len(),
            minimal.states().len()
        );

        Compiled {
            regex,
            glushkov,
            thompson,
            dfa,
            minimal,
        }
    }

    /// The automata in display order, with their names.
    pub fn automata(&self) -> [(&'static str, &dyn FiniteAutomaton); 4] {
        [
            ("glushkov", &self.glushkov),
            ("thompson", &self.thompson),
            ("dfa", &self.dfa),
            ("minimal", &self.minimal),
        ]
    }
}
