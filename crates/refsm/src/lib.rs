//! Regular expressions to finite automata: Glushkov and Thompson NFAs, subset
//! construction, Hopcroft minimization, and replayable recognition traces.

pub mod compile;
pub mod fa;
pub mod regex;
pub mod trace;


pub use compile::{CompileOptions, Compiled};
pub use fa::{Construction, Dfa, FiniteAutomaton, Nfa, State, StateId, Symbol};
pub use regex::{Regex, RegexError};
pub use trace::{Status, Step, Trace};
