// regular expression tree over single-character symbols, with the derived
// sets (nullable, prefixes, suffixes, pairs) used by the Glushkov construction
//
// <choice>  ::= <concat> { '|' <concat> }
// <concat>  ::= <postfix> { <postfix> }
// <postfix> ::= <atom> { '+' | '*' | '?' }
// <atom>    ::= '(' <choice> ')'
// |  [A-Za-z0-9]
// |  'ε'

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

mod parser;
mod positions;

pub use parser::{RegexError, MAX_DEPTH};

/// A single-symbol atom. `position` is only set on linearized trees, where it
/// is unique across the whole expression.
// field order matters: derived Ord sorts letters by position first
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Letter {
    pub position: Option<u32>,
    pub symbol: char,
}

impl Letter {
    pub fn new(symbol: char) -> Letter {
        Letter {
            position: None,
            symbol,
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "{}[{}]", self.symbol, position),
            None => write!(f, "{}", self.symbol),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regex {
    Letter(Letter),
    /// Matches the empty string. Linearization numbers it like a letter, but it
    /// never becomes a position since it consumes no input.
    Epsilon(Option<u32>),
    Choice(Box<Regex>, Box<Regex>),
    Concatenation(Box<Regex>, Box<Regex>),
    Optional(Box<Regex>),
    KleeneStar(Box<Regex>),
    KleenePlus(Box<Regex>),
}

impl Regex {
    pub fn letter(symbol: char) -> Regex {
        Regex::Letter(Letter::new(symbol))
    }

    pub fn epsilon() -> Regex {
        Regex::Epsilon(None)
    }

    pub fn choice(left: Regex, right: Regex) -> Regex {
        Regex::Choice(Box::new(left), Box::new(right))
    }

    pub fn concat(left: Regex, right: Regex) -> Regex {
        Regex::Concatenation(Box::new(left), Box::new(right))
    }

    pub fn optional(inner: Regex) -> Regex {
        Regex::Optional(Box::new(inner))
    }

    pub fn star(inner: Regex) -> Regex {
        Regex::KleeneStar(Box::new(inner))
    }

    pub fn plus(inner: Regex) -> Regex {
        Regex::KleenePlus(Box::new(inner))
    }

    /// Whether the language of this expression contains the empty string.
    pub fn nullable(&self) -> bool {
        match self {
            Regex::Letter(_) => false,
            Regex::Epsilon(_) => true,
            Regex::Choice(left, right) => left.nullable() || right.nullable(),
            Regex::Concatenation(left, right) => left.nullable() && right.nullable(),
            Regex::Optional(_) | Regex::KleeneStar(_) => true,
            Regex::KleenePlus(inner) => inner.nullable(),
        }
    }

    /// Returns a structurally identical tree whose letters (and epsilons) carry
    /// ids `1..=n`, assigned depth-first, left to right.
    pub fn linearized(&self) -> Regex {
        self.linearize_from(1).1
    }

    // threads the next free id through the traversal
    fn linearize_from(&self, next: u32) -> (u32, Regex) {
        match self {
            Regex::Letter(letter) => (
                next + 1,
                Regex::Letter(Letter {
                    position: Some(next),
                    symbol: letter.symbol,
                }),
            ),
            Regex::Epsilon(_) => (next + 1, Regex::Epsilon(Some(next))),
            Regex::Choice(left, right) => {
                let (next, left) = left.linearize_from(next);
                let (next, right) = right.linearize_from(next);
                (next, Regex::choice(left, right))
            }
            Regex::Concatenation(left, right) => {
                let (next, left) = left.linearize_from(next);
                let (next, right) = right.linearize_from(next);
                (next, Regex::concat(left, right))
            }
            Regex::Optional(inner) => {
                let (next, inner) = inner.linearize_from(next);
                (next, Regex::optional(inner))
            }
            Regex::KleeneStar(inner) => {
                let (next, inner) = inner.linearize_from(next);
                (next, Regex::star(inner))
            }
            Regex::KleenePlus(inner) => {
                let (next, inner) = inner.linearize_from(next);
                (next, Regex::plus(inner))
            }
        }
    }

    /// Every letter occurrence, left to right.
    pub fn letters(&self) -> Vec<Letter> {
        let mut letters = Vec::new();
        self.collect_letters(&mut letters);
        letters
    }

    fn collect_letters(&self, letters: &mut Vec<Letter>) {
        match self {
            Regex::Letter(letter) => letters.push(*letter),
            Regex::Epsilon(_) => {}
            Regex::Choice(left, right) | Regex::Concatenation(left, right) => {
                left.collect_letters(letters);
                right.collect_letters(letters);
            }
            Regex::Optional(inner) | Regex::KleeneStar(inner) | Regex::KleenePlus(inner) => {
                inner.collect_letters(letters)
            }
        }
    }

    /// The distinct symbols used by the expression. Never contains epsilon.
    pub fn alphabet(&self) -> BTreeSet<char> {
        self.letters().into_iter().map(|letter| letter.symbol).collect()
    }

    pub fn height(&self) -> usize {
        match self {
            Regex::Letter(_) | Regex::Epsilon(_) => 1,
            Regex::Choice(left, right) | Regex::Concatenation(left, right) => {
                1 + left.height().max(right.height())
            }
            Regex::Optional(inner) | Regex::KleeneStar(inner) | Regex::KleenePlus(inner) => {
                1 + inner.height()
            }
        }
    }

    // 0 = choice, 1 = concatenation, 2 = postfix / atom
    fn precedence(&self) -> u8 {
        match self {
            Regex::Choice(..) => 0,
            Regex::Concatenation(..) => 1,
            _ => 2,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

// prints text the parser reads back into the same tree (for unlinearized trees)
impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regex::Letter(letter) => write!(f, "{}", letter),
            Regex::Epsilon(_) => write!(f, "ε"),
            Regex::Choice(left, right) => {
                left.fmt_operand(f, 0)?;
                write!(f, "|")?;
                right.fmt_operand(f, 1)
            }
            Regex::Concatenation(left, right) => {
                left.fmt_operand(f, 1)?;
                right.fmt_operand(f, 2)
            }
            Regex::Optional(inner) => {
                inner.fmt_operand(f, 2)?;
                write!(f, "?")
            }
            Regex::KleeneStar(inner) => {
                inner.fmt_operand(f, 2)?;
                write!(f, "*")
            }
            Regex::KleenePlus(inner) => {
                inner.fmt_operand(f, 2)?;
                write!(f, "+")
            }
        }
    }
}
