use std::iter::Peekable;
use std::str::{CharIndices, FromStr};

use log::warn;
use thiserror::Error;

use super::Regex;

type Tokens<'a> = Peekable<CharIndices<'a>>;

/// Deepest tree, and deepest parenthesis nesting, the parser accepts. Every
/// pass over a `Regex` recurses once per level of its height.
pub const MAX_DEPTH: usize = 500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegexError {
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected character '{found}' at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("'(' at offset {offset} is never closed")]
    UnmatchedDelimiter { offset: usize },
    #[error("expression nests deeper than {limit} levels at offset {offset}")]
    TooDeep { limit: usize, offset: usize },
}

impl RegexError {
    /// Errors that end the whole parse rather than just the repetition they
    /// occur in.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RegexError::UnmatchedDelimiter { .. } | RegexError::TooDeep { .. })
    }
}

// a subtree together with its height
type Parsed = (Regex, usize);

fn next_offset(tokens: &mut Tokens) -> usize {
    tokens.peek().map_or(0, |&(offset, _)| offset)
}

fn checked_height(height: usize, offset: usize) -> Result<usize, RegexError> {
    if height > MAX_DEPTH {
        Err(RegexError::TooDeep {
            limit: MAX_DEPTH,
            offset,
        })
    } else {
        Ok(height)
    }
}

// basic recursive descent parsing. a failed element inside a repetition
// rewinds to before it and ends the repetition; only an unclosed '(' or a
// tree past MAX_DEPTH aborts
impl Regex {
    /// Parses the longest valid prefix of `text`, returning the tree and the
    /// unconsumed remainder.
    pub fn parse_prefix(text: &str) -> Result<(Regex, &str), RegexError> {
        let mut tokens = text.char_indices().peekable();
        let (regex, _) = Self::parse_choice(&mut tokens, 0)?;
        let rest = match tokens.peek() {
            Some(&(offset, _)) => &text[offset..],
            None => "",
        };
        Ok((regex, rest))
    }

    fn parse_choice(tokens: &mut Tokens, nesting: usize) -> Result<Parsed, RegexError> {
        let (mut left, mut height) = Self::parse_concatenation(tokens, nesting)?;
        while tokens.peek().is_some_and(|&(_, c)| c == '|') {
            let checkpoint = tokens.clone();
            _ = tokens.next();
            let offset = next_offset(tokens);
            match Self::parse_concatenation(tokens, nesting) {
                Ok((right, right_height)) => {
                    height = checked_height(1 + height.max(right_height), offset)?;
                    left = Regex::choice(left, right);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(_) => {
                    *tokens = checkpoint;
                    break;
                }
            }
        }
        Ok((left, height))
    }

    fn parse_concatenation(tokens: &mut Tokens, nesting: usize) -> Result<Parsed, RegexError> {
        let (mut left, mut height) = Self::parse_postfix(tokens, nesting)?;
        loop {
            let checkpoint = tokens.clone();
            let offset = next_offset(tokens);
            match Self::parse_postfix(tokens, nesting) {
                Ok((right, right_height)) => {
                    height = checked_height(1 + height.max(right_height), offset)?;
                    left = Regex::concat(left, right);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(_) => {
                    *tokens = checkpoint;
                    break;
                }
            }
        }
        Ok((left, height))
    }

    fn parse_postfix(tokens: &mut Tokens, nesting: usize) -> Result<Parsed, RegexError> {
        let (mut body, mut height) = Self::parse_atom(tokens, nesting)?;
        while let Some(&(offset, op)) = tokens.peek() {
            body = match op {
                '+' => Regex::plus(body),
                '*' => Regex::star(body),
                '?' => Regex::optional(body),
                _ => break,
            };
            height = checked_height(height + 1, offset)?;
            _ = tokens.next();
        }
        Ok((body, height))
    }

    fn parse_atom(tokens: &mut Tokens, nesting: usize) -> Result<Parsed, RegexError> {
        match tokens.next() {
            None => Err(RegexError::UnexpectedEnd),
            Some((offset, '(')) => {
                if nesting >= MAX_DEPTH {
                    return Err(RegexError::TooDeep {
                        limit: MAX_DEPTH,
                        offset,
                    });
                }
                // whatever stops the group from parsing leaves the '(' open
                let unmatched = RegexError::UnmatchedDelimiter { offset };
                let inner = match Self::parse_choice(tokens, nesting + 1) {
                    Ok(inner) => inner,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(_) => return Err(unmatched),
                };
                match tokens.next_if(|&(_, c)| c == ')') {
                    Some(_) => Ok(inner),
                    None => Err(unmatched),
                }
            }
            Some((_, 'ε')) => Ok((Regex::epsilon(), 1)),
            Some((_, c)) if c.is_ascii_alphanumeric() => Ok((Regex::letter(c), 1)),
            Some((offset, found)) => Err(RegexError::UnexpectedChar { found, offset }),
        }
    }
}

// trailing garbage is tolerated (the expression may still be being typed)
impl FromStr for Regex {
    type Err = RegexError;

    fn from_str(text: &str) -> Result<Regex, RegexError> {
        let (regex, rest) = Regex::parse_prefix(text)?;
        if !rest.is_empty() {
            warn!(
                "ignoring unparsed input {:?} at offset {}",
                rest,
                text.len() - rest.len()
            );
        }
        Ok(regex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Regex {
        text.parse().expect("failed to parse regex")
    }

    #[test]
    fn precedence() {
        assert_eq!(
            parse("a|bc*"),
            Regex::choice(
                Regex::letter('a'),
                Regex::concat(Regex::letter('b'), Regex::star(Regex::letter('c')))
            )
        );
        assert_eq!(
            parse("(a|b)+?"),
            Regex::optional(Regex::plus(Regex::choice(
                Regex::letter('a'),
                Regex::letter('b')
            )))
        );
    }

    #[test]
    fn operators_associate_left() {
        assert_eq!(
            parse("abc"),
            Regex::concat(
                Regex::concat(Regex::letter('a'), Regex::letter('b')),
                Regex::letter('c')
            )
        );
        assert_eq!(
            parse("a|b|c"),
            Regex::choice(
                Regex::choice(Regex::letter('a'), Regex::letter('b')),
                Regex::letter('c')
            )
        );
    }

    #[test]
    fn epsilon_atom() {
        assert_eq!(
            parse("aε|b"),
            Regex::choice(
                Regex::concat(Regex::letter('a'), Regex::epsilon()),
                Regex::letter('b')
            )
        );
    }

    #[test]
    fn failures() {
        assert_eq!(Regex::from_str(""), Err(RegexError::UnexpectedEnd));
        assert_eq!(
            Regex::from_str("*a"),
            Err(RegexError::UnexpectedChar {
                found: '*',
                offset: 0
            })
        );
        assert_eq!(
            Regex::from_str("(a"),
            Err(RegexError::UnmatchedDelimiter { offset: 0 })
        );
        assert_eq!(
            Regex::from_str("ab(c|d"),
            Err(RegexError::UnmatchedDelimiter { offset: 2 })
        );
        assert!(Regex::from_str("((a)").is_err());
    }

    #[test]
    fn open_group_at_end_is_unmatched() {
        for (text, offset) in [("(", 0), ("a(", 1), ("a|(", 2), ("ab*(", 3), ("a(b", 1), ("a|(b", 2)] {
            assert_eq!(
                Regex::from_str(text),
                Err(RegexError::UnmatchedDelimiter { offset }),
                "{}",
                text
            );
        }
        // an empty or broken group is not closed either
        assert_eq!(
            Regex::from_str("a()"),
            Err(RegexError::UnmatchedDelimiter { offset: 1 })
        );
        assert_eq!(
            Regex::from_str("(*)"),
            Err(RegexError::UnmatchedDelimiter { offset: 0 })
        );
    }

    #[test]
    fn depth_limit() {
        let letters = "a".repeat(MAX_DEPTH);
        assert_eq!(parse(&letters).height(), MAX_DEPTH);
        assert_eq!(
            Regex::from_str(&format!("{}b", letters)),
            Err(RegexError::TooDeep {
                limit: MAX_DEPTH,
                offset: MAX_DEPTH
            })
        );

        let stars = format!("a{}", "*".repeat(MAX_DEPTH));
        assert_eq!(
            Regex::from_str(&stars),
            Err(RegexError::TooDeep {
                limit: MAX_DEPTH,
                offset: MAX_DEPTH
            })
        );
        assert_eq!(parse(&stars[..MAX_DEPTH]).height(), MAX_DEPTH);

        let nested = |n: usize| format!("{}a{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(parse(&nested(MAX_DEPTH)), Regex::letter('a'));
        assert_eq!(
            Regex::from_str(&nested(MAX_DEPTH + 1)),
            Err(RegexError::TooDeep {
                limit: MAX_DEPTH,
                offset: MAX_DEPTH
            })
        );
        // far past the limit still fails cleanly
        assert!(Regex::from_str(&nested(20_000)).is_err());

        // the limit also escapes an enclosing repetition
        assert!(Regex::from_str(&format!("b|{}", nested(MAX_DEPTH + 1))).is_err());
    }

    #[test]
    fn remainder_is_tolerated() {
        assert_eq!(Regex::parse_prefix("a|"), Ok((Regex::letter('a'), "|")));
        assert_eq!(
            Regex::parse_prefix("ab)c"),
            Ok((Regex::concat(Regex::letter('a'), Regex::letter('b')), ")c"))
        );
        assert_eq!(parse("a-b"), Regex::letter('a'));
    }

    #[test]
    fn parsing_is_deterministic() {
        for text in ["(a|b)*abb", "a?b+|ε", "((a)(b))*c"] {
            assert_eq!(parse(text), parse(text));
            // printing and re-parsing gives the same tree back
            assert_eq!(parse(&parse(text).to_string()), parse(text));
        }
    }
}
