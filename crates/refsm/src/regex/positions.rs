// position sets of a (normally linearized) expression:
//   P = letters that can start a match
//   D = letters that can end a match
//   F = pairs (a, b) such that b can directly follow a
// epsilon is never a position

use std::collections::BTreeSet;

use super::{Letter, Regex};

impl Regex {
    /// The P set.
    pub fn prefixes(&self) -> BTreeSet<Letter> {
        let mut prefixes = BTreeSet::new();
        self.collect_prefixes(&mut prefixes);
        prefixes
    }

    /// The D set.
    pub fn suffixes(&self) -> BTreeSet<Letter> {
        let mut suffixes = BTreeSet::new();
        self.collect_suffixes(&mut suffixes);
        suffixes
    }

    /// The F set.
    pub fn pairs(&self) -> BTreeSet<(Letter, Letter)> {
        let mut pairs = BTreeSet::new();
        self.collect_pairs(&mut pairs);
        pairs
    }

    fn collect_prefixes(&self, out: &mut BTreeSet<Letter>) {
        match self {
            Regex::Letter(letter) => {
                out.insert(*letter);
            }
            Regex::Epsilon(_) => {}
            Regex::Choice(left, right) => {
                left.collect_prefixes(out);
                right.collect_prefixes(out);
            }
            Regex::Concatenation(left, right) => {
                left.collect_prefixes(out);
                if left.nullable() {
                    right.collect_prefixes(out);
                }
            }
            Regex::Optional(inner) | Regex::KleeneStar(inner) | Regex::KleenePlus(inner) => {
                inner.collect_prefixes(out)
            }
        }
    }

    fn collect_suffixes(&self, out: &mut BTreeSet<Letter>) {
        match self {
            Regex::Letter(letter) => {
                out.insert(*letter);
            }
            Regex::Epsilon(_) => {}
            Regex::Choice(left, right) => {
                left.collect_suffixes(out);
                right.collect_suffixes(out);
            }
            Regex::Concatenation(left, right) => {
                right.collect_suffixes(out);
                if right.nullable() {
                    left.collect_suffixes(out);
                }
            }
            Regex::Optional(inner) | Regex::KleeneStar(inner) | Regex::KleenePlus(inner) => {
                inner.collect_suffixes(out)
            }
        }
    }

    fn collect_pairs(&self, out: &mut BTreeSet<(Letter, Letter)>) {
        match self {
            Regex::Letter(_) | Regex::Epsilon(_) => {}
            Regex::Choice(left, right) => {
                left.collect_pairs(out);
                right.collect_pairs(out);
            }
            Regex::Concatenation(left, right) => {
                left.collect_pairs(out);
                right.collect_pairs(out);
                let prefixes = right.prefixes();
                for suffix in left.suffixes() {
                    out.extend(prefixes.iter().map(|prefix| (suffix, *prefix)));
                }
            }
            Regex::Optional(inner) => inner.collect_pairs(out),
            Regex::KleeneStar(inner) | Regex::KleenePlus(inner) => {
                inner.collect_pairs(out);
                // repetition: any last letter may loop back to any first letter
                let prefixes = inner.prefixes();
                for suffix in inner.suffixes() {
                    out.extend(prefixes.iter().map(|prefix| (suffix, *prefix)));
                }
            }
        }
    }
}
