//! Glob patterns for the `like` operator.
//!
//! A pattern is a sequence of literal characters and wildcards; the wildcard
//! matches any run of characters (including none). Matching is anchored at
//! both ends and case-sensitive. In source text `*` is the wildcard, `\*`
//! a literal star and `\\` a literal backslash.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternElem {
    Literal(char),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pattern(Vec<PatternElem>);

impl Pattern {
    pub fn elems(&self) -> &[PatternElem] {
        &self.0
    }

    /// Whole-string match with single-star backtracking.
    pub fn wildcard_match(&self, text: &str) -> bool {
        let text: Vec<char> = text.chars().collect();
        let pattern = &self.0;

        let (mut t, mut p) = (0, 0);
        // (pattern index after the last wildcard, text index it resumed at)
        let mut resume: Option<(usize, usize)> = None;

        while t < text.len() {
            match pattern.get(p) {
                Some(PatternElem::Wildcard) => {
                    resume = Some((p + 1, t));
                    p += 1;
                }
                Some(PatternElem::Literal(c)) if *c == text[t] => {
                    p += 1;
                    t += 1;
                }
                _ => match resume {
                    Some((after_star, start)) => {
                        p = after_star;
                        t = start + 1;
                        resume = Some((after_star, start + 1));
                    }
                    None => return false,
                },
            }
        }

        pattern[p.min(pattern.len())..]
            .iter()
            .all(|elem| *elem == PatternElem::Wildcard)
    }
}

impl FromStr for Pattern {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut elems = Vec::with_capacity(s.len());
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            match c {
                '*' => elems.push(PatternElem::Wildcard),
                '\\' => match chars.next() {
                    Some(escaped @ ('*' | '\\')) => elems.push(PatternElem::Literal(escaped)),
                    Some(other) => {
                        return Err(PolicyError::InvalidPattern(format!(
                            "unknown escape `\\{other}` in `{s}`"
                        )));
                    }
                    None => {
                        return Err(PolicyError::InvalidPattern(format!(
                            "dangling escape at end of `{s}`"
                        )));
                    }
                },
                c => elems.push(PatternElem::Literal(c)),
            }
        }
        Ok(Pattern(elems))
    }
}

/// Renders back to source text, escaping literal stars and backslashes.
impl Display for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for elem in &self.0 {
            match elem {
                PatternElem::Wildcard => write!(f, "*")?,
                PatternElem::Literal(c @ ('*' | '\\')) => write!(f, "\\{c}")?,
                PatternElem::Literal(c) => write!(f, "{c}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        suffix = { "*.jpg", "photo.jpg", true },
        wrong_suffix = { "*.png", "photo.jpg", false },
        prefix = { "web*", "web-01.example.com", true },
        wrong_prefix = { "bob*", "web-01.example.com", false },
        exact = { "photo.jpg", "photo.jpg", true },
        anchored_end = { "photo", "photo.jpg", false },
        anchored_start = { "jpg", "photo.jpg", false },
        infix = { "*oto*", "photo.jpg", true },
        backtracking = { "*a*b", "aaxaab", true },
        backtracking_fails = { "*a*b", "aaxaac", false },
        only_star = { "*", "", true },
        empty_pattern_empty_text = { "", "", true },
        empty_pattern = { "", "x", false },
        double_star = { "a**b", "ab", true },
        case_sensitive = { "*.JPG", "photo.jpg", false },
        escaped_star = { r"a\*b", "a*b", true },
        escaped_star_is_literal = { r"a\*b", "axxb", false },
        escaped_backslash = { r"a\\*", r"a\bc", true },
        unicode = { "h*llo", "hé llo", true },
    )]
    fn test_wildcard_match(pattern: &str, text: &str, expected: bool) {
        let pattern: Pattern = pattern.parse().unwrap();
        assert_eq!(pattern.wildcard_match(text), expected);
    }

    #[parameterized(
        dangling = { r"abc\" },
        unknown = { r"a\nb" },
    )]
    fn test_pattern_parse_rejects(source: &str) {
        assert!(matches!(
            source.parse::<Pattern>(),
            Err(PolicyError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_pattern_display_round_trips() {
        let source = r"*.\*\\x";
        let pattern: Pattern = source.parse().unwrap();
        assert_eq!(pattern.to_string(), source);
        assert_eq!(
            pattern.elems(),
            &[
                PatternElem::Wildcard,
                PatternElem::Literal('.'),
                PatternElem::Literal('*'),
                PatternElem::Literal('\\'),
                PatternElem::Literal('x'),
            ]
        );
    }
}
