//! LIKE pattern compilation.
//!
//! A pattern is translated once into an anchored regular expression:
//! `_` matches any single character, `%` any run of characters, and the
//! escape character makes the following pattern character literal.

use std::collections::HashMap;

use regex::Regex;

use crate::evaluator::EvalError;

/// A compiled LIKE pattern.
#[derive(Debug, Clone)]
pub struct LikePattern {
    regex: Regex,
}

impl LikePattern {
    pub fn compile(pattern: &str, escape: Option<char>) -> Result<Self, EvalError> {
        let mut source = String::from("(?s)^");
        let mut chars = pattern.chars();

        while let Some(ch) = chars.next() {
            if Some(ch) == escape {
                let escaped = chars.next().ok_or_else(|| {
                    EvalError::InvalidEscape(format!(
                        "LIKE pattern '{}' ends with escape character '{}'",
                        pattern, ch
                    ))
                })?;
                source.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4])));
                continue;
            }

            match ch {
                '_' => source.push('.'),
                '%' => source.push_str(".*"),
                c => source.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        source.push('$');

        let regex = Regex::new(&source)
            .map_err(|e| EvalError::InvalidEscape(format!("invalid LIKE pattern '{}': {}", pattern, e)))?;
        Ok(LikePattern { regex })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Validates an ESCAPE operand: exactly one character.
pub fn escape_char(escape: &str) -> Result<char, EvalError> {
    let mut chars = escape.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(EvalError::InvalidEscape(format!(
            "ESCAPE must be a single character, got '{}'",
            escape
        ))),
    }
}

/// Compiled patterns for one run, keyed by pattern text and escape.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: HashMap<(String, Option<char>), LikePattern>,
}

impl PatternCache {
    pub fn get(&mut self, pattern: &str, escape: Option<char>) -> Result<&LikePattern, EvalError> {
        let key = (pattern.to_string(), escape);
        if !self.compiled.contains_key(&key) {
            let compiled = LikePattern::compile(pattern, escape)?;
            self.compiled.insert(key.clone(), compiled);
        }
        self.compiled
            .get(&key)
            .ok_or_else(|| EvalError::InvalidEscape(format!("LIKE pattern '{}' was not compiled", pattern)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcards() {
        let p = LikePattern::compile("a_c%", None).unwrap();
        assert!(p.is_match("abc"));
        assert!(p.is_match("abcdef"));
        assert!(!p.is_match("ac"));
        assert!(!p.is_match("xabc"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let p = LikePattern::compile("1.5+(x)", None).unwrap();
        assert!(p.is_match("1.5+(x)"));
        assert!(!p.is_match("1x5+(x)"));
    }

    #[test]
    fn test_escape_makes_wildcard_literal() {
        let p = LikePattern::compile("%x^%", Some('^')).unwrap();
        assert!(p.is_match("abx%"));
        assert!(!p.is_match("abxyz"));
    }

    #[test]
    fn test_escape_at_end_is_error() {
        assert!(matches!(
            LikePattern::compile("abc^", Some('^')),
            Err(EvalError::InvalidEscape(_))
        ));
    }

    #[test]
    fn test_underscore_matches_newline_and_multibyte() {
        let p = LikePattern::compile("a_b", None).unwrap();
        assert!(p.is_match("a\nb"));
        assert!(p.is_match("aéb"));
    }

    #[test]
    fn test_escape_char_must_be_single() {
        assert_eq!(escape_char("^").unwrap(), '^');
        assert!(escape_char("^^").is_err());
        assert!(escape_char("").is_err());
    }
}
