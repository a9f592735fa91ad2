//! Compiled handler rules.
//!
//! A rule is a regular expression that must match at the **start** of the
//! subject; it does not have to consume the whole subject. `"^ping"` and
//! `"ping"` are therefore equivalent, while `"ping$"` only matches a subject
//! that is exactly `ping`.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

/// A compiled, start-anchored handler rule.
#[derive(Clone)]
pub struct Pattern {
    rule: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles `rule`.
    pub fn compile(rule: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(rule)?;
        Ok(Self {
            rule: rule.to_string(),
            regex,
        })
    }

    /// Returns the rule as written by the handler.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Returns `true` if the rule matches at the start of `subject`.
    pub fn is_match(&self, subject: &str) -> bool {
        self.regex.find(subject).is_some_and(|m| m.start() == 0)
    }

    /// Matches the rule against `subject`, capturing groups.
    pub fn captures(&self, subject: &str) -> Option<Match> {
        // Leftmost-first search reports a match at offset 0 whenever one exists.
        let caps = self
            .regex
            .captures(subject)
            .filter(|caps| caps.get(0).is_some_and(|m| m.start() == 0))?;
        let groups = caps
            .iter()
            .map(|g| g.map(|m| m.as_str().to_string()))
            .collect();
        let names = self
            .regex
            .capture_names()
            .enumerate()
            .filter_map(|(i, name)| name.map(|n| (n.to_string(), i)))
            .collect();
        Some(Match { groups, names })
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.rule).finish()
    }
}

/// The owned result of a successful [`Pattern::captures`].
///
/// Group `0` is the whole matched prefix of the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    groups: Vec<Option<String>>,
    names: HashMap<String, usize>,
}

impl Match {
    /// Returns the matched prefix of the subject.
    pub fn as_str(&self) -> &str {
        self.group(0).unwrap_or_default()
    }

    /// Returns capture group `i`, or `None` if it did not participate.
    pub fn group(&self, i: usize) -> Option<&str> {
        self.groups.get(i).and_then(|g| g.as_deref())
    }

    /// Returns the named capture group, or `None` if it did not participate.
    pub fn name(&self, name: &str) -> Option<&str> {
        self.names.get(name).and_then(|&i| self.group(i))
    }

    /// Returns the participating groups after group `0`, in order.
    pub fn groups(&self) -> impl Iterator<Item = Option<&str>> {
        self.groups.iter().skip(1).map(|g| g.as_deref())
    }

    /// Number of groups, including group `0`.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_is_anchored_at_start_only() {
        let p = Pattern::compile("ping").unwrap();
        assert!(p.is_match("ping :"));
        assert!(!p.is_match("xping"));

        let exact = Pattern::compile("^hi$").unwrap();
        assert!(exact.is_match("hi"));
        assert!(!exact.is_match("hi there"));
    }

    #[test]
    fn test_alternation_stays_anchored() {
        let p = Pattern::compile("foo|bar").unwrap();
        assert!(p.is_match("bar!"));
        assert!(!p.is_match("xbar"));
    }

    #[test]
    fn test_captures() {
        let p = Pattern::compile(r"!echo (?P<text>.+)").unwrap();
        let m = p.captures("!echo hello world").unwrap();
        assert_eq!(m.as_str(), "!echo hello world");
        assert_eq!(m.group(1), Some("hello world"));
        assert_eq!(m.name("text"), Some("hello world"));
        assert_eq!(m.len(), 2);
        assert!(p.captures("say !echo hi").is_none());
    }

    #[test]
    fn test_optional_group_absent() {
        let p = Pattern::compile(r"!unload (\S+)(?: (\S+))?").unwrap();
        let m = p.captures("!unload greet").unwrap();
        assert_eq!(m.group(1), Some("greet"));
        assert_eq!(m.group(2), None);
        assert_eq!(m.groups().collect::<Vec<_>>(), vec![Some("greet"), None]);
    }

    #[test]
    fn test_invalid_rule() {
        assert!(Pattern::compile("(unclosed").is_err());
        assert!(Pattern::compile("a)(b").is_err());
    }

    #[test]
    fn test_verbose_rule_with_trailing_comment() {
        let p = Pattern::compile("(?x) ping  # keep-alive").unwrap();
        assert!(p.is_match("ping :irc.example.net"));
        assert!(!p.is_match("xping"));
        assert_eq!(p.captures("ping :x").unwrap().as_str(), "ping");
        assert!(p.captures("say ping").is_none());
    }
}
