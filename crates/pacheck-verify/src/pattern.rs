//! Port-name patterns and their cardinalities.

use std::fmt;

use pacheck_core::{Port, PortDirection};
use serde::Serialize;

/// How a pattern recognises a port name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum NameMatcher {
    /// `<key>.` at the start of the name followed by at least one digit.
    Indexed(&'static str),
    /// The whole name.
    Exact(&'static str),
    /// `<key>` anywhere in the name.
    Contains(&'static str),
}

impl NameMatcher {
    pub fn key(&self) -> &'static str {
        match self {
            NameMatcher::Indexed(k) | NameMatcher::Exact(k) | NameMatcher::Contains(k) => k,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameMatcher::Indexed(key) => name
                .strip_prefix(key)
                .and_then(|rest| rest.strip_prefix('.'))
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| c.is_ascii_digit()),
            NameMatcher::Exact(key) => name == *key,
            NameMatcher::Contains(key) => name.contains(key),
        }
    }
}

impl fmt::Display for NameMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameMatcher::Indexed(k) => write!(f, "{k}.<index>"),
            NameMatcher::Exact(k) => write!(f, "{k}"),
            NameMatcher::Contains(k) => write!(f, "*{k}*"),
        }
    }
}

/// How many matches a pattern must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// One match per transformed site.
    PerSite,
    /// Exactly one match.
    Singleton,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::PerSite => write!(f, "per-site"),
            Cardinality::Singleton => write!(f, "singleton"),
        }
    }
}

/// A named-port check the transformed graph must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortPattern {
    pub matcher: NameMatcher,
    pub cardinality: Cardinality,
    pub direction: PortDirection,
}

impl PortPattern {
    pub const fn per_site_input(key: &'static str) -> Self {
        Self {
            matcher: NameMatcher::Indexed(key),
            cardinality: Cardinality::PerSite,
            direction: PortDirection::Input,
        }
    }

    pub const fn per_site_output(key: &'static str) -> Self {
        Self {
            matcher: NameMatcher::Indexed(key),
            cardinality: Cardinality::PerSite,
            direction: PortDirection::Output,
        }
    }

    /// A singleton input matched as a substring of the port name.
    pub const fn shared_input(key: &'static str) -> Self {
        Self {
            matcher: NameMatcher::Contains(key),
            cardinality: Cardinality::Singleton,
            direction: PortDirection::Input,
        }
    }

    /// A singleton input matched against the whole port name.
    pub const fn exact_input(key: &'static str) -> Self {
        Self {
            matcher: NameMatcher::Exact(key),
            cardinality: Cardinality::Singleton,
            direction: PortDirection::Input,
        }
    }

    pub fn key(&self) -> &'static str {
        self.matcher.key()
    }
}

/// Count matching names across `ports`. A port with several matching names
/// contributes every one of them.
pub fn count_matches(ports: &[Port], matcher: &NameMatcher) -> usize {
    ports
        .iter()
        .flat_map(|p| p.names.iter())
        .filter(|name| matcher.matches(name))
        .count()
}
