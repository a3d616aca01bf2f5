//! Signed population change between two snapshots.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snapshot::NodeTypeCount;

/// Node type to signed change in count.
///
/// Equality is exact over keys: a type recorded with `0` differs from an
/// absent type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delta(BTreeMap<String, i64>);

impl Delta {
    /// Value for `node_type`, zero when absent.
    pub fn get(&self, node_type: &str) -> i64 {
        self.0.get(node_type).copied().unwrap_or(0)
    }

    pub fn lookup(&self, node_type: &str) -> Option<i64> {
        self.0.get(node_type).copied()
    }

    pub fn insert(&mut self, node_type: impl Into<String>, value: i64) {
        self.0.insert(node_type.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every type whose entry differs from `expected`, including types
    /// present on one side only.
    pub fn mismatches(&self, expected: &Delta) -> Vec<DeltaMismatch> {
        let keys: BTreeSet<&String> = self.0.keys().chain(expected.0.keys()).collect();
        keys.into_iter()
            .filter_map(|key| {
                let actual = self.lookup(key);
                let wanted = expected.lookup(key);
                (actual != wanted).then(|| DeltaMismatch {
                    node_type: key.clone(),
                    expected: wanted,
                    actual,
                })
            })
            .collect()
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for Delta {
    fn from_iter<I: IntoIterator<Item = (S, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(t, d)| format!("{t}: {d:+}")).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// `after[t] - before[t]` for every type in either snapshot.
pub fn compute_delta(before: &NodeTypeCount, after: &NodeTypeCount) -> Delta {
    let types: BTreeSet<&str> = before.types().chain(after.types()).collect();
    types
        .into_iter()
        .map(|t| (t, after.get(t) as i64 - before.get(t) as i64))
        .collect()
}

/// One node type whose observed change disagrees with the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeltaMismatch {
    pub node_type: String,
    /// `None` when the reference has no entry for the type.
    pub expected: Option<i64>,
    /// `None` when the type never appeared in either snapshot.
    pub actual: Option<i64>,
}

impl fmt::Display for DeltaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<i64>| v.map_or_else(|| "absent".to_string(), |v| format!("{v:+}"));
        write!(
            f,
            "{}: expected {}, actual {}",
            self.node_type,
            show(self.expected),
            show(self.actual)
        )
    }
}
