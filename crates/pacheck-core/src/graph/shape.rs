//! Partially known tensor shapes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One tensor dimension: a statically known extent or a dynamic one.
///
/// Serialized as a number, or `null` for a dynamic dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<u64>", into = "Option<u64>")]
pub enum Dimension {
    Static(u64),
    Dynamic,
}

impl Dimension {
    pub fn is_static(&self) -> bool {
        matches!(self, Dimension::Static(_))
    }

    pub fn value(&self) -> Option<u64> {
        match self {
            Dimension::Static(v) => Some(*v),
            Dimension::Dynamic => None,
        }
    }
}

impl From<Option<u64>> for Dimension {
    fn from(value: Option<u64>) -> Self {
        value.map_or(Dimension::Dynamic, Dimension::Static)
    }
}

impl From<Dimension> for Option<u64> {
    fn from(dim: Dimension) -> Self {
        dim.value()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Static(v) => write!(f, "{v}"),
            Dimension::Dynamic => write!(f, "?"),
        }
    }
}

/// An ordered sequence of dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(Vec<Dimension>);

impl Shape {
    pub fn new(dims: Vec<Dimension>) -> Self {
        Self(dims)
    }

    /// Shape with every dimension static.
    pub fn fixed(dims: &[u64]) -> Self {
        Self(dims.iter().copied().map(Dimension::Static).collect())
    }

    /// Shape of the given rank with every dimension dynamic.
    pub fn dynamic(rank: usize) -> Self {
        Self(vec![Dimension::Dynamic; rank])
    }

    /// A scalar (rank 0).
    pub fn scalar() -> Self {
        Self(Vec::new())
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<Dimension> {
        self.0.get(index).copied()
    }

    pub fn is_static(&self) -> bool {
        self.0.iter().all(Dimension::is_static)
    }
}

impl From<Vec<Dimension>> for Shape {
    fn from(dims: Vec<Dimension>) -> Self {
        Self(dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, dim) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{dim}")?;
        }
        write!(f, "]")
    }
}
