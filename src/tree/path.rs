//! Dotted-and-bracketed addressing of locations inside a document tree.
//!
//! Paths are carried as typed steps from the scanner to the patcher, so the
//! string form (`photos[2].cloudUrl`) only exists for reports and for paths
//! typed in by a user.

use std::fmt;
use std::str::FromStr;

/// A single step from a container to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    Key(String),
    Index(usize),
}

/// An ordered sequence of steps from the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DocPath(Vec<Step>);

impl DocPath {
    /// Split into the parent steps and the final step.
    pub fn split_last(&self) -> Option<(&Step, &[Step])> {
        self.0.split_last()
    }
}

impl From<Vec<Step>> for DocPath {
    fn from(steps: Vec<Step>) -> Self {
        Self(steps)
    }
}

impl From<&[Step]> for DocPath {
    fn from(steps: &[Step]) -> Self {
        Self(steps.to_vec())
    }
}

/// Encodes `Key(k)` as `.k` (bare `k` when first) and `Index(i)` as `[i]`.
impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            match step {
                Step::Key(key) if i == 0 => f.write_str(key)?,
                Step::Key(key) => write!(f, ".{key}")?,
                Step::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

/// Decoding is lossy: a map key made of digits comes back as an `Index`.
impl FromStr for DocPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let steps = s
            .split(['.', '[', ']'])
            .filter(|token| !token.is_empty())
            .map(|token| match parse_index(token) {
                Some(idx) => Step::Index(idx),
                None => Step::Key(token.to_string()),
            })
            .collect();
        Ok(Self(steps))
    }
}

fn parse_index(token: &str) -> Option<usize> {
    if token.bytes().all(|b| b.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}
