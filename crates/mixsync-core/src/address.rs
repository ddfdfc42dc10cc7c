//! Positional index paths into the live session tree.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::AddressError;
use crate::node::NodeLevel;

/// Ordered, zero-based index path locating one node instance.
///
/// Indices are only meaningful against the topology they were derived from;
/// after a strip or plugin is removed the same address may point at a
/// different entity or at nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(Vec<u32>);

impl Address {
    /// Wrap raw components.
    pub fn new(components: Vec<u32>) -> Self {
        Self(components)
    }

    /// Empty address of a global node.
    pub fn global() -> Self {
        Self(Vec::new())
    }

    /// `[strip]`
    pub fn strip(strip: u32) -> Self {
        Self(vec![strip])
    }

    /// `[strip, plugin]`
    pub fn plugin(strip: u32, plugin: u32) -> Self {
        Self(vec![strip, plugin])
    }

    /// `[strip, plugin, parameter]`
    pub fn parameter(strip: u32, plugin: u32, parameter: u32) -> Self {
        Self(vec![strip, plugin, parameter])
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the empty (global) address.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw components.
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Component at `index`.
    pub fn nth(&self, index: usize) -> Result<u32, AddressError> {
        self.0
            .get(index)
            .copied()
            .ok_or(AddressError::MissingComponent { index })
    }

    /// Check that the length matches what `level` requires.
    pub fn check_level(&self, level: NodeLevel) -> Result<(), AddressError> {
        let expected = level.address_len();
        if self.0.len() == expected {
            Ok(())
        } else {
            Err(AddressError::Arity {
                level,
                expected,
                found: self.0.len(),
            })
        }
    }
}

impl From<Vec<u32>> for Address {
    fn from(components: Vec<u32>) -> Self {
        Self(components)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{c}")?;
        }
        f.write_str("]")
    }
}
