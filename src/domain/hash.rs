//! Package hashes and hash sets
//!
//! A [`Hash`] is the content-derived identifier of one published package
//! version. The root package (the working copy in the current directory)
//! has not been published and carries the empty hash.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Content-derived identifier of a package version
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hash(String);

impl Hash {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The hash of the unpublished root package
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&str> for Hash {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Hash {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An ordered set of package hashes
///
/// Iteration order is the hash order, so every algorithm built on top of
/// these sets is deterministic across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet(BTreeSet<Hash>);

impl DependencySet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Adds a hash, returning true if it was not already present
    pub fn add(&mut self, hash: Hash) -> bool {
        self.0.insert(hash)
    }

    /// Removes every given hash, returning how many were actually present
    pub fn remove_all<'a>(&mut self, hashes: impl IntoIterator<Item = &'a Hash>) -> usize {
        hashes
            .into_iter()
            .filter(|hash| self.0.remove(*hash))
            .count()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.0.contains(hash)
    }

    /// Returns the hashes present in both sets
    pub fn intersect(&self, other: &DependencySet) -> DependencySet {
        Self(self.0.intersection(&other.0).cloned().collect())
    }

    /// Adds every hash of `other` to this set
    pub fn extend_from(&mut self, other: &DependencySet) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hash> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<Hash> {
        self.0.iter().cloned().collect()
    }
}

impl FromIterator<Hash> for DependencySet {
    fn from_iter<I: IntoIterator<Item = Hash>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a DependencySet {
    type Item = &'a Hash;
    type IntoIter = std::collections::btree_set::Iter<'a, Hash>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
