//! Branch, revision and package identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a package within the indexing engine.
///
/// Module atoms use the owning package as their culture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageIndex(pub u32);

impl fmt::Display for PackageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "package#{}", self.0)
    }
}

/// Identifier of a branch within a package tree.
///
/// Branch ids are dense: a branch's id is its index in the tree, and a fork
/// always has a larger id than the branch it forked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchId(pub u32);

impl BranchId {
    /// Position of this branch in its tree.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "branch#{}", self.0)
    }
}

/// A strictly increasing, per-branch commit counter.
///
/// Revisions from different branches live in different spaces and are never
/// compared with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision(pub u32);

impl Revision {
    /// The first revision of every branch.
    pub const ZERO: Self = Self(0);

    /// Position of this revision in its branch's commit log.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The revision immediately before this one, if any.
    pub fn predecessor(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }

    /// The revision immediately after this one.
    pub fn successor(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A point in a package's history: a revision on a particular branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    /// Branch the revision belongs to.
    pub branch: BranchId,
    /// Revision on that branch.
    pub revision: Revision,
}

impl Version {
    /// Create a new version.
    pub fn new(branch: BranchId, revision: Revision) -> Self {
        Self { branch, revision }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.branch, self.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_neighbors() {
        assert_eq!(Revision::ZERO.predecessor(), None);
        assert_eq!(Revision(3).predecessor(), Some(Revision(2)));
        assert_eq!(Revision(3).successor(), Revision(4));
    }

    #[test]
    fn test_version_ordering() {
        let a = Version::new(BranchId(0), Revision(5));
        let b = Version::new(BranchId(1), Revision(0));
        assert!(a < b);
        assert_eq!(a.to_string(), "branch#0@r5");
    }
}
