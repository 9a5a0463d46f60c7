//! Branch-independent entity identifiers.
//!
//! An [`Atom`] names an entity by the culture that declared it and its offset
//! in the package's per-kind buffer. Atoms never change and are never reused,
//! so they stay valid across every branch that can see the entity. A
//! [`Position`] additionally records the branch that minted the atom, which is
//! what a descendant branch needs to route a lookup to the right segment.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::version::BranchId;

/// Dense index of an entity within its package's buffer for one kind.
pub type Offset = u32;

/// An entity kind that can be addressed by an [`Atom`].
pub trait AtomKind: 'static {
    /// Owner of an atom of this kind at the time it was minted.
    type Culture: Copy + Eq + Ord + Hash + fmt::Debug + Serialize + DeserializeOwned;

    /// Short kind name used in diagnostics.
    const NAME: &'static str;
}

/// Stable, branch-independent identifier of an entity.
///
/// Equality and ordering compare `(offset, culture)`.
#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct Atom<K: AtomKind> {
    /// Module (or package, for modules) that owns the entity.
    pub culture: K::Culture,
    /// Offset in the package's buffer for this kind.
    pub offset: Offset,
}

impl<K: AtomKind> Atom<K> {
    /// Create a new atom.
    pub fn new(culture: K::Culture, offset: Offset) -> Self {
        Self { culture, offset }
    }

    /// Tag this atom with the branch that minted it.
    pub fn on(self, branch: BranchId) -> Position<K> {
        Position::new(self, branch)
    }
}

impl<K: AtomKind> Clone for Atom<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: AtomKind> Copy for Atom<K> {}

impl<K: AtomKind> PartialEq for Atom<K> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset && self.culture == other.culture
    }
}

impl<K: AtomKind> Eq for Atom<K> {}

impl<K: AtomKind> PartialOrd for Atom<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: AtomKind> Ord for Atom<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.offset
            .cmp(&other.offset)
            .then_with(|| self.culture.cmp(&other.culture))
    }
}

impl<K: AtomKind> Hash for Atom<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.offset.hash(state);
        self.culture.hash(state);
    }
}

impl<K: AtomKind> fmt::Debug for Atom<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?}:{})", K::NAME, self.culture, self.offset)
    }
}

/// An [`Atom`] together with the branch that minted it.
///
/// A position minted on branch `B` resolves on `B` and on every descendant of
/// `B`. Resolving it from an unrelated lineage yields nothing.
#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct Position<K: AtomKind> {
    /// The entity.
    pub atom: Atom<K>,
    /// Branch on which the atom was minted.
    pub branch: BranchId,
}

impl<K: AtomKind> Position<K> {
    /// Create a new position.
    pub fn new(atom: Atom<K>, branch: BranchId) -> Self {
        Self { atom, branch }
    }

    /// Offset of the underlying atom.
    pub fn offset(&self) -> Offset {
        self.atom.offset
    }

    /// Culture of the underlying atom.
    pub fn culture(&self) -> K::Culture {
        self.atom.culture
    }
}

impl<K: AtomKind> Clone for Position<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: AtomKind> Copy for Position<K> {}

impl<K: AtomKind> PartialEq for Position<K> {
    fn eq(&self, other: &Self) -> bool {
        self.atom == other.atom && self.branch == other.branch
    }
}

impl<K: AtomKind> Eq for Position<K> {}

impl<K: AtomKind> PartialOrd for Position<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: AtomKind> Ord for Position<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.atom
            .cmp(&other.atom)
            .then_with(|| self.branch.cmp(&other.branch))
    }
}

impl<K: AtomKind> Hash for Position<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.atom.hash(state);
        self.branch.hash(state);
    }
}

impl<K: AtomKind> fmt::Debug for Position<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}", self.atom, self.branch)
    }
}
