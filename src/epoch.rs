//! Bounded, read-only views of one branch's buffer contribution.

use std::cmp::Ordering;
use std::fmt;

use crate::buffer::{Buffer, Divergence};
use crate::element::Element;
use crate::types::{Atom, BranchId, Offset, Revision};

/// What one branch contributed to a kind's buffer, as of a revision.
///
/// Covers the offsets `[start, end)` where `end` is the branch's ring at
/// `limit`, plus the divergences the branch had recorded by `limit`.
pub struct Epoch<'a, E: Element> {
    buffer: &'a Buffer<E>,
    end: Offset,
    branch: BranchId,
    limit: Revision,
}

impl<'a, E: Element> Epoch<'a, E> {
    /// Bound `buffer` at `end`, as seen at revision `limit` of `branch`.
    pub fn new(buffer: &'a Buffer<E>, end: Offset, branch: BranchId, limit: Revision) -> Self {
        Self {
            buffer,
            end: end.clamp(buffer.start(), buffer.end()),
            branch,
            limit,
        }
    }

    /// First offset of the epoch.
    pub fn start(&self) -> Offset {
        self.buffer.start()
    }

    /// One past the last offset of the epoch.
    pub fn end(&self) -> Offset {
        self.end
    }

    /// Branch that minted the epoch's atoms.
    pub fn branch(&self) -> BranchId {
        self.branch
    }

    /// Revision bounding the epoch.
    pub fn limit(&self) -> Revision {
        self.limit
    }

    /// Number of entities in the epoch.
    pub fn len(&self) -> usize {
        (self.end - self.start()) as usize
    }

    /// Whether the epoch contributed no entities.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Where `offset` falls relative to this epoch.
    ///
    /// `Less` when the epoch lies entirely below `offset`, `Greater` when it
    /// lies entirely above, `Equal` when it contains it.
    pub fn locate(&self, offset: Offset) -> Ordering {
        if offset < self.start() {
            Ordering::Greater
        } else if offset >= self.end {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }

    /// The entities of the epoch, without copying.
    pub fn elements(&self) -> &'a [E] {
        self.buffer.prefix(self.end)
    }

    /// The atom minted in this epoch for `id`.
    pub fn position(&self, id: &E::Id) -> Option<Atom<E>> {
        self.buffer
            .atom(id)
            .filter(|atom| self.locate(atom.offset) == Ordering::Equal)
    }

    /// The entity at `offset`, if the epoch contains it.
    pub fn get(&self, offset: Offset) -> Option<&'a E> {
        if self.locate(offset) != Ordering::Equal {
            return None;
        }
        self.buffer.get(offset)
    }

    /// The divergence the branch had recorded for `atom` by `limit`.
    pub fn divergence(&self, atom: &Atom<E>) -> Option<&'a Divergence<E::Heads>> {
        self.buffer
            .divergence(atom)
            .filter(|divergence| divergence.since <= self.limit)
    }

    /// Iterate the epoch's entities with their atoms.
    pub fn iter(&self) -> impl Iterator<Item = (Atom<E>, &'a E)> + 'a {
        let end = self.end;
        self.buffer.iter().take_while(move |(atom, _)| atom.offset < end)
    }
}

impl<E: Element> Clone for Epoch<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: Element> Copy for Epoch<'_, E> {}

impl<E: Element> fmt::Debug for Epoch<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Epoch")
            .field("kind", &E::NAME)
            .field("branch", &self.branch)
            .field("limit", &self.limit)
            .field("range", &(self.start()..self.end))
            .finish()
    }
}
