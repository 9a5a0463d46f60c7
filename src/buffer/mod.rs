//! Per-branch, per-kind append-only entity storage.
//!
//! A forked branch's buffer starts at the parent's end-offset at fork time
//! and never copies ancestor storage: offsets below [`Buffer::start`]
//! belong to the ancestor chain and must be resolved through a
//! [`Fasces`](crate::fasces::Fasces). Entities the branch inherits but
//! changes are tracked in its divergence map instead.

pub mod divergence;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::branch::BranchError;
use crate::element::{Element, Field, Histories};
use crate::fasces::Axis;
use crate::types::{Atom, Offset, Revision};

pub use divergence::{Divergence, UpdateOutcome, UpdateStats};

/// Append-only storage for one entity kind on one branch.
pub struct Buffer<E: Element> {
    start: Offset,
    storage: Vec<E>,
    index: HashMap<E::Id, Atom<E>>,
    divergences: BTreeMap<Atom<E>, Divergence<E::Heads>>,
}

impl<E: Element> Buffer<E> {
    /// Create an empty buffer whose first local offset is `start`.
    pub fn new(start: Offset) -> Self {
        Self {
            start,
            storage: Vec::new(),
            index: HashMap::new(),
            divergences: BTreeMap::new(),
        }
    }

    /// First offset owned by this buffer.
    pub fn start(&self) -> Offset {
        self.start
    }

    /// One past the last offset owned by this buffer.
    pub fn end(&self) -> Offset {
        self.start + self.storage.len() as Offset
    }

    /// Number of locally stored entities.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether nothing is stored locally.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Whether `offset` is owned by this buffer rather than an ancestor.
    pub fn owns(&self, offset: Offset) -> bool {
        self.start <= offset && offset < self.end()
    }

    /// The atom minted for `id` on this branch.
    pub fn atom(&self, id: &E::Id) -> Option<Atom<E>> {
        self.index.get(id).copied()
    }

    /// Register an entity, minting a new atom unless `id` is already known.
    ///
    /// `make` receives the new atom so self-referential fields can be filled
    /// in. Re-registering an id under a different culture is data
    /// corruption.
    pub fn insert(
        &mut self,
        id: E::Id,
        culture: E::Culture,
        make: impl FnOnce(Atom<E>) -> E,
    ) -> Result<Atom<E>, BranchError> {
        if let Some(existing) = self.index.get(&id) {
            if existing.culture != culture {
                return Err(BranchError::culture_conflict::<E>(&id, existing.culture, culture));
            }
            return Ok(*existing);
        }

        let atom = Atom::new(culture, self.end());
        self.storage.push(make(atom));
        self.index.insert(id, atom);
        Ok(atom)
    }

    /// The entity at a local offset.
    pub fn get(&self, offset: Offset) -> Option<&E> {
        let local = offset.checked_sub(self.start)?;
        self.storage.get(local as usize)
    }

    /// The mutable entity at a local offset.
    pub fn get_mut(&mut self, offset: Offset) -> Option<&mut E> {
        let local = offset.checked_sub(self.start)?;
        self.storage.get_mut(local as usize)
    }

    /// Local entities below `end`, without copying.
    pub fn prefix(&self, end: Offset) -> &[E] {
        let count = end.saturating_sub(self.start) as usize;
        &self.storage[..count.min(self.storage.len())]
    }

    /// Iterate local entities with their atoms.
    pub fn iter(&self) -> impl Iterator<Item = (Atom<E>, &E)> + '_ {
        self.storage
            .iter()
            .zip(self.start..)
            .map(|(element, offset)| (Atom::new(element.culture(), offset), element))
    }

    /// Divergence records for inherited entities.
    pub fn divergences(&self) -> &BTreeMap<Atom<E>, Divergence<E::Heads>> {
        &self.divergences
    }

    /// Divergence record for an inherited entity.
    pub fn divergence(&self, atom: &Atom<E>) -> Option<&Divergence<E::Heads>> {
        self.divergences.get(atom)
    }

    /// Record `value` for `atom`'s `field` at `revision`.
    ///
    /// Local entities are written directly. Inherited entities only get a
    /// divergence when the value differs from what `trunk` (the ancestor
    /// chain at the fork) already shows.
    pub fn update<V: PartialEq>(
        &mut self,
        atom: Atom<E>,
        value: V,
        revision: Revision,
        trunk: Axis<'_, E>,
        field: &Field<E::Heads, V>,
        histories: &mut Histories,
    ) -> Result<UpdateOutcome, BranchError> {
        if atom.offset >= self.start {
            let element = self
                .get_mut(atom.offset)
                .filter(|element| element.culture() == atom.culture)
                .ok_or_else(|| BranchError::unknown_atom(atom))?;
            let slot = (field.head_mut)(element.heads_mut());
            let history = (field.history_mut)(histories);
            if history.current(*slot) == Some(&value) {
                return Ok(UpdateOutcome::Unchanged);
            }
            *slot = Some(history.deposit(value, revision, *slot)?);
            return Ok(UpdateOutcome::Deposited);
        }

        if trunk.pluralize(atom).is_none() {
            return Err(BranchError::foreign_atom(atom));
        }
        let outcome = divergence::diverge(
            &mut self.divergences,
            atom,
            value,
            revision,
            field,
            histories,
            |histories, value| trunk.value(atom, field, histories) == Some(value),
        )?;
        Ok(outcome)
    }
}

impl<E: Element> fmt::Debug for Buffer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("kind", &E::NAME)
            .field("start", &self.start)
            .field("len", &self.storage.len())
            .field("divergences", &self.divergences.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Module, ModuleId};
    use crate::types::PackageIndex;

    fn module(id: &str) -> ModuleId {
        ModuleId::from(id)
    }

    #[test]
    fn test_insert_mints_dense_offsets() {
        let mut buffer: Buffer<Module> = Buffer::new(5);
        let package = PackageIndex(2);

        let a = buffer.insert(module("A"), package, |atom| Module::new(module("A"), atom.culture)).unwrap();
        let b = buffer.insert(module("B"), package, |atom| Module::new(module("B"), atom.culture)).unwrap();

        assert_eq!(a.offset, 5);
        assert_eq!(b.offset, 6);
        assert_eq!(buffer.end(), 7);
        assert!(buffer.owns(6));
        assert!(!buffer.owns(4));
    }

    #[test]
    fn test_insert_existing_id_is_noop() {
        let mut buffer: Buffer<Module> = Buffer::new(0);
        let package = PackageIndex(0);

        let first = buffer.insert(module("A"), package, |atom| Module::new(module("A"), atom.culture)).unwrap();
        let again = buffer
            .insert(module("A"), package, |_| panic!("factory must not run for known ids"))
            .unwrap();

        assert_eq!(first, again);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_insert_conflicting_culture_is_corruption() {
        let mut buffer: Buffer<Module> = Buffer::new(0);
        buffer
            .insert(module("A"), PackageIndex(0), |atom| Module::new(module("A"), atom.culture))
            .unwrap();

        let result = buffer.insert(module("A"), PackageIndex(1), |atom| Module::new(module("A"), atom.culture));
        assert!(matches!(result, Err(BranchError::CultureConflict { .. })));
    }

    #[test]
    fn test_ancestor_offsets_are_not_local() {
        let mut buffer: Buffer<Module> = Buffer::new(3);
        buffer
            .insert(module("A"), PackageIndex(0), |atom| Module::new(module("A"), atom.culture))
            .unwrap();

        assert!(buffer.get(2).is_none());
        assert!(buffer.get(3).is_some());
        assert!(buffer.get(4).is_none());
        assert_eq!(buffer.prefix(3).len(), 0);
        assert_eq!(buffer.prefix(4).len(), 1);
        assert_eq!(buffer.prefix(99).len(), 1);
    }
}
