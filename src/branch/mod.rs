//! Branches: the write side of the storage engine.
//!
//! A branch owns one [`Buffer`] per entity kind, its commit log, its route
//! table and its opinion divergences. It is always open for writing.
//!
//! ## Ingestion convention
//!
//! An ingestion pass registers entities and updates fields using
//! [`Branch::next_revision`], then calls [`Branch::commit`], which captures
//! the buffer ends in the revision's [`Ring`] and makes everything visible
//! to readers bounded at that revision. Updates must use either the
//! in-progress revision or the most recently committed one; anything else
//! is rejected. Once a fork captures a revision, the parent can no longer
//! write at it.

pub mod revision;

use std::collections::{BTreeMap, BTreeSet};

use crate::buffer::{divergence, Buffer, UpdateStats};
use crate::element::{
    Article, ArticleAtom, Declaration, Described, Documentation, Documented, Element, Field,
    Histories, Module, ModuleAtom, OpinionHeads, Opinions, Symbol, SymbolAtom,
};
use crate::fasces::Fasces;
use crate::history::HistoryError;
use crate::route::{Composite, Diacritic, Route, RouteTable};
use crate::types::{Atom, BranchId, PackageIndex, Position, Revision, Version};

pub use revision::{Commit, CommitInfo, Ring};

/// Error raised by branch writes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BranchError {
    /// An id was registered again under a different culture.
    #[error("Conflicting culture for {kind} {id}: registered under {existing}, re-registered under {incoming}")]
    CultureConflict {
        /// Entity kind.
        kind: &'static str,
        /// External identifier.
        id: String,
        /// Culture of the existing registration.
        existing: String,
        /// Culture of the rejected registration.
        incoming: String,
    },
    /// An atom in this branch's own range does not name a stored entity.
    #[error("No {kind} stored for {atom} on this branch")]
    UnknownAtom {
        /// Entity kind.
        kind: &'static str,
        /// The atom.
        atom: String,
    },
    /// An inherited atom is not visible through the trunk.
    #[error("{kind} {atom} is not part of this branch's lineage")]
    ForeignAtom {
        /// Entity kind.
        kind: &'static str,
        /// The atom.
        atom: String,
    },
    /// A write used a revision other than the current one.
    #[error("Write at {revision} outside writable revisions {earliest}..={latest}")]
    RevisionOutOfRange {
        /// Revision of the rejected write.
        revision: Revision,
        /// Most recently committed revision.
        earliest: Revision,
        /// In-progress revision.
        latest: Revision,
    },
    /// A write targeted a revision another branch has forked from.
    #[error("Write at {revision} into revision {frozen}, which a fork already captured")]
    FrozenRevision {
        /// Revision of the rejected write.
        revision: Revision,
        /// Latest revision captured by a fork.
        frozen: Revision,
    },
    /// A history write failed.
    #[error("History error: {0}")]
    History(#[from] HistoryError),
}

impl BranchError {
    pub(crate) fn culture_conflict<E: Element>(id: &E::Id, existing: E::Culture, incoming: E::Culture) -> Self {
        tracing::error!(
            kind = E::NAME,
            id = %id,
            existing = ?existing,
            incoming = ?incoming,
            "CULTURE_CONFLICT: id re-registered under a different culture"
        );
        Self::CultureConflict {
            kind: E::NAME,
            id: id.to_string(),
            existing: format!("{:?}", existing),
            incoming: format!("{:?}", incoming),
        }
    }

    pub(crate) fn unknown_atom<E: Element>(atom: Atom<E>) -> Self {
        tracing::error!(atom = ?atom, "UNKNOWN_ATOM: local offset does not name a stored entity");
        Self::UnknownAtom {
            kind: E::NAME,
            atom: format!("{:?}", atom),
        }
    }

    pub(crate) fn foreign_atom<E: Element>(atom: Atom<E>) -> Self {
        tracing::error!(atom = ?atom, "FOREIGN_ATOM: inherited offset outside the trunk");
        Self::ForeignAtom {
            kind: E::NAME,
            atom: format!("{:?}", atom),
        }
    }
}

/// An independent, forkable timeline over the entity buffers.
#[derive(Debug)]
pub struct Branch {
    id: BranchId,
    name: String,
    fork: Option<Version>,
    frozen: Option<Revision>,
    revisions: Vec<Commit>,
    modules: Buffer<Module>,
    symbols: Buffer<Symbol>,
    articles: Buffer<Article>,
    opinions: Opinions,
    routes: RouteTable,
}

impl Branch {
    /// Create a branch, optionally forked at `fork` whose ring is given.
    ///
    /// Buffers of a fork start at the fork ring's offsets; a root starts
    /// at zero.
    pub fn new(id: BranchId, name: impl Into<String>, fork: Option<(Version, Ring)>) -> Self {
        let (fork, ring) = match fork {
            Some((version, ring)) => (Some(version), ring),
            None => (None, Ring::default()),
        };
        Self {
            id,
            name: name.into(),
            fork,
            frozen: None,
            revisions: Vec::new(),
            modules: Buffer::new(ring.modules),
            symbols: Buffer::new(ring.symbols),
            articles: Buffer::new(ring.articles),
            opinions: Opinions::new(),
            routes: RouteTable::new(),
        }
    }

    /// Branch id.
    pub fn id(&self) -> BranchId {
        self.id
    }

    /// Branch name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The version this branch was forked from.
    pub fn fork(&self) -> Option<Version> {
        self.fork
    }

    /// Module buffer.
    pub fn modules(&self) -> &Buffer<Module> {
        &self.modules
    }

    /// Mutable module buffer.
    pub fn modules_mut(&mut self) -> &mut Buffer<Module> {
        &mut self.modules
    }

    /// Symbol buffer.
    pub fn symbols(&self) -> &Buffer<Symbol> {
        &self.symbols
    }

    /// Mutable symbol buffer.
    pub fn symbols_mut(&mut self) -> &mut Buffer<Symbol> {
        &mut self.symbols
    }

    /// Article buffer.
    pub fn articles(&self) -> &Buffer<Article> {
        &self.articles
    }

    /// Mutable article buffer.
    pub fn articles_mut(&mut self) -> &mut Buffer<Article> {
        &mut self.articles
    }

    /// Opinion divergences asserted on this branch.
    pub fn opinions(&self) -> &Opinions {
        &self.opinions
    }

    /// Route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Commit log, oldest first.
    pub fn revisions(&self) -> &[Commit] {
        &self.revisions
    }

    /// Current buffer end-offsets.
    pub fn ring(&self) -> Ring {
        Ring::new(self.modules.end(), self.symbols.end(), self.articles.end())
    }

    /// The revision the next commit will create.
    pub fn next_revision(&self) -> Revision {
        Revision(self.revisions.len() as u32)
    }

    /// Latest revision some fork was taken from. Writes at or below it are
    /// rejected.
    pub fn frozen(&self) -> Option<Revision> {
        self.frozen
    }

    pub(crate) fn freeze(&mut self, revision: Revision) {
        if self.frozen.map_or(true, |frozen| frozen < revision) {
            tracing::debug!(branch = %self.name, revision = %revision, "Froze revision for fork");
            self.frozen = Some(revision);
        }
    }

    /// The most recent committed version.
    pub fn latest(&self) -> Option<Version> {
        self.next_revision()
            .predecessor()
            .map(|revision| Version::new(self.id, revision))
    }

    /// The commit row of `revision`.
    pub fn revision(&self, revision: Revision) -> Option<&Commit> {
        self.revisions.get(revision.index())
    }

    /// The ring captured at `revision`.
    pub fn ring_at(&self, revision: Revision) -> Option<Ring> {
        self.revision(revision).map(|commit| commit.ring)
    }

    /// The version whose commit has `hash`.
    pub fn find_commit(&self, hash: &str) -> Option<Version> {
        self.revisions
            .iter()
            .position(|commit| commit.hash == hash)
            .map(|index| Version::new(self.id, Revision(index as u32)))
    }

    /// The latest version tagged `tag`.
    pub fn find_tag(&self, tag: &str) -> Option<Version> {
        self.revisions
            .iter()
            .rposition(|commit| commit.tag.as_deref() == Some(tag))
            .map(|index| Version::new(self.id, Revision(index as u32)))
    }

    /// Commit the in-progress revision.
    pub fn commit(&mut self, info: CommitInfo, pins: BTreeMap<PackageIndex, Version>) -> Version {
        let revision = self.next_revision();
        let ring = self.ring();
        debug_assert!(self.revisions.last().map_or(true, |last| last.ring.precedes(&ring)));
        tracing::debug!(
            branch = %self.name,
            revision = %revision,
            hash = %info.hash,
            modules = ring.modules,
            symbols = ring.symbols,
            articles = ring.articles,
            "Committed revision"
        );
        self.revisions.push(Commit::new(info, ring, pins));
        Version::new(self.id, revision)
    }

    /// Register an entity, reusing the lineage's atom if `trunk` already
    /// knows `id`.
    pub fn add<E: Element>(
        &mut self,
        id: E::Id,
        culture: E::Culture,
        trunk: &Fasces<'_>,
        make: impl FnOnce(Atom<E>) -> E,
    ) -> Result<Position<E>, BranchError> {
        if let Some(position) = trunk.axis::<E>().find(&id) {
            if position.atom.culture != culture {
                return Err(BranchError::culture_conflict::<E>(&id, position.atom.culture, culture));
            }
            return Ok(position);
        }
        let atom = E::buffer_mut(self).insert(id, culture, make)?;
        Ok(atom.on(self.id))
    }

    /// Publish a composite at a route.
    pub fn publish(&mut self, route: Route, composite: Composite, revision: Revision) -> Result<bool, BranchError> {
        self.check_revision(revision)?;
        Ok(self.routes.insert(route, composite, revision))
    }

    /// Update metadata of modules, symbols or articles.
    pub fn update_metadata<E: Described>(
        &mut self,
        entries: impl IntoIterator<Item = (Atom<E>, E::Metadata)>,
        revision: Revision,
        trunk: &Fasces<'_>,
        histories: &mut Histories,
    ) -> Result<UpdateStats, BranchError> {
        self.update(entries, revision, trunk, &E::METADATA, histories)
    }

    /// Update symbol declarations.
    pub fn update_declarations(
        &mut self,
        entries: impl IntoIterator<Item = (SymbolAtom, Declaration)>,
        revision: Revision,
        trunk: &Fasces<'_>,
        histories: &mut Histories,
    ) -> Result<UpdateStats, BranchError> {
        self.update(entries, revision, trunk, &Symbol::DECLARATION, histories)
    }

    /// Update documentation of modules, symbols or articles.
    pub fn update_documentation<E: Documented>(
        &mut self,
        entries: impl IntoIterator<Item = (Atom<E>, Documentation)>,
        revision: Revision,
        trunk: &Fasces<'_>,
        histories: &mut Histories,
    ) -> Result<UpdateStats, BranchError> {
        self.update(entries, revision, trunk, &E::DOCUMENTATION, histories)
    }

    /// Update the top-level symbols of modules.
    pub fn update_top_level_symbols(
        &mut self,
        entries: impl IntoIterator<Item = (ModuleAtom, BTreeSet<SymbolAtom>)>,
        revision: Revision,
        trunk: &Fasces<'_>,
        histories: &mut Histories,
    ) -> Result<UpdateStats, BranchError> {
        self.update(entries, revision, trunk, &Module::TOP_LEVEL_SYMBOLS, histories)
    }

    /// Update the top-level articles of modules.
    pub fn update_top_level_articles(
        &mut self,
        entries: impl IntoIterator<Item = (ModuleAtom, BTreeSet<ArticleAtom>)>,
        revision: Revision,
        trunk: &Fasces<'_>,
        histories: &mut Histories,
    ) -> Result<UpdateStats, BranchError> {
        self.update(entries, revision, trunk, &Module::TOP_LEVEL_ARTICLES, histories)
    }

    /// Update the traits foreign cultures assert about symbols.
    pub fn update_opinions(
        &mut self,
        entries: impl IntoIterator<Item = (Diacritic, BTreeSet<SymbolAtom>)>,
        revision: Revision,
        trunk: &Fasces<'_>,
        histories: &mut Histories,
    ) -> Result<UpdateStats, BranchError> {
        self.check_revision(revision)?;
        let mut stats = UpdateStats::default();
        for (diacritic, traits) in entries {
            let outcome = divergence::diverge(
                &mut self.opinions,
                diacritic,
                traits,
                revision,
                &OpinionHeads::TRAITS,
                histories,
                |histories, traits| trunk.opinion(&diacritic, histories) == Some(traits),
            )?;
            stats.record(outcome);
        }
        self.log_update(OpinionHeads::TRAITS.name, revision, &stats);
        Ok(stats)
    }

    fn update<E: Element, V: PartialEq>(
        &mut self,
        entries: impl IntoIterator<Item = (Atom<E>, V)>,
        revision: Revision,
        trunk: &Fasces<'_>,
        field: &Field<E::Heads, V>,
        histories: &mut Histories,
    ) -> Result<UpdateStats, BranchError> {
        self.check_revision(revision)?;
        let axis = trunk.axis::<E>();
        let buffer = E::buffer_mut(self);
        let mut stats = UpdateStats::default();
        for (atom, value) in entries {
            stats.record(buffer.update(atom, value, revision, axis, field, histories)?);
        }
        self.log_update(field.name, revision, &stats);
        Ok(stats)
    }

    fn log_update(&self, field: &'static str, revision: Revision, stats: &UpdateStats) {
        tracing::trace!(
            branch = %self.name,
            field,
            revision = %revision,
            unchanged = stats.unchanged,
            deposited = stats.deposited,
            diverged = stats.diverged,
            "Applied field updates"
        );
    }

    fn check_revision(&self, revision: Revision) -> Result<(), BranchError> {
        let latest = self.next_revision();
        let earliest = latest.predecessor().unwrap_or(latest);
        if revision < earliest || latest < revision {
            tracing::warn!(
                branch = %self.name,
                revision = %revision,
                earliest = %earliest,
                latest = %latest,
                "Rejected write outside the writable revisions"
            );
            return Err(BranchError::RevisionOutOfRange {
                revision,
                earliest,
                latest,
            });
        }
        if let Some(frozen) = self.frozen.filter(|frozen| revision <= *frozen) {
            tracing::warn!(
                branch = %self.name,
                revision = %revision,
                frozen = %frozen,
                "Rejected write into a revision captured by a fork"
            );
            return Err(BranchError::FrozenRevision { revision, frozen });
        }
        Ok(())
    }
}
