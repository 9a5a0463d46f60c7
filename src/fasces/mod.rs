//! Lineage views: one branch bounded by a revision ([`Fascis`]) and the
//! ordered chain of them from the root down to the queried branch
//! ([`Fasces`]).
//!
//! Every cross-branch read goes through a [`Fasces`]. Segments are ordered
//! oldest ancestor first; since a fork's buffers start where its parent's
//! ring ended at the fork revision, the segments' epochs tile each kind's
//! offset space in ascending order, which is what makes
//! [`Axis::pluralize`] a binary search.
//!
//! Each segment answers history queries at its own `limit`: an ancestor
//! segment is bounded at the revision its child forked from, so writes the
//! ancestor makes after the fork stay invisible downstream.

pub mod routing;

use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;

use crate::branch::{Branch, Ring};
use crate::buffer::Divergence;
use crate::canonical::canonical_hash_hex;
use crate::element::{Article, Element, Field, Histories, Module, OpinionHeads, Opinions, Symbol, SymbolAtom};
use crate::epoch::Epoch;
use crate::route::{Diacritic, RouteTable};
use crate::types::{Atom, BranchId, Offset, Position, Revision};
use crate::STORAGE_SCHEMA_VERSION;

pub use routing::RoutingView;

/// One branch's contribution to a lineage, bounded by a revision.
#[derive(Debug, Clone, Copy)]
pub struct Fascis<'a> {
    branch: BranchId,
    limit: Revision,
    ring: Ring,
    modules: Epoch<'a, Module>,
    symbols: Epoch<'a, Symbol>,
    articles: Epoch<'a, Article>,
    opinions: &'a Opinions,
    routes: &'a RouteTable,
}

impl<'a> Fascis<'a> {
    /// View `branch` as of its committed revision `limit`.
    ///
    /// Returns `None` if `limit` has not been committed.
    pub fn new(branch: &'a Branch, limit: Revision) -> Option<Self> {
        let ring = branch.ring_at(limit)?;
        Some(Self {
            branch: branch.id(),
            limit,
            ring,
            modules: epoch(branch, &ring, limit),
            symbols: epoch(branch, &ring, limit),
            articles: epoch(branch, &ring, limit),
            opinions: branch.opinions(),
            routes: branch.routes(),
        })
    }

    /// The viewed branch.
    pub fn branch(&self) -> BranchId {
        self.branch
    }

    /// Revision bounding this view.
    pub fn limit(&self) -> Revision {
        self.limit
    }

    /// Buffer ends at `limit`.
    pub fn ring(&self) -> Ring {
        self.ring
    }

    /// Module epoch.
    pub fn modules(&self) -> &Epoch<'a, Module> {
        &self.modules
    }

    /// Symbol epoch.
    pub fn symbols(&self) -> &Epoch<'a, Symbol> {
        &self.symbols
    }

    /// Article epoch.
    pub fn articles(&self) -> &Epoch<'a, Article> {
        &self.articles
    }

    /// The opinion this branch had asserted for `diacritic` by `limit`.
    pub fn opinion(&self, diacritic: &Diacritic) -> Option<&'a Divergence<OpinionHeads>> {
        self.opinions
            .get(diacritic)
            .filter(|divergence| divergence.since <= self.limit)
    }

    /// The branch's route table, unbounded; callers filter by `limit`.
    pub fn routes(&self) -> &'a RouteTable {
        self.routes
    }
}

fn epoch<'a, E: Element>(branch: &'a Branch, ring: &Ring, limit: Revision) -> Epoch<'a, E> {
    Epoch::new(E::buffer(branch), E::end(ring), branch.id(), limit)
}

/// The ordered chain of [`Fascis`] segments, root first.
#[derive(Debug, Clone, Default)]
pub struct Fasces<'a> {
    segments: Vec<Fascis<'a>>,
}

#[derive(Serialize)]
struct SegmentKey {
    branch: BranchId,
    limit: Revision,
    ring: Ring,
}

impl<'a> Fasces<'a> {
    /// Chain `segments`, which must be ordered oldest ancestor first.
    pub fn new(segments: Vec<Fascis<'a>>) -> Self {
        Self { segments }
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the chain is empty (the trunk of a root branch).
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments, oldest first.
    pub fn segments(&self) -> &[Fascis<'a>] {
        &self.segments
    }

    /// Iterate segments, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, Fascis<'a>> {
        self.segments.iter()
    }

    /// The most derived branch in the chain.
    pub fn branch(&self) -> Option<BranchId> {
        self.segments.last().map(Fascis::branch)
    }

    /// Lookups for one entity kind.
    pub fn axis<E: Element>(&self) -> Axis<'_, E> {
        Axis::new(&self.segments)
    }

    /// Module lookups.
    pub fn modules(&self) -> Axis<'_, Module> {
        self.axis()
    }

    /// Symbol lookups.
    pub fn symbols(&self) -> Axis<'_, Symbol> {
        self.axis()
    }

    /// Article lookups.
    pub fn articles(&self) -> Axis<'_, Article> {
        self.axis()
    }

    /// Traits `diacritic.culture` asserts about `diacritic.host`, as seen
    /// from the most derived segment.
    pub fn opinion<'h>(&self, diacritic: &Diacritic, histories: &'h Histories) -> Option<&'h BTreeSet<SymbolAtom>> {
        let field = &OpinionHeads::TRAITS;
        let history = (field.history)(histories);
        self.segments.iter().rev().find_map(|fascis| {
            let divergence = fascis.opinion(diacritic)?;
            history.value_as_of(fascis.limit(), (field.head)(&divergence.heads))
        })
    }

    /// Route lookups, optionally layering a live branch's uncommitted routes
    /// over the committed segments.
    pub fn routes(&self, layering: Option<&'a Branch>) -> RoutingView<'_> {
        RoutingView::new(layering, &self.segments)
    }

    /// Deterministic digest of the chain's shape, usable as a cache key.
    pub fn fingerprint(&self) -> String {
        let keys: Vec<SegmentKey> = self
            .segments
            .iter()
            .map(|fascis| SegmentKey {
                branch: fascis.branch,
                limit: fascis.limit,
                ring: fascis.ring,
            })
            .collect();
        canonical_hash_hex(&(STORAGE_SCHEMA_VERSION, keys))
    }
}

/// Typed lookups for one entity kind across a lineage.
pub struct Axis<'s, E: Element> {
    segments: &'s [Fascis<'s>],
    kind: PhantomData<fn() -> E>,
}

impl<E: Element> Clone for Axis<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: Element> Copy for Axis<'_, E> {}

impl<'s, E: Element> Axis<'s, E> {
    /// Lookups over `segments`, oldest first.
    pub fn new(segments: &'s [Fascis<'s>]) -> Self {
        Self {
            segments,
            kind: PhantomData,
        }
    }

    /// This kind's epochs, oldest first.
    pub fn epochs(&self) -> impl DoubleEndedIterator<Item = &'s Epoch<'s, E>> + 's {
        self.segments.iter().map(E::epoch)
    }

    /// The position minted anywhere in the lineage for `id`.
    pub fn find(&self, id: &E::Id) -> Option<Position<E>> {
        self.epochs()
            .rev()
            .find_map(|epoch| epoch.position(id).map(|atom| atom.on(epoch.branch())))
    }

    /// The segment whose epoch contains `offset`.
    pub fn locate(&self, offset: Offset) -> Option<&'s Fascis<'s>> {
        let segments = self.segments;
        segments
            .binary_search_by(|fascis| E::epoch(fascis).locate(offset))
            .ok()
            .map(|index| &segments[index])
    }

    /// Tag `atom` with the branch that minted it.
    pub fn pluralize(&self, atom: Atom<E>) -> Option<Position<E>> {
        self.locate(atom.offset).map(|fascis| atom.on(fascis.branch()))
    }

    /// The element at `atom`, if it exists in the lineage under `atom`'s
    /// culture.
    pub fn element(&self, atom: Atom<E>) -> Option<&'s E> {
        let fascis = self.locate(atom.offset)?;
        E::epoch(fascis)
            .get(atom.offset)
            .filter(|element| element.culture() == atom.culture)
    }

    /// The element at `position`.
    ///
    /// Siblings forked from the same version share offsets above the fork,
    /// so a position minted on a branch outside this lineage resolves to
    /// `None` rather than to whatever occupies the same offset here.
    pub fn resolve(&self, position: Position<E>) -> Option<&'s E> {
        let fascis = self.locate(position.offset())?;
        if fascis.branch() != position.branch {
            return None;
        }
        self.element(position.atom)
    }

    /// The value of `atom`'s `field` as seen from the most derived segment.
    ///
    /// Divergences recorded by descendants of the minting branch take
    /// precedence, newest first; otherwise the minting branch's own history
    /// answers. Each segment is queried at its own limit.
    pub fn value<'h, V>(&self, atom: Atom<E>, field: &Field<E::Heads, V>, histories: &'h Histories) -> Option<&'h V> {
        let segments = self.segments;
        let index = segments
            .binary_search_by(|fascis| E::epoch(fascis).locate(atom.offset))
            .ok()?;
        let origin = &segments[index];
        let element = E::epoch(origin)
            .get(atom.offset)
            .filter(|element| element.culture() == atom.culture)?;
        let history = (field.history)(histories);

        for fascis in segments[index + 1..].iter().rev() {
            let Some(divergence) = E::epoch(fascis).divergence(&atom) else {
                continue;
            };
            let head = (field.head)(&divergence.heads);
            if let Some(value) = history.value_as_of(fascis.limit(), head) {
                return Some(value);
            }
        }
        history.value_as_of(origin.limit(), (field.head)(element.heads()))
    }
}

impl<E: Element> fmt::Debug for Axis<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Axis")
            .field("kind", &E::NAME)
            .field("segments", &self.segments.len())
            .finish()
    }
}
