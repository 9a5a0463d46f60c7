//! Route tables.
//!
//! A route table maps a lexical [`Route`] key to the set of symbol
//! [`Composite`]s published there. Almost every route has exactly one
//! occupant, so [`Stack`] stores that case inline and only falls back to
//! ordered maps when two composites genuinely collide (overloads, or the
//! same symbol inherited into several hosts).
//!
//! Tables are append-only for the lifetime of a branch. Each entry remembers
//! the revision it was published at so historical readers can ignore
//! entries from later revisions.

pub mod selection;

use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use crate::element::{ModuleAtom, SymbolAtom};
use crate::types::Revision;

pub use selection::{Selection, SelectionError};

/// Lexical lookup key of a documentation page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Route {
    /// Module namespace the route lives under.
    pub namespace: ModuleAtom,
    /// Normalized path stem below the namespace.
    pub stem: String,
}

impl Route {
    /// Create a new route.
    pub fn new(namespace: ModuleAtom, stem: impl Into<String>) -> Self {
        Self {
            namespace,
            stem: stem.into(),
        }
    }
}

/// The perspective that contributed an appearance of a symbol: the host it
/// appears under and the culture that asserted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Diacritic {
    /// Symbol the base appears under.
    pub host: SymbolAtom,
    /// Module that asserted the appearance.
    pub culture: ModuleAtom,
}

impl Diacritic {
    /// Create a new diacritic.
    pub fn new(host: SymbolAtom, culture: ModuleAtom) -> Self {
        Self { host, culture }
    }
}

/// A specific appearance of a base symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Composite {
    /// The symbol itself.
    pub base: SymbolAtom,
    /// Where, and on whose authority, it appears.
    pub diacritic: Diacritic,
}

impl Composite {
    /// The symbol as declared by its own culture.
    pub fn natural(base: SymbolAtom) -> Self {
        Self {
            base,
            diacritic: Diacritic::new(base, base.culture),
        }
    }

    /// The symbol as it appears under `host`, asserted by `culture`.
    pub fn synthesized(base: SymbolAtom, host: SymbolAtom, culture: ModuleAtom) -> Self {
        Self {
            base,
            diacritic: Diacritic::new(host, culture),
        }
    }

    /// Whether this is the symbol's own declaration.
    pub fn is_natural(&self) -> bool {
        self.diacritic.host == self.base && self.diacritic.culture == self.base.culture
    }
}

/// Diacritics published for one base symbol at one route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Substack {
    /// A single diacritic.
    One(Diacritic, Revision),
    /// Several diacritics, each with its publication revision.
    Many(BTreeMap<Diacritic, Revision>),
}

impl Substack {
    /// Add a diacritic; returns whether it was new.
    pub fn insert(&mut self, diacritic: Diacritic, revision: Revision) -> bool {
        match self {
            Self::One(existing, since) => {
                if *existing == diacritic {
                    return false;
                }
                let (existing, since) = (*existing, *since);
                *self = Self::Many(BTreeMap::from([(existing, since), (diacritic, revision)]));
                true
            }
            Self::Many(diacritics) => match diacritics.entry(diacritic) {
                Entry::Vacant(entry) => {
                    entry.insert(revision);
                    true
                }
                Entry::Occupied(_) => false,
            },
        }
    }

    fn for_each(&self, base: SymbolAtom, f: &mut impl FnMut(Composite, Revision)) {
        match self {
            Self::One(diacritic, since) => f(Composite { base, diacritic: *diacritic }, *since),
            Self::Many(diacritics) => {
                for (diacritic, since) in diacritics {
                    f(Composite { base, diacritic: *diacritic }, *since);
                }
            }
        }
    }
}

/// Composites published at one route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stack {
    /// A single composite.
    One(Composite, Revision),
    /// Several composites, grouped by base symbol.
    Many(BTreeMap<SymbolAtom, Substack>),
}

impl Stack {
    /// Add a composite; returns whether it was new.
    pub fn insert(&mut self, composite: Composite, revision: Revision) -> bool {
        match self {
            Self::One(existing, since) => {
                if *existing == composite {
                    return false;
                }
                let (existing, since) = (*existing, *since);
                let mut bases = BTreeMap::new();
                bases.insert(existing.base, Substack::One(existing.diacritic, since));
                let inserted = Self::insert_into(&mut bases, composite, revision);
                *self = Self::Many(bases);
                inserted
            }
            Self::Many(bases) => Self::insert_into(bases, composite, revision),
        }
    }

    fn insert_into(bases: &mut BTreeMap<SymbolAtom, Substack>, composite: Composite, revision: Revision) -> bool {
        match bases.entry(composite.base) {
            Entry::Vacant(entry) => {
                entry.insert(Substack::One(composite.diacritic, revision));
                true
            }
            Entry::Occupied(mut entry) => entry.get_mut().insert(composite.diacritic, revision),
        }
    }

    /// Visit every composite with its publication revision.
    pub fn for_each(&self, mut f: impl FnMut(Composite, Revision)) {
        match self {
            Self::One(composite, since) => f(*composite, *since),
            Self::Many(bases) => {
                for (base, substack) in bases {
                    substack.for_each(*base, &mut f);
                }
            }
        }
    }

    /// Number of composites in the stack.
    pub fn len(&self) -> usize {
        let mut count = 0;
        self.for_each(|_, _| count += 1);
        count
    }

    /// Always false; a stack holds at least one composite.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// One branch's route table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteTable {
    stacks: HashMap<Route, Stack>,
}

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `composite` at `route`; returns whether it was new.
    ///
    /// Re-publishing keeps the original revision.
    pub fn insert(&mut self, route: Route, composite: Composite, revision: Revision) -> bool {
        match self.stacks.get_mut(&route) {
            Some(stack) => stack.insert(composite, revision),
            None => {
                self.stacks.insert(route, Stack::One(composite, revision));
                true
            }
        }
    }

    /// The stack at `route`.
    pub fn stack(&self, route: &Route) -> Option<&Stack> {
        self.stacks.get(route)
    }

    /// Number of distinct routes.
    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    /// Whether no route has been published.
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Project the composites at `route` published no later than `limit`
    /// (all of them when `limit` is `None`) into `selection`.
    pub fn select<T: PartialEq>(
        &self,
        route: &Route,
        limit: Option<Revision>,
        f: &mut impl FnMut(Composite) -> Option<T>,
        selection: &mut Selection<T>,
    ) {
        let Some(stack) = self.stacks.get(route) else {
            return;
        };
        stack.for_each(|composite, since| {
            if limit.map_or(true, |limit| since <= limit) {
                if let Some(selected) = f(composite) {
                    selection.append(selected);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Atom, PackageIndex};

    fn module() -> ModuleAtom {
        Atom::new(PackageIndex(0), 0)
    }

    fn symbol(offset: u32) -> SymbolAtom {
        Atom::new(module(), offset)
    }

    fn route() -> Route {
        Route::new(module(), "array/append(_:)")
    }

    fn collect(table: &RouteTable, limit: Option<Revision>) -> Selection<Composite> {
        let mut selection = Selection::None;
        table.select(&route(), limit, &mut |composite| Some(composite), &mut selection);
        selection
    }

    #[test]
    fn test_single_occupant_stays_inline() {
        let mut table = RouteTable::new();
        assert!(table.insert(route(), Composite::natural(symbol(1)), Revision(0)));
        assert!(!table.insert(route(), Composite::natural(symbol(1)), Revision(3)));

        assert!(matches!(table.stack(&route()), Some(Stack::One(_, Revision(0)))));
        assert_eq!(collect(&table, None), Selection::One(Composite::natural(symbol(1))));
    }

    #[test]
    fn test_collision_promotes_to_many() {
        let mut table = RouteTable::new();
        let natural = Composite::natural(symbol(1));
        let inherited = Composite::synthesized(symbol(1), symbol(7), module());
        let overload = Composite::natural(symbol(2));

        table.insert(route(), natural, Revision(0));
        table.insert(route(), inherited, Revision(1));
        table.insert(route(), overload, Revision(2));

        let stack = table.stack(&route()).unwrap();
        assert_eq!(stack.len(), 3);
        match stack {
            Stack::Many(bases) => {
                assert!(matches!(bases.get(&symbol(1)), Some(Substack::Many(_))));
                assert!(matches!(bases.get(&symbol(2)), Some(Substack::One(_, _))));
            }
            Stack::One(..) => panic!("expected a promoted stack"),
        }
    }

    #[test]
    fn test_select_respects_limit() {
        let mut table = RouteTable::new();
        table.insert(route(), Composite::natural(symbol(1)), Revision(0));
        table.insert(route(), Composite::natural(symbol(2)), Revision(4));

        assert_eq!(collect(&table, Some(Revision(3))), Selection::One(Composite::natural(symbol(1))));
        assert_eq!(collect(&table, Some(Revision(4))).len(), 2);
        assert_eq!(collect(&table, None).len(), 2);
    }

    #[test]
    fn test_composite_natural() {
        assert!(Composite::natural(symbol(3)).is_natural());
        assert!(!Composite::synthesized(symbol(3), symbol(4), module()).is_natural());
    }
}
