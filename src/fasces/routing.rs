//! Route lookups across a lineage.

use crate::branch::Branch;
use crate::route::{Composite, Route, Selection};
use crate::types::BranchId;

use super::Fascis;

/// Route tables of a lineage, optionally layered with one live branch.
#[derive(Debug, Clone, Copy)]
pub struct RoutingView<'s> {
    live: Option<&'s Branch>,
    segments: &'s [Fascis<'s>],
}

impl<'s> RoutingView<'s> {
    /// Layer `live`'s full route table, committed or not, over `segments`.
    pub fn new(live: Option<&'s Branch>, segments: &'s [Fascis<'s>]) -> Self {
        Self { live, segments }
    }

    /// Collect what `f` makes of every composite published at `route`.
    ///
    /// Committed segments only contribute composites published by their
    /// limit. `f` receives the branch that published each composite and may
    /// filter it out by returning `None`.
    pub fn select<T: PartialEq>(
        &self,
        route: &Route,
        mut f: impl FnMut(BranchId, Composite) -> Option<T>,
    ) -> Selection<T> {
        let mut selection = Selection::None;
        for fascis in self.segments {
            let branch = fascis.branch();
            fascis
                .routes()
                .select(route, Some(fascis.limit()), &mut |composite| f(branch, composite), &mut selection);
        }
        if let Some(live) = self.live {
            let branch = live.id();
            live.routes()
                .select(route, None, &mut |composite| f(branch, composite), &mut selection);
        }
        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::{CommitInfo, Ring};
    use crate::element::{ModuleAtom, SymbolAtom};
    use crate::fasces::Fasces;
    use crate::types::{Atom, PackageIndex, Revision, Version};
    use chrono::{DateTime, Utc};
    use std::collections::BTreeMap;

    fn module() -> ModuleAtom {
        Atom::new(PackageIndex(0), 0)
    }

    fn symbol(offset: u32) -> SymbolAtom {
        Atom::new(module(), offset)
    }

    fn route() -> Route {
        Route::new(module(), "f")
    }

    fn info() -> CommitInfo {
        CommitInfo::new("h", DateTime::<Utc>::from_timestamp(0, 0).unwrap())
    }

    #[test]
    fn test_select_across_segments() {
        let mut root = Branch::new(BranchId(0), "master", None);
        root.publish(route(), Composite::natural(symbol(0)), Revision(0)).unwrap();
        root.commit(info(), BTreeMap::new());

        let fork = Version::new(BranchId(0), Revision(0));
        let mut child = Branch::new(BranchId(1), "release", Some((fork, Ring::default())));
        child.publish(route(), Composite::natural(symbol(1)), Revision(0)).unwrap();
        child.commit(info(), BTreeMap::new());

        let fasces = Fasces::new(vec![
            Fascis::new(&root, Revision(0)).unwrap(),
            Fascis::new(&child, Revision(0)).unwrap(),
        ]);
        let selection = fasces.routes(None).select(&route(), |branch, composite| Some((branch, composite)));
        assert_eq!(
            selection,
            Selection::Many(vec![
                (BranchId(0), Composite::natural(symbol(0))),
                (BranchId(1), Composite::natural(symbol(1))),
            ])
        );

        let filtered = fasces
            .routes(None)
            .select(&route(), |branch, composite| (branch == BranchId(0)).then_some(composite));
        assert_eq!(filtered, Selection::One(Composite::natural(symbol(0))));
    }

    #[test]
    fn test_live_layer_sees_uncommitted_routes() {
        let mut root = Branch::new(BranchId(0), "master", None);
        root.publish(route(), Composite::natural(symbol(0)), Revision(0)).unwrap();
        root.commit(info(), BTreeMap::new());
        root.publish(route(), Composite::natural(symbol(2)), Revision(1)).unwrap();

        let fasces = Fasces::new(vec![Fascis::new(&root, Revision(0)).unwrap()]);
        let committed = fasces.routes(None).select(&route(), |_, composite| Some(composite));
        assert_eq!(committed, Selection::One(Composite::natural(symbol(0))));

        let live = fasces.routes(Some(&root)).select(&route(), |_, composite| Some(composite));
        assert_eq!(live.len(), 2);
    }
}
