//! Integration tests for branching, forking and as-of reads.
//!
//! These tests drive the engine the way an ingestion pass does:
//! 1. Register entities and update fields at the in-progress revision
//! 2. Commit
//! 3. Fork release branches from committed versions
//! 4. Read everything back through lineage views

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use versioned_symbols::{
    BranchError, BranchId, Checkout, CommitInfo, Composite, Declaration, Described, Diacritic, Documentation,
    Documented, HistoryError, Module, ModuleAtom, ModuleId, PackageIndex, Revision, Route, Selection, Symbol,
    SymbolAtom, SymbolId, SymbolMetadata, Tree, TreeConfig, Version,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn info(hash: &str) -> CommitInfo {
    CommitInfo::new(hash, DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap())
}

fn add_module(checkout: &mut Checkout<'_>, name: &str) -> ModuleAtom {
    checkout
        .add(ModuleId::from(name), PackageIndex(0), |atom| {
            Module::new(ModuleId::from(name), atom.culture)
        })
        .unwrap()
        .atom
}

fn add_symbol(checkout: &mut Checkout<'_>, module: ModuleAtom, name: &str) -> SymbolAtom {
    checkout
        .add(SymbolId::from(name), module, |atom| {
            Symbol::new(
                SymbolId::from(name),
                atom.culture,
                vec![name.to_string()],
                Route::new(module, name),
            )
        })
        .unwrap()
        .atom
}

fn commit(tree: &mut Tree, branch: BranchId, hash: &str) -> Version {
    tree.checkout(branch).unwrap().commit(info(hash), BTreeMap::new())
}

/// A `master` branch with module `M` and symbols `s0..s{count}`, committed
/// at revision 0.
fn seeded(count: usize) -> (Tree, BranchId, ModuleAtom, Vec<SymbolAtom>) {
    let mut tree = Tree::new(PackageIndex(0));
    let master = tree.root("master").unwrap();
    let (module, symbols) = {
        let mut checkout = tree.checkout(master).unwrap();
        let module = add_module(&mut checkout, "M");
        let symbols = (0..count)
            .map(|i| add_symbol(&mut checkout, module, &format!("s{i}")))
            .collect();
        checkout.commit(info("m0"), BTreeMap::new());
        (module, symbols)
    };
    (tree, master, module, symbols)
}

fn declaration(tree: &Tree, version: Version, symbol: SymbolAtom) -> Option<Declaration> {
    tree.fasces(version)
        .unwrap()
        .symbols()
        .value(symbol, &Symbol::DECLARATION, tree.histories())
        .cloned()
}

fn metadata(tree: &Tree, version: Version, symbol: SymbolAtom) -> Option<SymbolMetadata> {
    tree.fasces(version)
        .unwrap()
        .symbols()
        .value(symbol, &Symbol::METADATA, tree.histories())
        .cloned()
}

fn roles(symbols: &[SymbolAtom]) -> SymbolMetadata {
    SymbolMetadata {
        roles: symbols.iter().copied().collect(),
        traits: BTreeSet::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_scenario_a_declaration_as_of_revision() {
    let mut tree = Tree::new(PackageIndex(0));
    let master = tree.root("master").unwrap();
    let symbol = {
        let mut checkout = tree.checkout(master).unwrap();
        let module = add_module(&mut checkout, "M");
        let symbol = add_symbol(&mut checkout, module, "f");

        let revision = checkout.next_revision();
        checkout
            .update_declarations([(symbol, Declaration::new("func f()"))], revision)
            .unwrap();
        checkout.commit(info("r0"), BTreeMap::new());

        let revision = checkout.next_revision();
        checkout
            .update_declarations([(symbol, Declaration::new("func f() throws"))], revision)
            .unwrap();
        checkout.commit(info("r1"), BTreeMap::new());
        symbol
    };

    assert_eq!(
        declaration(&tree, Version::new(master, Revision(0)), symbol),
        Some(Declaration::new("func f()"))
    );
    assert_eq!(
        declaration(&tree, Version::new(master, Revision(1)), symbol),
        Some(Declaration::new("func f() throws"))
    );
    assert_eq!(tree.histories().declarations.len(), 2);
}

#[test]
fn test_scenario_b_fork_does_not_see_later_parent_symbols() {
    let (mut tree, master, module, symbols) = seeded(50);
    let r1 = commit(&mut tree, master, "m1");
    let release = tree.fork("release/1.0", r1).unwrap();
    assert_eq!(tree.branch(release).unwrap().symbols().start(), 50);

    let late = {
        let mut checkout = tree.checkout(master).unwrap();
        let late = add_symbol(&mut checkout, module, "s50");
        checkout.commit(info("m2"), BTreeMap::new());
        late
    };
    assert_eq!(late.offset, 50);
    let release_head = commit(&mut tree, release, "r0");

    let fasces = tree.fasces(release_head).unwrap();
    assert_eq!(fasces.symbols().find(&SymbolId::from("s50")), None);
    assert_eq!(fasces.symbols().pluralize(late), None);
    assert!(fasces.symbols().element(late).is_none());
    assert_eq!(fasces.symbols().pluralize(symbols[49]), Some(symbols[49].on(master)));

    let root = tree.fasces(Version::new(master, Revision(2))).unwrap();
    assert_eq!(root.symbols().find(&SymbolId::from("s50")), Some(late.on(master)));
}

#[test]
fn test_scenario_c_override_is_branch_local() {
    let (mut tree, master, _, symbols) = seeded(20);
    let target = symbols[10];
    assert_eq!(target.offset, 10);

    let original = roles(&[symbols[0]]);
    let override_ = roles(&[symbols[1]]);
    let r1 = {
        let mut checkout = tree.checkout(master).unwrap();
        let revision = checkout.next_revision();
        checkout
            .update_metadata::<Symbol>([(target, original.clone())], revision)
            .unwrap();
        checkout.commit(info("m1"), BTreeMap::new())
    };

    let release = tree.fork("release/1.0", r1).unwrap();
    let sibling = tree.fork("release/2.0", r1).unwrap();
    {
        let mut checkout = tree.checkout(release).unwrap();
        let stats = checkout
            .update_metadata::<Symbol>([(target, override_.clone())], Revision(0))
            .unwrap();
        assert_eq!(stats.diverged, 1);
        checkout.commit(info("r0"), BTreeMap::new());
    }
    commit(&mut tree, sibling, "s0");

    // The parent keeps changing after the fork.
    {
        let mut checkout = tree.checkout(master).unwrap();
        let revision = checkout.next_revision();
        checkout
            .update_metadata::<Symbol>([(target, roles(&[symbols[2]]))], revision)
            .unwrap();
        checkout.commit(info("m2"), BTreeMap::new());
    }

    let release_head = Version::new(release, Revision(0));
    let sibling_head = Version::new(sibling, Revision(0));
    assert_eq!(metadata(&tree, release_head, target), Some(override_));
    assert_eq!(metadata(&tree, sibling_head, target), Some(original.clone()));
    assert_eq!(metadata(&tree, r1, target), Some(original));
    assert_eq!(
        metadata(&tree, Version::new(master, Revision(2)), target),
        Some(roles(&[symbols[2]]))
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_fork_offsets_are_monotonic() {
    let (mut tree, master, module, symbols) = seeded(5);
    let release = tree.fork("release", Version::new(master, Revision(0))).unwrap();
    let ring = tree.branch(master).unwrap().ring_at(Revision(0)).unwrap();

    let mut checkout = tree.checkout(release).unwrap();
    let fresh: Vec<_> = (0..3)
        .map(|i| add_symbol(&mut checkout, module, &format!("fresh{i}")))
        .collect();
    let inherited = add_symbol(&mut checkout, module, "s3");

    assert!(fresh.iter().all(|atom| atom.offset >= ring.symbols));
    assert!(symbols.iter().all(|atom| atom.offset < ring.symbols));
    assert_eq!(inherited, symbols[3]);
    assert_eq!(checkout.branch.symbols().len(), 3);
}

#[test]
fn test_unchanged_inherited_value_creates_no_divergence() {
    let (mut tree, master, _, symbols) = seeded(3);
    let decl = Declaration::new("var x: Int");
    let r1 = {
        let mut checkout = tree.checkout(master).unwrap();
        checkout.update_declarations([(symbols[0], decl.clone())], Revision(1)).unwrap();
        checkout.commit(info("m1"), BTreeMap::new())
    };
    let release = tree.fork("release", r1).unwrap();

    let mut checkout = tree.checkout(release).unwrap();
    let stats = checkout.update_declarations([(symbols[0], decl)], Revision(0)).unwrap();
    assert_eq!(stats.unchanged, 1);
    assert_eq!(stats.written(), 0);
    assert!(checkout.branch.symbols().divergences().is_empty());
}

#[test]
fn test_fork_writes_do_not_leak_into_parent() {
    let (mut tree, master, module, symbols) = seeded(4);
    let m0 = Version::new(master, Revision(0));
    {
        let mut checkout = tree.checkout(master).unwrap();
        checkout
            .update_declarations([(symbols[1], Declaration::new("v1"))], Revision(0))
            .unwrap();
    }
    let before = tree.fasces(m0).unwrap().fingerprint();

    let release = tree.fork("release", m0).unwrap();
    {
        let mut checkout = tree.checkout(release).unwrap();
        add_symbol(&mut checkout, module, "extra");
        checkout
            .update_declarations([(symbols[1], Declaration::new("v2"))], Revision(0))
            .unwrap();
        checkout
            .publish(Route::new(module, "s1"), Composite::natural(symbols[2]), Revision(0))
            .unwrap();
        checkout.commit(info("r0"), BTreeMap::new());
    }

    assert_eq!(declaration(&tree, m0, symbols[1]), Some(Declaration::new("v1")));
    assert_eq!(
        declaration(&tree, Version::new(release, Revision(0)), symbols[1]),
        Some(Declaration::new("v2"))
    );
    let parent = tree.fasces(m0).unwrap();
    assert_eq!(parent.fingerprint(), before);
    assert_eq!(parent.symbols().find(&SymbolId::from("extra")), None);
    assert!(parent
        .routes(None)
        .select(&Route::new(module, "s1"), |_, composite| Some(composite))
        .is_empty());
}

#[test]
fn test_forked_revision_is_frozen_in_parent() {
    let (mut tree, master, module, symbols) = seeded(2);
    let m0 = Version::new(master, Revision(0));
    {
        let mut checkout = tree.checkout(master).unwrap();
        checkout
            .update_declarations([(symbols[0], Declaration::new("v1"))], Revision(0))
            .unwrap();
    }
    let release = tree.fork("release", m0).unwrap();
    let r0 = commit(&mut tree, release, "r0");
    let before = tree.fasces(r0).unwrap().fingerprint();

    {
        let mut checkout = tree.checkout(master).unwrap();
        let result = checkout.update_declarations([(symbols[0], Declaration::new("v-rewritten"))], Revision(0));
        assert_eq!(
            result,
            Err(BranchError::FrozenRevision {
                revision: Revision(0),
                frozen: Revision(0),
            })
        );
        let result = checkout.publish(Route::new(module, "s0"), Composite::natural(symbols[1]), Revision(0));
        assert!(matches!(result, Err(BranchError::FrozenRevision { .. })));

        checkout
            .update_declarations([(symbols[0], Declaration::new("v2"))], Revision(1))
            .unwrap();
        checkout.commit(info("m1"), BTreeMap::new());
    }

    assert_eq!(tree.branch(master).unwrap().frozen(), Some(Revision(0)));
    assert_eq!(declaration(&tree, r0, symbols[0]), Some(Declaration::new("v1")));
    assert_eq!(declaration(&tree, m0, symbols[0]), Some(Declaration::new("v1")));
    assert_eq!(
        declaration(&tree, Version::new(master, Revision(1)), symbols[0]),
        Some(Declaration::new("v2"))
    );
    assert_eq!(tree.fasces(r0).unwrap().fingerprint(), before);
}

#[test]
fn test_route_selection_cardinality() {
    let (mut tree, master, module, symbols) = seeded(3);
    let route = Route::new(module, "append(_:)");
    {
        let mut checkout = tree.checkout(master).unwrap();
        checkout.publish(route.clone(), Composite::natural(symbols[0]), Revision(1)).unwrap();
        checkout.commit(info("m1"), BTreeMap::new());
        checkout.publish(route.clone(), Composite::natural(symbols[1]), Revision(2)).unwrap();
        checkout.commit(info("m2"), BTreeMap::new());
    }

    let one = tree
        .fasces(Version::new(master, Revision(1)))
        .unwrap()
        .routes(None)
        .select(&route, |_, composite| Some(composite));
    assert_eq!(one, Selection::One(Composite::natural(symbols[0])));

    let many = tree
        .fasces(Version::new(master, Revision(2)))
        .unwrap()
        .routes(None)
        .select(&route, |_, composite| Some(composite));
    assert!(matches!(many, Selection::Many(_)));
    let found: BTreeSet<_> = many.into_vec().into_iter().collect();
    assert_eq!(
        found,
        BTreeSet::from([Composite::natural(symbols[0]), Composite::natural(symbols[1])])
    );
}

#[test]
fn test_live_branch_routes_layer_over_history() {
    let (mut tree, master, module, symbols) = seeded(2);
    let route = Route::new(module, "f");
    let r1 = {
        let mut checkout = tree.checkout(master).unwrap();
        checkout.publish(route.clone(), Composite::natural(symbols[0]), Revision(1)).unwrap();
        checkout.commit(info("m1"), BTreeMap::new())
    };
    let release = tree.fork("release", r1).unwrap();
    {
        let mut checkout = tree.checkout(release).unwrap();
        checkout.publish(route.clone(), Composite::natural(symbols[1]), Revision(0)).unwrap();
    }

    let fasces = tree.fasces(r1).unwrap();
    let live = fasces
        .routes(tree.branch(release))
        .select(&route, |branch, composite| Some((branch, composite)));
    assert_eq!(
        live,
        Selection::Many(vec![
            (master, Composite::natural(symbols[0])),
            (release, Composite::natural(symbols[1])),
        ])
    );
    assert!(live.clone().unique().is_err());
}

// ─────────────────────────────────────────────────────────────────────────────
// Fields, opinions and error detection
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_exhausted_history_keeps_committed_value() {
    let config = TreeConfig {
        history_limit: 1,
        ..TreeConfig::default()
    };
    let mut tree = Tree::with_config(PackageIndex(0), config).unwrap();
    let master = tree.root("master").unwrap();
    let symbol = {
        let mut checkout = tree.checkout(master).unwrap();
        let module = add_module(&mut checkout, "M");
        let symbol = add_symbol(&mut checkout, module, "f");
        checkout
            .update_declarations([(symbol, Declaration::new("v1"))], Revision(0))
            .unwrap();
        checkout.commit(info("m0"), BTreeMap::new());

        let result = checkout.update_declarations([(symbol, Declaration::new("v2"))], Revision(1));
        assert_eq!(
            result,
            Err(BranchError::History(HistoryError::Exhausted { limit: 1 }))
        );
        checkout.commit(info("m1"), BTreeMap::new());
        symbol
    };

    for revision in [0, 1] {
        assert_eq!(
            declaration(&tree, Version::new(master, Revision(revision)), symbol),
            Some(Declaration::new("v1"))
        );
    }
}

#[test]
fn test_stale_revision_is_rejected() {
    let (mut tree, master, _, symbols) = seeded(1);
    commit(&mut tree, master, "m1");
    commit(&mut tree, master, "m2");

    let mut checkout = tree.checkout(master).unwrap();
    let result = checkout.update_declarations([(symbols[0], Declaration::new("late"))], Revision(0));
    assert!(matches!(result, Err(BranchError::RevisionOutOfRange { .. })));
}

#[test]
fn test_inherited_chain_deposits_after_divergence() {
    let (mut tree, master, _, symbols) = seeded(1);
    let release = tree.fork("release", Version::new(master, Revision(0))).unwrap();
    {
        let mut checkout = tree.checkout(release).unwrap();
        let first = checkout
            .update_documentation::<Symbol>([(symbols[0], Documentation::comment("one"))], Revision(0))
            .unwrap();
        assert_eq!(first.diverged, 1);
        checkout.commit(info("r0"), BTreeMap::new());

        let second = checkout
            .update_documentation::<Symbol>([(symbols[0], Documentation::comment("two"))], Revision(1))
            .unwrap();
        assert_eq!(second.deposited, 1);
        checkout.commit(info("r1"), BTreeMap::new());

        let since = checkout.branch.symbols().divergence(&symbols[0]).map(|divergence| divergence.since);
        assert_eq!(since, Some(Revision(0)));
    }

    let read = |revision| {
        tree.fasces(Version::new(release, Revision(revision)))
            .unwrap()
            .symbols()
            .value(symbols[0], &Symbol::DOCUMENTATION, tree.histories())
            .cloned()
    };
    assert_eq!(read(0), Some(Documentation::comment("one")));
    assert_eq!(read(1), Some(Documentation::comment("two")));
}

#[test]
fn test_top_level_symbols() {
    let (mut tree, master, module, symbols) = seeded(3);
    {
        let mut checkout = tree.checkout(master).unwrap();
        let top: BTreeSet<_> = symbols[..2].iter().copied().collect();
        checkout.update_top_level_symbols([(module, top)], Revision(0)).unwrap();
    }
    let value = tree
        .fasces(Version::new(master, Revision(0)))
        .unwrap()
        .modules()
        .value(module, &Module::TOP_LEVEL_SYMBOLS, tree.histories())
        .cloned();
    assert_eq!(value.map(|top| top.len()), Some(2));
}

#[test]
fn test_opinions_follow_lineage() {
    let (mut tree, master, module, symbols) = seeded(3);
    let diacritic = Diacritic::new(symbols[0], module);
    let r1 = {
        let mut checkout = tree.checkout(master).unwrap();
        let stats = checkout
            .update_opinions([(diacritic, BTreeSet::from([symbols[1]]))], Revision(1))
            .unwrap();
        assert_eq!(stats.diverged, 1);
        checkout.commit(info("m1"), BTreeMap::new())
    };
    let release = tree.fork("release", r1).unwrap();
    {
        let mut checkout = tree.checkout(release).unwrap();
        let same = checkout
            .update_opinions([(diacritic, BTreeSet::from([symbols[1]]))], Revision(0))
            .unwrap();
        assert_eq!(same.unchanged, 1);
        checkout.commit(info("r0"), BTreeMap::new());
        let changed = checkout
            .update_opinions([(diacritic, BTreeSet::from([symbols[2]]))], Revision(1))
            .unwrap();
        assert_eq!(changed.diverged, 1);
        checkout.commit(info("r1"), BTreeMap::new());
    }

    let opinion = |version| tree.fasces(version).unwrap().opinion(&diacritic, tree.histories()).cloned();
    assert_eq!(opinion(r1), Some(BTreeSet::from([symbols[1]])));
    assert_eq!(opinion(Version::new(release, Revision(0))), Some(BTreeSet::from([symbols[1]])));
    assert_eq!(opinion(Version::new(release, Revision(1))), Some(BTreeSet::from([symbols[2]])));
    assert_eq!(opinion(Version::new(master, Revision(0))), None);
}

#[test]
fn test_concurrent_readers() {
    let (mut tree, master, _, symbols) = seeded(64);
    {
        let mut checkout = tree.checkout(master).unwrap();
        let entries = symbols
            .iter()
            .map(|&symbol| (symbol, Declaration::new(format!("decl {}", symbol.offset))));
        checkout.update_declarations(entries, Revision(1)).unwrap();
        checkout.commit(info("m1"), BTreeMap::new());
    }

    let tree = &tree;
    let symbols = &symbols;
    std::thread::scope(|scope| {
        for worker in 0..4 {
            scope.spawn(move || {
                let fasces = tree.fasces(Version::new(master, Revision(1))).unwrap();
                for symbol in symbols.iter().skip(worker).step_by(4) {
                    let found = fasces.symbols().value(*symbol, &Symbol::DECLARATION, tree.histories());
                    assert_eq!(found, Some(&Declaration::new(format!("decl {}", symbol.offset))));
                }
            });
        }
    });
}
