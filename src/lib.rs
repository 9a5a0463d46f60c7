//! # versioned-symbols
//!
//! Branch/revision storage for a documentation indexer.
//!
//! Every package is a [`Tree`] of branches. Each branch appends modules,
//! symbols and articles to its own buffers and publishes revisions; a fork
//! starts its buffers where its parent's ended, so an entity keeps one
//! identity (its [`Atom`]) across every descendant branch.
//!
//! ## Core Contract
//!
//! 1. Entities are append-only: an offset, once minted, never moves
//! 2. Field values are stored per change, not per revision
//! 3. Any field can be read as of any committed version
//! 4. A branch never observes writes made by its siblings or descendants
//!
//! ## Architecture
//!
//! ```text
//! ingestion → Checkout → Branch ─┬─ Buffer<Module | Symbol | Article>
//!                                ├─ RouteTable
//!                                └─ Opinions
//!                     Histories (shared by every branch)
//!
//! query → Tree::fasces(version) → Fasces ─┬─ Axis<E>::{find, pluralize, value}
//!                                         └─ RoutingView::select
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Offsets are dense and assigned in insertion order
//! - Re-depositing an unchanged value writes nothing
//! - Fingerprints of the same lineage shape are identical

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod branch;
pub mod buffer;
pub mod canonical;
pub mod config;
pub mod element;
pub mod epoch;
pub mod fasces;
pub mod history;
pub mod logging;
pub mod route;
pub mod tree;
pub mod types;

pub use branch::{Branch, BranchError, Commit, CommitInfo, Ring};
pub use buffer::{Buffer, Divergence, UpdateOutcome, UpdateStats};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
pub use config::{ConfigError, LogConfig, LogFormat, TreeConfig};
pub use element::{
    Article, ArticleAtom, ArticleId, ArticleMetadata, Declaration, Described, Documentation, Documented, Element,
    Field, Histories, Module, ModuleAtom, ModuleId, ModuleMetadata, Symbol, SymbolAtom, SymbolId, SymbolMetadata,
};
pub use epoch::Epoch;
pub use fasces::{Axis, Fascis, Fasces, RoutingView};
pub use history::{Head, History, HistoryError, Node};
pub use logging::init_tracing;
pub use route::{Composite, Diacritic, Route, RouteTable, Selection, SelectionError};
pub use tree::{Checkout, Tree, TreeError};
pub use types::{Atom, AtomKind, BranchId, Offset, PackageIndex, Position, Revision, Version};

/// Schema version of the stored data types.
/// Increment on breaking changes to any serialized type.
pub const STORAGE_SCHEMA_VERSION: &str = "1.0.0";
