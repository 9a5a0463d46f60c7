//! The three entity kinds stored in branch buffers.
//!
//! [`Module`], [`Symbol`] and [`Article`] implement the closed [`Element`]
//! trait, which ties each kind to its buffer in a [`Branch`], its ring
//! end-offset, and its epoch in a [`Fascis`]. Mutable fields are reached
//! through [`Field`] accessor tables so the update protocol and the
//! lineage lookups are written once for every kind.

pub mod article;
pub mod module;
pub mod opinion;
pub mod symbol;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;

use crate::branch::{Branch, Ring};
use crate::buffer::Buffer;
use crate::epoch::Epoch;
use crate::fasces::Fascis;
use crate::history::{Head, History};
use crate::types::{Atom, AtomKind, Offset, Position};

pub use article::{Article, ArticleHeads, ArticleId, ArticleMetadata};
pub use module::{Module, ModuleHeads, ModuleId, ModuleMetadata};
pub use opinion::{OpinionHeads, Opinions};
pub use symbol::{Declaration, Symbol, SymbolHeads, SymbolId, SymbolMetadata};

/// Atom of a module; its culture is the owning package.
pub type ModuleAtom = Atom<Module>;
/// Atom of a symbol; its culture is the declaring module.
pub type SymbolAtom = Atom<Symbol>;
/// Atom of an article; its culture is the owning module.
pub type ArticleAtom = Atom<Article>;
/// Position of a module.
pub type ModulePosition = Position<Module>;
/// Position of a symbol.
pub type SymbolPosition = Position<Symbol>;
/// Position of an article.
pub type ArticlePosition = Position<Article>;

/// An entity kind stored in a per-branch [`Buffer`].
pub trait Element: AtomKind + fmt::Debug + Sized {
    /// External identifier the ingestion layer knows the entity by.
    type Id: Clone + Eq + Hash + Ord + fmt::Debug + fmt::Display;
    /// History heads for the entity's mutable fields.
    type Heads: Clone + Default + fmt::Debug;

    /// External identifier of this entity.
    fn id(&self) -> &Self::Id;

    /// Culture the entity was declared in.
    fn culture(&self) -> Self::Culture;

    /// Heads of this entity's branch-original field histories.
    fn heads(&self) -> &Self::Heads;

    /// Mutable heads of this entity's field histories.
    fn heads_mut(&mut self) -> &mut Self::Heads;

    /// This kind's buffer in `branch`.
    fn buffer(branch: &Branch) -> &Buffer<Self>;

    /// This kind's mutable buffer in `branch`.
    fn buffer_mut(branch: &mut Branch) -> &mut Buffer<Self>;

    /// This kind's end-offset in `ring`.
    fn end(ring: &Ring) -> Offset;

    /// This kind's epoch in `fascis`.
    fn epoch<'f, 'a>(fascis: &'f Fascis<'a>) -> &'f Epoch<'a, Self>;
}

/// Accessors for one mutable field: where its head lives and which history
/// arena its values go to.
pub struct Field<H, V> {
    /// Field name used in diagnostics.
    pub name: &'static str,
    /// Read the field's head.
    pub head: fn(&H) -> Option<Head>,
    /// Write the field's head.
    pub head_mut: fn(&mut H) -> &mut Option<Head>,
    /// The history arena for this field.
    pub history: fn(&Histories) -> &History<V>,
    /// The mutable history arena for this field.
    pub history_mut: fn(&mut Histories) -> &mut History<V>,
}

/// Kinds with a metadata field.
pub trait Described: Element {
    /// Metadata value type.
    type Metadata: PartialEq;
    /// The metadata field.
    const METADATA: Field<Self::Heads, Self::Metadata>;
}

/// Kinds with a documentation field.
pub trait Documented: Element {
    /// The documentation field.
    const DOCUMENTATION: Field<Self::Heads, Documentation>;
}

/// Documentation attached to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Documentation {
    /// Reuses another symbol's documentation verbatim.
    Inherits(SymbolAtom),
    /// Own documentation, optionally extending another symbol's.
    Extends {
        /// Symbol whose documentation this extends.
        origin: Option<SymbolAtom>,
        /// Documentation comment.
        comment: String,
    },
}

impl Documentation {
    /// Own documentation that extends nothing.
    pub fn comment(comment: impl Into<String>) -> Self {
        Self::Extends {
            origin: None,
            comment: comment.into(),
        }
    }
}

/// History arenas shared by every branch of a package.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Histories {
    /// Module metadata.
    pub module_metadata: History<ModuleMetadata>,
    /// Symbol metadata.
    pub symbol_metadata: History<SymbolMetadata>,
    /// Article metadata.
    pub article_metadata: History<ArticleMetadata>,
    /// Symbol declarations.
    pub declarations: History<Declaration>,
    /// Documentation for every kind.
    pub documentation: History<Documentation>,
    /// Top-level symbols of modules.
    pub top_level_symbols: History<BTreeSet<SymbolAtom>>,
    /// Top-level articles of modules.
    pub top_level_articles: History<BTreeSet<ArticleAtom>>,
    /// Traits asserted about symbols by foreign cultures.
    pub opinions: History<BTreeSet<SymbolAtom>>,
}

impl Histories {
    /// Create arenas that each hold at most `limit` nodes.
    pub fn with_limit(limit: u32) -> Self {
        Self {
            module_metadata: History::with_limit(limit),
            symbol_metadata: History::with_limit(limit),
            article_metadata: History::with_limit(limit),
            declarations: History::with_limit(limit),
            documentation: History::with_limit(limit),
            top_level_symbols: History::with_limit(limit),
            top_level_articles: History::with_limit(limit),
            opinions: History::with_limit(limit),
        }
    }

    /// Total number of nodes across all arenas.
    pub fn len(&self) -> usize {
        self.module_metadata.len()
            + self.symbol_metadata.len()
            + self.article_metadata.len()
            + self.declarations.len()
            + self.documentation.len()
            + self.top_level_symbols.len()
            + self.top_level_articles.len()
            + self.opinions.len()
    }

    /// Whether no history has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
