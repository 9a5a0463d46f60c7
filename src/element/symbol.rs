//! Symbols.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::{Described, Documentation, Documented, Element, Field, ModuleAtom, SymbolAtom};
use crate::branch::{Branch, Ring};
use crate::buffer::Buffer;
use crate::epoch::Epoch;
use crate::fasces::Fascis;
use crate::history::Head;
use crate::route::Route;
use crate::types::{AtomKind, Offset};

/// External identifier of a symbol (its USR), e.g. `"s:Sa"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub String);

impl From<&str> for SymbolId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declaration of a symbol as rendered from the symbol graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Declaration {
    /// Declaration source text.
    pub fragments: String,
    /// Availability annotation, if any.
    pub availability: Option<String>,
}

impl Declaration {
    /// A declaration with no availability annotation.
    pub fn new(fragments: impl Into<String>) -> Self {
        Self {
            fragments: fragments.into(),
            availability: None,
        }
    }
}

/// Mutable, versioned facts about a symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMetadata {
    /// Symbols this symbol plays a role for (e.g. its scope).
    pub roles: BTreeSet<SymbolAtom>,
    /// Traits asserted by the symbol's own culture.
    pub traits: BTreeSet<SymbolAtom>,
}

/// Field history heads of a symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolHeads {
    /// Metadata head.
    pub metadata: Option<Head>,
    /// Declaration head.
    pub declaration: Option<Head>,
    /// Documentation head.
    pub documentation: Option<Head>,
}

/// A symbol in a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    /// External identifier.
    pub id: SymbolId,
    /// Declaring module.
    pub culture: ModuleAtom,
    /// Lexical path components, e.g. `["Array", "append(_:)"]`.
    pub path: Vec<String>,
    /// Route the symbol is published at.
    pub route: Route,
    /// Field history heads.
    pub heads: SymbolHeads,
}

impl Symbol {
    /// Create a symbol with no field history.
    pub fn new(id: SymbolId, culture: ModuleAtom, path: Vec<String>, route: Route) -> Self {
        Self {
            id,
            culture,
            path,
            route,
            heads: SymbolHeads::default(),
        }
    }

    /// The declaration field.
    pub const DECLARATION: Field<SymbolHeads, Declaration> = Field {
        name: "declaration",
        head: |heads| heads.declaration,
        head_mut: |heads| &mut heads.declaration,
        history: |histories| &histories.declarations,
        history_mut: |histories| &mut histories.declarations,
    };
}

impl AtomKind for Symbol {
    type Culture = ModuleAtom;
    const NAME: &'static str = "symbol";
}

impl Element for Symbol {
    type Id = SymbolId;
    type Heads = SymbolHeads;

    fn id(&self) -> &SymbolId {
        &self.id
    }

    fn culture(&self) -> ModuleAtom {
        self.culture
    }

    fn heads(&self) -> &SymbolHeads {
        &self.heads
    }

    fn heads_mut(&mut self) -> &mut SymbolHeads {
        &mut self.heads
    }

    fn buffer(branch: &Branch) -> &Buffer<Self> {
        branch.symbols()
    }

    fn buffer_mut(branch: &mut Branch) -> &mut Buffer<Self> {
        branch.symbols_mut()
    }

    fn end(ring: &Ring) -> Offset {
        ring.symbols
    }

    fn epoch<'f, 'a>(fascis: &'f Fascis<'a>) -> &'f Epoch<'a, Self> {
        fascis.symbols()
    }
}

impl Described for Symbol {
    type Metadata = SymbolMetadata;

    const METADATA: Field<SymbolHeads, SymbolMetadata> = Field {
        name: "symbol_metadata",
        head: |heads| heads.metadata,
        head_mut: |heads| &mut heads.metadata,
        history: |histories| &histories.symbol_metadata,
        history_mut: |histories| &mut histories.symbol_metadata,
    };
}

impl Documented for Symbol {
    const DOCUMENTATION: Field<SymbolHeads, Documentation> = Field {
        name: "symbol_documentation",
        head: |heads| heads.documentation,
        head_mut: |heads| &mut heads.documentation,
        history: |histories| &histories.documentation,
        history_mut: |histories| &mut histories.documentation,
    };
}
