//! Modules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::{
    ArticleAtom, Described, Documentation, Documented, Element, Field, ModuleAtom, SymbolAtom,
};
use crate::branch::{Branch, Ring};
use crate::buffer::Buffer;
use crate::epoch::Epoch;
use crate::fasces::Fascis;
use crate::history::Head;
use crate::types::{AtomKind, Offset, PackageIndex};

/// External identifier of a module, e.g. `"Foundation"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub String);

impl From<&str> for ModuleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mutable, versioned facts about a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// Modules this module imports.
    pub dependencies: BTreeSet<ModuleAtom>,
}

/// Field history heads of a module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleHeads {
    /// Metadata head.
    pub metadata: Option<Head>,
    /// Top-level symbols head.
    pub top_level_symbols: Option<Head>,
    /// Top-level articles head.
    pub top_level_articles: Option<Head>,
    /// Documentation head.
    pub documentation: Option<Head>,
}

/// A module in a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// External identifier.
    pub id: ModuleId,
    /// Owning package.
    pub culture: PackageIndex,
    /// Field history heads.
    pub heads: ModuleHeads,
}

impl Module {
    /// Create a module with no field history.
    pub fn new(id: ModuleId, culture: PackageIndex) -> Self {
        Self {
            id,
            culture,
            heads: ModuleHeads::default(),
        }
    }

    /// The top-level symbols field.
    pub const TOP_LEVEL_SYMBOLS: Field<ModuleHeads, BTreeSet<SymbolAtom>> = Field {
        name: "top_level_symbols",
        head: |heads| heads.top_level_symbols,
        head_mut: |heads| &mut heads.top_level_symbols,
        history: |histories| &histories.top_level_symbols,
        history_mut: |histories| &mut histories.top_level_symbols,
    };

    /// The top-level articles field.
    pub const TOP_LEVEL_ARTICLES: Field<ModuleHeads, BTreeSet<ArticleAtom>> = Field {
        name: "top_level_articles",
        head: |heads| heads.top_level_articles,
        head_mut: |heads| &mut heads.top_level_articles,
        history: |histories| &histories.top_level_articles,
        history_mut: |histories| &mut histories.top_level_articles,
    };
}

impl AtomKind for Module {
    type Culture = PackageIndex;
    const NAME: &'static str = "module";
}

impl Element for Module {
    type Id = ModuleId;
    type Heads = ModuleHeads;

    fn id(&self) -> &ModuleId {
        &self.id
    }

    fn culture(&self) -> PackageIndex {
        self.culture
    }

    fn heads(&self) -> &ModuleHeads {
        &self.heads
    }

    fn heads_mut(&mut self) -> &mut ModuleHeads {
        &mut self.heads
    }

    fn buffer(branch: &Branch) -> &Buffer<Self> {
        branch.modules()
    }

    fn buffer_mut(branch: &mut Branch) -> &mut Buffer<Self> {
        branch.modules_mut()
    }

    fn end(ring: &Ring) -> Offset {
        ring.modules
    }

    fn epoch<'f, 'a>(fascis: &'f Fascis<'a>) -> &'f Epoch<'a, Self> {
        fascis.modules()
    }
}

impl Described for Module {
    type Metadata = ModuleMetadata;

    const METADATA: Field<ModuleHeads, ModuleMetadata> = Field {
        name: "module_metadata",
        head: |heads| heads.metadata,
        head_mut: |heads| &mut heads.metadata,
        history: |histories| &histories.module_metadata,
        history_mut: |histories| &mut histories.module_metadata,
    };
}

impl Documented for Module {
    const DOCUMENTATION: Field<ModuleHeads, Documentation> = Field {
        name: "module_documentation",
        head: |heads| heads.documentation,
        head_mut: |heads| &mut heads.documentation,
        history: |histories| &histories.documentation,
        history_mut: |histories| &mut histories.documentation,
    };
}
