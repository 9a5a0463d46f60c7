//! Articles.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Described, Documentation, Documented, Element, Field, ModuleAtom};
use crate::branch::{Branch, Ring};
use crate::buffer::Buffer;
use crate::epoch::Epoch;
use crate::fasces::Fascis;
use crate::history::Head;
use crate::route::Route;
use crate::types::{AtomKind, Offset};

/// External identifier of an article, e.g. `"Swift/GettingStarted"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArticleId(pub String);

impl From<&str> for ArticleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mutable, versioned facts about an article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    /// Plain-text headline.
    pub headline: String,
}

/// Field history heads of an article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleHeads {
    /// Metadata head.
    pub metadata: Option<Head>,
    /// Documentation head.
    pub documentation: Option<Head>,
}

/// A standalone documentation article in a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// External identifier.
    pub id: ArticleId,
    /// Owning module.
    pub culture: ModuleAtom,
    /// Route the article is published at.
    pub route: Route,
    /// Field history heads.
    pub heads: ArticleHeads,
}

impl Article {
    /// Create an article with no field history.
    pub fn new(id: ArticleId, culture: ModuleAtom, route: Route) -> Self {
        Self {
            id,
            culture,
            route,
            heads: ArticleHeads::default(),
        }
    }
}

impl AtomKind for Article {
    type Culture = ModuleAtom;
    const NAME: &'static str = "article";
}

impl Element for Article {
    type Id = ArticleId;
    type Heads = ArticleHeads;

    fn id(&self) -> &ArticleId {
        &self.id
    }

    fn culture(&self) -> ModuleAtom {
        self.culture
    }

    fn heads(&self) -> &ArticleHeads {
        &self.heads
    }

    fn heads_mut(&mut self) -> &mut ArticleHeads {
        &mut self.heads
    }

    fn buffer(branch: &Branch) -> &Buffer<Self> {
        branch.articles()
    }

    fn buffer_mut(branch: &mut Branch) -> &mut Buffer<Self> {
        branch.articles_mut()
    }

    fn end(ring: &Ring) -> Offset {
        ring.articles
    }

    fn epoch<'f, 'a>(fascis: &'f Fascis<'a>) -> &'f Epoch<'a, Self> {
        fascis.articles()
    }
}

impl Described for Article {
    type Metadata = ArticleMetadata;

    const METADATA: Field<ArticleHeads, ArticleMetadata> = Field {
        name: "article_metadata",
        head: |heads| heads.metadata,
        head_mut: |heads| &mut heads.metadata,
        history: |histories| &histories.article_metadata,
        history_mut: |histories| &mut histories.article_metadata,
    };
}

impl Documented for Article {
    const DOCUMENTATION: Field<ArticleHeads, Documentation> = Field {
        name: "article_documentation",
        head: |heads| heads.documentation,
        head_mut: |heads| &mut heads.documentation,
        history: |histories| &histories.documentation,
        history_mut: |histories| &mut histories.documentation,
    };
}
