//! A branch's commit log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Offset, PackageIndex, Version};

/// Buffer end-offsets captured when a revision was committed.
///
/// Ring fields never decrease along a branch's revisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ring {
    /// End of the module buffer.
    pub modules: Offset,
    /// End of the symbol buffer.
    pub symbols: Offset,
    /// End of the article buffer.
    pub articles: Offset,
}

impl Ring {
    /// Create a new ring.
    pub fn new(modules: Offset, symbols: Offset, articles: Offset) -> Self {
        Self {
            modules,
            symbols,
            articles,
        }
    }

    /// Whether every field of `self` is at most the matching field of `other`.
    pub fn precedes(&self, other: &Ring) -> bool {
        self.modules <= other.modules && self.symbols <= other.symbols && self.articles <= other.articles
    }
}

/// Upstream identification of a revision, supplied by ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Source-control hash of the ingested snapshot.
    pub hash: String,
    /// When the snapshot was published.
    pub date: DateTime<Utc>,
    /// Release tag, if the snapshot is a tagged release.
    pub tag: Option<String>,
}

impl CommitInfo {
    /// An untagged commit.
    pub fn new(hash: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            hash: hash.into(),
            date,
            tag: None,
        }
    }

    /// Attach a release tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// One row of a branch's commit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Source-control hash.
    pub hash: String,
    /// Buffer end-offsets at this revision.
    pub ring: Ring,
    /// Versions of dependency packages this revision was built against.
    pub pins: BTreeMap<PackageIndex, Version>,
    /// Publication date.
    pub date: DateTime<Utc>,
    /// Release tag.
    pub tag: Option<String>,
}

impl Commit {
    /// Assemble a commit row.
    pub fn new(info: CommitInfo, ring: Ring, pins: BTreeMap<PackageIndex, Version>) -> Self {
        Self {
            hash: info.hash,
            ring,
            pins,
            date: info.date,
            tag: info.tag,
        }
    }
}
