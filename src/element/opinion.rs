//! Opinions: traits one culture asserts about a symbol declared by another.
//!
//! Opinions have no owning element. Every branch records the ones it
//! asserts as divergences keyed by the [`Diacritic`] that contributed them,
//! and readers resolve them across the lineage like any diverged field.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{Field, SymbolAtom};
use crate::buffer::Divergence;
use crate::history::Head;
use crate::route::Diacritic;

/// Divergence records for opinions, keyed by contributing diacritic.
pub type Opinions = BTreeMap<Diacritic, Divergence<OpinionHeads>>;

/// History heads of an opinion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpinionHeads {
    /// Traits head.
    pub traits: Option<Head>,
}

impl OpinionHeads {
    /// The traits field.
    pub const TRAITS: Field<OpinionHeads, BTreeSet<SymbolAtom>> = Field {
        name: "opinion_traits",
        head: |heads| heads.traits,
        head_mut: |heads| &mut heads.traits,
        history: |histories| &histories.opinions,
        history_mut: |histories| &mut histories.opinions,
    };
}
