//! Branch-local overrides of fields owned by an ancestor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::element::{Field, Histories};
use crate::history::HistoryError;
use crate::types::Revision;

/// A branch's own history heads for an entity (or opinion) it did not mint.
///
/// `since` is stamped when the branch first diverges and never moves. A
/// `None` head means the field still follows the ancestor chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Divergence<H> {
    /// Revision of the first divergence on this branch.
    pub since: Revision,
    /// Per-field heads.
    pub heads: H,
}

impl<H: Default> Divergence<H> {
    /// A divergence with no field heads yet.
    pub fn new(since: Revision) -> Self {
        Self {
            since,
            heads: H::default(),
        }
    }
}

/// What an update did to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOutcome {
    /// The incoming value was already visible; nothing was written.
    Unchanged,
    /// A history node was written on an existing chain.
    Deposited,
    /// A new divergence head was created for an inherited entity.
    Diverged,
}

/// Tally of update outcomes over a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStats {
    /// Updates that wrote nothing.
    pub unchanged: usize,
    /// Updates that extended an existing chain.
    pub deposited: usize,
    /// Updates that started a divergence.
    pub diverged: usize,
}

impl UpdateStats {
    /// Count one outcome.
    pub fn record(&mut self, outcome: UpdateOutcome) {
        match outcome {
            UpdateOutcome::Unchanged => self.unchanged += 1,
            UpdateOutcome::Deposited => self.deposited += 1,
            UpdateOutcome::Diverged => self.diverged += 1,
        }
    }

    /// Number of updates that wrote to storage.
    pub fn written(&self) -> usize {
        self.deposited + self.diverged
    }
}

/// Record `value` as this branch's view of `key`'s field.
///
/// If the branch already diverged on this field, the write goes to its own
/// chain (a no-op when the chain already holds `value`). Otherwise `inherits`
/// is asked whether the ancestor chain already shows `value`; if so nothing
/// is stored, else a divergence head is created.
pub(crate) fn diverge<K, H, V>(
    divergences: &mut BTreeMap<K, Divergence<H>>,
    key: K,
    value: V,
    revision: Revision,
    field: &Field<H, V>,
    histories: &mut Histories,
    inherits: impl FnOnce(&Histories, &V) -> bool,
) -> Result<UpdateOutcome, HistoryError>
where
    K: Ord,
    H: Default,
    V: PartialEq,
{
    if let Some(divergence) = divergences.get_mut(&key) {
        let head = (field.head)(&divergence.heads);
        if head.is_some() {
            let history = (field.history_mut)(histories);
            if history.current(head) == Some(&value) {
                return Ok(UpdateOutcome::Unchanged);
            }
            let deposited = history.deposit(value, revision, head)?;
            *(field.head_mut)(&mut divergence.heads) = Some(deposited);
            return Ok(UpdateOutcome::Deposited);
        }
    }

    if inherits(histories, &value) {
        return Ok(UpdateOutcome::Unchanged);
    }

    let head = (field.history_mut)(histories).deposit(value, revision, None)?;
    let divergence = divergences
        .entry(key)
        .or_insert_with(|| Divergence::new(revision));
    *(field.head_mut)(&mut divergence.heads) = Some(head);

    tracing::trace!(
        field = field.name,
        since = %divergence.since,
        revision = %revision,
        "Started divergence"
    );
    Ok(UpdateOutcome::Diverged)
}
