//! Per-field value histories.
//!
//! A [`History`] is an append-only arena of [`Node`]s. Each entity field (or
//! divergence record) stores the [`Head`] of its own chain; walking
//! `previous` links goes back in time. Writes deduplicate: re-depositing the
//! value the head already holds costs nothing, so storage grows with the
//! number of changes rather than with the number of revisions.
//!
//! ## Chain invariant
//!
//! Along any chain, `first` strictly decreases as you follow `previous`, and
//! a node's `last` is either open (still current) or ends before the `first`
//! of the node that superseded it. Lookups rely on this to stop early.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Revision;

/// Index of a node in a [`History`] arena.
///
/// "No history" is spelled `Option::<Head>::None`; the arena never grows far
/// enough for an index to collide with a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Head(u32);

impl Head {
    /// Position of this node in its arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "head#{}", self.0)
    }
}

/// One value of a field and the revision span it was current for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node<V> {
    /// The field value.
    pub value: V,
    /// First revision the value is visible at.
    pub first: Revision,
    /// Last revision the value is visible at; `None` while it is current.
    pub last: Option<Revision>,
    /// The node this one superseded.
    pub previous: Option<Head>,
}

impl<V> Node<V> {
    /// Whether this node's span covers `revision`.
    pub fn covers(&self, revision: Revision) -> bool {
        self.first <= revision && self.last.map_or(true, |last| revision <= last)
    }

    /// Whether this node is still current.
    pub fn is_open(&self) -> bool {
        self.last.is_none()
    }
}

/// Error raised by history writes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    /// A write arrived for a revision the chain has already moved past.
    #[error("Out-of-order history write at {revision}: chain already covers {covered}")]
    OutOfOrder {
        /// Revision of the rejected write.
        revision: Revision,
        /// Latest revision the chain already accounts for.
        covered: Revision,
    },
    /// The arena reached its configured node limit.
    #[error("History exhausted after {limit} nodes")]
    Exhausted {
        /// The configured limit.
        limit: u32,
    },
    /// A head does not point into this arena.
    #[error("Dangling history head: {0}")]
    DanglingHead(Head),
}

/// Append-only arena of value histories for one field type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History<V> {
    nodes: Vec<Node<V>>,
    limit: u32,
}

impl<V> Default for History<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> History<V> {
    /// Largest number of nodes an arena may hold.
    pub const MAX_NODES: u32 = u32::MAX - 1;

    /// Create an empty arena with the maximum node limit.
    pub fn new() -> Self {
        Self::with_limit(Self::MAX_NODES)
    }

    /// Create an empty arena holding at most `limit` nodes.
    pub fn with_limit(limit: u32) -> Self {
        Self {
            nodes: Vec::new(),
            limit: limit.min(Self::MAX_NODES),
        }
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node limit of this arena.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Get a node by head.
    pub fn node(&self, head: Head) -> Option<&Node<V>> {
        self.nodes.get(head.index())
    }

    /// Find the node whose span covers `revision`, starting at `head`.
    ///
    /// Walks back only past nodes that started after `revision`, so the cost
    /// is proportional to the number of changes since `revision`.
    pub fn find(&self, revision: Revision, head: Option<Head>) -> Option<Head> {
        let mut cursor = head;
        while let Some(current) = cursor {
            let node = self.node(current)?;
            if revision < node.first {
                cursor = node.previous;
                continue;
            }
            return node.covers(revision).then_some(current);
        }
        None
    }

    /// The value of a field as of `revision`.
    pub fn value_as_of(&self, revision: Revision, head: Option<Head>) -> Option<&V> {
        self.find(revision, head)
            .and_then(|found| self.node(found))
            .map(|node| &node.value)
    }

    /// The current value of a chain, if its head is still open.
    pub fn current(&self, head: Option<Head>) -> Option<&V> {
        head.and_then(|head| self.node(head))
            .filter(|node| node.is_open())
            .map(|node| &node.value)
    }

    /// Iterate a chain from the most recent node backwards.
    pub fn chain(&self, head: Option<Head>) -> Chain<'_, V> {
        Chain {
            history: self,
            cursor: head,
        }
    }

    /// Mark the value at `head` as absent from `revision` onward.
    ///
    /// Returns the head that now represents the chain. If the current node
    /// started at `revision` itself it can never be observed, so the chain
    /// falls back to the node it superseded.
    pub fn retire(&mut self, revision: Revision, head: Option<Head>) -> Result<Option<Head>, HistoryError> {
        let Some(head) = head else {
            return Ok(None);
        };
        let node = self
            .nodes
            .get_mut(head.index())
            .ok_or(HistoryError::DanglingHead(head))?;

        if let Some(last) = node.last {
            if revision <= last {
                return Err(HistoryError::OutOfOrder { revision, covered: last });
            }
            return Ok(Some(head));
        }
        if revision < node.first {
            return Err(HistoryError::OutOfOrder {
                revision,
                covered: node.first,
            });
        }
        match revision.predecessor() {
            Some(last) if node.first <= last => {
                node.last = Some(last);
                Ok(Some(head))
            }
            _ => Ok(node.previous),
        }
    }

    fn push(&mut self, node: Node<V>) -> Result<Head, HistoryError> {
        if self.nodes.len() as u64 >= u64::from(self.limit) {
            tracing::error!(limit = self.limit, "History arena exhausted");
            return Err(HistoryError::Exhausted { limit: self.limit });
        }
        let head = Head(self.nodes.len() as u32);
        self.nodes.push(node);
        Ok(head)
    }
}

impl<V: PartialEq> History<V> {
    /// Record `value` for `revision` on the chain starting at `head`.
    ///
    /// Returns `head` unchanged when the chain is current and already holds
    /// `value`. Otherwise seals the old head and returns a new node pointing
    /// back to it. A differing value deposited at the very revision the
    /// current node started at replaces that node's value in place. A failed
    /// write leaves the chain untouched.
    pub fn deposit(&mut self, value: V, revision: Revision, head: Option<Head>) -> Result<Head, HistoryError> {
        let Some(head) = head else {
            return self.push(Node {
                value,
                first: revision,
                last: None,
                previous: None,
            });
        };
        let node = self.node(head).ok_or(HistoryError::DanglingHead(head))?;
        let (first, last, same) = (node.first, node.last, node.value == value);

        if revision < first {
            return Err(HistoryError::OutOfOrder { revision, covered: first });
        }
        match last {
            None if same => return Ok(head),
            None if first == revision => return Ok(self.replace(head, value)),
            Some(last) if revision <= last => {
                return Err(HistoryError::OutOfOrder { revision, covered: last });
            }
            _ => {}
        }
        let pushed = self.push(Node {
            value,
            first: revision,
            last: None,
            previous: Some(head),
        })?;
        if last.is_none() {
            // `revision > first >= 0` here
            self.nodes[head.index()].last = revision.predecessor();
        }
        Ok(pushed)
    }

    /// Replace the value of the open node at `head`, which started at the
    /// revision being written.
    ///
    /// When the node it superseded ended right before it and holds `value`,
    /// that node is reopened instead so adjacent nodes never repeat a value.
    fn replace(&mut self, head: Head, value: V) -> Head {
        let index = head.index();
        let (first, previous) = (self.nodes[index].first, self.nodes[index].previous);
        if let Some(previous) = previous {
            if let Some(node) = self.nodes.get_mut(previous.index()) {
                if node.value == value && node.last.is_some() && node.last == first.predecessor() {
                    node.last = None;
                    if index + 1 == self.nodes.len() {
                        self.nodes.pop();
                    }
                    return previous;
                }
            }
        }
        self.nodes[index].value = value;
        head
    }
}

/// Iterator over a history chain, most recent node first.
pub struct Chain<'a, V> {
    history: &'a History<V>,
    cursor: Option<Head>,
}

impl<'a, V> Iterator for Chain<'a, V> {
    type Item = &'a Node<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.history.node(self.cursor?)?;
        self.cursor = node.previous;
        Some(node)
    }
}
