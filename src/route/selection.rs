//! Accumulated lookup results.

use std::fmt;

/// Result of a lookup that may match zero, one or several entries.
///
/// `Many` is a legal outcome (genuine overload ambiguity at a route); it
/// only becomes an error when a caller asks for a [`unique`](Self::unique)
/// match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    /// Nothing matched.
    None,
    /// Exactly one match.
    One(T),
    /// Several distinct matches, in discovery order.
    Many(Vec<T>),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Self::None
    }
}

impl<T: PartialEq> Selection<T> {
    /// Add a match, ignoring duplicates.
    pub fn append(&mut self, next: T) {
        *self = match std::mem::take(self) {
            Self::None => Self::One(next),
            Self::One(first) if first == next => Self::One(first),
            Self::One(first) => Self::Many(vec![first, next]),
            Self::Many(mut all) => {
                if !all.contains(&next) {
                    all.push(next);
                }
                Self::Many(all)
            }
        };
    }
}

impl<T> Selection<T> {
    /// Number of matches.
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::One(_) => 1,
            Self::Many(all) => all.len(),
        }
    }

    /// Whether nothing matched.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }

    /// All matches, in discovery order.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::None => Vec::new(),
            Self::One(only) => vec![only],
            Self::Many(all) => all,
        }
    }

    /// Transform every match.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Selection<U> {
        match self {
            Self::None => Selection::None,
            Self::One(only) => Selection::One(f(only)),
            Self::Many(all) => Selection::Many(all.into_iter().map(f).collect()),
        }
    }
}

impl<T: fmt::Debug> Selection<T> {
    /// The single match, or an error describing why there isn't one.
    pub fn unique(self) -> Result<T, SelectionError<T>> {
        match self {
            Self::None => Err(SelectionError::None),
            Self::One(only) => Ok(only),
            Self::Many(all) => Err(SelectionError::Many(all)),
        }
    }
}

/// Error when a lookup demanded a unique match.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError<T: fmt::Debug> {
    /// Nothing matched.
    #[error("No entry matched the selection")]
    None,
    /// Several entries matched.
    #[error("Ambiguous selection: {} candidates", .0.len())]
    Many(Vec<T>),
}
