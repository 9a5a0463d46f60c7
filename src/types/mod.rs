//! Addressing and versioning primitives.

pub mod atom;
pub mod version;

pub use atom::{Atom, AtomKind, Offset, Position};
pub use version::{BranchId, PackageIndex, Revision, Version};
