//! Deterministic digests of plain data.
//!
//! Used for configuration digests and lineage fingerprints. Values are
//! serialized to JSON and hashed with xxh64, so only types whose
//! serialization is order-stable may be hashed: structs, `Vec`s and
//! `BTreeMap`s, never `HashMap`s.

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to the canonical byte form that gets hashed.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// xxh64 of a value's canonical bytes.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// [`canonical_hash`] as 16 lowercase hex digits.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}
