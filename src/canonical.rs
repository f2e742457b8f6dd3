//! Canonical serialization for payload fingerprints.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: struct fields serialize in declaration order
//! - Stable Vec order: transaction statements serialize in submission order
//! - No HashMap in hashed data: maps use BTreeMap

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    // Only called with crate types whose map keys are strings.
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityRef, TxStatement, Value};

    #[test]
    fn test_fingerprint_tracks_payload() {
        let a = vec![TxStatement::add(EntityRef::temp("x"), "k/v", Value::Long(1))];
        let b = vec![TxStatement::add(EntityRef::temp("x"), "k/v", Value::Long(2))];

        assert_eq!(canonical_hash_hex(&a), canonical_hash_hex(&a.clone()));
        assert_ne!(canonical_hash_hex(&a), canonical_hash_hex(&b));
        assert_eq!(canonical_hash_hex(&a).len(), 16);
    }
}
