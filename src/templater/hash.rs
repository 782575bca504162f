//! Content hashing for generated build-input trees.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use super::skeleton::SKELETON_VERSION;
use crate::registry::REGISTRY_VERSION;

/// Computes the SHA-256 content hash of an in-memory tree.
///
/// Each file contributes its relative path followed by its content, in
/// sorted path order, so the hash is independent of insertion order. The
/// skeleton and registry versions are folded in first, so bumping either
/// invalidates cached trees built from the same config.
pub fn tree_hash(files: &BTreeMap<String, Vec<u8>>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("apkwrap/s{SKELETON_VERSION}/r{REGISTRY_VERSION}\n"));

    for (path, content) in files {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update((content.len() as u64).to_be_bytes());
        hasher.update(content);
    }

    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_order_independent() {
        let mut a = BTreeMap::new();
        a.insert("b.txt".to_string(), b"two".to_vec());
        a.insert("a.txt".to_string(), b"one".to_vec());

        let mut b = BTreeMap::new();
        b.insert("a.txt".to_string(), b"one".to_vec());
        b.insert("b.txt".to_string(), b"two".to_vec());

        assert_eq!(tree_hash(&a), tree_hash(&b));
    }

    #[test]
    fn content_change_changes_hash() {
        let mut a = BTreeMap::new();
        a.insert("a.txt".to_string(), b"one".to_vec());
        let before = tree_hash(&a);
        a.insert("a.txt".to_string(), b"two".to_vec());
        assert_ne!(before, tree_hash(&a));
    }

    #[test]
    fn path_and_content_boundaries_are_unambiguous() {
        let mut a = BTreeMap::new();
        a.insert("ab".to_string(), b"c".to_vec());
        let mut b = BTreeMap::new();
        b.insert("a".to_string(), b"bc".to_vec());
        assert_ne!(tree_hash(&a), tree_hash(&b));
    }
}
