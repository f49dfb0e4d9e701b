//! Aggregate manifest digest.
//!
//! A single SHA-256 over every entry lets a client tell whether anything in
//! the manifest changed without comparing entries one by one. Entries are
//! fed sorted by path, required group first, each as:
//!
//! ```text
//! tag ('R' | 'O') || path || 0x00 || decimal size || 0x00 || raw digest bytes
//! ```
//!
//! The group tag keeps a file moved from one group to the other from
//! producing the same aggregate.

use super::FileEntry;
use crate::core::{Group, SyncError};
use anyhow::Result;
use sha2::{Digest, Sha256};

/// Compute the aggregate digest of the two groups as lowercase hex.
pub fn compute_aggregate_digest(required: &[FileEntry], optional: &[FileEntry]) -> Result<String> {
    let mut hasher = Sha256::new();
    feed_group(&mut hasher, Group::Required, required)?;
    feed_group(&mut hasher, Group::Optional, optional)?;
    Ok(hex::encode(hasher.finalize()))
}

fn feed_group(hasher: &mut Sha256, group: Group, entries: &[FileEntry]) -> Result<()> {
    let mut sorted: Vec<&FileEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    for entry in sorted {
        let digest_bytes =
            hex::decode(&entry.content_digest).map_err(|e| SyncError::ManifestValidation {
                reason: format!("entry {} has a non-hex digest: {e}", entry.path),
            })?;
        hasher.update([group.digest_tag()]);
        hasher.update(entry.path.as_bytes());
        hasher.update([0u8]);
        hasher.update(entry.size_bytes.to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(&digest_bytes);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const H1: &str = "1111111111111111111111111111111111111111111111111111111111111111";
    const H2: &str = "2222222222222222222222222222222222222222222222222222222222222222";

    #[test]
    fn test_digest_is_order_independent() {
        let a = FileEntry::new("a.jar", H1, 1);
        let b = FileEntry::new("b.jar", H2, 2);
        let first = compute_aggregate_digest(&[a.clone(), b.clone()], &[]).unwrap();
        let second = compute_aggregate_digest(&[b, a], &[]).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_group_tag_prevents_collision() {
        let entry = FileEntry::new("a.jar", H1, 1);
        let as_required = compute_aggregate_digest(std::slice::from_ref(&entry), &[]).unwrap();
        let as_optional = compute_aggregate_digest(&[], std::slice::from_ref(&entry)).unwrap();
        assert_ne!(as_required, as_optional);
    }

    #[test]
    fn test_size_and_content_change_digest() {
        let base = compute_aggregate_digest(&[FileEntry::new("a.jar", H1, 1)], &[]).unwrap();
        let resized = compute_aggregate_digest(&[FileEntry::new("a.jar", H1, 2)], &[]).unwrap();
        let rehashed = compute_aggregate_digest(&[FileEntry::new("a.jar", H2, 1)], &[]).unwrap();
        assert_ne!(base, resized);
        assert_ne!(base, rehashed);
    }

    #[test]
    fn test_empty_manifest_digest_is_sha256_of_nothing() {
        let digest = compute_aggregate_digest(&[], &[]).unwrap();
        assert_eq!(digest, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    }

    #[test]
    fn test_non_hex_digest_is_rejected() {
        assert!(compute_aggregate_digest(&[FileEntry::new("a", "zz", 1)], &[]).is_err());
    }
}
