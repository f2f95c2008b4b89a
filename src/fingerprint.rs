// src/fingerprint.rs

//! Content fingerprints for snapshots and fast-skip comparisons.

use blake3::Hasher;

/// Compute the hex fingerprint of a snapshot's raw content.
///
/// Processors use this to populate `previous_checksum` on a successful
/// check; the datastore records it alongside each history snapshot so the
/// next fetch can skip processing when the content is byte-identical.
pub fn content_fingerprint(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    hasher.finalize().to_hex().to_string()
}
