//! Document-level deduplication by content checksum.

use crate::store::{DocumentStore, StoreError};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of the UTF-8 bytes of `text`.
pub fn checksum(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether a document with this checksum has already been stored.
///
/// Only first-chunk records carry the checksum, and the store lookup is restricted to them.
pub async fn is_duplicate(store: &dyn DocumentStore, checksum: &str) -> Result<bool, StoreError> {
    store.checksum_exists(checksum).await
}
