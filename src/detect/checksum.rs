// src/detect/checksum.rs

//! Content digests.

use sha2::{Digest, Sha256};

/// Hex length of a content digest.
pub const DIGEST_LEN: usize = 64;

/// Lowercase hex SHA-256 of the raw content bytes.
///
/// Every stored digest was produced by this function; changing the algorithm
/// turns the next run into a change for every job.
pub fn content_digest(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}
