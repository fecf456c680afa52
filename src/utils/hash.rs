//! Content hash combinator.
//!
//! Program cache keys are opaque strings built from an ordered list of
//! tokens (template uid, collection hash, ...). Every token is fed to an
//! xxh3-64 hasher behind its length, so `["ab", "c"]` and `["a", "bc"]`
//! produce different keys.

use xxhash_rust::xxh3::Xxh3;

/// Hashes an ordered list of string tokens into a 16-digit hex key.
#[must_use]
pub fn hash_tokens<I, S>(tokens: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Xxh3::new();
    for token in tokens {
        let bytes = token.as_ref().as_bytes();
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    format!("{:016x}", hasher.digest())
}

/// Convenience wrapper for the common two-token case.
#[inline]
#[must_use]
pub fn hash_pair(a: &str, b: &str) -> String {
    hash_tokens([a, b])
}
