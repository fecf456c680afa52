//! Utility Module
//!
//! - [`hash`]: content hash combinator used for program cache keys

pub mod hash;

pub use hash::{hash_pair, hash_tokens};
