//! Core cryptographic primitives.
//!
//! Pure functions with no state and no I/O. Everything in this module is
//! deterministic except nonce generation, which deliberately is not.

pub mod commitment;

// Re-export core types
pub use commitment::{commit, generate_nonce, verify, CommitDigest, EncodedChoice};
