//! Commit-Reveal Scheme
//!
//! Binds a player to a hidden choice before it is revealed. The digest is
//! `SHA-256(canonical_choice_bytes || nonce_le_8)`, rendered as lowercase hex
//! for transport. This byte layout is part of the protocol's compatibility
//! surface: the ledger recomputes it independently at reveal time, so any two
//! implementations must agree byte-for-byte.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Width of the nonce encoding in the commitment preimage.
pub const NONCE_WIDTH: usize = 8;

/// A canonically encoded choice, ready for hashing.
///
/// The only sanctioned producer is [`crate::catalog::variant::GameRules::encode`],
/// which owns the per-variant canonical encoding. Routing both the commit
/// path and the reveal path through that single encoder is what makes
/// encode-time/reveal-time mismatches structurally impossible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChoice(Vec<u8>);

impl EncodedChoice {
    /// Wrap canonical choice bytes. Empty input is invalid and rejected
    /// before it can reach the hash function.
    pub fn new(bytes: Vec<u8>) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        Some(Self(bytes))
    }

    /// The canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A 256-bit commitment digest.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDigest([u8; 32]);

impl CommitDigest {
    /// Lowercase hex rendering used on the wire.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Parse a digest from its wire rendering.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for CommitDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CommitDigest({})", self.to_hex())
    }
}

impl std::fmt::Display for CommitDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Preimage bytes for a commitment: `choice || nonce_le_8`.
fn preimage(choice: &EncodedChoice, nonce: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(choice.as_bytes().len() + NONCE_WIDTH);
    bytes.extend_from_slice(choice.as_bytes());
    bytes.extend_from_slice(&nonce.to_le_bytes());
    bytes
}

/// Compute the commitment digest for a choice and nonce.
///
/// Deterministic and one-way: equal inputs always produce the same digest,
/// and the digest reveals nothing about the choice as long as the nonce is
/// unpredictable.
pub fn commit(choice: &EncodedChoice, nonce: u64) -> CommitDigest {
    let mut hasher = Sha256::new();
    hasher.update(preimage(choice, nonce));
    CommitDigest(hasher.finalize().into())
}

/// Verify a reveal against a prior commitment.
///
/// Recomputes the digest and compares for exact equality. No partial or
/// fuzzy matching.
pub fn verify(choice: &EncodedChoice, nonce: u64, digest: &CommitDigest) -> bool {
    commit(choice, nonce) == *digest
}

/// Generate a fresh commitment nonce from the OS CSPRNG.
///
/// The nonce is the sole defense against dictionary attacks on small choice
/// domains (a binary choice has two preimages per nonce), so its 64 bits of
/// entropy must dominate. A counter or timestamp is not acceptable here.
pub fn generate_nonce() -> u64 {
    OsRng.next_u64()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(s: &str) -> EncodedChoice {
        EncodedChoice::new(s.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_preimage_layout() {
        // choice bytes followed by the 8-byte little-endian nonce
        let bytes = preimage(&encoded("cooperate"), 0x0102030405060708);
        assert_eq!(&bytes[..9], b"cooperate");
        assert_eq!(&bytes[9..], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_commit_verify_roundtrip() {
        let choice = encoded("defect");
        let nonce = generate_nonce();
        let digest = commit(&choice, nonce);
        assert!(verify(&choice, nonce, &digest));
    }

    #[test]
    fn test_commit_determinism() {
        let choice = encoded("rock");
        assert_eq!(commit(&choice, 42), commit(&choice, 42));
    }

    #[test]
    fn test_wrong_choice_fails() {
        let digest = commit(&encoded("cooperate"), 7);
        assert!(!verify(&encoded("defect"), 7, &digest));
    }

    #[test]
    fn test_wrong_nonce_fails() {
        let digest = commit(&encoded("cooperate"), 7);
        assert!(!verify(&encoded("cooperate"), 8, &digest));
    }

    #[test]
    fn test_distinct_inputs_distinct_digests() {
        // fixed vectors across the choice/nonce grid must not collide
        let pairs = [
            ("cooperate", 0u64),
            ("cooperate", 1),
            ("defect", 0),
            ("defect", 1),
            ("9", u64::MAX),
        ];
        let digests: Vec<_> = pairs
            .iter()
            .map(|(c, n)| commit(&encoded(c), *n))
            .collect();
        for i in 0..digests.len() {
            for j in (i + 1)..digests.len() {
                assert_ne!(digests[i], digests[j], "{:?} vs {:?}", pairs[i], pairs[j]);
            }
        }
    }

    #[test]
    fn test_empty_choice_rejected() {
        assert!(EncodedChoice::new(Vec::new()).is_none());
    }

    #[test]
    fn test_hex_roundtrip() {
        let digest = commit(&encoded("paper"), 99);
        let hex = digest.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(hex, hex.to_lowercase());
        assert_eq!(CommitDigest::from_hex(&hex), Some(digest));
    }

    #[test]
    fn test_hex_rejects_bad_input() {
        assert!(CommitDigest::from_hex("abcd").is_none());
        assert!(CommitDigest::from_hex("zz").is_none());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn verify_accepts_what_commit_produced(choice in "[a-z0-9]{1,32}", nonce: u64) {
                let encoded = encoded(&choice);
                let digest = commit(&encoded, nonce);
                prop_assert!(verify(&encoded, nonce, &digest));
            }

            #[test]
            fn nonce_blinds_equal_choices(choice in "[a-z]{1,16}", a: u64, b: u64) {
                prop_assume!(a != b);
                let encoded = encoded(&choice);
                prop_assert_ne!(commit(&encoded, a), commit(&encoded, b));
            }
        }
    }
}
