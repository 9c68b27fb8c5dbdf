//! # Sealed Round
//!
//! Client-side coordinator for commit-reveal games whose authoritative state
//! lives on an external, append-only ledger.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       SEALED ROUND                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/              - Cryptographic primitives               │
//! │  └── commitment.rs  - SHA-256 commit/reveal scheme           │
//! │                                                              │
//! │  catalog/           - Game variant registry                  │
//! │  └── variant.rs     - Choice domains and canonical encoding  │
//! │                                                              │
//! │  session/           - Session protocol (client-local)        │
//! │  ├── state.rs       - Snapshot types, status derivation      │
//! │  ├── secrets.rs     - Durable {choice, nonce} storage        │
//! │  ├── sync.rs        - Polling loop, snapshot publication     │
//! │  └── controller.rs  - State machine and public API           │
//! │                                                              │
//! │  ledger/            - External ledger boundary               │
//! │  ├── client.rs      - Query/execute contract, actions        │
//! │  └── mock.rs        - In-memory ledger for tests and demos   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Trust Model
//!
//! The ledger is the single source of truth and the only serializer of
//! actions. The client never owns session state: it caches read-only
//! snapshots whose staleness is bounded by the poll interval, and it never
//! assumes a locally issued action has taken effect until a later read
//! confirms it. The only client-held secret is the `{choice, nonce}` pair
//! between commit and reveal, persisted through [`session::secrets`] so a
//! process restart does not forfeit the round.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod core;
pub mod ledger;
pub mod session;

// Re-export commonly used types
pub use catalog::variant::{Choice, ChoiceDomain, GameVariant};
pub use crate::core::commitment::{commit, generate_nonce, verify, CommitDigest};
pub use ledger::client::{Action, LedgerClient, LedgerError};
pub use session::controller::{ErrorClass, SessionController, SessionError};
pub use session::state::{GameConfig, GameStatus, PlayerAddr, SessionId, SessionSnapshot};
pub use session::sync::{SessionView, SyncConfig, SyncLoop};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default ledger poll interval for the sync loop.
pub const DEFAULT_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);
