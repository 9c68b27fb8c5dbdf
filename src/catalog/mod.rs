//! Game Catalog
//!
//! Fixed registry mapping a game-variant tag to its choice domain and
//! canonical wire encoding. Read-only, effectively static configuration.
//! Transaction message shapes live in [`crate::ledger::client::Action`];
//! the per-variant part of a payload is produced by
//! [`variant::GameRules::render`].

pub mod variant;

// Re-export key types
pub use variant::{all, rules, Choice, ChoiceDomain, ChoiceError, GameRules, GameVariant};
