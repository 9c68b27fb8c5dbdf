//! Session Protocol
//!
//! Everything that drives a commit-reveal session on behalf of one player:
//! the derived local state model, durable secret storage, the polling sync
//! loop, and the controller that submits actions.

pub mod controller;
pub mod secrets;
pub mod state;
pub mod sync;

// Re-export key types
pub use controller::{ErrorClass, SessionController, SessionError};
pub use secrets::{FileSecretStore, MemorySecretStore, RoundSecret, SecretKey, SecretStore};
pub use state::{
    GameConfig, GameStatus, Player, PlayerAddr, Round, RoundStatus, SessionId, SessionSnapshot,
};
pub use sync::{SessionView, SyncConfig, SyncHandle, SyncLoop};
