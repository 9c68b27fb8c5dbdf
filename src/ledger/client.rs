//! Ledger Client Contract
//!
//! The boundary consumed by the session protocol. Wallet key management,
//! signing, transport, and the contract's storage layout all live behind
//! this trait; the client only needs eventually-consistent reads and the
//! ability to submit signed, totally ordered actions.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::catalog::variant::GameVariant;
use crate::session::state::{GameConfig, GameStatus, Round, SessionId, SessionSnapshot};

/// A state-changing contract message.
///
/// Serializes to the externally tagged shape the contract expects, e.g.
/// `{"commit_round": {"session_id": 3, "digest_hex": "..."}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Create a session; the new id is emitted as an event attribute.
    CreateGame {
        /// Ruleset tag, immutable after creation.
        variant: GameVariant,
        /// Session configuration.
        config: GameConfig,
    },
    /// Join an existing session.
    JoinGame {
        /// Target session.
        session_id: SessionId,
        /// Optional display label.
        label: Option<String>,
    },
    /// Open the first round.
    StartGame {
        /// Target session.
        session_id: SessionId,
    },
    /// Submit a commitment digest for the current round.
    CommitRound {
        /// Target session.
        session_id: SessionId,
        /// Lowercase hex SHA-256 digest.
        digest_hex: String,
    },
    /// Disclose the committed choice and nonce.
    RevealRound {
        /// Target session.
        session_id: SessionId,
        /// Canonical rendering of the choice.
        value: String,
        /// The commitment nonce.
        nonce: u64,
    },
    /// Close a session whose rounds are finished.
    EndGame {
        /// Target session.
        session_id: SessionId,
    },
}

/// A structured event emitted by an accepted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Event kind, e.g. `"wasm"`.
    pub kind: String,
    /// Key/value attributes.
    pub attributes: Vec<(String, String)>,
}

impl LedgerEvent {
    /// Look up an attribute by key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Result of an accepted transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteOutcome {
    /// Events emitted during execution.
    pub events: Vec<LedgerEvent>,
}

impl ExecuteOutcome {
    /// Scan emitted events for a ledger-assigned session id.
    ///
    /// New ids are never predictable client-side; they only exist as the
    /// `game_id` attribute of the creation event.
    pub fn session_id(&self) -> Option<SessionId> {
        self.events
            .iter()
            .find_map(|e| e.attribute("game_id"))
            .and_then(|v| v.parse().ok())
    }
}

/// Errors surfaced by a ledger client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    /// Network or timeout failure; the action may or may not have landed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Deterministic rejection: another party's action already advanced the
    /// state, or a precondition failed contract-side.
    #[error("ledger rejected action: {0}")]
    Rejected(String),

    /// The ledger's independent recomputation of the commitment digest did
    /// not match the stored one.
    #[error("reveal does not match the stored commitment")]
    RevealMismatch,

    /// No session with this id.
    #[error("unknown session {0}")]
    UnknownSession(SessionId),
}

/// Capability to read from and write to the ledger on behalf of one signer.
///
/// Reads are eventually consistent with the last finalized write; writes are
/// totally ordered by the ledger. Implementations bind a signing identity,
/// which is how `execute` attributes actions to a player.
pub trait LedgerClient: Send + Sync {
    /// Read a session's configuration, players, and rounds.
    fn query_session(
        &self,
        id: SessionId,
    ) -> impl Future<Output = Result<SessionSnapshot, LedgerError>> + Send;

    /// Read the current round, if one has been opened.
    fn query_current_round(
        &self,
        id: SessionId,
    ) -> impl Future<Output = Result<Option<Round>, LedgerError>> + Send;

    /// Read the status the ledger itself reports for a session.
    fn query_status(
        &self,
        id: SessionId,
    ) -> impl Future<Output = Result<GameStatus, LedgerError>> + Send;

    /// Submit a signed, state-changing action.
    fn execute(
        &self,
        action: Action,
    ) -> impl Future<Output = Result<ExecuteOutcome, LedgerError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_shape() {
        let action = Action::CommitRound {
            session_id: 3,
            digest_hex: "ab".repeat(32),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert!(json.get("commit_round").is_some());
        assert_eq!(json["commit_round"]["session_id"], 3);
    }

    #[test]
    fn test_session_id_from_events() {
        let outcome = ExecuteOutcome {
            events: vec![
                LedgerEvent {
                    kind: "message".into(),
                    attributes: vec![("module".into(), "wasm".into())],
                },
                LedgerEvent {
                    kind: "wasm".into(),
                    attributes: vec![
                        ("action".into(), "create_game".into()),
                        ("game_id".into(), "17".into()),
                    ],
                },
            ],
        };
        assert_eq!(outcome.session_id(), Some(17));
    }

    #[test]
    fn test_session_id_missing() {
        let outcome = ExecuteOutcome {
            events: vec![LedgerEvent {
                kind: "wasm".into(),
                attributes: vec![("action".into(), "join_game".into())],
            }],
        };
        assert_eq!(outcome.session_id(), None);
    }
}
