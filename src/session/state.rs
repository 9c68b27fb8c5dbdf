//! Session State
//!
//! Client-local, derived representation of one game session. Rebuilt from
//! ledger reads; never the source of truth. Status is a projection over
//! accumulated facts, so re-derivation is idempotent and two independent
//! clients reading the same ledger state always agree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::variant::GameVariant;

/// Ledger-assigned session identifier.
pub type SessionId = u64;

/// A player's account address on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerAddr(pub String);

impl PlayerAddr {
    /// Construct from any address-like string.
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerAddr {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Configuration fixed at session creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Whether rounds alternate turns between players.
    pub has_turns: bool,
    /// Minimum players before the session can start.
    pub min_players: u8,
    /// Maximum players that may join.
    pub max_players: u8,
    /// Number of commit/reveal rounds to play.
    pub max_rounds: u32,
    /// Minimum per-round deposit (escrow handling is the ledger's business).
    pub min_deposit: u128,
    /// Round expiry, in ledger blocks.
    pub round_expiry_duration: u64,
    /// Close rounds on commitments alone, without a reveal phase.
    pub skip_reveal: bool,
    /// Optional fee locked when joining.
    pub joining_fee: Option<u128>,
    /// Optional reward multiplier applied per round.
    pub round_reward_multiplier: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            has_turns: false,
            min_players: 2,
            max_players: 5,
            max_rounds: 3,
            min_deposit: 0,
            round_expiry_duration: 100,
            skip_reveal: false,
            joining_fee: None,
            round_reward_multiplier: None,
        }
    }
}

impl GameConfig {
    /// Enforce the structural invariants before a create transaction is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_players < 2 {
            return Err(ConfigError::TooFewPlayers {
                min_players: self.min_players,
            });
        }
        if self.max_players < self.min_players {
            return Err(ConfigError::PlayerBoundsInverted {
                min_players: self.min_players,
                max_players: self.max_players,
            });
        }
        if self.max_rounds == 0 {
            return Err(ConfigError::NoRounds);
        }
        Ok(())
    }
}

/// Invalid game configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Fewer than two players can never play.
    #[error("min_players must be at least 2, got {min_players}")]
    TooFewPlayers {
        /// Configured minimum.
        min_players: u8,
    },

    /// max_players below min_players.
    #[error("max_players ({max_players}) below min_players ({min_players})")]
    PlayerBoundsInverted {
        /// Configured minimum.
        min_players: u8,
        /// Configured maximum.
        max_players: u8,
    },

    /// A session needs at least one round.
    #[error("max_rounds must be at least 1")]
    NoRounds,
}

/// A joined player. Immutable once joined; unique by address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Ledger account address.
    pub addr: PlayerAddr,
    /// Optional display label supplied at join time.
    pub label: Option<String>,
}

/// A commitment as recorded on the ledger. Created exactly once per player
/// per round; absence is not a zero digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Lowercase hex SHA-256 digest.
    pub digest_hex: String,
}

/// A reveal as recorded on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealRecord {
    /// The disclosed choice, in its canonical wire rendering.
    pub value: String,
    /// The disclosed nonce.
    pub nonce: u64,
}

/// Ledger-side round phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// Accepting commitments.
    Open,
    /// All commitments in, accepting reveals.
    Committed,
    /// Round closed.
    Ended,
}

/// One commit/reveal cycle. Append-only: commitments and reveals are added,
/// never removed or edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Sequence number starting at 1.
    pub id: u32,
    /// Ledger-side phase.
    pub status: RoundStatus,
    /// Commitments keyed by player.
    pub commits: BTreeMap<PlayerAddr, CommitRecord>,
    /// Reveals keyed by player.
    pub reveals: BTreeMap<PlayerAddr, RevealRecord>,
}

impl Round {
    /// A fresh, open round.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            status: RoundStatus::Open,
            commits: BTreeMap::new(),
            reveals: BTreeMap::new(),
        }
    }

    /// Whether this player has committed in this round.
    pub fn has_committed(&self, player: &PlayerAddr) -> bool {
        self.commits.contains_key(player)
    }

    /// Whether this player has revealed in this round.
    pub fn has_revealed(&self, player: &PlayerAddr) -> bool {
        self.reveals.contains_key(player)
    }

    /// All expected commitments present.
    pub fn all_committed(&self, expected: usize) -> bool {
        self.commits.len() >= expected
    }

    /// All expected reveals present.
    pub fn all_revealed(&self, expected: usize) -> bool {
        self.reveals.len() >= expected
    }
}

/// Derived game status. Never stored client-side; always recomputed from the
/// latest snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Not enough players yet.
    Pending,
    /// Enough players, not started.
    Ready,
    /// Started, current round open.
    InProgress,
    /// All rounds played.
    RoundsFinished,
    /// Terminal.
    Ended,
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::InProgress => "in_progress",
            Self::RoundsFinished => "rounds_finished",
            Self::Ended => "ended",
        };
        f.write_str(s)
    }
}

/// One read of a session from the ledger: configuration, players, rounds,
/// and whether an explicit end transaction has been observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Ledger-assigned id.
    pub id: SessionId,
    /// Game ruleset tag.
    pub variant: GameVariant,
    /// Configuration fixed at creation.
    pub config: GameConfig,
    /// Players in join order.
    pub players: Vec<Player>,
    /// Rounds in sequence order; at most one is ever open.
    pub rounds: Vec<Round>,
    /// Explicit end transaction observed.
    pub ended: bool,
}

impl SessionSnapshot {
    /// The active round, if any round has been opened.
    pub fn current_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    /// Whether the address has joined this session.
    pub fn is_player(&self, addr: &PlayerAddr) -> bool {
        self.players.iter().any(|p| &p.addr == addr)
    }

    /// Whether a round for this player is closed by a commitment alone.
    fn round_closed(&self, round: &Round) -> bool {
        let expected = self.players.len();
        if self.config.skip_reveal {
            round.all_committed(expected)
        } else {
            round.all_revealed(expected)
        }
    }

    /// Derive the game status from this snapshot alone.
    ///
    /// Ordered checks, first match wins; no client-side memory of previous
    /// snapshots may influence the result:
    ///
    /// 1. too few players → [`GameStatus::Pending`]
    /// 2. no round started → [`GameStatus::Ready`]
    /// 3. current round open → [`GameStatus::InProgress`]
    /// 4. end transaction observed → [`GameStatus::Ended`]
    /// 5. current round closed at the final round → [`GameStatus::RoundsFinished`]
    ///
    /// An observed end is terminal once the current round has closed, which
    /// is the only ordering under which a normally completed session (final
    /// round closed, then an end transaction) ever derives ended. A closed
    /// round that is not the final one (the next round has not yet been
    /// opened by the ledger) derives as in-progress.
    pub fn status(&self) -> GameStatus {
        if (self.players.len() as u32) < u32::from(self.config.min_players) {
            return GameStatus::Pending;
        }
        let current = match self.rounds.last() {
            Some(round) => round,
            None => return GameStatus::Ready,
        };
        if !self.round_closed(current) {
            return GameStatus::InProgress;
        }
        if self.ended {
            return GameStatus::Ended;
        }
        if self.rounds.len() as u32 >= self.config.max_rounds {
            return GameStatus::RoundsFinished;
        }
        GameStatus::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_player_config(max_rounds: u32) -> GameConfig {
        GameConfig {
            min_players: 2,
            max_players: 2,
            max_rounds,
            ..GameConfig::default()
        }
    }

    fn player(addr: &str) -> Player {
        Player {
            addr: PlayerAddr::from(addr),
            label: None,
        }
    }

    fn snapshot(config: GameConfig, players: &[&str]) -> SessionSnapshot {
        SessionSnapshot {
            id: 1,
            variant: GameVariant::Dilemma,
            config,
            players: players.iter().map(|a| player(a)).collect(),
            rounds: Vec::new(),
            ended: false,
        }
    }

    fn commit_for(round: &mut Round, addr: &str) {
        round.commits.insert(
            PlayerAddr::from(addr),
            CommitRecord {
                digest_hex: "00".repeat(32),
            },
        );
    }

    fn reveal_for(round: &mut Round, addr: &str) {
        round.reveals.insert(
            PlayerAddr::from(addr),
            RevealRecord {
                value: "cooperate".into(),
                nonce: 1,
            },
        );
    }

    #[test]
    fn test_pending_until_enough_players() {
        let snap = snapshot(two_player_config(1), &["alice"]);
        assert_eq!(snap.status(), GameStatus::Pending);
    }

    #[test]
    fn test_ready_once_full() {
        let snap = snapshot(two_player_config(1), &["alice", "bob"]);
        assert_eq!(snap.status(), GameStatus::Ready);
    }

    #[test]
    fn test_in_progress_while_round_open() {
        let mut snap = snapshot(two_player_config(1), &["alice", "bob"]);
        snap.rounds.push(Round::new(1));
        assert_eq!(snap.status(), GameStatus::InProgress);

        // All commits in but reveals outstanding: still in progress.
        let round = snap.rounds.last_mut().unwrap();
        commit_for(round, "alice");
        commit_for(round, "bob");
        round.status = RoundStatus::Committed;
        assert_eq!(snap.status(), GameStatus::InProgress);

        let round = snap.rounds.last_mut().unwrap();
        reveal_for(round, "alice");
        assert_eq!(snap.status(), GameStatus::InProgress);
    }

    #[test]
    fn test_rounds_finished_after_final_reveal() {
        let mut snap = snapshot(two_player_config(1), &["alice", "bob"]);
        let mut round = Round::new(1);
        commit_for(&mut round, "alice");
        commit_for(&mut round, "bob");
        reveal_for(&mut round, "alice");
        reveal_for(&mut round, "bob");
        round.status = RoundStatus::Ended;
        snap.rounds.push(round);
        assert_eq!(snap.status(), GameStatus::RoundsFinished);
    }

    #[test]
    fn test_closed_round_awaiting_next_is_in_progress() {
        let mut snap = snapshot(two_player_config(3), &["alice", "bob"]);
        let mut round = Round::new(1);
        commit_for(&mut round, "alice");
        commit_for(&mut round, "bob");
        reveal_for(&mut round, "alice");
        reveal_for(&mut round, "bob");
        round.status = RoundStatus::Ended;
        snap.rounds.push(round);
        assert_eq!(snap.status(), GameStatus::InProgress);
    }

    #[test]
    fn test_ended_after_final_round() {
        // normal lifecycle terminus: final round fully revealed, then an
        // end transaction observed
        let mut snap = snapshot(two_player_config(1), &["alice", "bob"]);
        let mut round = Round::new(1);
        commit_for(&mut round, "alice");
        commit_for(&mut round, "bob");
        reveal_for(&mut round, "alice");
        reveal_for(&mut round, "bob");
        round.status = RoundStatus::Ended;
        snap.rounds.push(round);
        assert_eq!(snap.status(), GameStatus::RoundsFinished);

        snap.ended = true;
        assert_eq!(snap.status(), GameStatus::Ended);
    }

    #[test]
    fn test_ended_between_rounds() {
        let mut snap = snapshot(two_player_config(3), &["alice", "bob"]);
        let mut round = Round::new(1);
        commit_for(&mut round, "alice");
        commit_for(&mut round, "bob");
        reveal_for(&mut round, "alice");
        reveal_for(&mut round, "bob");
        round.status = RoundStatus::Ended;
        snap.rounds.push(round);
        snap.ended = true;
        assert_eq!(snap.status(), GameStatus::Ended);
    }

    #[test]
    fn test_skip_reveal_closes_on_commits() {
        let mut config = two_player_config(1);
        config.skip_reveal = true;
        let mut snap = snapshot(config, &["alice", "bob"]);
        let mut round = Round::new(1);
        commit_for(&mut round, "alice");
        commit_for(&mut round, "bob");
        snap.rounds.push(round);
        assert_eq!(snap.status(), GameStatus::RoundsFinished);
    }

    #[test]
    fn test_derivation_is_pure() {
        let mut snap = snapshot(two_player_config(2), &["alice", "bob"]);
        snap.rounds.push(Round::new(1));
        let first = snap.status();
        let second = snap.status();
        assert_eq!(first, second);
    }

    #[test]
    fn test_config_validation() {
        assert!(GameConfig::default().validate().is_ok());

        let too_few = GameConfig {
            min_players: 1,
            ..GameConfig::default()
        };
        assert!(matches!(
            too_few.validate(),
            Err(ConfigError::TooFewPlayers { .. })
        ));

        let inverted = GameConfig {
            min_players: 4,
            max_players: 2,
            ..GameConfig::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(ConfigError::PlayerBoundsInverted { .. })
        ));

        let zero_rounds = GameConfig {
            max_rounds: 0,
            ..GameConfig::default()
        };
        assert_eq!(zero_rounds.validate(), Err(ConfigError::NoRounds));
    }

    #[test]
    fn test_status_wire_rendering() {
        let json = serde_json::to_string(&GameStatus::RoundsFinished).unwrap();
        assert_eq!(json, "\"rounds_finished\"");
        assert_eq!(GameStatus::InProgress.to_string(), "in_progress");
    }
}
