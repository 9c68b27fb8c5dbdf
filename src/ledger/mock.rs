//! In-Memory Ledger
//!
//! A process-local stand-in for the contract, used by the demo binary and
//! the test suite. It reproduces the contract's lifecycle semantics: an id
//! counter, join/start preconditions, round bookkeeping, and an independent
//! SHA-256 recomputation at reveal time. Rejections here model the
//! deterministic rejections a real ledger would return, which is what makes
//! contention paths testable without a network. There is no block-height
//! notion, so `round_expiry_duration` is carried but never closes a round.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};

use crate::ledger::client::{Action, ExecuteOutcome, LedgerClient, LedgerError, LedgerEvent};
use crate::session::state::{
    GameStatus, Player, PlayerAddr, Round, RoundStatus, SessionId, SessionSnapshot,
};

#[derive(Default)]
struct MockState {
    games: std::collections::BTreeMap<SessionId, SessionSnapshot>,
    next_id: SessionId,
    fail_queries: u32,
    fail_executes: u32,
}

/// Shared mock ledger state with per-player handles.
///
/// Clones produced by [`MockLedger::for_player`] share one state, so several
/// controllers can race against the same session the way independent wallets
/// race against one contract.
pub struct MockLedger {
    state: Arc<Mutex<MockState>>,
    submissions: Arc<AtomicU64>,
    sender: PlayerAddr,
}

impl MockLedger {
    /// Fresh ledger bound to one signing identity.
    pub fn new(sender: impl Into<PlayerAddr>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            submissions: Arc::new(AtomicU64::new(0)),
            sender: sender.into(),
        }
    }

    /// A handle over the same ledger state, signing as another player.
    pub fn for_player(&self, sender: impl Into<PlayerAddr>) -> Self {
        Self {
            state: Arc::clone(&self.state),
            submissions: Arc::clone(&self.submissions),
            sender: sender.into(),
        }
    }

    /// Total transactions submitted through any handle.
    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Make the next `n` read queries fail with a transport error.
    pub fn fail_next_queries(&self, n: u32) {
        self.state.lock().unwrap().fail_queries = n;
    }

    /// Make the next `n` transactions fail in transit, never reaching the
    /// ledger.
    pub fn fail_next_executes(&self, n: u32) {
        self.state.lock().unwrap().fail_executes = n;
    }

    fn check_query_failure(&self) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_queries > 0 {
            state.fail_queries -= 1;
            return Err(LedgerError::Transport("injected read failure".into()));
        }
        Ok(())
    }

    fn apply(&self, action: Action) -> Result<ExecuteOutcome, LedgerError> {
        let mut state = self.state.lock().unwrap();
        match action {
            Action::CreateGame { variant, config } => {
                let id = state.next_id;
                state.next_id += 1;
                state.games.insert(
                    id,
                    SessionSnapshot {
                        id,
                        variant,
                        config,
                        players: Vec::new(),
                        rounds: Vec::new(),
                        ended: false,
                    },
                );
                Ok(ExecuteOutcome {
                    events: vec![LedgerEvent {
                        kind: "wasm".into(),
                        attributes: vec![
                            ("action".into(), "create_game".into()),
                            ("game_id".into(), id.to_string()),
                        ],
                    }],
                })
            }
            Action::JoinGame { session_id, label } => {
                let game = Self::game_mut(&mut state, session_id)?;
                match game.status() {
                    GameStatus::Pending | GameStatus::Ready => {}
                    status => {
                        return Err(LedgerError::Rejected(format!(
                            "game {session_id} cannot be joined while {status}"
                        )))
                    }
                }
                if game.is_player(&self.sender) {
                    return Err(LedgerError::Rejected(format!(
                        "player {} already joined",
                        self.sender
                    )));
                }
                if game.players.len() >= game.config.max_players as usize {
                    return Err(LedgerError::Rejected(format!("game {session_id} is full")));
                }
                game.players.push(Player {
                    addr: self.sender.clone(),
                    label,
                });
                Ok(ExecuteOutcome {
                    events: vec![LedgerEvent {
                        kind: "wasm".into(),
                        attributes: vec![
                            ("action".into(), "join_game".into()),
                            ("game_id".into(), session_id.to_string()),
                            ("player".into(), self.sender.to_string()),
                        ],
                    }],
                })
            }
            Action::StartGame { session_id } => {
                let game = Self::game_mut(&mut state, session_id)?;
                if game.status() != GameStatus::Ready {
                    return Err(LedgerError::Rejected(format!(
                        "game {session_id} is not ready to start"
                    )));
                }
                game.rounds.push(Round::new(1));
                Ok(ExecuteOutcome::default())
            }
            Action::CommitRound {
                session_id,
                digest_hex,
            } => {
                let sender = self.sender.clone();
                let game = Self::game_mut(&mut state, session_id)?;
                if !game.is_player(&sender) {
                    return Err(LedgerError::Rejected(format!(
                        "player {sender} not in game {session_id}"
                    )));
                }
                let players = game.players.len();
                let round = game
                    .rounds
                    .last_mut()
                    .ok_or_else(|| LedgerError::Rejected("no open round".into()))?;
                if round.status != RoundStatus::Open {
                    return Err(LedgerError::Rejected(format!(
                        "round {} is not accepting commitments",
                        round.id
                    )));
                }
                if round.has_committed(&sender) {
                    return Err(LedgerError::Rejected(format!(
                        "player {sender} already committed in round {}",
                        round.id
                    )));
                }
                round
                    .commits
                    .insert(sender, crate::session::state::CommitRecord { digest_hex });
                if round.all_committed(players) {
                    round.status = RoundStatus::Committed;
                }
                Ok(ExecuteOutcome::default())
            }
            Action::RevealRound {
                session_id,
                value,
                nonce,
            } => {
                let sender = self.sender.clone();
                let game = Self::game_mut(&mut state, session_id)?;
                if game.config.skip_reveal {
                    return Ok(ExecuteOutcome::default());
                }
                let players = game.players.len();
                let max_rounds = game.config.max_rounds;
                let round = game
                    .rounds
                    .last_mut()
                    .ok_or_else(|| LedgerError::Rejected("no open round".into()))?;
                if round.status != RoundStatus::Committed {
                    return Err(LedgerError::Rejected(format!(
                        "round {} is still waiting for commitments",
                        round.id
                    )));
                }
                if round.has_revealed(&sender) {
                    return Err(LedgerError::Rejected(format!(
                        "player {sender} already revealed in round {}",
                        round.id
                    )));
                }
                let commit = round.commits.get(&sender).ok_or_else(|| {
                    LedgerError::Rejected(format!(
                        "player {sender} has no commitment in round {}",
                        round.id
                    ))
                })?;

                // Independent recomputation of the commitment digest. The
                // byte layout must agree with the client's to the byte:
                // canonical choice bytes followed by the little-endian nonce.
                let mut hasher = Sha256::new();
                hasher.update(value.as_bytes());
                hasher.update(nonce.to_le_bytes());
                let recomputed = hex::encode(hasher.finalize());
                if recomputed != commit.digest_hex {
                    return Err(LedgerError::RevealMismatch);
                }

                round
                    .reveals
                    .insert(sender, crate::session::state::RevealRecord { value, nonce });
                if round.all_revealed(players) {
                    round.status = RoundStatus::Ended;
                    let finished = round.id;
                    if finished < max_rounds {
                        game.rounds.push(Round::new(finished + 1));
                    }
                }
                Ok(ExecuteOutcome::default())
            }
            Action::EndGame { session_id } => {
                let game = Self::game_mut(&mut state, session_id)?;
                if game.ended {
                    return Err(LedgerError::Rejected(format!(
                        "game {session_id} already ended"
                    )));
                }
                if game.status() != GameStatus::RoundsFinished {
                    return Err(LedgerError::Rejected(format!(
                        "game {session_id} rounds are not finished"
                    )));
                }
                game.ended = true;
                Ok(ExecuteOutcome::default())
            }
        }
    }

    fn game_mut(
        state: &mut MockState,
        id: SessionId,
    ) -> Result<&mut SessionSnapshot, LedgerError> {
        state.games.get_mut(&id).ok_or(LedgerError::UnknownSession(id))
    }
}

impl LedgerClient for MockLedger {
    async fn query_session(&self, id: SessionId) -> Result<SessionSnapshot, LedgerError> {
        self.check_query_failure()?;
        let state = self.state.lock().unwrap();
        state
            .games
            .get(&id)
            .cloned()
            .ok_or(LedgerError::UnknownSession(id))
    }

    async fn query_current_round(&self, id: SessionId) -> Result<Option<Round>, LedgerError> {
        self.check_query_failure()?;
        let state = self.state.lock().unwrap();
        let game = state.games.get(&id).ok_or(LedgerError::UnknownSession(id))?;
        Ok(game.rounds.last().cloned())
    }

    async fn query_status(&self, id: SessionId) -> Result<GameStatus, LedgerError> {
        self.check_query_failure()?;
        let state = self.state.lock().unwrap();
        let game = state.games.get(&id).ok_or(LedgerError::UnknownSession(id))?;
        Ok(game.status())
    }

    async fn execute(&self, action: Action) -> Result<ExecuteOutcome, LedgerError> {
        {
            let mut state = self.state.lock().unwrap();
            if state.fail_executes > 0 {
                state.fail_executes -= 1;
                return Err(LedgerError::Transport("injected write failure".into()));
            }
        }
        self.submissions.fetch_add(1, Ordering::SeqCst);
        self.apply(action)
    }
}
