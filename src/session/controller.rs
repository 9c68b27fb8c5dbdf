//! Session Controller
//!
//! The single entry point for everything a player does to a session. Each
//! operation follows the same shape: read a fresh snapshot, check the
//! preconditions locally, then submit at most one transaction. Local checks
//! exist to keep obviously doomed transactions (and their fees) off the
//! ledger; they are best-effort, and the ledger's own rejection of a raced
//! action surfaces as a contention error rather than a bug.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalog::variant::{self, Choice, ChoiceError, GameVariant};
use crate::core::commitment::{commit, generate_nonce, verify, CommitDigest};
use crate::ledger::client::{Action, LedgerClient, LedgerError};
use crate::session::secrets::{RoundSecret, SecretKey, SecretStore, SecretStoreError};
use crate::session::state::{
    ConfigError, GameConfig, GameStatus, PlayerAddr, SessionId, SessionSnapshot,
};

/// Coarse classification of a session error, for callers deciding between
/// "fix your input", "refresh and retry", "investigate", and "check the
/// network".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request was never valid; retrying unchanged will fail again.
    Validation,
    /// Another party's action got there first; refresh state and reassess.
    Contention,
    /// Local data loss or a commitment that does not verify. Not retryable.
    Integrity,
    /// The ledger could not be reached or answered nonsense.
    Transport,
}

/// Everything that can go wrong driving a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Structurally invalid game configuration.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    /// Choice outside the variant's domain.
    #[error(transparent)]
    InvalidChoice(#[from] ChoiceError),

    /// No session with this id.
    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    /// The session is past the joining window.
    #[error("session {session} cannot be joined while {status}")]
    NotJoinable {
        /// Target session.
        session: SessionId,
        /// Status at the time of the check.
        status: GameStatus,
    },

    /// This player has already joined.
    #[error("player {player} already joined session {session}")]
    AlreadyJoined {
        /// Target session.
        session: SessionId,
        /// The joining player.
        player: PlayerAddr,
    },

    /// The session is at its player cap.
    #[error("session {session} is full")]
    GameFull {
        /// Target session.
        session: SessionId,
    },

    /// This player has not joined the session.
    #[error("player {player} has not joined session {session}")]
    NotInGame {
        /// Target session.
        session: SessionId,
        /// The acting player.
        player: PlayerAddr,
    },

    /// Start requested before enough players joined.
    #[error("session {session} is not ready to start while {status}")]
    NotReady {
        /// Target session.
        session: SessionId,
        /// Status at the time of the check.
        status: GameStatus,
    },

    /// The operation needs an open round.
    #[error("session {session} is not in progress while {status}")]
    NotInProgress {
        /// Target session.
        session: SessionId,
        /// Status at the time of the check.
        status: GameStatus,
    },

    /// A commitment for this round is already on the ledger.
    #[error("already committed in round {round} of session {session}")]
    AlreadyCommitted {
        /// Target session.
        session: SessionId,
        /// Round number.
        round: u32,
    },

    /// A locally stored commitment for a different choice is still pending
    /// confirmation; overwriting it would orphan the submitted digest.
    #[error("a commitment for a different choice is pending in round {round} of session {session}")]
    PendingCommit {
        /// Target session.
        session: SessionId,
        /// Round number.
        round: u32,
    },

    /// Reveal requested before every player committed.
    #[error("round {round} of session {session} is still waiting for commitments")]
    CommitsOutstanding {
        /// Target session.
        session: SessionId,
        /// Round number.
        round: u32,
    },

    /// Reveal requested without a commitment on the ledger.
    #[error("nothing to reveal in round {round} of session {session}")]
    NothingToReveal {
        /// Target session.
        session: SessionId,
        /// Round number.
        round: u32,
    },

    /// This player already revealed in this round.
    #[error("already revealed in round {round} of session {session}")]
    AlreadyRevealed {
        /// Target session.
        session: SessionId,
        /// Round number.
        round: u32,
    },

    /// End requested before the final round closed.
    #[error("session {session} rounds are not finished while {status}")]
    RoundsNotFinished {
        /// Target session.
        session: SessionId,
        /// Status at the time of the check.
        status: GameStatus,
    },

    /// The stored secret and the on-ledger commitment disagree, caught
    /// before the reveal left this process.
    #[error("reveal does not match the commitment in round {round} of session {session}")]
    RevealMismatch {
        /// Target session.
        session: SessionId,
        /// Round number.
        round: u32,
    },

    /// The committed secret is gone; the choice can never be proven.
    #[error("committed secret for round {round} of session {session} is missing")]
    SecretLost {
        /// Target session.
        session: SessionId,
        /// Round number.
        round: u32,
    },

    /// Secret storage failed.
    #[error(transparent)]
    Secrets(#[from] SecretStoreError),

    /// The creation transaction succeeded but emitted no session id.
    #[error("create transaction emitted no game_id attribute")]
    MissingSessionId,

    /// The ledger deterministically rejected the action.
    #[error("ledger rejected action: {reason}")]
    Contention {
        /// Rejection reason as reported by the ledger.
        reason: String,
    },

    /// Network failure; the action may or may not have landed.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl SessionError {
    /// Classify for retry/abort decisions.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidConfig(_)
            | Self::InvalidChoice(_)
            | Self::UnknownSession(_)
            | Self::NotJoinable { .. }
            | Self::AlreadyJoined { .. }
            | Self::GameFull { .. }
            | Self::NotInGame { .. }
            | Self::NotReady { .. }
            | Self::NotInProgress { .. }
            | Self::AlreadyCommitted { .. }
            | Self::PendingCommit { .. }
            | Self::CommitsOutstanding { .. }
            | Self::NothingToReveal { .. }
            | Self::AlreadyRevealed { .. }
            | Self::RoundsNotFinished { .. } => ErrorClass::Validation,
            Self::Contention { .. } => ErrorClass::Contention,
            Self::RevealMismatch { .. } | Self::SecretLost { .. } | Self::Secrets(_) => {
                ErrorClass::Integrity
            }
            Self::MissingSessionId | Self::Transport(_) => ErrorClass::Transport,
        }
    }
}

impl From<LedgerError> for SessionError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Transport(msg) => Self::Transport(msg),
            LedgerError::Rejected(reason) => Self::Contention { reason },
            // Contextless fallback; reveal_round maps this with its round.
            LedgerError::RevealMismatch => Self::Contention {
                reason: "reveal does not match the stored commitment".into(),
            },
            LedgerError::UnknownSession(id) => Self::UnknownSession(id),
        }
    }
}

/// Drives sessions on behalf of one player.
///
/// Generic over the ledger transport and the secret store; tests bind an
/// in-process mock and a memory store, the demo binary a file store.
pub struct SessionController<L, S> {
    ledger: Arc<L>,
    secrets: S,
    player: PlayerAddr,
}

impl<L, S> SessionController<L, S>
where
    L: LedgerClient,
    S: SecretStore,
{
    /// Controller for one player identity.
    pub fn new(ledger: Arc<L>, secrets: S, player: impl Into<PlayerAddr>) -> Self {
        Self {
            ledger,
            secrets,
            player: player.into(),
        }
    }

    /// The player this controller signs as.
    pub fn player(&self) -> &PlayerAddr {
        &self.player
    }

    /// Fresh snapshot of a session.
    pub async fn view(&self, session: SessionId) -> Result<SessionSnapshot, SessionError> {
        Ok(self.ledger.query_session(session).await?)
    }

    /// Locally derived status of a session.
    pub async fn status(&self, session: SessionId) -> Result<GameStatus, SessionError> {
        Ok(self.view(session).await?.status())
    }

    /// Create a session and return the ledger-assigned id.
    ///
    /// The id is read back from the creation event's `game_id` attribute;
    /// it is never predicted client-side.
    pub async fn create_game(
        &self,
        variant: GameVariant,
        config: GameConfig,
    ) -> Result<SessionId, SessionError> {
        config.validate()?;
        let outcome = self
            .ledger
            .execute(Action::CreateGame { variant, config })
            .await?;
        let session = outcome.session_id().ok_or(SessionError::MissingSessionId)?;
        info!(session, %variant, player = %self.player, "created session");
        Ok(session)
    }

    /// Join a session that has not yet started.
    pub async fn join_game(
        &self,
        session: SessionId,
        label: Option<String>,
    ) -> Result<(), SessionError> {
        let snap = self.view(session).await?;
        match snap.status() {
            GameStatus::Pending | GameStatus::Ready => {}
            status => return Err(SessionError::NotJoinable { session, status }),
        }
        if snap.is_player(&self.player) {
            return Err(SessionError::AlreadyJoined {
                session,
                player: self.player.clone(),
            });
        }
        if snap.players.len() >= snap.config.max_players as usize {
            return Err(SessionError::GameFull { session });
        }
        self.ledger
            .execute(Action::JoinGame { session_id: session, label })
            .await?;
        info!(session, player = %self.player, "joined session");
        Ok(())
    }

    /// Open the first round of a ready session.
    ///
    /// Any joined player may start. Losing a start race to another player
    /// reaches the same state the caller wanted, so it is not an error.
    pub async fn start_game(&self, session: SessionId) -> Result<(), SessionError> {
        let snap = self.view(session).await?;
        match snap.status() {
            GameStatus::Ready => {}
            GameStatus::Pending => {
                return Err(SessionError::NotReady {
                    session,
                    status: GameStatus::Pending,
                })
            }
            _ => {
                debug!(session, "session already started");
                return Ok(());
            }
        }
        match self.ledger.execute(Action::StartGame { session_id: session }).await {
            Ok(_) => {
                info!(session, player = %self.player, "started session");
                Ok(())
            }
            Err(LedgerError::Rejected(reason)) => {
                debug!(session, %reason, "start raced, already started");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Commit to a choice for the current round.
    ///
    /// The `{choice, nonce}` secret is persisted durably before the digest
    /// transaction is submitted, so a crash between the two never orphans
    /// an on-ledger commitment. Calling again with the same choice after a
    /// transport failure reuses the stored nonce and resubmits the same
    /// digest; calling with a different choice while a submission may still
    /// land is refused.
    pub async fn commit_round(
        &self,
        session: SessionId,
        choice: Choice,
    ) -> Result<CommitDigest, SessionError> {
        let snap = self.view(session).await?;
        match snap.status() {
            GameStatus::InProgress => {}
            status => return Err(SessionError::NotInProgress { session, status }),
        }
        if !snap.is_player(&self.player) {
            return Err(SessionError::NotInGame {
                session,
                player: self.player.clone(),
            });
        }
        let round = snap
            .current_round()
            .ok_or(SessionError::NotInProgress {
                session,
                status: GameStatus::Ready,
            })?;
        if round.has_committed(&self.player) {
            return Err(SessionError::AlreadyCommitted {
                session,
                round: round.id,
            });
        }

        let rules = variant::rules(snap.variant);
        let encoded = rules.encode(&choice)?;
        let key = SecretKey {
            session,
            round: round.id,
            player: self.player.clone(),
        };
        let secret = match self.secrets.get(&key)? {
            Some(existing) if existing.choice == choice => {
                debug!(session, round = round.id, "resubmitting stored commitment");
                existing
            }
            Some(_) => {
                return Err(SessionError::PendingCommit {
                    session,
                    round: round.id,
                })
            }
            None => {
                let nonce = generate_nonce();
                let digest = commit(&encoded, nonce);
                let secret = RoundSecret {
                    variant: snap.variant,
                    choice,
                    nonce,
                    digest_hex: digest.to_hex(),
                };
                self.secrets.put(&key, &secret)?;
                secret
            }
        };

        let digest = commit(&encoded, secret.nonce);
        self.ledger
            .execute(Action::CommitRound {
                session_id: session,
                digest_hex: digest.to_hex(),
            })
            .await?;
        info!(session, round = round.id, player = %self.player, %digest, "committed");
        Ok(digest)
    }

    /// Disclose the committed choice for the current round.
    ///
    /// The stored secret is re-verified against the on-ledger digest before
    /// anything leaves this process; a mismatch means local corruption and
    /// never reaches the network. The secret is purged only after the ledger
    /// confirms the reveal.
    pub async fn reveal_round(&self, session: SessionId) -> Result<Choice, SessionError> {
        let snap = self.view(session).await?;
        if !snap.is_player(&self.player) {
            return Err(SessionError::NotInGame {
                session,
                player: self.player.clone(),
            });
        }
        let round = snap.current_round().ok_or(SessionError::NotInProgress {
            session,
            status: snap.status(),
        })?;
        if !round.all_committed(snap.players.len()) {
            return Err(SessionError::CommitsOutstanding {
                session,
                round: round.id,
            });
        }
        if round.has_revealed(&self.player) {
            return Err(SessionError::AlreadyRevealed {
                session,
                round: round.id,
            });
        }
        let commit_record =
            round
                .commits
                .get(&self.player)
                .ok_or(SessionError::NothingToReveal {
                    session,
                    round: round.id,
                })?;

        let key = SecretKey {
            session,
            round: round.id,
            player: self.player.clone(),
        };
        let secret = self.secrets.get(&key)?.ok_or(SessionError::SecretLost {
            session,
            round: round.id,
        })?;

        let mismatch = SessionError::RevealMismatch {
            session,
            round: round.id,
        };
        let rules = variant::rules(secret.variant);
        let encoded = match rules.encode(&secret.choice) {
            Ok(encoded) => encoded,
            Err(_) => return Err(mismatch),
        };
        let on_ledger = match CommitDigest::from_hex(&commit_record.digest_hex) {
            Some(digest) => digest,
            None => return Err(mismatch),
        };
        if !verify(&encoded, secret.nonce, &on_ledger) {
            return Err(mismatch);
        }

        match self
            .ledger
            .execute(Action::RevealRound {
                session_id: session,
                value: rules.render(&secret.choice),
                nonce: secret.nonce,
            })
            .await
        {
            Ok(_) => {}
            Err(LedgerError::RevealMismatch) => return Err(mismatch),
            Err(e) => return Err(e.into()),
        }

        info!(session, round = round.id, player = %self.player, "revealed");
        if let Err(e) = self.secrets.remove(&key) {
            warn!(session, round = round.id, error = %e, "failed to purge revealed secret");
        }
        Ok(secret.choice)
    }

    /// Close a session whose rounds are all played.
    ///
    /// Reaching an already-ended session is the caller's desired state, so
    /// it succeeds silently, as does losing an end race.
    pub async fn end_game(&self, session: SessionId) -> Result<(), SessionError> {
        let snap = self.view(session).await?;
        if snap.ended {
            debug!(session, "session already ended");
            return Ok(());
        }
        match snap.status() {
            GameStatus::RoundsFinished => {}
            status => return Err(SessionError::RoundsNotFinished { session, status }),
        }
        match self.ledger.execute(Action::EndGame { session_id: session }).await {
            Ok(_) => {
                info!(session, player = %self.player, "ended session");
                Ok(())
            }
            Err(LedgerError::Rejected(reason)) => {
                debug!(session, %reason, "end raced, already ended");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
