//! Sealed Round Demo Driver
//!
//! Plays a complete two-player dilemma session against the in-memory ledger,
//! with a sync loop observing state transitions the way a UI would.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use sealed_round::{
    ledger::MockLedger,
    session::{FileSecretStore, SessionController},
    Choice, GameConfig, GameVariant, SyncConfig, SyncLoop, DEFAULT_POLL_INTERVAL, VERSION,
};

#[tokio::main]
async fn main() {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Sealed Round v{}", VERSION);
    info!("Default poll interval: {:?}", DEFAULT_POLL_INTERVAL);

    demo_session().await;
}

/// Play one dilemma session end to end.
async fn demo_session() {
    info!("=== Starting Demo Session ===");

    let ledger = MockLedger::new("alice");
    // file-backed stores, so a committed secret would survive a restart
    let secrets_root = std::env::temp_dir().join("sealed-round-demo");
    let alice = SessionController::new(
        Arc::new(ledger.for_player("alice")),
        FileSecretStore::open(secrets_root.join("alice")).expect("open alice secret store"),
        "alice",
    );
    let bob = SessionController::new(
        Arc::new(ledger.for_player("bob")),
        FileSecretStore::open(secrets_root.join("bob")).expect("open bob secret store"),
        "bob",
    );

    let config = GameConfig {
        min_players: 2,
        max_players: 2,
        max_rounds: 3,
        ..GameConfig::default()
    };
    let session = alice
        .create_game(GameVariant::Dilemma, config)
        .await
        .expect("create session");
    info!("Session ID: {}", session);

    // An observer polls like a UI would while the players act.
    let sync = SyncLoop::spawn(
        Arc::new(ledger.for_player("observer")),
        session,
        SyncConfig {
            poll_interval: Duration::from_millis(50),
        },
    );
    let mut views = sync.subscribe();
    let watcher = tokio::spawn(async move {
        while views.changed().await.is_ok() {
            if let Some(view) = views.borrow_and_update().clone() {
                info!(
                    "Observed: status={} players={} rounds={}",
                    view.status(),
                    view.snapshot.players.len(),
                    view.snapshot.rounds.len(),
                );
            }
        }
    });

    alice.join_game(session, Some("Alice".into())).await.expect("alice joins");
    bob.join_game(session, Some("Bob".into())).await.expect("bob joins");
    alice.start_game(session).await.expect("start");

    let plays = [
        (Choice::Symbol("cooperate".into()), Choice::Symbol("cooperate".into())),
        (Choice::Symbol("cooperate".into()), Choice::Symbol("defect".into())),
        (Choice::Symbol("defect".into()), Choice::Symbol("defect".into())),
    ];
    for (round, (a, b)) in plays.into_iter().enumerate() {
        info!("--- Round {} ---", round + 1);
        let digest = alice.commit_round(session, a).await.expect("alice commits");
        info!("Alice committed: {}", digest);
        let digest = bob.commit_round(session, b).await.expect("bob commits");
        info!("Bob committed: {}", digest);

        let revealed = alice.reveal_round(session).await.expect("alice reveals");
        info!("Alice revealed: {}", revealed.canonical_text());
        let revealed = bob.reveal_round(session).await.expect("bob reveals");
        info!("Bob revealed: {}", revealed.canonical_text());
    }

    alice.end_game(session).await.expect("end session");

    // The sync loop notices the end and finishes on its own.
    sync.stopped().await;
    let _ = watcher.await;

    let snapshot = alice.view(session).await.expect("final view");
    info!("=== Session Results ===");
    info!("Final status: {}", snapshot.status());
    for round in &snapshot.rounds {
        for (player, reveal) in &round.reveals {
            info!("Round {}: {} played {}", round.id, player, reveal.value);
        }
    }
}
