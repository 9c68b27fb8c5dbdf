//! Ledger Boundary
//!
//! The external system of record: eventually consistent reads, totally
//! ordered writes. The session protocol consumes the [`client::LedgerClient`]
//! trait; [`mock::MockLedger`] provides the contract semantics in-process
//! for demos and tests.

pub mod client;
pub mod mock;

// Re-export key types
pub use client::{Action, ExecuteOutcome, LedgerClient, LedgerError, LedgerEvent};
pub use mock::MockLedger;
