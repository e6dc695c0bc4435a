/// Records kept in the ledger: accounts and the payloads they publish.
pub mod account;

/// Canonical binary encoding shared by every replica.
pub mod codec;

/// Public key format checks.
pub mod crypto;

/// Transaction envelope as submitted to the engine.
pub mod transaction;

/// Ledger interface, plus "in memory" copy-on-write implementation.
pub mod state;

/// Check/Deliver pairs per transaction kind, and the registry that dispatches on the kind tag.
pub mod handler;

/// Application state machine driven by the consensus engine.
/// Owns canonical state and the committed snapshot that Check reads from.
pub mod app;

/// Application settings, loaded from JSON.
pub mod config;

/// Replays a transaction log through [`app::App`]. Lives in the library so the
/// integration tests can drive it too.
pub mod bin_utils;
