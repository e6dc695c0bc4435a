use serde::Serialize;
use thiserror::Error;

use crate::account::{Account, AccountId, Payload, PayloadId};

pub mod in_memory_state;

pub type AppHash = [u8; 32];

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateError {
    #[error("Account `{id}` already exists")]
    DuplicateAccount { id: AccountId },
    #[error("Payload `{id}` already exists")]
    DuplicatePayload { id: PayloadId },
    #[error("Storage failure: {detail}")]
    Storage { detail: String },
}

/// Account and payload records, keyed by id.
///
/// Reads never mutate. Each `add_*` performs its existence check and insert as
/// one step: on error nothing has been written.
pub trait Ledger {
    fn has_account(&self, id: &str) -> bool;

    fn get_account(&self, id: &str) -> Option<Account>;

    fn add_account(&mut self, account: Account) -> Result<(), StateError>;

    fn has_payload(&self, id: &str) -> bool;

    fn get_payload(&self, id: &str) -> Option<Payload>;

    fn add_payload(&mut self, payload: Payload) -> Result<(), StateError>;

    fn account_count(&self) -> usize;

    fn payload_count(&self) -> usize;

    /// Accounts in ascending id order.
    fn accounts(&self) -> Box<dyn Iterator<Item = &Account> + '_>;

    /// Digest of the full ledger contents, equal across replicas holding equal state.
    fn app_hash(&self) -> AppHash;
}
