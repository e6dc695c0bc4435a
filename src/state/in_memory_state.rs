use std::{
    collections::{BTreeMap, btree_map::Entry},
    sync::Arc,
};

use sha2::{Digest, Sha256};
use tracing::trace;

use crate::{
    account::{Account, AccountId, Payload, PayloadId},
    codec,
};

use super::{AppHash, Ledger, StateError};

/// In-memory ledger with copy-on-write maps.
///
/// `clone()` is a snapshot: it shares the maps with the original, and the first
/// write on either side copies them, so a snapshot never observes later writes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryState {
    accounts: Arc<BTreeMap<AccountId, Account>>,
    payloads: Arc<BTreeMap<PayloadId, Payload>>,
    max_records: Option<usize>,
}

impl InMemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses inserts once `max_records` accounts and payloads are stored in total.
    pub fn with_capacity_limit(max_records: usize) -> Self {
        Self {
            max_records: Some(max_records),
            ..Self::default()
        }
    }

    fn ensure_capacity(&self) -> Result<(), StateError> {
        match self.max_records {
            Some(max) if self.accounts.len() + self.payloads.len() >= max => {
                Err(StateError::Storage {
                    detail: format!("capacity of {max} records exhausted"),
                })
            }
            _ => Ok(()),
        }
    }
}

impl Ledger for InMemoryState {
    fn has_account(&self, id: &str) -> bool {
        self.accounts.contains_key(id)
    }

    fn get_account(&self, id: &str) -> Option<Account> {
        self.accounts.get(id).cloned()
    }

    fn add_account(&mut self, account: Account) -> Result<(), StateError> {
        if self.accounts.contains_key(&account.id) {
            return Err(StateError::DuplicateAccount { id: account.id });
        }
        self.ensure_capacity()?;
        match Arc::make_mut(&mut self.accounts).entry(account.id.clone()) {
            Entry::Occupied(entry) => Err(StateError::DuplicateAccount {
                id: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                trace!(id = %account.id, "account stored");
                entry.insert(account);
                Ok(())
            }
        }
    }

    fn has_payload(&self, id: &str) -> bool {
        self.payloads.contains_key(id)
    }

    fn get_payload(&self, id: &str) -> Option<Payload> {
        self.payloads.get(id).cloned()
    }

    fn add_payload(&mut self, payload: Payload) -> Result<(), StateError> {
        if self.payloads.contains_key(&payload.id) {
            return Err(StateError::DuplicatePayload { id: payload.id });
        }
        self.ensure_capacity()?;
        match Arc::make_mut(&mut self.payloads).entry(payload.id.clone()) {
            Entry::Occupied(entry) => Err(StateError::DuplicatePayload {
                id: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                trace!(id = %payload.id, "payload stored");
                entry.insert(payload);
                Ok(())
            }
        }
    }

    fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn payload_count(&self) -> usize {
        self.payloads.len()
    }

    fn accounts(&self) -> Box<dyn Iterator<Item = &Account> + '_> {
        Box::new(self.accounts.values())
    }

    fn app_hash(&self) -> AppHash {
        let mut hasher = Sha256::new();
        hasher.update(b"accounts");
        hasher.update((self.accounts.len() as u64).to_le_bytes());
        for account in self.accounts.values() {
            hash_record(&mut hasher, account);
        }
        hasher.update(b"payloads");
        hasher.update((self.payloads.len() as u64).to_le_bytes());
        for payload in self.payloads.values() {
            hash_record(&mut hasher, payload);
        }
        hasher.finalize().into()
    }
}

fn hash_record<T: serde::Serialize>(hasher: &mut Sha256, record: &T) {
    // strings, byte vectors and string maps have no failing bincode encoding
    let bytes = codec::encode(record).unwrap_or_default();
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(&bytes);
}
