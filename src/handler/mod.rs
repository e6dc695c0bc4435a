use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::{
    account::AccountId,
    codec::DecodeError,
    crypto::InvalidKeyError,
    state::{Ledger, StateError},
    transaction::{self, Transaction},
};

pub mod account_add;
pub mod payload_add;

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TxError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    InvalidKey(#[from] InvalidKeyError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("Account `{id}` does not exist")]
    UnknownAccount { id: AccountId },
    #[error("No handler registered for transaction kind `{kind}`")]
    UnknownKind { kind: String },
}

/// Flat classification of [`TxError`], stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Decode,
    InvalidKey,
    DuplicateAccount,
    Storage,
    DuplicatePayload,
    UnknownAccount,
    UnknownKind,
}

impl ErrorKind {
    /// Response code reported to the engine. Zero is reserved for success.
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::Decode => 1,
            ErrorKind::InvalidKey => 2,
            ErrorKind::DuplicateAccount => 3,
            ErrorKind::Storage => 4,
            ErrorKind::DuplicatePayload => 5,
            ErrorKind::UnknownAccount => 6,
            ErrorKind::UnknownKind => 7,
        }
    }

    /// Conflicts with existing records, which Check is expected to catch.
    pub fn is_conflict(self) -> bool {
        matches!(
            self,
            ErrorKind::DuplicateAccount | ErrorKind::DuplicatePayload
        )
    }
}

impl TxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TxError::Decode(_) => ErrorKind::Decode,
            TxError::InvalidKey(_) => ErrorKind::InvalidKey,
            TxError::State(StateError::DuplicateAccount { .. }) => ErrorKind::DuplicateAccount,
            TxError::State(StateError::DuplicatePayload { .. }) => ErrorKind::DuplicatePayload,
            TxError::State(StateError::Storage { .. }) => ErrorKind::Storage,
            TxError::UnknownAccount { .. } => ErrorKind::UnknownAccount,
            TxError::UnknownKind { .. } => ErrorKind::UnknownKind,
        }
    }

    pub fn code(&self) -> u32 {
        self.kind().code()
    }
}

/// Limits shared by every handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxContext {
    pub max_tx_bytes: u64,
}

pub type CheckFn<S> = fn(&Transaction, &S, &TxContext) -> Result<(), TxError>;
pub type DeliverFn<S> = fn(&Transaction, &mut S, &TxContext) -> Result<(), TxError>;

/// Check/Deliver pair for one transaction kind.
///
/// `check` must not mutate and may run any number of times. `deliver` runs once
/// per transaction per block and must depend only on the prior state and the
/// transaction.
pub struct TxHandler<S> {
    pub check: CheckFn<S>,
    pub deliver: DeliverFn<S>,
}

impl<S> Clone for TxHandler<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for TxHandler<S> {}

/// Type tag to handler mapping consulted by the application on every call.
pub struct Registry<S> {
    handlers: BTreeMap<String, TxHandler<S>>,
}

impl<S> Clone for Registry<S> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<S> Default for Registry<S> {
    fn default() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }
}

impl<S: Ledger> Registry<S> {
    /// Registry holding `account-add` and `payload-add`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        registry.register(transaction::ACCOUNT_ADD, account_add::handler());
        registry.register(transaction::PAYLOAD_ADD, payload_add::handler());
        registry
    }
}

impl<S> Registry<S> {
    /// Returns the handler previously registered under `kind`, if any.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        handler: TxHandler<S>,
    ) -> Option<TxHandler<S>> {
        self.handlers.insert(kind.into(), handler)
    }

    pub fn get(&self, kind: &str) -> Option<TxHandler<S>> {
        self.handlers.get(kind).copied()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}
