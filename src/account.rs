use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::codec::{self, DecodeError};

pub type AccountId = String;
pub type PayloadId = String;

/// Registered account. Created once by `account-add` and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub pub_key: String,
    /// Opaque client-defined fields, kept ordered so the encoding is canonical.
    pub profile: BTreeMap<String, String>,
}

impl Account {
    pub fn new(id: impl Into<AccountId>, pub_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pub_key: pub_key.into(),
            profile: BTreeMap::new(),
        }
    }

    pub fn with_profile(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.profile.insert(key.into(), value.into());
        self
    }

    pub fn decode(bytes: &[u8], limit: u64) -> Result<Self, DecodeError> {
        let account: Self = codec::decode(bytes, limit)?;
        require_id("id", &account.id)?;
        Ok(account)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateData {
    pub receiver_account_id: AccountId,
    pub data: Vec<u8>,
}

/// Data published by a registered account, optionally addressed to other accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub id: PayloadId,
    pub sender_account_id: AccountId,
    pub public_data: String,
    pub private_data: Vec<PrivateData>,
}

impl Payload {
    pub fn decode(bytes: &[u8], limit: u64) -> Result<Self, DecodeError> {
        let payload: Self = codec::decode(bytes, limit)?;
        require_id("id", &payload.id)?;
        require_id("sender_account_id", &payload.sender_account_id)?;
        for entry in &payload.private_data {
            require_id("receiver_account_id", &entry.receiver_account_id)?;
        }
        Ok(payload)
    }

    /// Every account referenced by this payload, sender first.
    pub fn referenced_accounts(&self) -> impl Iterator<Item = &AccountId> {
        std::iter::once(&self.sender_account_id)
            .chain(self.private_data.iter().map(|p| &p.receiver_account_id))
    }
}

fn require_id(field: &'static str, value: &str) -> Result<(), DecodeError> {
    if value.trim().is_empty() {
        return Err(DecodeError::InvalidField {
            field,
            detail: "must not be empty".to_string(),
        });
    }
    if value.chars().any(char::is_control) {
        return Err(DecodeError::InvalidField {
            field,
            detail: "must not contain control characters".to_string(),
        });
    }
    Ok(())
}
