use serde::{Deserialize, Serialize};

use crate::{
    account::{Account, Payload},
    codec::{self, DecodeError},
};

pub const ACCOUNT_ADD: &str = "account-add";
pub const PAYLOAD_ADD: &str = "payload-add";

/// Envelope handed to the application by the engine, as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub kind: String,
    pub data: Vec<u8>,
}

impl Transaction {
    pub fn new(kind: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    pub fn account_add(account: &Account) -> Result<Self, bincode::Error> {
        Ok(Self::new(ACCOUNT_ADD, codec::encode(account)?))
    }

    pub fn payload_add(payload: &Payload) -> Result<Self, bincode::Error> {
        Ok(Self::new(PAYLOAD_ADD, codec::encode(payload)?))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        codec::encode(self)
    }

    pub fn from_bytes(bytes: &[u8], limit: u64) -> Result<Self, DecodeError> {
        let tx: Self = codec::decode(bytes, limit)?;
        if tx.kind.is_empty() {
            return Err(DecodeError::InvalidField {
                field: "kind",
                detail: "must not be empty".to_string(),
            });
        }
        Ok(tx)
    }
}
