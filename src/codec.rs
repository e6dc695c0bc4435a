use bincode::Options;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Upper bound used when no explicit limit is configured.
pub const DEFAULT_MAX_TX_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DecodeError {
    #[error("Payload of {len} bytes exceeds the limit of {max} bytes")]
    TooLarge { len: usize, max: u64 },
    #[error("Payload is malformed: {detail}")]
    Malformed { detail: String },
    #[error("Payload is not in canonical form")]
    NonCanonical,
    #[error("Field `{field}` is invalid: {detail}")]
    InvalidField { field: &'static str, detail: String },
}

// Fixed-width little-endian integers, no trailing garbage. The same options are used
// for encoding so that `decode(encode(x)) == x` and `encode(decode(b)) == b`.
fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

pub fn encode<T>(value: &T) -> Result<Vec<u8>, bincode::Error>
where
    T: Serialize,
{
    options().serialize(value)
}

/// Decodes `bytes` into `T`, rejecting anything that would not be produced by [`encode`].
///
/// Two replicas handed the same bytes either both get the same value or both
/// get the same error.
pub fn decode<T>(bytes: &[u8], limit: u64) -> Result<T, DecodeError>
where
    T: Serialize + DeserializeOwned,
{
    if bytes.len() as u64 > limit {
        return Err(DecodeError::TooLarge {
            len: bytes.len(),
            max: limit,
        });
    }
    let value: T = options()
        .with_limit(limit)
        .deserialize(bytes)
        .map_err(|err| DecodeError::Malformed {
            detail: err.to_string(),
        })?;
    // maps accept any key order and duplicates on the way in
    match encode(&value) {
        Ok(canonical) if canonical == bytes => Ok(value),
        _ => Err(DecodeError::NonCanonical),
    }
}
