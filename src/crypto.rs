use base64::{Engine as _, engine::general_purpose};
use ed25519_dalek::{PUBLIC_KEY_LENGTH, VerifyingKey};
use serde::Serialize;
use thiserror::Error;

pub const ED25519_PREFIX: &str = "ed25519";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyScheme {
    Ed25519,
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidKeyError {
    #[error("Public key is empty")]
    Empty,
    #[error("Public key must be written as `<scheme>:<base64>`")]
    MissingScheme,
    #[error("Key scheme `{scheme}` is not supported")]
    UnsupportedScheme { scheme: String },
    #[error("Key material is not valid base64: {detail}")]
    Encoding { detail: String },
    #[error("Key material must be {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("Key material is not a valid {scheme:?} point")]
    NotOnCurve { scheme: KeyScheme },
    #[error("Key material is a small-order {scheme:?} point")]
    WeakKey { scheme: KeyScheme },
}

/// Checks that `pub_key` is syntactically usable as an account key.
///
/// Accepted form is `ed25519:<standard padded base64 of 32 bytes>`. Only the
/// encoding and the curve point are checked, there is no proof of possession.
pub fn validate_public_key(pub_key: &str) -> Result<KeyScheme, InvalidKeyError> {
    if pub_key.is_empty() {
        return Err(InvalidKeyError::Empty);
    }
    let Some((scheme, material)) = pub_key.split_once(':') else {
        return Err(InvalidKeyError::MissingScheme);
    };
    match scheme {
        ED25519_PREFIX => validate_ed25519(material).map(|_| KeyScheme::Ed25519),
        _ => Err(InvalidKeyError::UnsupportedScheme {
            scheme: scheme.to_string(),
        }),
    }
}

fn validate_ed25519(material: &str) -> Result<VerifyingKey, InvalidKeyError> {
    let bytes = general_purpose::STANDARD
        .decode(material)
        .map_err(|err| InvalidKeyError::Encoding {
            detail: err.to_string(),
        })?;
    let raw: [u8; PUBLIC_KEY_LENGTH] =
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| InvalidKeyError::Length {
                expected: PUBLIC_KEY_LENGTH,
                actual: bytes.len(),
            })?;
    let key = VerifyingKey::from_bytes(&raw).map_err(|_| InvalidKeyError::NotOnCurve {
        scheme: KeyScheme::Ed25519,
    })?;
    if key.is_weak() {
        return Err(InvalidKeyError::WeakKey {
            scheme: KeyScheme::Ed25519,
        });
    }
    Ok(key)
}

/// Formats an ed25519 verifying key the way [`validate_public_key`] expects it.
pub fn format_ed25519(key: &VerifyingKey) -> String {
    format!(
        "{ED25519_PREFIX}:{}",
        general_purpose::STANDARD.encode(key.as_bytes())
    )
}
