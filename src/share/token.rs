//! Share IDs and access tokens.
//!
//! An access token is the string `shareID:resourceID:nonce`. It carries no
//! signature and no expiry of its own: whoever holds it is trusted exactly as
//! far as the referenced share is still enabled, unexpired and pointing at the
//! same resource. Its unguessability comes only from the random share ID and
//! nonce. A signed, time-boxed token could replace this without changing the
//! `encode`/`decode` contract.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand_core::{OsRng, RngCore};

use crate::{LuminaError, Result};

/// Random bytes behind a share ID (96 bits, 16 characters encoded).
pub const SHARE_ID_BYTES: usize = 12;

/// Random bytes behind a token nonce (128 bits, 22 characters encoded).
pub const NONCE_BYTES: usize = 16;

const SEPARATOR: char = ':';

fn random_string(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a new share ID from OS randomness.
pub fn generate_share_id() -> String {
    random_string(SHARE_ID_BYTES)
}

/// Generate a new token nonce from OS randomness.
pub fn generate_nonce() -> String {
    random_string(NONCE_BYTES)
}

/// Bearer capability binding a share to the resource it exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Referenced share.
    pub share_id: String,
    /// Resource the share pointed at when the token was minted.
    pub resource_id: i64,
    /// Random nonce.
    pub nonce: String,
}

impl AccessToken {
    /// Mint a token with a fresh nonce.
    pub fn mint(share_id: impl Into<String>, resource_id: i64) -> Self {
        Self {
            share_id: share_id.into(),
            resource_id,
            nonce: generate_nonce(),
        }
    }

    /// Encode as `shareID:resourceID:nonce`.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Decode a token string.
    ///
    /// Fails with a validation error unless the input has exactly three
    /// fields, a non-empty share ID and nonce, and an integer resource ID.
    pub fn decode(token: &str) -> Result<Self> {
        let mut parts = token.split(SEPARATOR);
        let (Some(share_id), Some(resource_id), Some(nonce), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(LuminaError::Validation(
                "access token must have three parts".to_string(),
            ));
        };

        if share_id.is_empty() || nonce.is_empty() {
            return Err(LuminaError::Validation(
                "access token has an empty part".to_string(),
            ));
        }

        let resource_id = resource_id.parse::<i64>().map_err(|_| {
            LuminaError::Validation("access token resource ID is not a number".to_string())
        })?;

        Ok(Self {
            share_id: share_id.to_string(),
            resource_id,
            nonce: nonce.to_string(),
        })
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.share_id, self.resource_id, self.nonce
        )
    }
}

impl FromStr for AccessToken {
    type Err = LuminaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}
