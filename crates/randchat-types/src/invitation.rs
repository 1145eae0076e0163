//! Referral invitation tokens.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::error::UserError;

/// Exact length of every invitation token.
pub const INVITATION_LENGTH: usize = 10;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// A user's permanent referral token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Invitation(String);

impl Invitation {
    /// Generate a random token from a v4 UUID's bytes.
    ///
    /// Uniqueness is not guaranteed here; callers retry on conflict.
    pub fn generate() -> Self {
        let bytes = uuid::Uuid::new_v4().into_bytes();
        let token = bytes
            .iter()
            .take(INVITATION_LENGTH)
            .map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char)
            .collect();
        Self(token)
    }

    /// Accept a token only if it has the exact invitation length.
    pub fn parse(token: &str) -> Result<Self, UserError> {
        if token.chars().count() != INVITATION_LENGTH {
            return Err(UserError::InvalidInvitation(token.to_string()));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Invitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
