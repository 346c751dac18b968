//! Record identifiers.
//!
//! A record is identified either by a random URL-safe token or by a
//! sequence number scoped to its collection. Which form a collection uses
//! is fixed by its [`IdStrategy`](crate::allocator::IdStrategy); both share
//! this one type so the storage and wire layers need a single contract.
//!
//! On the wire a token is a JSON string, a sequence number is a JSON
//! integer, and an unassigned identifier is omitted (or `null`).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use serde::de::{self, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of random bytes behind a token (96 bits of entropy).
pub const TOKEN_BYTES: usize = 12;

/// Errors that can occur when reading an identifier from text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Identifier is empty")]
    Empty,

    #[error("Invalid sequence identifier: {0:?}")]
    InvalidSequence(String),
}

/// The identifier of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Identifier {
    /// Not yet assigned.
    #[default]
    Null,
    /// Base64url encoding of [`TOKEN_BYTES`] random bytes.
    Token(String),
    /// Per-collection counter value, starting at 1.
    Sequence(u64),
}

impl Identifier {
    /// Generates a new random token from the thread-local CSPRNG.
    pub fn new_token() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill(&mut bytes);
        Identifier::Token(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wraps an existing token. An empty token is the null identifier.
    pub fn token(token: impl Into<String>) -> Self {
        let token = token.into();
        if token.is_empty() {
            Identifier::Null
        } else {
            Identifier::Token(token)
        }
    }

    pub fn sequence(value: u64) -> Self {
        Identifier::Sequence(value)
    }

    /// Parses a sequence identifier from its decimal text.
    pub fn parse_sequence(text: &str) -> Result<Self, IdentifierError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(IdentifierError::Empty);
        }
        text.parse::<u64>()
            .map(Identifier::Sequence)
            .map_err(|_| IdentifierError::InvalidSequence(text.to_string()))
    }

    /// Parses a token identifier, rejecting empty input.
    pub fn parse_token(text: &str) -> Result<Self, IdentifierError> {
        match Self::token(text.trim()) {
            Identifier::Null => Err(IdentifierError::Empty),
            id => Ok(id),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Identifier::Null)
    }

    pub fn is_valid(&self) -> bool {
        !self.is_null()
    }

    pub fn as_sequence(&self) -> Option<u64> {
        match self {
            Identifier::Sequence(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            Identifier::Token(token) => Some(token),
            _ => None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Null => Ok(()),
            Identifier::Token(token) => f.write_str(token),
            Identifier::Sequence(value) => write!(f, "{}", value),
        }
    }
}

impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Identifier::Null => serializer.serialize_none(),
            Identifier::Token(token) => serializer.serialize_str(token),
            Identifier::Sequence(value) => serializer.serialize_u64(*value),
        }
    }
}

struct IdentifierVisitor;

impl<'de> Visitor<'de> for IdentifierVisitor {
    type Value = Identifier;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a token string, a non-negative integer, or null")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Identifier, E> {
        Ok(Identifier::token(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Identifier, E> {
        Ok(Identifier::Sequence(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Identifier, E> {
        u64::try_from(v)
            .map(Identifier::Sequence)
            .map_err(|_| E::custom(format!("negative sequence identifier {}", v)))
    }

    fn visit_none<E: de::Error>(self) -> Result<Identifier, E> {
        Ok(Identifier::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Identifier, E> {
        Ok(Identifier::Null)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(IdentifierVisitor)
    }
}
