//! Eleven-character public identifiers.
//!
//! Every organisation unit, category option and option combo carries a
//! `Uid` in addition to its internal id. Organisation unit paths are built
//! from these, so the fixed width matters: a path slot is one separator plus
//! [`Uid::LENGTH`] characters.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHANUMERIC: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Errors produced when parsing a [`Uid`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UidError {
    /// The input does not have exactly eleven characters.
    #[error("UID must be {expected} characters, got {actual}")]
    InvalidLength {
        /// Required length.
        expected: usize,
        /// Length of the rejected input.
        actual: usize,
    },

    /// The input does not start with a letter or contains non-alphanumerics.
    #[error("UID '{0}' must start with a letter and contain only ASCII letters and digits")]
    InvalidCharacters(String),
}

/// An eleven-character identifier: one ASCII letter followed by ten ASCII
/// letters or digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(String);

impl Uid {
    /// Number of characters in every UID.
    pub const LENGTH: usize = 11;

    /// Generates a random UID.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut code = String::with_capacity(Self::LENGTH);
        code.push(char::from(LETTERS[rng.random_range(0..LETTERS.len())]));
        for _ in 1..Self::LENGTH {
            code.push(char::from(
                ALPHANUMERIC[rng.random_range(0..ALPHANUMERIC.len())],
            ));
        }
        Self(code)
    }

    /// Parses and validates a UID.
    pub fn parse(s: &str) -> Result<Self, UidError> {
        if s.len() != Self::LENGTH {
            return Err(UidError::InvalidLength {
                expected: Self::LENGTH,
                actual: s.chars().count(),
            });
        }

        let mut bytes = s.bytes();
        let starts_with_letter = bytes.next().is_some_and(|b| b.is_ascii_alphabetic());
        if !starts_with_letter || !bytes.all(|b| b.is_ascii_alphanumeric()) {
            return Err(UidError::InvalidCharacters(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }

    /// Returns the UID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Uid {
    type Err = UidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Uid {
    type Error = UidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.0
    }
}

impl AsRef<str> for Uid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "uid_tests.rs"]
mod tests;
