//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a provisioned account.
///
/// The identity store assigns it at creation and it never changes afterwards.
/// It is opaque to this system: usually a UUID, but nothing here relies on
/// that, so it is carried as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub const MAX_LEN: usize = 128;

    /// Identity store ids are UUIDs; ASCII letters, digits, `-` and `_` cover
    /// every id it issues and keep the id a single URL path segment.
    fn is_id_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '-' || c == '_'
    }

    /// Wrap an identifier issued by the identity store.
    ///
    /// Use `FromStr` for untrusted input; this constructor does not validate.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

impl FromStr for AccountId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(DomainError::invalid_id("AccountId: empty"));
        }
        if s.len() > Self::MAX_LEN {
            return Err(DomainError::invalid_id("AccountId: too long"));
        }
        if let Some(c) = s.chars().find(|c| !Self::is_id_char(*c)) {
            return Err(DomainError::invalid_id(format!("AccountId: invalid character {c:?}")));
        }
        Ok(Self(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_opaque_ids() {
        let id: AccountId = "U1".parse().unwrap();
        assert_eq!(id.as_str(), "U1");

        let uuid_like: AccountId = "0190c6c4-8a7e-7cc2-9d4e-1f2a3b4c5d6e".parse().unwrap();
        assert_eq!(uuid_like.to_string(), "0190c6c4-8a7e-7cc2-9d4e-1f2a3b4c5d6e");
    }

    #[test]
    fn rejects_empty_and_padded_ids() {
        assert!("".parse::<AccountId>().is_err());
        assert!(" U1".parse::<AccountId>().is_err());
        assert!("a/b".parse::<AccountId>().is_err());
    }

    #[test]
    fn rejects_url_syntax_in_ids() {
        for raw in ["U1?x=1", "U1#frag", "..", ".", "U1%2F", "a b", "é"] {
            assert!(raw.parse::<AccountId>().is_err(), "{raw:?} should be rejected");
        }
        assert!("x".repeat(AccountId::MAX_LEN + 1).parse::<AccountId>().is_err());
        assert!("admin_1-b".parse::<AccountId>().is_ok());
    }

    #[test]
    fn serializes_transparently() {
        let id = AccountId::new("U7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"U7\"");
    }
}
