//! Store ports consumed by the provisioner.
//!
//! Adapters must not retry internally and must not swallow errors. Timeouts
//! belong to the adapter's client and surface here as `Unavailable`.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use lexportal_core::AccountId;

use crate::account::{AccountMetadata, Password, Profile};

/// Coarse classification of a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreErrorKind {
    /// The target record does not exist.
    NotFound,
    /// A uniqueness constraint was violated (e.g. duplicate email).
    Conflict,
    /// The store understood the request and refused it.
    Rejected,
    /// The store could not be reached or timed out.
    Unavailable,
    Other,
}

impl core::fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            StoreErrorKind::NotFound => "not found",
            StoreErrorKind::Conflict => "conflict",
            StoreErrorKind::Rejected => "rejected",
            StoreErrorKind::Unavailable => "unavailable",
            StoreErrorKind::Other => "store failure",
        })
    }
}

/// Error reported by a store adapter.
///
/// `code` carries the store's own diagnostic (SQLSTATE, identity-store error
/// code) when there is one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
    pub code: Option<String>,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Conflict, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Rejected, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Unavailable, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Other, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == StoreErrorKind::NotFound
    }
}

/// What the identity store hands back after creating an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub id: AccountId,
    pub email: String,
}

/// Authentication/identity store.
///
/// The source of truth for email uniqueness: a duplicate email must come back
/// as `StoreErrorKind::Conflict`.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Create an account with the email already confirmed.
    async fn create_account(
        &self,
        email: &str,
        password: &Password,
        metadata: &AccountMetadata,
    ) -> Result<IdentityRecord, StoreError>;

    /// Delete an account. Callers treat `NotFound` as success.
    async fn delete_account(&self, id: &AccountId) -> Result<(), StoreError>;

    /// Resolve a session token to the account that owns it.
    ///
    /// `Ok(None)` means the token is unknown or expired.
    async fn resolve_session(&self, token: &str) -> Result<Option<AccountId>, StoreError>;
}

/// Relational profile store.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn insert_profile(&self, profile: &Profile) -> Result<(), StoreError>;

    async fn get_profile(&self, id: &AccountId) -> Result<Option<Profile>, StoreError>;

    /// Remove every row that references the account, then the profile row,
    /// as one atomic server-side operation.
    async fn delete_account_cascade(&self, id: &AccountId) -> Result<(), StoreError>;
}
