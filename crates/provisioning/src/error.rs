//! Provisioning error taxonomy.

use thiserror::Error;

use lexportal_auth::AuthzError;
use lexportal_core::{AccountId, DomainError};

use crate::ports::{StoreError, StoreErrorKind};

/// Outcome of a failed provisioning operation.
///
/// Callers must be able to tell input problems, store outages and consistency
/// violations apart, so store failures keep their origin and the two
/// cross-store escape hatches (`OrphanedIdentityRecord`, `PartialDelete`) name
/// the account an operator has to reconcile.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProvisioningError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("conflict: {message}")]
    Conflict { message: String, code: Option<String> },

    #[error("identity store error: {message}")]
    IdentityStore { message: String, code: Option<String> },

    #[error("profile store error: {message}")]
    ProfileStore { message: String, code: Option<String> },

    /// Profile insert failed and the compensating identity delete failed too.
    #[error("orphaned identity record {account_id}: {message}")]
    OrphanedIdentityRecord {
        account_id: AccountId,
        message: String,
        code: Option<String>,
    },

    /// Profile removed, identity record survived.
    #[error("partial delete of {account_id}: {message}")]
    PartialDelete {
        account_id: AccountId,
        message: String,
        code: Option<String>,
    },
}

impl ProvisioningError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Map an identity-store failure, keeping duplicate emails distinct.
    pub fn identity_store(err: StoreError) -> Self {
        match err.kind {
            StoreErrorKind::Conflict => Self::Conflict {
                message: "an account with this email already exists".to_string(),
                code: err.code,
            },
            _ => Self::IdentityStore {
                message: err.message,
                code: err.code,
            },
        }
    }

    pub fn profile_store(err: StoreError) -> Self {
        Self::ProfileStore {
            message: err.message,
            code: err.code,
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::IdentityStore { .. } => "identity_store_error",
            Self::ProfileStore { .. } => "profile_store_error",
            Self::OrphanedIdentityRecord { .. } => "orphaned_identity_record",
            Self::PartialDelete { .. } => "partial_delete",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput { message }
            | Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::Conflict { message, .. }
            | Self::IdentityStore { message, .. }
            | Self::ProfileStore { message, .. }
            | Self::OrphanedIdentityRecord { message, .. }
            | Self::PartialDelete { message, .. } => message,
        }
    }

    /// Underlying store diagnostic code, when known.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Conflict { code, .. }
            | Self::IdentityStore { code, .. }
            | Self::ProfileStore { code, .. }
            | Self::OrphanedIdentityRecord { code, .. }
            | Self::PartialDelete { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Account left in a partial state, if any.
    pub fn account_id(&self) -> Option<&AccountId> {
        match self {
            Self::OrphanedIdentityRecord { account_id, .. }
            | Self::PartialDelete { account_id, .. } => Some(account_id),
            _ => None,
        }
    }

    /// True when the identity store and the profile store disagree afterwards.
    pub fn is_consistency_violation(&self) -> bool {
        self.account_id().is_some()
    }
}

impl From<DomainError> for ProvisioningError {
    fn from(value: DomainError) -> Self {
        Self::invalid_input(value.detail())
    }
}

impl From<AuthzError> for ProvisioningError {
    fn from(value: AuthzError) -> Self {
        Self::Forbidden {
            message: value.to_string(),
        }
    }
}
