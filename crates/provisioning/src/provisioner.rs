//! Identity Provisioner: two-store create/delete with compensating rollback.
//!
//! Create writes the identity store first, then the profile store. If the
//! profile insert fails, the identity record is deleted again. This order
//! keeps the compensation a plain idempotent delete.
//!
//! Delete removes the profile (with its dependents, atomically on the store
//! side) before the identity record. A failure in between is not repaired
//! here; it is surfaced as `PartialDelete` for an operator.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use lexportal_core::AccountId;

use crate::account::{validate, Account, AccountMetadata, NewAccountRequest, Profile};
use crate::config::ProvisionerConfig;
use crate::error::ProvisioningError;
use crate::ports::{IdentityStore, ProfileStore, StoreError};
use crate::saga::{Compensation, CompletedStep, SagaJournal};

/// Facts about a completed delete, kept for the audit entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedAccount {
    pub id: AccountId,
    /// Present when a profile row existed before the delete.
    pub email: Option<String>,
    pub full_name: Option<String>,
    /// False when the identity record was already gone.
    pub identity_existed: bool,
}

impl DeletedAccount {
    pub fn profile_existed(&self) -> bool {
        self.email.is_some()
    }
}

pub struct IdentityProvisioner {
    identity: Arc<dyn IdentityStore>,
    profiles: Arc<dyn ProfileStore>,
    config: ProvisionerConfig,
}

impl IdentityProvisioner {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        profiles: Arc<dyn ProfileStore>,
        config: ProvisionerConfig,
    ) -> Self {
        Self {
            identity,
            profiles,
            config,
        }
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    /// Create an account in both stores, or in neither.
    ///
    /// The only way to end up with one record is `OrphanedIdentityRecord`,
    /// returned when the compensating identity delete fails as well.
    #[instrument(skip_all, fields(action = "create_user", account_id = tracing::field::Empty), err(Display))]
    pub async fn create_account(&self, request: &NewAccountRequest) -> Result<Account, ProvisioningError> {
        let validated = validate(request, self.config.min_password_length)?;
        let mut journal = SagaJournal::new("create_account");

        let metadata = AccountMetadata::from(&validated);
        let record = self
            .identity
            .create_account(&validated.email, &validated.password, &metadata)
            .await
            .map_err(ProvisioningError::identity_store)?;

        tracing::Span::current().record("account_id", record.id.as_str());
        journal.record(CompletedStep::IdentityCreated {
            account_id: record.id.clone(),
        });

        let profile = Profile {
            id: record.id.clone(),
            email: validated.email.clone(),
            full_name: validated.full_name.clone(),
            role: validated.role,
            created_at: Utc::now(),
            last_login: None,
        };

        if let Err(err) = self.profiles.insert_profile(&profile).await {
            tracing::warn!(
                error = %err,
                code = err.code.as_deref(),
                "profile insert failed; compensating identity record"
            );
            return Err(self.compensate(&journal, err).await);
        }
        journal.record(CompletedStep::ProfileInserted {
            account_id: record.id.clone(),
        });

        tracing::info!(role = %validated.role, "account provisioned");
        Ok(Account {
            id: record.id,
            email: record.email,
            role: validated.role,
        })
    }

    /// Run the journal's compensations after a failed profile insert.
    async fn compensate(&self, journal: &SagaJournal, cause: StoreError) -> ProvisioningError {
        for compensation in journal.compensations() {
            match compensation {
                Compensation::DeleteIdentity { account_id } => {
                    match self.identity.delete_account(&account_id).await {
                        Ok(()) => {
                            tracing::info!(account_id = %account_id, "compensating identity delete succeeded");
                        }
                        Err(err) if err.is_not_found() => {
                            tracing::info!(account_id = %account_id, "identity record already absent during compensation");
                        }
                        Err(err) => {
                            tracing::error!(
                                account_id = %account_id,
                                error = %err,
                                code = err.code.as_deref(),
                                profile_error = %cause,
                                "compensating identity delete failed; identity record orphaned"
                            );
                            return ProvisioningError::OrphanedIdentityRecord {
                                account_id,
                                message: format!(
                                    "profile insert failed ({cause}) and the identity record could not be removed ({err})"
                                ),
                                code: err.code,
                            };
                        }
                    }
                }
            }
        }

        ProvisioningError::profile_store(cause)
    }

    /// Remove an account from both stores.
    ///
    /// Missing records on either side are not errors: the desired end state
    /// (no account) already holds for that side.
    #[instrument(skip_all, fields(action = "delete_user", account_id = %id), err(Display))]
    pub async fn delete_account(&self, id: &AccountId) -> Result<DeletedAccount, ProvisioningError> {
        let mut journal = SagaJournal::new("delete_account");

        let existing = self
            .profiles
            .get_profile(id)
            .await
            .map_err(ProvisioningError::profile_store)?;
        if existing.is_none() {
            tracing::info!("no profile row for account; deleting identity record only");
        }

        match self.profiles.delete_account_cascade(id).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(ProvisioningError::profile_store(err)),
        }
        if existing.is_some() {
            journal.record(CompletedStep::ProfileRemoved {
                account_id: id.clone(),
            });
        }

        let identity_existed = match self.identity.delete_account(id).await {
            Ok(()) => true,
            Err(err) if err.is_not_found() => {
                tracing::info!("identity record already absent");
                false
            }
            Err(err) if journal.has_irreversible_step() => {
                tracing::error!(
                    error = %err,
                    code = err.code.as_deref(),
                    "identity delete failed after profile removal; account partially deleted"
                );
                return Err(ProvisioningError::PartialDelete {
                    account_id: id.clone(),
                    message: format!("profile removed but identity record remains ({err})"),
                    code: err.code,
                });
            }
            Err(err) => return Err(ProvisioningError::identity_store(err)),
        };
        journal.record(CompletedStep::IdentityDeleted {
            account_id: id.clone(),
        });

        let (email, full_name) = match existing {
            Some(profile) => (Some(profile.email), Some(profile.full_name)),
            None => (None, None),
        };
        Ok(DeletedAccount {
            id: id.clone(),
            email,
            full_name,
            identity_existed,
        })
    }
}

impl core::fmt::Debug for IdentityProvisioner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdentityProvisioner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
