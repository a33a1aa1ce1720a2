use std::sync::Arc;

use lexportal_auth::Principal;
use lexportal_core::AccountId;
use lexportal_infra::{
    AppConfig, Backends, HttpIdentityStore, InMemoryIdentityStore, InMemoryProfileStore, PostgresAuditSink,
    PostgresProfileStore, postgres, seed_dev_admin,
};
use lexportal_provisioning::{
    AuditRecorder, AuditSink, IdentityProvisioner, IdentityStore, ProfileStore, ProvisionerConfig,
    ProvisioningService, StoreError, TracingAuditSink,
};

/// Everything the handlers and the session middleware need.
pub struct AppServices {
    provisioning: ProvisioningService,
    identity: Arc<dyn IdentityStore>,
    profiles: Arc<dyn ProfileStore>,
}

impl AppServices {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        profiles: Arc<dyn ProfileStore>,
        audit: Arc<dyn AuditSink>,
        config: ProvisionerConfig,
    ) -> Self {
        let provisioner = IdentityProvisioner::new(identity.clone(), profiles.clone(), config);
        let recorder = AuditRecorder::new(audit, config.audit_dispatch);
        Self {
            provisioning: ProvisioningService::new(provisioner, recorder),
            identity,
            profiles,
        }
    }

    /// Build the configured backends.
    ///
    /// Remote mode connects the pool and applies the schema before returning.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        match &config.backends {
            Backends::InMemory { dev_admin } => {
                tracing::warn!("using in-memory stores; nothing is persisted");
                let identity = Arc::new(InMemoryIdentityStore::new());
                let profiles = Arc::new(InMemoryProfileStore::new());
                match dev_admin {
                    Some(admin) => {
                        let id = seed_dev_admin(&identity, &profiles, admin)?;
                        tracing::info!(account_id = %id, email = %admin.email, "seeded dev admin session");
                    }
                    None => tracing::warn!("no LEXPORTAL_DEV_ADMIN_TOKEN set; every /admin request will be 401"),
                }
                Ok(Self::new(identity, profiles, Arc::new(TracingAuditSink), config.provisioning))
            }
            Backends::Remote { identity, database } => {
                let pool = postgres::connect(database).await?;
                postgres::migrate(&pool).await?;
                tracing::info!(max_connections = database.max_connections, "profile store connected");

                Ok(Self::new(
                    Arc::new(HttpIdentityStore::new(identity)?),
                    Arc::new(PostgresProfileStore::new(pool.clone())),
                    Arc::new(PostgresAuditSink::new(pool)),
                    config.provisioning,
                ))
            }
        }
    }

    pub fn provisioning(&self) -> &ProvisioningService {
        &self.provisioning
    }

    /// Resolve a session token to a principal.
    ///
    /// `Ok(None)` when the token is unknown. A missing or unreadable profile
    /// leaves the role unresolved, which the gate always denies.
    pub async fn resolve_principal(&self, token: &str) -> Result<Option<Principal>, StoreError> {
        let Some(account_id) = self.identity.resolve_session(token).await? else {
            return Ok(None);
        };

        Ok(Some(self.principal_for(account_id).await))
    }

    async fn principal_for(&self, account_id: AccountId) -> Principal {
        match self.profiles.get_profile(&account_id).await {
            Ok(Some(profile)) => Principal::resolved(account_id, profile.role),
            Ok(None) => {
                tracing::info!(account_id = %account_id, "session has no profile row");
                Principal::unresolved(account_id)
            }
            Err(err) => {
                tracing::warn!(
                    account_id = %account_id,
                    error = %err,
                    "profile lookup failed during session resolution"
                );
                Principal::unresolved(account_id)
            }
        }
    }
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppServices")
            .field("provisioning", &self.provisioning)
            .finish_non_exhaustive()
    }
}
