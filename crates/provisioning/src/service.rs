//! Request pipeline: authorization gate → provisioner → audit recorder.

use lexportal_auth::{authorize, explain_authorization, Principal, ProvisioningAction};
use lexportal_core::AccountId;

use crate::account::{Account, NewAccountRequest};
use crate::audit::{Actor, AuditAction, AuditLogEntry, AuditOrigin, AuditRecorder};
use crate::error::ProvisioningError;
use crate::provisioner::{DeletedAccount, IdentityProvisioner};

/// Who is asking for a provisioning operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// A session-resolved principal; always passes through the gate.
    Principal(Principal),
    /// In-process entry points (e.g. bootstrapping the first admin).
    ///
    /// Never construct this from request data.
    System,
}

impl Caller {
    pub fn actor(&self) -> Actor {
        match self {
            Caller::Principal(p) => Actor::Account(p.account_id.clone()),
            Caller::System => Actor::System,
        }
    }
}

pub struct ProvisioningService {
    provisioner: IdentityProvisioner,
    recorder: AuditRecorder,
}

impl ProvisioningService {
    pub fn new(provisioner: IdentityProvisioner, recorder: AuditRecorder) -> Self {
        Self {
            provisioner,
            recorder,
        }
    }

    pub fn provisioner(&self) -> &IdentityProvisioner {
        &self.provisioner
    }

    /// ProvisionAccount: gate, create in both stores, audit.
    pub async fn provision_account(
        &self,
        caller: &Caller,
        origin: AuditOrigin,
        request: &NewAccountRequest,
    ) -> Result<Account, ProvisioningError> {
        let email = request.email.trim().to_lowercase();

        if let Err(err) = self.gate(caller, ProvisioningAction::CreateUser) {
            self.audit(caller, AuditAction::CreateUser, origin, None, format!("denied: create {email}: {err}"))
                .await;
            return Err(err);
        }

        let result = self.provisioner.create_account(request).await;

        let (target, details) = match &result {
            Ok(account) => (
                Some(account.id.clone()),
                format!("created {} account {}", account.role, account.email),
            ),
            Err(err) => (
                err.account_id().cloned(),
                format!("failed: create {email}: {err}"),
            ),
        };
        self.audit(caller, AuditAction::CreateUser, origin, target, details).await;

        result
    }

    /// DeprovisionAccount: gate, delete from both stores, audit.
    pub async fn deprovision_account(
        &self,
        caller: &Caller,
        origin: AuditOrigin,
        id: &AccountId,
    ) -> Result<DeletedAccount, ProvisioningError> {
        if let Err(err) = self.gate(caller, ProvisioningAction::DeleteUser) {
            self.audit(caller, AuditAction::DeleteUser, origin, Some(id.clone()), format!("denied: {err}"))
                .await;
            return Err(err);
        }

        let result = self.provisioner.delete_account(id).await;

        let details = match &result {
            Ok(deleted) => match (&deleted.email, &deleted.full_name) {
                (Some(email), Some(name)) => format!("deleted account {email} ({name})"),
                _ => format!("deleted account {id} (no profile row existed)"),
            },
            Err(err) => format!("failed: delete {id}: {err}"),
        };
        self.audit(caller, AuditAction::DeleteUser, origin, Some(id.clone()), details).await;

        result
    }

    /// Runs strictly before any store call.
    fn gate(&self, caller: &Caller, action: ProvisioningAction) -> Result<(), ProvisioningError> {
        let Caller::Principal(principal) = caller else {
            return Ok(());
        };

        authorize(principal, action).map_err(|err| {
            let explanation = explain_authorization(principal, action);
            tracing::info!(
                account_id = %principal.account_id,
                action = action.as_str(),
                reason = %explanation.reason,
                "provisioning request denied"
            );
            ProvisioningError::from(err)
        })
    }

    async fn audit(
        &self,
        caller: &Caller,
        action: AuditAction,
        origin: AuditOrigin,
        target: Option<AccountId>,
        details: String,
    ) {
        let entry = AuditLogEntry::new(caller.actor(), action, origin, details).with_target(target);
        self.recorder.record(entry).await;
    }
}

impl core::fmt::Debug for ProvisioningService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProvisioningService")
            .field("provisioner", &self.provisioner)
            .field("recorder", &self.recorder)
            .finish()
    }
}
