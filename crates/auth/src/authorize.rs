use serde::{Deserialize, Serialize};
use thiserror::Error;

use lexportal_core::AccountId;

use crate::{Principal, Role, StaffRole};

/// Provisioning actions guarded by the gate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningAction {
    CreateUser,
    DeleteUser,
}

impl ProvisioningAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningAction::CreateUser => "create_user",
            ProvisioningAction::DeleteUser => "delete_user",
        }
    }
}

impl core::fmt::Display for ProvisioningAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Staff sub-roles allowed to delete accounts.
pub const DELETE_ALLOWED_STAFF_ROLES: [StaffRole; 3] = [
    StaffRole::SeniorAttorney,
    StaffRole::Attorney,
    StaffRole::Secretary,
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: {action} not permitted ({reason})")]
    Forbidden {
        action: ProvisioningAction,
        reason: DenialKind,
    },
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// The caller's profile could not be resolved.
    UnresolvedProfile,
    /// The caller's role never grants the action.
    RoleNotPermitted,
    /// The caller is staff, but the sub-role is not on the allow-list.
    StaffRoleNotPermitted,
}

impl core::fmt::Display for DenialKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            DenialKind::UnresolvedProfile => "caller profile could not be resolved",
            DenialKind::RoleNotPermitted => "role not permitted",
            DenialKind::StaffRoleNotPermitted => "staff role not permitted",
        })
    }
}

fn decide(role: Option<&Role>, action: ProvisioningAction) -> Result<(), DenialKind> {
    let role = role.ok_or(DenialKind::UnresolvedProfile)?;

    match (action, role) {
        (_, Role::Admin) => Ok(()),
        (ProvisioningAction::CreateUser, Role::Staff(_)) => Ok(()),
        (ProvisioningAction::DeleteUser, Role::Staff(sub)) => {
            if DELETE_ALLOWED_STAFF_ROLES.contains(sub) {
                Ok(())
            } else {
                Err(DenialKind::StaffRoleNotPermitted)
            }
        }
        (_, Role::Client) => Err(DenialKind::RoleNotPermitted),
    }
}

/// Authorize a provisioning action for a resolved principal.
///
/// - No IO
/// - No panics
/// - Unresolved role is always a deny
pub fn authorize(principal: &Principal, action: ProvisioningAction) -> Result<(), AuthzError> {
    decide(principal.role.as_ref(), action).map_err(|reason| AuthzError::Forbidden { action, reason })
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub action: ProvisioningAction,
    pub granted: bool,
    pub reason: String,
    pub account_id: AccountId,
    pub role: Option<&'static str>,
    pub staff_role: Option<&'static str>,
    pub denial: Option<DenialKind>,
}

/// Explain why a decision was (or would be) made.
///
/// Always agrees with [`authorize`]; it only adds readable context.
pub fn explain_authorization(
    principal: &Principal,
    action: ProvisioningAction,
) -> AuthorizationExplanation {
    let (role, staff_role) = match principal.role {
        Some(r) => {
            let (role, staff) = r.as_parts();
            (Some(role), staff)
        }
        None => (None, None),
    };

    let decision = decide(principal.role.as_ref(), action);
    let reason = match (decision, principal.role) {
        (Err(DenialKind::UnresolvedProfile), _) | (_, None) => format!(
            "no profile found for account {}; treating caller as unprivileged",
            principal.account_id
        ),
        (Ok(()), Some(Role::Admin)) => format!("admins may {action}"),
        (Ok(()), Some(r)) => format!("{r} may {action}"),
        (Err(kind), Some(r)) => format!("{r} may not {action}: {kind}"),
    };

    AuthorizationExplanation {
        action,
        granted: decision.is_ok(),
        reason,
        account_id: principal.account_id.clone(),
        role,
        staff_role,
        denial: decision.err(),
    }
}
