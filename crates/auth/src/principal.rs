use serde::{Deserialize, Serialize};

use lexportal_core::AccountId;

use crate::Role;

/// A principal resolved for an authorization decision.
///
/// The session tells us *who* is calling; the role comes from that account's
/// profile row. If the profile cannot be found (deleted mid-session, missing
/// row) the role stays unresolved and every gated action is denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub account_id: AccountId,
    pub role: Option<Role>,
}

impl Principal {
    pub fn resolved(account_id: AccountId, role: Role) -> Self {
        Self {
            account_id,
            role: Some(role),
        }
    }

    pub fn unresolved(account_id: AccountId) -> Self {
        Self {
            account_id,
            role: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.role.is_some()
    }
}
