use lexportal_auth::Principal;
use lexportal_provisioning::Caller;

/// Authenticated caller for a request.
///
/// Inserted by the session middleware; the role may still be unresolved when
/// the caller's profile row is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    principal: Principal,
}

impl CallerContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// HTTP callers always go through the gate.
    pub fn caller(&self) -> Caller {
        Caller::Principal(self.principal.clone())
    }
}
