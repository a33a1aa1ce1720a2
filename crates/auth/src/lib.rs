//! `lexportal-auth`: pure authorization boundary for account provisioning.
//!
//! This crate is intentionally decoupled from HTTP and storage: callers resolve
//! the principal (session + profile lookup) and hand the result in.

pub mod authorize;
pub mod principal;
pub mod roles;

pub use authorize::{
    authorize, explain_authorization, AuthorizationExplanation, AuthzError, DenialKind,
    ProvisioningAction,
};
pub use principal::Principal;
pub use roles::{Role, RoleError, StaffRole};
