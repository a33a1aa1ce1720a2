use crate::audit::AuditDispatch;

/// Tunables for the provisioning pipeline.
///
/// Built once by the caller (from the environment in binaries, directly in
/// tests) and passed in at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionerConfig {
    pub min_password_length: usize,
    pub audit_dispatch: AuditDispatch,
}

impl ProvisionerConfig {
    pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            min_password_length: Self::DEFAULT_MIN_PASSWORD_LENGTH,
            audit_dispatch: AuditDispatch::Detached,
        }
    }
}
