//! `lexportal-provisioning`: account provisioning across the identity store
//! and the profile store.
//!
//! Pipeline per request: authorization gate → [`IdentityProvisioner`] (identity
//! store, profile store) → [`AuditRecorder`]. [`ProvisioningService`] wires the
//! three together; store adapters live in `lexportal-infra`.

pub mod account;
pub mod audit;
pub mod config;
pub mod error;
pub mod ports;
pub mod provisioner;
pub mod saga;
pub mod service;

pub use account::{validate, Account, AccountMetadata, NewAccountRequest, Password, Profile, ValidatedAccount};
pub use audit::{Actor, AuditAction, AuditDispatch, AuditLogEntry, AuditOrigin, AuditRecorder, AuditSink, TracingAuditSink};
pub use config::ProvisionerConfig;
pub use error::ProvisioningError;
pub use ports::{IdentityRecord, IdentityStore, ProfileStore, StoreError, StoreErrorKind};
pub use provisioner::{DeletedAccount, IdentityProvisioner};
pub use saga::{Compensation, CompletedStep, SagaJournal};
pub use service::{Caller, ProvisioningService};
