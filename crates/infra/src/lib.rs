//! Infrastructure layer: store adapters, configuration.

pub mod config;
pub mod identity_http;
pub mod in_memory;
pub mod postgres;

pub use config::{AppConfig, Backends, ConfigError, DatabaseConfig, DevAdmin, IdentityStoreConfig, LogSettings};
pub use identity_http::HttpIdentityStore;
pub use in_memory::{seed_dev_admin, CallJournal, InMemoryAuditSink, InMemoryIdentityStore, InMemoryProfileStore, StoreCall};
pub use postgres::{PostgresAuditSink, PostgresProfileStore};
