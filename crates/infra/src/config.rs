//! Process configuration.
//!
//! Read once from the environment by the binaries and passed down; library
//! code never looks at process state.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use lexportal_provisioning::{AuditDispatch, ProvisionerConfig};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

/// Identity store (admin API) connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityStoreConfig {
    pub base_url: String,
    pub service_key: String,
    pub request_timeout: Duration,
}

impl core::fmt::Debug for IdentityStoreConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdentityStoreConfig")
            .field("base_url", &self.base_url)
            .field("service_key", &"***")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl core::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"***")
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub json: bool,
}

/// Backends used by the running service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backends {
    /// Identity store over HTTP, profiles and audit in Postgres.
    Remote {
        identity: IdentityStoreConfig,
        database: DatabaseConfig,
    },
    /// Everything in process memory (dev mode).
    InMemory { dev_admin: Option<DevAdmin> },
}

/// Admin account seeded into the in-memory stores at startup, with a fixed
/// session token so requests can be made against a dev server.
#[derive(Clone, PartialEq, Eq)]
pub struct DevAdmin {
    pub email: String,
    pub session_token: String,
}

impl DevAdmin {
    pub const DEFAULT_EMAIL: &'static str = "admin@localhost";
}

impl core::fmt::Debug for DevAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DevAdmin")
            .field("email", &self.email)
            .field("session_token", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub backends: Backends,
    pub provisioning: ProvisionerConfig,
    pub log: LogSettings,
}

impl AppConfig {
    pub const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:8080";
    pub const DEFAULT_IDENTITY_TIMEOUT_SECS: u64 = 10;
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
    pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` for variable values. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_or(&get, "LEXPORTAL_BIND_ADDR", || {
            SocketAddr::from(([0, 0, 0, 0], 8080))
        })?;

        let in_memory = parse_bool_or(&get, "LEXPORTAL_IN_MEMORY", false)?;
        let backends = if in_memory {
            Backends::InMemory {
                dev_admin: get("LEXPORTAL_DEV_ADMIN_TOKEN").map(|session_token| DevAdmin {
                    email: get("LEXPORTAL_DEV_ADMIN_EMAIL").unwrap_or_else(|| DevAdmin::DEFAULT_EMAIL.to_string()),
                    session_token,
                }),
            }
        } else {
            Backends::Remote {
                identity: IdentityStoreConfig {
                    base_url: require(&get, "IDENTITY_STORE_URL")?
                        .trim_end_matches('/')
                        .to_string(),
                    service_key: require(&get, "IDENTITY_STORE_SERVICE_KEY")?,
                    request_timeout: Duration::from_secs(parse_or(&get, "IDENTITY_STORE_TIMEOUT_SECS", || {
                        Self::DEFAULT_IDENTITY_TIMEOUT_SECS
                    })?),
                },
                database: DatabaseConfig {
                    url: require(&get, "DATABASE_URL")?,
                    max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", || Self::DEFAULT_MAX_CONNECTIONS)?,
                    acquire_timeout: Duration::from_secs(parse_or(&get, "DATABASE_ACQUIRE_TIMEOUT_SECS", || {
                        Self::DEFAULT_ACQUIRE_TIMEOUT_SECS
                    })?),
                },
            }
        };

        let min_password_length = parse_or(&get, "LEXPORTAL_MIN_PASSWORD_LENGTH", || {
            ProvisionerConfig::DEFAULT_MIN_PASSWORD_LENGTH
        })?;
        if min_password_length == 0 {
            return Err(ConfigError::Invalid {
                var: "LEXPORTAL_MIN_PASSWORD_LENGTH",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            bind_addr,
            backends,
            provisioning: ProvisionerConfig {
                min_password_length,
                audit_dispatch: AuditDispatch::Detached,
            },
            log: LogSettings {
                json: parse_bool_or(&get, "LEXPORTAL_LOG_JSON", true)?,
            },
        })
    }
}

fn require<G>(get: &G, var: &'static str) -> Result<String, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    get(var).ok_or(ConfigError::Missing(var))
}

fn parse_or<G, T, D>(get: &G, var: &'static str, default: D) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: core::fmt::Display,
    D: FnOnce() -> T,
{
    match get(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            message: e.to_string(),
        }),
        None => Ok(default()),
    }
}

fn parse_bool_or<G>(get: &G, var: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(var).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                var,
                message: format!("expected a boolean, got {v:?}"),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn in_memory_mode_needs_no_credentials() {
        let cfg = load(&[("LEXPORTAL_IN_MEMORY", "true")]).unwrap();
        assert_eq!(cfg.backends, Backends::InMemory { dev_admin: None });
        assert_eq!(cfg.bind_addr.to_string(), AppConfig::DEFAULT_BIND_ADDR);
        assert_eq!(cfg.provisioning.min_password_length, 6);
        assert!(cfg.log.json);
    }

    #[test]
    fn dev_admin_applies_only_in_memory_mode() {
        let cfg = load(&[("LEXPORTAL_IN_MEMORY", "true"), ("LEXPORTAL_DEV_ADMIN_TOKEN", "dev-token")]).unwrap();
        let Backends::InMemory { dev_admin: Some(admin) } = &cfg.backends else {
            panic!("expected a dev admin");
        };
        assert_eq!(admin.email, DevAdmin::DEFAULT_EMAIL);
        assert_eq!(admin.session_token, "dev-token");
        assert!(!format!("{admin:?}").contains("dev-token"));

        let err = load(&[("LEXPORTAL_DEV_ADMIN_TOKEN", "dev-token")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("IDENTITY_STORE_URL"));
    }

    #[test]
    fn remote_mode_requires_identity_url() {
        let err = load(&[]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("IDENTITY_STORE_URL"));
    }

    #[test]
    fn remote_mode_reads_all_settings() {
        let cfg = load(&[
            ("IDENTITY_STORE_URL", "https://id.example.test/"),
            ("IDENTITY_STORE_SERVICE_KEY", "service-key"),
            ("IDENTITY_STORE_TIMEOUT_SECS", "3"),
            ("DATABASE_URL", "postgres://localhost/lexportal"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("LEXPORTAL_MIN_PASSWORD_LENGTH", "10"),
            ("LEXPORTAL_LOG_JSON", "false"),
        ])
        .unwrap();

        let Backends::Remote { identity, database } = cfg.backends else {
            panic!("expected remote backends");
        };
        assert_eq!(identity.base_url, "https://id.example.test");
        assert_eq!(identity.request_timeout, Duration::from_secs(3));
        assert_eq!(database.max_connections, 12);
        assert_eq!(database.acquire_timeout, Duration::from_secs(5));
        assert_eq!(cfg.provisioning.min_password_length, 10);
        assert!(!cfg.log.json);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = load(&[("LEXPORTAL_IN_MEMORY", "1"), ("LEXPORTAL_MIN_PASSWORD_LENGTH", "six")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "LEXPORTAL_MIN_PASSWORD_LENGTH", .. }));
    }

    #[test]
    fn secrets_are_not_debug_printed() {
        let cfg = IdentityStoreConfig {
            base_url: "https://id.example.test".to_string(),
            service_key: "super-secret".to_string(),
            request_timeout: Duration::from_secs(1),
        };
        assert!(!format!("{cfg:?}").contains("super-secret"));
    }
}
