//! Postgres-backed profile store and audit sink.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreErrorKind | Scenario |
//! |------------|----------------------|----------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate profile id or email |
//! | Database (foreign key violation) | `23503` | `Rejected` | Dependent rows outside the cascade |
//! | Database (check constraint violation) | `23514` | `Rejected` | Role/staff_role pairing rejected by the schema |
//! | Database (other) | Any other | `Other` | Other database errors |
//! | PoolTimedOut / PoolClosed / Io | N/A | `Unavailable` | Database unreachable or saturated |
//! | RowNotFound | N/A | `NotFound` | Unexpected (queries use `fetch_optional`) |
//! | Other | N/A | `Other` | Anything else |
//!
//! The SQLSTATE is always kept in `StoreError::code`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use lexportal_auth::Role;
use lexportal_core::AccountId;
use lexportal_provisioning::{AuditLogEntry, AuditSink, Profile, ProfileStore, StoreError, StoreErrorKind};

use crate::config::DatabaseConfig;

/// Schema for profiles, their dependents, the audit table and the cascade function.
pub const SCHEMA: &str = include_str!("../migrations/0001_provisioning.sql");

/// Open a connection pool with the configured limits.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

/// Apply [`SCHEMA`]. Every statement is idempotent.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;
    Ok(())
}

/// Profile store over the `profiles` table.
///
/// Deletes go through the `delete_account_cascade` SQL function so that the
/// dependent rows and the profile row disappear in one server-side
/// transaction.
#[derive(Debug, Clone)]
pub struct PostgresProfileStore {
    pool: Arc<PgPool>,
}

impl PostgresProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: String,
    email: String,
    full_name: String,
    role: String,
    staff_role: Option<String>,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = StoreError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role = Role::from_parts(&row.role, row.staff_role.as_deref())
            .map_err(|e| StoreError::other(format!("profile {} has an invalid role: {e}", row.id)))?;
        Ok(Profile {
            id: AccountId::new(row.id),
            email: row.email,
            full_name: row.full_name,
            role,
            created_at: row.created_at,
            last_login: row.last_login,
        })
    }
}

#[async_trait]
impl ProfileStore for PostgresProfileStore {
    #[instrument(skip_all, fields(account_id = %profile.id), err(Display))]
    async fn insert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        let (role, staff_role) = profile.role.as_parts();
        sqlx::query(
            r#"
            INSERT INTO profiles (id, email, full_name, role, staff_role, created_at, last_login)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(profile.id.as_str())
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(role)
        .bind(staff_role)
        .bind(profile.created_at)
        .bind(profile.last_login)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_profile", e))?;
        Ok(())
    }

    #[instrument(skip_all, fields(account_id = %id), err(Display))]
    async fn get_profile(&self, id: &AccountId) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, email, full_name, role, staff_role, created_at, last_login
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_profile", e))?;

        row.map(Profile::try_from).transpose()
    }

    #[instrument(skip_all, fields(account_id = %id), err(Display))]
    async fn delete_account_cascade(&self, id: &AccountId) -> Result<(), StoreError> {
        sqlx::query("SELECT delete_account_cascade($1)")
            .bind(id.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_account_cascade", e))?;
        Ok(())
    }
}

/// Audit sink over the append-only `audit_logs` table.
#[derive(Debug, Clone)]
pub struct PostgresAuditSink {
    pool: Arc<PgPool>,
}

impl PostgresAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, actor_id, action, details, target_id, origin, "timestamp")
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.actor_id.as_str())
        .bind(entry.action.as_str())
        .bind(&entry.details)
        .bind(entry.target_id.as_ref().map(AccountId::as_str))
        .bind(entry.origin.as_str())
        .bind(entry.timestamp)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_audit_log", e))?;
        Ok(())
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            let Some(code) = db_err.code() else {
                return StoreError::other(msg);
            };
            let kind = match code.as_ref() {
                // Unique violation
                "23505" => StoreErrorKind::Conflict,
                // Foreign key / check constraint violation
                "23503" | "23514" => StoreErrorKind::Rejected,
                _ => StoreErrorKind::Other,
            };
            StoreError::new(kind, msg).with_code(code.into_owned())
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::unavailable(format!("timed out acquiring a connection in {}", operation))
        }
        sqlx::Error::PoolClosed => {
            StoreError::unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::Io(e) => StoreError::unavailable(format!("io error in {}: {}", operation, e)),
        sqlx::Error::RowNotFound => {
            StoreError::not_found(format!("unexpected row not found in {}", operation))
        }
        _ => StoreError::other(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexportal_auth::StaffRole;

    fn row(role: &str, staff_role: Option<&str>) -> ProfileRow {
        ProfileRow {
            id: "U1".to_string(),
            email: "u1@x.com".to_string(),
            full_name: "U One".to_string(),
            role: role.to_string(),
            staff_role: staff_role.map(str::to_string),
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn staff_row_parses_into_tagged_role() {
        let profile = Profile::try_from(row("staff", Some("secretary"))).unwrap();
        assert_eq!(profile.role, Role::Staff(StaffRole::Secretary));
    }

    #[test]
    fn inconsistent_row_is_a_store_error() {
        let err = Profile::try_from(row("client", Some("attorney"))).unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::Other);
        assert!(err.message.contains("U1"));
    }

    #[test]
    fn pool_timeouts_are_unavailable() {
        let err = map_sqlx_error("get_profile", sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind, StoreErrorKind::Unavailable);
    }

    #[test]
    fn schema_defines_cascade_function() {
        assert!(SCHEMA.contains("delete_account_cascade"));
        assert!(SCHEMA.contains("audit_logs"));
    }
}
