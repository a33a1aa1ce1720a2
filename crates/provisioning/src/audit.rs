//! Audit trail for provisioning attempts.
//!
//! One recorder serves every origin. Recording is best-effort: a sink failure
//! is logged and dropped, never retried and never reported to the caller.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use lexportal_core::AccountId;

use crate::ports::StoreError;

/// Audited actions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    CreateUser,
    DeleteUser,
    UpdateUser,
    Login,
    Logout,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateUser => "create_user",
            AuditAction::DeleteUser => "delete_user",
            AuditAction::UpdateUser => "update_user",
            AuditAction::Login => "login",
            AuditAction::Logout => "logout",
        }
    }
}

/// Where an action came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOrigin {
    /// Interactive, session-authenticated request.
    Session,
    /// Automated or service-initiated call.
    Service,
}

impl AuditOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOrigin::Session => "session",
            AuditOrigin::Service => "service",
        }
    }
}

/// Who performed an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Actor {
    Account(AccountId),
    /// In-process entry points that are allowed to skip the session.
    System,
}

impl Actor {
    pub const SYSTEM_MARKER: &'static str = "system";

    pub fn as_str(&self) -> &str {
        match self {
            Actor::Account(id) => id.as_str(),
            Actor::System => Self::SYSTEM_MARKER,
        }
    }
}

impl Serialize for Actor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Immutable record of one provisioning attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor_id: Actor,
    pub action: AuditAction,
    pub details: String,
    pub target_id: Option<AccountId>,
    pub origin: AuditOrigin,
    pub timestamp: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(actor: Actor, action: AuditAction, origin: AuditOrigin, details: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            actor_id: actor,
            action,
            details: details.into(),
            target_id: None,
            origin,
            timestamp: Utc::now(),
        }
    }

    pub fn with_target(mut self, target: Option<AccountId>) -> Self {
        self.target_id = target;
        self
    }
}

/// Durable destination for audit entries.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), StoreError>;
}

/// Sink that writes entries to the tracing pipeline only.
///
/// Used when no audit table is configured (dev mode).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), StoreError> {
        tracing::info!(
            target: "audit",
            audit_id = %entry.id,
            actor_id = entry.actor_id.as_str(),
            action = entry.action.as_str(),
            origin = entry.origin.as_str(),
            target_id = entry.target_id.as_ref().map(AccountId::as_str),
            details = %entry.details,
            "audit entry"
        );
        Ok(())
    }
}

/// How the recorder hands entries to the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuditDispatch {
    /// Spawn one task per entry; the request path never waits on the sink.
    #[default]
    Detached,
    /// Await the sink before returning. Failures are still swallowed.
    Inline,
}

/// Best-effort audit recorder.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    dispatch: AuditDispatch,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>, dispatch: AuditDispatch) -> Self {
        Self { sink, dispatch }
    }

    pub fn dispatch(&self) -> AuditDispatch {
        self.dispatch
    }

    /// Record an entry. Never fails and never retries.
    pub async fn record(&self, entry: AuditLogEntry) {
        match self.dispatch {
            AuditDispatch::Inline => append_logged(self.sink.as_ref(), &entry).await,
            AuditDispatch::Detached => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let sink = Arc::clone(&self.sink);
                    handle.spawn(async move {
                        append_logged(sink.as_ref(), &entry).await;
                    });
                }
                Err(_) => {
                    tracing::warn!(
                        audit_id = %entry.id,
                        action = entry.action.as_str(),
                        "no async runtime available; audit entry dropped"
                    );
                }
            },
        }
    }
}

impl core::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuditRecorder")
            .field("dispatch", &self.dispatch)
            .finish_non_exhaustive()
    }
}

async fn append_logged(sink: &dyn AuditSink, entry: &AuditLogEntry) {
    if let Err(err) = sink.append(entry).await {
        tracing::warn!(
            audit_id = %entry.id,
            action = entry.action.as_str(),
            target_id = entry.target_id.as_ref().map(AccountId::as_str),
            error = %err,
            code = err.code.as_deref(),
            "failed to write audit entry"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct CollectingSink {
        entries: Mutex<Vec<AuditLogEntry>>,
        fail: bool,
    }

    #[async_trait]
    impl AuditSink for CollectingSink {
        async fn append(&self, entry: &AuditLogEntry) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::unavailable("audit table offline"));
            }
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    fn entry() -> AuditLogEntry {
        AuditLogEntry::new(
            Actor::Account(AccountId::new("admin-1")),
            AuditAction::DeleteUser,
            AuditOrigin::Session,
            "deleted account U2",
        )
        .with_target(Some(AccountId::new("U2")))
    }

    #[tokio::test]
    async fn inline_dispatch_writes_before_returning() {
        let sink = Arc::new(CollectingSink::default());
        let recorder = AuditRecorder::new(sink.clone(), AuditDispatch::Inline);

        recorder.record(entry()).await;

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::DeleteUser);
    }

    #[tokio::test]
    async fn detached_dispatch_eventually_writes() {
        let sink = Arc::new(CollectingSink::default());
        let recorder = AuditRecorder::new(sink.clone(), AuditDispatch::Detached);

        recorder.record(entry()).await;

        for _ in 0..50 {
            if !sink.entries.lock().unwrap().is_empty() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("detached audit write never landed");
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed() {
        let sink = Arc::new(CollectingSink {
            fail: true,
            ..Default::default()
        });
        let recorder = AuditRecorder::new(sink.clone(), AuditDispatch::Inline);

        recorder.record(entry()).await;

        assert!(sink.entries.lock().unwrap().is_empty());
    }

    #[test]
    fn entry_serializes_actor_as_plain_id() {
        let value = serde_json::to_value(entry()).unwrap();
        assert_eq!(value["actor_id"], "admin-1");
        assert_eq!(value["action"], "delete_user");
        assert_eq!(value["origin"], "session");
        assert_eq!(value["target_id"], "U2");

        let system = AuditLogEntry::new(Actor::System, AuditAction::CreateUser, AuditOrigin::Service, "bootstrap");
        assert_eq!(serde_json::to_value(system).unwrap()["actor_id"], "system");
    }
}
