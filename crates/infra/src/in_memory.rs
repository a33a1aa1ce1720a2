//! In-memory store adapters.
//!
//! Intended for tests/dev. Every store can share one [`CallJournal`], so tests
//! can assert the exact order of calls across stores (or that none happened),
//! and every store supports fault injection.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use lexportal_auth::Role;
use lexportal_core::AccountId;
use lexportal_provisioning::{
    AccountMetadata, AuditLogEntry, AuditSink, IdentityRecord, IdentityStore, Password, Profile,
    ProfileStore, StoreError,
};

use crate::config::DevAdmin;

/// One call against a store, as seen by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    IdentityCreate { email: String },
    IdentityDelete { id: AccountId },
    ResolveSession,
    ProfileInsert { id: AccountId },
    ProfileGet { id: AccountId },
    ProfileDeleteCascade { id: AccountId },
    AuditAppend,
}

impl StoreCall {
    /// True for calls that (may) change a store.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            StoreCall::IdentityCreate { .. }
                | StoreCall::IdentityDelete { .. }
                | StoreCall::ProfileInsert { .. }
                | StoreCall::ProfileDeleteCascade { .. }
        )
    }

    /// True for calls against the identity or profile store (not the audit sink).
    pub fn is_store_call(&self) -> bool {
        !matches!(self, StoreCall::AuditAppend | StoreCall::ResolveSession)
    }
}

/// Ordered, shared log of store calls.
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    calls: Arc<Mutex<Vec<StoreCall>>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: StoreCall) {
        lock(&self.calls).push(call);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }

    /// Identity and profile store calls, in order.
    pub fn store_calls(&self) -> Vec<StoreCall> {
        lock(&self.calls)
            .iter()
            .filter(|c| c.is_store_call())
            .cloned()
            .collect()
    }

    pub fn mutations(&self) -> Vec<StoreCall> {
        lock(&self.calls)
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
    }
}

// The journal and fault slots are test plumbing; a poisoned lock still holds
// usable data.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn poisoned() -> StoreError {
    StoreError::other("lock poisoned")
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity store
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredIdentity {
    pub email: String,
    pub metadata: Option<AccountMetadata>,
    /// Always true: accounts are created pre-confirmed.
    pub email_confirmed: bool,
}

/// In-memory identity store.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    accounts: RwLock<HashMap<AccountId, StoredIdentity>>,
    sessions: RwLock<HashMap<String, AccountId>>,
    next_ids: Mutex<VecDeque<AccountId>>,
    create_failure: Mutex<Option<StoreError>>,
    delete_failure: Mutex<Option<StoreError>>,
    journal: CallJournal,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: CallJournal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn journal(&self) -> &CallJournal {
        &self.journal
    }

    /// Ids to hand out on the next creates, in order. Afterwards ids are UUIDv7.
    pub fn queue_ids<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.next_ids).extend(ids.into_iter().map(AccountId::new));
    }

    /// Make every create fail with `err` until cleared.
    pub fn fail_creates(&self, err: Option<StoreError>) {
        *lock(&self.create_failure) = err;
    }

    /// Make every delete fail with `err` until cleared.
    pub fn fail_deletes(&self, err: Option<StoreError>) {
        *lock(&self.delete_failure) = err;
    }

    /// Seed an account directly, bypassing the journal.
    pub fn seed_account(&self, id: impl Into<String>, email: impl Into<String>) -> Result<AccountId, StoreError> {
        let id = AccountId::new(id);
        self.accounts.write().map_err(|_| poisoned())?.insert(
            id.clone(),
            StoredIdentity {
                email: email.into(),
                metadata: None,
                email_confirmed: true,
            },
        );
        Ok(id)
    }

    /// Issue a session token for an existing account.
    pub fn issue_session(&self, id: &AccountId) -> Result<String, StoreError> {
        if !self.contains(id) {
            return Err(StoreError::not_found(format!("no account {id}")));
        }
        let token = Uuid::now_v7().simple().to_string();
        self.sessions
            .write()
            .map_err(|_| poisoned())?
            .insert(token.clone(), id.clone());
        Ok(token)
    }

    /// Register `token` as a session for an existing account.
    pub fn seed_session(&self, id: &AccountId, token: impl Into<String>) -> Result<(), StoreError> {
        if !self.contains(id) {
            return Err(StoreError::not_found(format!("no account {id}")));
        }
        self.sessions
            .write()
            .map_err(|_| poisoned())?
            .insert(token.into(), id.clone());
        Ok(())
    }

    pub fn contains(&self, id: &AccountId) -> bool {
        self.accounts
            .read()
            .map(|accounts| accounts.contains_key(id))
            .unwrap_or(false)
    }

    pub fn get(&self, id: &AccountId) -> Option<StoredIdentity> {
        self.accounts.read().ok()?.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.accounts.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn create_account(
        &self,
        email: &str,
        _password: &Password,
        metadata: &AccountMetadata,
    ) -> Result<IdentityRecord, StoreError> {
        self.journal.push(StoreCall::IdentityCreate {
            email: email.to_string(),
        });
        if let Some(err) = lock(&self.create_failure).clone() {
            return Err(err);
        }

        let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
        if accounts.values().any(|a| a.email.eq_ignore_ascii_case(email)) {
            return Err(StoreError::conflict("a user with this email address has already been registered")
                .with_code("email_exists"));
        }

        let id = lock(&self.next_ids)
            .pop_front()
            .unwrap_or_else(|| AccountId::new(Uuid::now_v7().to_string()));
        accounts.insert(
            id.clone(),
            StoredIdentity {
                email: email.to_string(),
                metadata: Some(metadata.clone()),
                email_confirmed: true,
            },
        );

        Ok(IdentityRecord {
            id,
            email: email.to_string(),
        })
    }

    async fn delete_account(&self, id: &AccountId) -> Result<(), StoreError> {
        self.journal.push(StoreCall::IdentityDelete { id: id.clone() });
        if let Some(err) = lock(&self.delete_failure).clone() {
            return Err(err);
        }

        let removed = self.accounts.write().map_err(|_| poisoned())?.remove(id);
        if removed.is_none() {
            return Err(StoreError::not_found(format!("user {id} not found")).with_code("user_not_found"));
        }
        self.sessions
            .write()
            .map_err(|_| poisoned())?
            .retain(|_, owner| owner != id);
        Ok(())
    }

    async fn resolve_session(&self, token: &str) -> Result<Option<AccountId>, StoreError> {
        self.journal.push(StoreCall::ResolveSession);
        Ok(self.sessions.read().map_err(|_| poisoned())?.get(token).cloned())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Profile store
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ProfileTables {
    profiles: HashMap<AccountId, Profile>,
    /// Dependent rows (notification links) per account.
    notification_recipients: HashMap<AccountId, usize>,
}

/// In-memory profile store.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    tables: RwLock<ProfileTables>,
    insert_failure: Mutex<Option<StoreError>>,
    get_failure: Mutex<Option<StoreError>>,
    cascade_failure: Mutex<Option<StoreError>>,
    journal: CallJournal,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: CallJournal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn fail_inserts(&self, err: Option<StoreError>) {
        *lock(&self.insert_failure) = err;
    }

    pub fn fail_gets(&self, err: Option<StoreError>) {
        *lock(&self.get_failure) = err;
    }

    pub fn fail_cascades(&self, err: Option<StoreError>) {
        *lock(&self.cascade_failure) = err;
    }

    /// Seed a profile directly, bypassing the journal.
    pub fn seed_profile(&self, profile: Profile) -> Result<(), StoreError> {
        self.tables
            .write()
            .map_err(|_| poisoned())?
            .profiles
            .insert(profile.id.clone(), profile);
        Ok(())
    }

    /// Add a dependent notification row for an account.
    pub fn add_notification_recipient(&self, id: &AccountId) -> Result<(), StoreError> {
        *self
            .tables
            .write()
            .map_err(|_| poisoned())?
            .notification_recipients
            .entry(id.clone())
            .or_default() += 1;
        Ok(())
    }

    pub fn notification_recipients(&self, id: &AccountId) -> usize {
        self.tables
            .read()
            .ok()
            .and_then(|t| t.notification_recipients.get(id).copied())
            .unwrap_or(0)
    }

    pub fn get(&self, id: &AccountId) -> Option<Profile> {
        self.tables.read().ok()?.profiles.get(id).cloned()
    }

    pub fn contains(&self, id: &AccountId) -> bool {
        self.get(id).is_some()
    }

    pub fn all(&self) -> Vec<Profile> {
        self.tables
            .read()
            .map(|t| t.profiles.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn insert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.journal.push(StoreCall::ProfileInsert {
            id: profile.id.clone(),
        });
        if let Some(err) = lock(&self.insert_failure).clone() {
            return Err(err);
        }

        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        if tables.profiles.contains_key(&profile.id) {
            return Err(StoreError::conflict(format!("profile {} already exists", profile.id)).with_code("23505"));
        }
        if tables.profiles.values().any(|p| p.email == profile.email) {
            return Err(StoreError::conflict("duplicate key value violates unique constraint \"profiles_email_key\"")
                .with_code("23505"));
        }
        tables.profiles.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn get_profile(&self, id: &AccountId) -> Result<Option<Profile>, StoreError> {
        self.journal.push(StoreCall::ProfileGet { id: id.clone() });
        if let Some(err) = lock(&self.get_failure).clone() {
            return Err(err);
        }
        Ok(self.tables.read().map_err(|_| poisoned())?.profiles.get(id).cloned())
    }

    async fn delete_account_cascade(&self, id: &AccountId) -> Result<(), StoreError> {
        self.journal.push(StoreCall::ProfileDeleteCascade { id: id.clone() });
        if let Some(err) = lock(&self.cascade_failure).clone() {
            return Err(err);
        }

        // One write guard covers both tables.
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        tables.notification_recipients.remove(id);
        tables.profiles.remove(id);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Audit sink
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory audit sink.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    entries: Mutex<Vec<AuditLogEntry>>,
    failure: Mutex<Option<StoreError>>,
    journal: CallJournal,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: CallJournal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn fail_appends(&self, err: Option<StoreError>) {
        *lock(&self.failure) = err;
    }

    pub fn entries(&self) -> Vec<AuditLogEntry> {
        lock(&self.entries).clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), StoreError> {
        self.journal.push(StoreCall::AuditAppend);
        if let Some(err) = lock(&self.failure).clone() {
            return Err(err);
        }
        lock(&self.entries).push(entry.clone());
        Ok(())
    }
}

/// Seed an admin into both stores and register its fixed session token.
pub fn seed_dev_admin(
    identity: &InMemoryIdentityStore,
    profiles: &InMemoryProfileStore,
    admin: &DevAdmin,
) -> Result<AccountId, StoreError> {
    let id = identity.seed_account("dev-admin", admin.email.clone())?;
    profiles.seed_profile(Profile {
        id: id.clone(),
        email: admin.email.clone(),
        full_name: "Dev Admin".to_string(),
        role: Role::Admin,
        created_at: Utc::now(),
        last_login: None,
    })?;
    identity.seed_session(&id, admin.session_token.clone())?;
    Ok(id)
}
