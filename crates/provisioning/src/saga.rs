//! Saga journal for cross-store provisioning.
//!
//! The identity store and the profile store share no transaction. Each
//! protocol records its completed steps here in order; every step names the
//! compensating action that undoes it, or declares itself irreversible. On
//! failure the provisioner walks the journal backwards.
//!
//! The journal performs no IO, so the compensation plan can be tested
//! without any store.

use serde::{Deserialize, Serialize};

use lexportal_core::AccountId;

/// A step that has completed against one of the stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum CompletedStep {
    /// Identity record created (create protocol, step 2).
    IdentityCreated { account_id: AccountId },
    /// Profile row inserted (create protocol, step 3).
    ProfileInserted { account_id: AccountId },
    /// Profile row and its dependents removed (delete protocol, step 2).
    ProfileRemoved { account_id: AccountId },
    /// Identity record deleted (delete protocol, step 3).
    IdentityDeleted { account_id: AccountId },
}

/// Action that undoes a completed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Compensation {
    /// Delete the identity record; an already-absent record counts as done.
    DeleteIdentity { account_id: AccountId },
}

impl CompletedStep {
    pub fn name(&self) -> &'static str {
        match self {
            CompletedStep::IdentityCreated { .. } => "identity_created",
            CompletedStep::ProfileInserted { .. } => "profile_inserted",
            CompletedStep::ProfileRemoved { .. } => "profile_removed",
            CompletedStep::IdentityDeleted { .. } => "identity_deleted",
        }
    }

    /// Compensation for this step, if it has one.
    ///
    /// `ProfileInserted` is always the last create step, so nothing can fail
    /// after it. Removals cannot be undone: the cascade dropped dependent rows
    /// and the identity password is gone.
    pub fn compensation(&self) -> Option<Compensation> {
        match self {
            CompletedStep::IdentityCreated { account_id } => Some(Compensation::DeleteIdentity {
                account_id: account_id.clone(),
            }),
            CompletedStep::ProfileInserted { .. }
            | CompletedStep::ProfileRemoved { .. }
            | CompletedStep::IdentityDeleted { .. } => None,
        }
    }

    pub fn is_irreversible(&self) -> bool {
        matches!(
            self,
            CompletedStep::ProfileRemoved { .. } | CompletedStep::IdentityDeleted { .. }
        )
    }
}

/// Ordered record of the steps completed so far in one protocol run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SagaJournal {
    saga: &'static str,
    completed: Vec<CompletedStep>,
}

impl SagaJournal {
    pub fn new(saga: &'static str) -> Self {
        Self {
            saga,
            completed: Vec::new(),
        }
    }

    pub fn saga(&self) -> &'static str {
        self.saga
    }

    pub fn record(&mut self, step: CompletedStep) {
        tracing::debug!(saga = self.saga, step = step.name(), "saga step completed");
        self.completed.push(step);
    }

    pub fn completed(&self) -> &[CompletedStep] {
        &self.completed
    }

    /// Compensations to run, most recent step first.
    pub fn compensations(&self) -> Vec<Compensation> {
        self.completed
            .iter()
            .rev()
            .filter_map(CompletedStep::compensation)
            .collect()
    }

    /// True once a step that cannot be undone has completed.
    pub fn has_irreversible_step(&self) -> bool {
        self.completed.iter().any(CompletedStep::is_irreversible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> AccountId {
        AccountId::new(s)
    }

    #[test]
    fn empty_journal_needs_no_compensation() {
        let journal = SagaJournal::new("create_account");
        assert!(journal.compensations().is_empty());
        assert!(!journal.has_irreversible_step());
    }

    #[test]
    fn identity_creation_is_compensated_by_identity_delete() {
        let mut journal = SagaJournal::new("create_account");
        journal.record(CompletedStep::IdentityCreated { account_id: id("U1") });

        assert_eq!(
            journal.compensations(),
            vec![Compensation::DeleteIdentity { account_id: id("U1") }]
        );
    }

    #[test]
    fn completed_create_still_lists_identity_compensation_only() {
        let mut journal = SagaJournal::new("create_account");
        journal.record(CompletedStep::IdentityCreated { account_id: id("U1") });
        journal.record(CompletedStep::ProfileInserted { account_id: id("U1") });

        assert_eq!(journal.completed().len(), 2);
        assert_eq!(journal.compensations().len(), 1);
    }

    #[test]
    fn profile_removal_is_irreversible() {
        let mut journal = SagaJournal::new("delete_account");
        journal.record(CompletedStep::ProfileRemoved { account_id: id("U2") });

        assert!(journal.has_irreversible_step());
        assert!(journal.compensations().is_empty());
    }

    #[test]
    fn steps_serialize_with_tag() {
        let step = CompletedStep::IdentityCreated { account_id: id("U1") };
        assert_eq!(
            serde_json::to_value(&step).unwrap(),
            serde_json::json!({"step": "identity_created", "account_id": "U1"})
        );
    }
}
