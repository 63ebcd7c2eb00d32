//! Permission guard - owns the authorized actor set

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;

use crate::application::errors::{AuthorizationError, ConfigError};
use crate::domain::entities::ActorId;
use crate::domain::traits::AdminPersistence;

/// What a grant or revoke did to the in-memory set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardChange {
    Added,
    Removed,
    Unchanged,
}

/// Result of a mutation. The in-memory change stands even when persisting failed.
#[derive(Debug)]
pub struct MutationReport {
    pub change: GuardChange,
    pub persisted: Result<(), ConfigError>,
}

/// Stateless predicate over a mutable authorized actor set
pub struct PermissionGuard {
    actors: RwLock<BTreeSet<ActorId>>,
    persistence: Arc<dyn AdminPersistence>,
    // Serializes writes so the last persisted list is always the latest one
    persist_lock: Mutex<()>,
}

impl PermissionGuard {
    pub fn new(initial: impl IntoIterator<Item = ActorId>, persistence: Arc<dyn AdminPersistence>) -> Self {
        Self {
            actors: RwLock::new(initial.into_iter().collect()),
            persistence,
            persist_lock: Mutex::new(()),
        }
    }

    pub fn is_authorized(&self, actor: ActorId) -> bool {
        self.actors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&actor)
    }

    pub fn check(&self, actor: ActorId) -> Result<(), AuthorizationError> {
        if self.is_authorized(actor) {
            Ok(())
        } else {
            Err(AuthorizationError { actor })
        }
    }

    /// Current members in ascending order
    pub fn actors(&self) -> Vec<ActorId> {
        self.actors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    /// Add an actor. No-op if already present.
    pub async fn grant(&self, actor: ActorId) -> MutationReport {
        let inserted = self
            .actors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(actor);

        if !inserted {
            return MutationReport {
                change: GuardChange::Unchanged,
                persisted: Ok(()),
            };
        }

        tracing::info!("Granted access to actor {}", actor);
        MutationReport {
            change: GuardChange::Added,
            persisted: self.persist().await,
        }
    }

    /// Remove an actor. No-op if absent.
    pub async fn revoke(&self, actor: ActorId) -> MutationReport {
        let removed = self
            .actors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&actor);

        if !removed {
            return MutationReport {
                change: GuardChange::Unchanged,
                persisted: Ok(()),
            };
        }

        tracing::info!("Revoked access from actor {}", actor);
        MutationReport {
            change: GuardChange::Removed,
            persisted: self.persist().await,
        }
    }

    async fn persist(&self) -> Result<(), ConfigError> {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.actors();
        let result = self.persistence.persist(&snapshot).await;
        if let Err(e) = &result {
            tracing::warn!("Failed to persist admin list: {}", e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FailingPersistence;

    #[async_trait]
    impl AdminPersistence for FailingPersistence {
        async fn persist(&self, _admins: &[ActorId]) -> Result<(), ConfigError> {
            Err(ConfigError::Write("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn persistence_failure_keeps_in_memory_change() {
        let guard = PermissionGuard::new([100], Arc::new(FailingPersistence));

        let report = guard.grant(101).await;

        assert_eq!(report.change, GuardChange::Added);
        assert!(report.persisted.is_err());
        assert!(guard.is_authorized(101));
    }

    #[tokio::test]
    async fn repeated_grant_is_unchanged() {
        let guard = PermissionGuard::new([100], Arc::new(FailingPersistence));

        let report = guard.grant(100).await;

        assert_eq!(report.change, GuardChange::Unchanged);
        assert!(report.persisted.is_ok());
    }

    #[tokio::test]
    async fn revoke_of_absent_actor_is_unchanged() {
        let guard = PermissionGuard::new([100], Arc::new(FailingPersistence));

        let report = guard.revoke(7).await;

        assert_eq!(report.change, GuardChange::Unchanged);
        assert_eq!(guard.actors(), vec![100]);
        assert_eq!(guard.check(7), Err(AuthorizationError { actor: 7 }));
    }
}
