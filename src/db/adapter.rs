//! Persistence adapter trait.
//!
//! The record store is built against this interface and receives a concrete
//! adapter at construction time. Exactly one backend is active per session;
//! the store only ever inspects [`PersistenceAdapter::kind`] to decide
//! whether its own local write-through is the sole persistence path.

use std::str::FromStr;

use async_trait::async_trait;

use super::error::StoreResult;
use crate::models::{AvailabilityEntry, Collections, Substitution, Subject, Teacher};

/// Which backend an adapter talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Remote relational backend (Postgres).
    Postgres,
    /// Local JSON key-value fallback.
    Local,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "pg" | "remote" => Ok(Self::Postgres),
            "local" => Ok(Self::Local),
            _ => Err(format!("Unknown backend kind: {}", s)),
        }
    }
}

/// Identity handed back by a backend insert, keyed by the client-generated
/// correlation ref that was sent with the row.
///
/// Inserted rows are matched back to in-memory records through this ref,
/// never by field equality; duplicate names within one batch stay
/// unambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAssignment {
    /// The record's client-side id at the time of the insert.
    pub client_ref: String,
    /// The identity the backend assigned.
    pub backend_id: String,
}

/// Backend operations for the four record collections.
///
/// Implementations must be `Send + Sync`. Mutation methods are best-effort
/// from the store's point of view: the store has already applied the change
/// in memory and will persist it to the local fallback regardless of what
/// the adapter reports.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Which backend this adapter talks to.
    fn kind(&self) -> BackendKind;

    /// Lightweight reachability probe, run once at store initialization.
    async fn health_check(&self) -> StoreResult<bool>;

    /// Load all four collections.
    async fn load_all(&self) -> StoreResult<Collections>;

    /// Insert teachers; returns one assignment per row the backend stored.
    async fn insert_teachers(&self, added: &[Teacher]) -> StoreResult<Vec<IdAssignment>>;

    /// Delete a teacher by id.
    async fn delete_teacher(&self, id: &str) -> StoreResult<()>;

    /// Insert subjects. `roster` is the in-memory teacher collection, used
    /// to resolve denormalized teacher names to backend foreign keys.
    async fn insert_subjects(
        &self,
        added: &[Subject],
        roster: &[Teacher],
    ) -> StoreResult<Vec<IdAssignment>>;

    /// Insert a substitution together with its schedule slots.
    async fn insert_substitution(
        &self,
        substitution: &Substitution,
        roster: &[Teacher],
    ) -> StoreResult<Option<IdAssignment>>;

    /// Push the mutable fields (status, reason) of an updated substitution.
    async fn update_substitution(&self, substitution: &Substitution) -> StoreResult<()>;

    /// Delete a substitution by id.
    async fn delete_substitution(&self, id: &str) -> StoreResult<()>;

    /// Insert availability entries.
    async fn insert_availability(
        &self,
        added: &[AvailabilityEntry],
        roster: &[Teacher],
    ) -> StoreResult<Vec<IdAssignment>>;

    /// Replace the whole availability collection (clear, then insert).
    async fn replace_availability(
        &self,
        entries: &[AvailabilityEntry],
        roster: &[Teacher],
    ) -> StoreResult<Vec<IdAssignment>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!(BackendKind::from_str("local").unwrap(), BackendKind::Local);
        assert_eq!(
            BackendKind::from_str("postgres").unwrap(),
            BackendKind::Postgres
        );
        assert_eq!(BackendKind::from_str("Pg").unwrap(), BackendKind::Postgres);
        assert_eq!(
            BackendKind::from_str("remote").unwrap(),
            BackendKind::Postgres
        );
        assert!(BackendKind::from_str("mongo").is_err());
    }
}
