//! Local JSON key-value fallback storage.
//!
//! One file per collection key under a data directory, each holding the full
//! JSON-encoded collection. Writes replace the whole value; there is no
//! partial or append persistence. This is the durability floor: it is kept
//! current on every mutation even while the remote backend is primary.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::adapter::{BackendKind, IdAssignment, PersistenceAdapter};
use super::error::{ErrorContext, StoreError, StoreResult};
use crate::models::{AvailabilityEntry, Collections, Substitution, Subject, Teacher};

/// Collection key for teachers.
pub const KEY_TEACHERS: &str = "teachers";
/// Collection key for subjects.
pub const KEY_SUBJECTS: &str = "subjects";
/// Collection key for substitutions.
pub const KEY_SUBSTITUTIONS: &str = "substitutions";
/// Collection key for availability entries.
pub const KEY_AVAILABILITY: &str = "substitutionSchedule";

/// File-backed key-value store, one `<key>.json` per collection.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the collection files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Load a collection. `Ok(None)` when the key was never saved.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<Vec<T>>> {
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StoreError::io_with_context(
                    err.to_string(),
                    ErrorContext::new("load").with_entity(key),
                ))
            }
        };

        let rows = serde_json::from_str(&raw).map_err(|err| {
            StoreError::internal_with_context(
                format!("Corrupt collection file: {}", err),
                ErrorContext::new("load")
                    .with_entity(key)
                    .with_details(path.display().to_string()),
            )
        })?;
        Ok(Some(rows))
    }

    /// Replace a collection with the given rows.
    pub fn save<T: Serialize>(&self, key: &str, rows: &[T]) -> StoreResult<()> {
        fs::create_dir_all(&self.root).map_err(|err| {
            StoreError::io_with_context(
                err.to_string(),
                ErrorContext::new("save").with_details(self.root.display().to_string()),
            )
        })?;

        let encoded = serde_json::to_vec(rows)?;
        fs::write(self.path_for(key), encoded).map_err(|err| {
            StoreError::io_with_context(err.to_string(), ErrorContext::new("save").with_entity(key))
        })
    }
}

/// Adapter over [`LocalStore`] for local-only sessions.
///
/// Loads come from the collection files. Mutation hooks are no-ops: with the
/// local backend active, the store's unconditional write-through *is* the
/// persistence path, so per-operation propagation would write the same files
/// twice.
#[derive(Debug, Clone)]
pub struct LocalAdapter {
    store: LocalStore,
}

impl LocalAdapter {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// The underlying key-value store.
    pub fn store(&self) -> &LocalStore {
        &self.store
    }
}

#[async_trait]
impl PersistenceAdapter for LocalAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }

    async fn load_all(&self) -> StoreResult<Collections> {
        Ok(Collections {
            teachers: self.store.load(KEY_TEACHERS)?.unwrap_or_default(),
            subjects: self.store.load(KEY_SUBJECTS)?.unwrap_or_default(),
            substitutions: self.store.load(KEY_SUBSTITUTIONS)?.unwrap_or_default(),
            availability: self.store.load(KEY_AVAILABILITY)?.unwrap_or_default(),
        })
    }

    async fn insert_teachers(&self, _added: &[Teacher]) -> StoreResult<Vec<IdAssignment>> {
        Ok(Vec::new())
    }

    async fn delete_teacher(&self, _id: &str) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_subjects(
        &self,
        _added: &[Subject],
        _roster: &[Teacher],
    ) -> StoreResult<Vec<IdAssignment>> {
        Ok(Vec::new())
    }

    async fn insert_substitution(
        &self,
        _substitution: &Substitution,
        _roster: &[Teacher],
    ) -> StoreResult<Option<IdAssignment>> {
        Ok(None)
    }

    async fn update_substitution(&self, _substitution: &Substitution) -> StoreResult<()> {
        Ok(())
    }

    async fn delete_substitution(&self, _id: &str) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_availability(
        &self,
        _added: &[AvailabilityEntry],
        _roster: &[Teacher],
    ) -> StoreResult<Vec<IdAssignment>> {
        Ok(Vec::new())
    }

    async fn replace_availability(
        &self,
        _entries: &[AvailabilityEntry],
        _roster: &[Teacher],
    ) -> StoreResult<Vec<IdAssignment>> {
        Ok(Vec::new())
    }
}
