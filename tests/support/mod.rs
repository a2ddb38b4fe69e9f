#![allow(dead_code)] // Each test binary uses the subset of helpers it needs.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sustituciones_rust::db::{
    BackendKind, IdAssignment, PersistenceAdapter, StoreError, StoreResult,
};
use sustituciones_rust::models::{
    AvailabilityEntry, Collections, Subject, Substitution, Teacher,
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` with environment variables temporarily set or removed.
///
/// Serializes access to the process-global environment so parallel tests do
/// not race, and restores the previous values afterwards (also on panic,
/// via the guard's `Drop`).
pub fn with_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK poisoned");

    struct Restore(Vec<(String, Option<String>)>);
    impl Drop for Restore {
        fn drop(&mut self) {
            // Reverse order, so duplicate keys restore the oldest snapshot.
            for (key, value) in self.0.drain(..).rev() {
                match value {
                    Some(v) => std::env::set_var(&key, v),
                    None => std::env::remove_var(&key),
                }
            }
        }
    }

    let mut saved = Vec::with_capacity(changes.len());
    for (key, value) in changes {
        saved.push((key.to_string(), std::env::var(key).ok()));
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
    let _restore = Restore(saved);

    f()
}

/// Unique scratch directory for one test.
pub fn temp_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "sustituciones-test-{}-{}",
        tag,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

/// In-memory stand-in for the remote backend.
///
/// Assigns sequential serial ids the way the real backend does and hands
/// them back keyed by each row's client ref. Failure injection: flip
/// `set_healthy(false)` to fail the reachability probe, `set_rejecting(true)`
/// to fail every mutation, or `fail_teacher_call(n)` to fail only the n-th
/// teacher insert (zero-based) so batch tolerance can be observed.
#[derive(Default)]
pub struct FakeRemote {
    healthy: AtomicBool,
    rejecting: AtomicBool,
    next_id: AtomicI64,
    teacher_calls: AtomicUsize,
    subject_calls: AtomicUsize,
    failing_teacher_calls: Mutex<HashSet<usize>>,
    data: Mutex<Collections>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    pub fn fail_teacher_call(&self, call: usize) {
        self.failing_teacher_calls
            .lock()
            .unwrap()
            .insert(call);
    }

    pub fn teacher_calls(&self) -> usize {
        self.teacher_calls.load(Ordering::SeqCst)
    }

    pub fn subject_calls(&self) -> usize {
        self.subject_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of what the backend currently holds.
    pub fn data(&self) -> Collections {
        self.data.lock().unwrap().clone()
    }

    pub fn seed(&self, collections: Collections) {
        *self.data.lock().unwrap() = collections;
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn check_accepting(&self, operation: &str) -> StoreResult<()> {
        if self.rejecting.load(Ordering::SeqCst) {
            Err(StoreError::query(format!("injected failure in {operation}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PersistenceAdapter for FakeRemote {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(self.healthy.load(Ordering::SeqCst))
    }

    async fn load_all(&self) -> StoreResult<Collections> {
        Ok(self.data())
    }

    async fn insert_teachers(&self, added: &[Teacher]) -> StoreResult<Vec<IdAssignment>> {
        let call = self.teacher_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_teacher_calls.lock().unwrap().contains(&call) {
            return Err(StoreError::query(format!(
                "injected failure in teacher call {call}"
            )));
        }
        self.check_accepting("insert_teachers")?;

        let mut data = self.data.lock().unwrap();
        let mut assignments = Vec::with_capacity(added.len());
        for teacher in added {
            let backend_id = self.allocate_id().to_string();
            assignments.push(IdAssignment {
                client_ref: teacher.id.clone(),
                backend_id: backend_id.clone(),
            });
            data.teachers.push(Teacher {
                id: backend_id,
                ..teacher.clone()
            });
        }
        Ok(assignments)
    }

    async fn delete_teacher(&self, id: &str) -> StoreResult<()> {
        self.check_accepting("delete_teacher")?;
        self.data.lock().unwrap().teachers.retain(|t| t.id != id);
        Ok(())
    }

    async fn insert_subjects(
        &self,
        added: &[Subject],
        _roster: &[Teacher],
    ) -> StoreResult<Vec<IdAssignment>> {
        self.subject_calls.fetch_add(1, Ordering::SeqCst);
        self.check_accepting("insert_subjects")?;

        let mut data = self.data.lock().unwrap();
        let mut assignments = Vec::with_capacity(added.len());
        for subject in added {
            let backend_id = self.allocate_id().to_string();
            assignments.push(IdAssignment {
                client_ref: subject.id.clone(),
                backend_id: backend_id.clone(),
            });
            data.subjects.push(Subject {
                id: backend_id,
                ..subject.clone()
            });
        }
        Ok(assignments)
    }

    async fn insert_substitution(
        &self,
        substitution: &Substitution,
        _roster: &[Teacher],
    ) -> StoreResult<Option<IdAssignment>> {
        self.check_accepting("insert_substitution")?;

        let backend_id = self.allocate_id().to_string();
        let assignment = IdAssignment {
            client_ref: substitution.id.clone(),
            backend_id: backend_id.clone(),
        };
        self.data.lock().unwrap().substitutions.push(Substitution {
            id: backend_id,
            ..substitution.clone()
        });
        Ok(Some(assignment))
    }

    async fn update_substitution(&self, substitution: &Substitution) -> StoreResult<()> {
        self.check_accepting("update_substitution")?;

        let mut data = self.data.lock().unwrap();
        if let Some(stored) = data
            .substitutions
            .iter_mut()
            .find(|s| s.id == substitution.id)
        {
            stored.status = substitution.status.clone();
            stored.reason = substitution.reason.clone();
        }
        Ok(())
    }

    async fn delete_substitution(&self, id: &str) -> StoreResult<()> {
        self.check_accepting("delete_substitution")?;
        self.data
            .lock()
            .unwrap()
            .substitutions
            .retain(|s| s.id != id);
        Ok(())
    }

    async fn insert_availability(
        &self,
        added: &[AvailabilityEntry],
        _roster: &[Teacher],
    ) -> StoreResult<Vec<IdAssignment>> {
        self.check_accepting("insert_availability")?;

        let mut data = self.data.lock().unwrap();
        let mut assignments = Vec::with_capacity(added.len());
        for entry in added {
            let backend_id = self.allocate_id().to_string();
            assignments.push(IdAssignment {
                client_ref: entry.id.clone(),
                backend_id: backend_id.clone(),
            });
            data.availability.push(AvailabilityEntry {
                id: backend_id,
                ..entry.clone()
            });
        }
        Ok(assignments)
    }

    async fn replace_availability(
        &self,
        entries: &[AvailabilityEntry],
        roster: &[Teacher],
    ) -> StoreResult<Vec<IdAssignment>> {
        self.check_accepting("replace_availability")?;
        self.data.lock().unwrap().availability.clear();
        self.insert_availability(entries, roster).await
    }
}
