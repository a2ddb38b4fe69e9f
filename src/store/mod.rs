//! The record store.
//!
//! Owns the four in-memory collections and keeps them synchronized with the
//! active persistence backend. Mutations apply in memory first, propagate
//! best-effort to the injected [`PersistenceAdapter`], and always write the
//! full collection through to the local fallback as a durability floor; a
//! remote failure is logged and never rolls the local mutation back.
//!
//! Duplicate handling: every insert checks the collection's uniqueness key
//! and reports a skip through [`InsertOutcome`] instead of erroring, so
//! re-importing the same timetable is harmless.

pub mod batch;
pub mod export;

use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;

use crate::availability::AvailabilityIndex;
use crate::db::factory::AdapterFactory;
use crate::db::local::{
    LocalStore, KEY_AVAILABILITY, KEY_SUBJECTS, KEY_SUBSTITUTIONS, KEY_TEACHERS,
};
use crate::db::{BackendKind, IdAssignment, PersistenceAdapter, StoreError, StoreResult};
use crate::models::{
    fresh_id, join_time_range, AvailabilityEntry, BatchInsertReport, Collections, InsertOutcome,
    NewAvailability, NewSubject, NewSubstitution, NewTeacher, Stats, Subject, Substitution,
    SubstitutionPatch, Teacher,
};
use batch::{BatchPacer, BatchPolicy, FixedDelayPacer};

pub use batch::NoopPacer;
pub use export::{ExportBundle, MigrationReport};

/// The substitution tracker's data-access layer.
///
/// Construct with [`Store::open`]; the persistence adapter is injected, and
/// the local fallback store is always kept current regardless of which
/// backend is active.
pub struct Store {
    teachers: Vec<Teacher>,
    subjects: Vec<Subject>,
    substitutions: Vec<Substitution>,
    availability: Vec<AvailabilityEntry>,
    adapter: Arc<dyn PersistenceAdapter>,
    fallback: LocalStore,
    batch: BatchPolicy,
    pacer: Box<dyn BatchPacer>,
}

impl Store {
    /// Open a store against the given adapter and local fallback.
    ///
    /// If the adapter is remote and either the reachability probe or the
    /// initial load fails, the store falls back to the local backend for the
    /// remainder of the session.
    pub async fn open(
        adapter: Arc<dyn PersistenceAdapter>,
        fallback: LocalStore,
        batch: BatchPolicy,
    ) -> StoreResult<Self> {
        let pacer = Box::new(FixedDelayPacer::new(batch.pause));
        Self::open_with_pacer(adapter, fallback, batch, pacer).await
    }

    /// [`Store::open`] with an explicit batch pacer (tests inject
    /// [`NoopPacer`]).
    pub async fn open_with_pacer(
        adapter: Arc<dyn PersistenceAdapter>,
        fallback: LocalStore,
        batch: BatchPolicy,
        pacer: Box<dyn BatchPacer>,
    ) -> StoreResult<Self> {
        let mut store = Self {
            teachers: Vec::new(),
            subjects: Vec::new(),
            substitutions: Vec::new(),
            availability: Vec::new(),
            adapter,
            fallback,
            batch,
            pacer,
        };
        store.init().await?;
        Ok(store)
    }

    /// Open a store configured from the environment.
    pub async fn open_from_env() -> anyhow::Result<Self> {
        let (adapter, fallback) = AdapterFactory::from_env()
            .await
            .context("Failed to create persistence adapter")?;
        Self::open(adapter, fallback, BatchPolicy::default())
            .await
            .context("Failed to initialize store")
    }

    async fn init(&mut self) -> StoreResult<()> {
        if self.remote_active() {
            match self.probe_and_load().await {
                Ok(collections) => {
                    log::info!("using remote backend");
                    self.install(collections);
                    return Ok(());
                }
                Err(err) => {
                    log::error!("remote backend unavailable, falling back to local storage: {err}");
                    self.adapter = AdapterFactory::create_local(self.fallback.clone());
                }
            }
        } else {
            log::info!("using local storage");
        }

        let collections = self.adapter.load_all().await?;
        self.install(collections);
        Ok(())
    }

    async fn probe_and_load(&self) -> StoreResult<Collections> {
        if !self.adapter.health_check().await? {
            return Err(StoreError::connection("backend health probe failed"));
        }
        self.adapter.load_all().await
    }

    fn install(&mut self, collections: Collections) {
        self.teachers = collections.teachers;
        self.subjects = collections.subjects;
        self.substitutions = collections.substitutions;
        self.availability = collections.availability;
    }

    /// Which backend ended up active for this session.
    pub fn backend_kind(&self) -> BackendKind {
        self.adapter.kind()
    }

    fn remote_active(&self) -> bool {
        self.adapter.kind() == BackendKind::Postgres
    }

    // ==================== accessors ====================

    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn substitutions(&self) -> &[Substitution] {
        &self.substitutions
    }

    pub fn availability(&self) -> &[AvailabilityEntry] {
        &self.availability
    }

    /// Snapshot of all four collections.
    pub fn collections(&self) -> Collections {
        Collections {
            teachers: self.teachers.clone(),
            subjects: self.subjects.clone(),
            substitutions: self.substitutions.clone(),
            availability: self.availability.clone(),
        }
    }

    // ==================== durability floor ====================

    fn save_teachers(&self) -> StoreResult<()> {
        self.fallback.save(KEY_TEACHERS, &self.teachers)
    }

    fn save_subjects(&self) -> StoreResult<()> {
        self.fallback.save(KEY_SUBJECTS, &self.subjects)
    }

    fn save_substitutions(&self) -> StoreResult<()> {
        self.fallback.save(KEY_SUBSTITUTIONS, &self.substitutions)
    }

    fn save_availability(&self) -> StoreResult<()> {
        self.fallback.save(KEY_AVAILABILITY, &self.availability)
    }

    pub(crate) fn save_all(&self) -> StoreResult<()> {
        self.save_teachers()?;
        self.save_subjects()?;
        self.save_substitutions()?;
        self.save_availability()
    }

    // ==================== teachers ====================

    /// Add a teacher unless a case-insensitive name match already exists.
    pub async fn add_teacher(&mut self, new: NewTeacher) -> StoreResult<InsertOutcome> {
        if self.teachers.iter().any(|t| t.name_matches(&new.name)) {
            return Ok(InsertOutcome::DuplicateSkipped);
        }

        let mut teacher = Teacher {
            id: fresh_id(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            department: new.department,
        };

        if self.remote_active() {
            match self
                .adapter
                .insert_teachers(std::slice::from_ref(&teacher))
                .await
            {
                Ok(assignments) => {
                    if let Some(assignment) = assignments
                        .into_iter()
                        .find(|a| a.client_ref == teacher.id)
                    {
                        teacher.id = assignment.backend_id;
                    }
                    log::info!("teacher stored in remote backend");
                }
                Err(err) => log::error!("failed to store teacher remotely: {err}"),
            }
        }

        let id = teacher.id.clone();
        self.teachers.push(teacher);
        self.save_teachers()?;
        Ok(InsertOutcome::Inserted { id })
    }

    /// Bulk-add teachers, propagating to the remote backend in batches.
    ///
    /// Candidates are deduplicated against the existing collection; the
    /// whole set lands in memory and the local floor before remote batches
    /// start, and a failed batch never halts the following ones.
    pub async fn add_teachers(&mut self, rows: Vec<NewTeacher>) -> StoreResult<BatchInsertReport> {
        let mut report = BatchInsertReport {
            requested: rows.len(),
            ..Default::default()
        };

        let mut added = Vec::new();
        for row in rows {
            if self.teachers.iter().any(|t| t.name_matches(&row.name)) {
                report.duplicates += 1;
                continue;
            }
            added.push(Teacher {
                id: fresh_id(),
                name: row.name,
                email: row.email,
                phone: row.phone,
                department: row.department,
            });
        }

        if added.is_empty() {
            return Ok(report);
        }

        report.inserted = added.len();
        self.teachers.extend(added.iter().cloned());
        self.save_teachers()?;

        if self.remote_active() {
            report.failed_batches = self.push_teacher_batches(&added).await;
            // Reconciliation may have replaced ids; keep the floor current.
            self.save_teachers()?;
        }

        Ok(report)
    }

    async fn push_teacher_batches(&mut self, added: &[Teacher]) -> usize {
        let total_batches = added.len().div_ceil(self.batch.size);
        log::info!(
            "storing {} teachers in {} batches",
            added.len(),
            total_batches
        );

        let mut failed = 0;
        for (index, chunk) in added.chunks(self.batch.size).enumerate() {
            let result = self.adapter.insert_teachers(chunk).await;
            match result {
                Ok(assignments) => {
                    self.apply_teacher_assignments(assignments);
                    log::info!(
                        "batch {}/{}: {} teachers stored",
                        index + 1,
                        total_batches,
                        chunk.len()
                    );
                }
                Err(err) => {
                    failed += 1;
                    log::error!("teacher batch {}/{} failed: {err}", index + 1, total_batches);
                }
            }

            if (index + 1) * self.batch.size < added.len() {
                self.pacer.rest().await;
            }
        }
        failed
    }

    fn apply_teacher_assignments(&mut self, assignments: Vec<IdAssignment>) {
        for assignment in assignments {
            if let Some(teacher) = self
                .teachers
                .iter_mut()
                .find(|t| t.id == assignment.client_ref)
            {
                teacher.id = assignment.backend_id;
            }
        }
    }

    /// Remove a teacher by id. Returns whether a record was removed.
    pub async fn remove_teacher(&mut self, id: &str) -> StoreResult<bool> {
        if self.remote_active() {
            if let Err(err) = self.adapter.delete_teacher(id).await {
                log::error!("failed to delete teacher remotely: {err}");
            }
        }

        let initial = self.teachers.len();
        self.teachers.retain(|t| t.id != id);

        if self.teachers.len() != initial {
            self.save_teachers()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // ==================== subjects ====================

    /// Add a subject unless its uniqueness key already exists.
    pub async fn add_subject(&mut self, new: NewSubject) -> StoreResult<InsertOutcome> {
        if self.subjects.iter().any(|s| s.matches_key(&new)) {
            return Ok(InsertOutcome::DuplicateSkipped);
        }

        let mut subject = Subject {
            id: fresh_id(),
            teacher: new.teacher,
            day: new.day,
            time: new.time,
            subject: new.subject,
            course_group: new.course_group,
            code: new.code,
            department: new.department,
        };

        if self.remote_active() {
            match self
                .adapter
                .insert_subjects(std::slice::from_ref(&subject), &self.teachers)
                .await
            {
                Ok(assignments) => {
                    if let Some(assignment) = assignments
                        .into_iter()
                        .find(|a| a.client_ref == subject.id)
                    {
                        subject.id = assignment.backend_id;
                    }
                    log::info!("subject stored in remote backend");
                }
                Err(err) => log::error!("failed to store subject remotely: {err}"),
            }
        }

        let id = subject.id.clone();
        self.subjects.push(subject);
        self.save_subjects()?;
        Ok(InsertOutcome::Inserted { id })
    }

    /// Bulk-add subjects, propagating to the remote backend in batches.
    pub async fn add_subjects(&mut self, rows: Vec<NewSubject>) -> StoreResult<BatchInsertReport> {
        let mut report = BatchInsertReport {
            requested: rows.len(),
            ..Default::default()
        };

        let mut added = Vec::new();
        for row in rows {
            if self.subjects.iter().any(|s| s.matches_key(&row)) {
                report.duplicates += 1;
                continue;
            }
            added.push(Subject {
                id: fresh_id(),
                teacher: row.teacher,
                day: row.day,
                time: row.time,
                subject: row.subject,
                course_group: row.course_group,
                code: row.code,
                department: row.department,
            });
        }

        if added.is_empty() {
            return Ok(report);
        }

        report.inserted = added.len();
        self.subjects.extend(added.iter().cloned());
        self.save_subjects()?;

        if self.remote_active() {
            report.failed_batches = self.push_subject_batches(&added).await;
            self.save_subjects()?;
        }

        Ok(report)
    }

    async fn push_subject_batches(&mut self, added: &[Subject]) -> usize {
        let total_batches = added.len().div_ceil(self.batch.size);
        log::info!(
            "storing {} subjects in {} batches of {}",
            added.len(),
            total_batches,
            self.batch.size
        );

        let mut failed = 0;
        for (index, chunk) in added.chunks(self.batch.size).enumerate() {
            let result = self.adapter.insert_subjects(chunk, &self.teachers).await;
            match result {
                Ok(assignments) => {
                    self.apply_subject_assignments(assignments);
                    log::info!(
                        "batch {}/{}: {} subjects stored",
                        index + 1,
                        total_batches,
                        chunk.len()
                    );
                }
                Err(err) => {
                    failed += 1;
                    log::error!("subject batch {}/{} failed: {err}", index + 1, total_batches);
                }
            }

            if (index + 1) * self.batch.size < added.len() {
                self.pacer.rest().await;
            }
        }
        failed
    }

    fn apply_subject_assignments(&mut self, assignments: Vec<IdAssignment>) {
        for assignment in assignments {
            if let Some(subject) = self
                .subjects
                .iter_mut()
                .find(|s| s.id == assignment.client_ref)
            {
                subject.id = assignment.backend_id;
            }
        }
    }

    /// Drop the whole subject collection. Local only; the remote rows are
    /// kept for the next full import to reconcile against.
    pub fn clear_subjects(&mut self) -> StoreResult<()> {
        self.subjects.clear();
        self.save_subjects()
    }

    // ==================== substitutions ====================

    /// Record an absence. Status defaults to
    /// [`Substitution::STATUS_ACTIVE`]; the record is prepended so the most
    /// recent absence lists first.
    pub async fn add_substitution(&mut self, new: NewSubstitution) -> StoreResult<Substitution> {
        let mut substitution = Substitution {
            id: fresh_id(),
            teacher_id: new.teacher_id,
            teacher_name: new.teacher_name,
            date: new.date,
            reason: new.reason,
            status: new
                .status
                .unwrap_or_else(|| Substitution::STATUS_ACTIVE.to_string()),
            substitute: new.substitute,
            schedule: new.schedule,
        };

        if self.remote_active() {
            match self
                .adapter
                .insert_substitution(&substitution, &self.teachers)
                .await
            {
                Ok(Some(assignment)) if assignment.client_ref == substitution.id => {
                    substitution.id = assignment.backend_id;
                    log::info!("substitution stored in remote backend");
                }
                Ok(_) => {}
                Err(err) => log::error!("failed to store substitution remotely: {err}"),
            }
        }

        self.substitutions.insert(0, substitution.clone());
        self.save_substitutions()?;
        Ok(substitution)
    }

    /// Merge a partial update into a substitution. Returns whether the id
    /// matched a record.
    pub async fn update_substitution(
        &mut self,
        id: &str,
        patch: SubstitutionPatch,
    ) -> StoreResult<bool> {
        let Some(index) = self.substitutions.iter().position(|s| s.id == id) else {
            return Ok(false);
        };

        {
            let substitution = &mut self.substitutions[index];
            if let Some(status) = patch.status {
                substitution.status = status;
            }
            if let Some(reason) = patch.reason {
                substitution.reason = reason;
            }
            if let Some(substitute) = patch.substitute {
                substitution.substitute = substitute;
            }
            if let Some(schedule) = patch.schedule {
                substitution.schedule = schedule;
            }
        }

        if self.remote_active() {
            let updated = self.substitutions[index].clone();
            if let Err(err) = self.adapter.update_substitution(&updated).await {
                log::error!("failed to update substitution remotely: {err}");
            }
        }

        self.save_substitutions()?;
        Ok(true)
    }

    /// Remove a substitution by id. Returns whether a record was removed.
    pub async fn remove_substitution(&mut self, id: &str) -> StoreResult<bool> {
        if self.remote_active() {
            if let Err(err) = self.adapter.delete_substitution(id).await {
                log::error!("failed to delete substitution remotely: {err}");
            }
        }

        let initial = self.substitutions.len();
        self.substitutions.retain(|s| s.id != id);

        if self.substitutions.len() != initial {
            self.save_substitutions()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Remove every substitution for one teacher on one date.
    ///
    /// Remote deletes stop at the first failure (logged); the local prune
    /// always runs.
    pub async fn remove_substitutions_for(
        &mut self,
        teacher_id: &str,
        date: NaiveDate,
    ) -> StoreResult<bool> {
        if self.remote_active() {
            let doomed: Vec<String> = self
                .substitutions
                .iter()
                .filter(|s| s.teacher_id == teacher_id && s.date == date)
                .map(|s| s.id.clone())
                .collect();
            let total = doomed.len();

            let mut deleted = 0;
            for id in doomed {
                if let Err(err) = self.adapter.delete_substitution(&id).await {
                    log::error!("failed to delete substitutions remotely: {err}");
                    break;
                }
                deleted += 1;
            }
            if deleted > 0 {
                log::info!("{deleted}/{total} substitutions deleted remotely");
            }
        }

        let initial = self.substitutions.len();
        self.substitutions
            .retain(|s| !(s.teacher_id == teacher_id && s.date == date));

        if self.substitutions.len() != initial {
            self.save_substitutions()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // ==================== availability ====================

    /// Replace the whole availability collection.
    ///
    /// Remotely this clears the table and re-inserts; locally the floor file
    /// is rewritten. Returns the number of entries installed.
    pub async fn set_availability(&mut self, entries: Vec<NewAvailability>) -> StoreResult<usize> {
        self.availability = entries
            .into_iter()
            .map(|entry| AvailabilityEntry {
                id: fresh_id(),
                teacher: entry.teacher,
                day: entry.day,
                start_time: entry.start_time,
                end_time: entry.end_time,
                options: entry.options,
            })
            .collect();

        if self.remote_active() {
            let result = self
                .adapter
                .replace_availability(&self.availability, &self.teachers)
                .await;
            match result {
                Ok(assignments) => {
                    self.apply_availability_assignments(assignments);
                    log::info!(
                        "{} availability entries stored in remote backend",
                        self.availability.len()
                    );
                }
                Err(err) => log::error!("failed to store availability remotely: {err}"),
            }
        }

        self.save_availability()?;
        Ok(self.availability.len())
    }

    /// Add availability entries, skipping uniqueness-key duplicates.
    ///
    /// Duplicates are also suppressed within the incoming batch: a window
    /// listed twice in one import lands once.
    pub async fn add_availability(
        &mut self,
        entries: Vec<NewAvailability>,
    ) -> StoreResult<BatchInsertReport> {
        let mut report = BatchInsertReport {
            requested: entries.len(),
            ..Default::default()
        };

        let mut added = Vec::new();
        for entry in entries {
            if self.availability.iter().any(|e| e.matches_key(&entry)) {
                report.duplicates += 1;
                continue;
            }
            let record = AvailabilityEntry {
                id: fresh_id(),
                teacher: entry.teacher,
                day: entry.day,
                start_time: entry.start_time,
                end_time: entry.end_time,
                options: entry.options,
            };
            self.availability.push(record.clone());
            added.push(record);
        }
        report.inserted = added.len();

        if !added.is_empty() && self.remote_active() {
            let result = self.adapter.insert_availability(&added, &self.teachers).await;
            match result {
                Ok(assignments) => {
                    self.apply_availability_assignments(assignments);
                    log::info!(
                        "{} availability entries stored in remote backend",
                        added.len()
                    );
                }
                Err(err) => {
                    report.failed_batches = 1;
                    log::error!("failed to store availability remotely: {err}");
                }
            }
        }

        self.save_availability()?;
        Ok(report)
    }

    fn apply_availability_assignments(&mut self, assignments: Vec<IdAssignment>) {
        for assignment in assignments {
            if let Some(entry) = self
                .availability
                .iter_mut()
                .find(|e| e.id == assignment.client_ref)
            {
                entry.id = assignment.backend_id;
            }
        }
    }

    /// Drop the whole availability collection. Local only, like
    /// [`Store::clear_subjects`].
    pub fn clear_availability(&mut self) -> StoreResult<()> {
        self.availability.clear();
        self.save_availability()
    }

    // ==================== queries ====================

    /// Teachers free at the given day and instant.
    pub fn available_substitutes(&self, day: &str, time: &str) -> Vec<String> {
        AvailabilityIndex::new(&self.availability).find_at_instant(day, time)
    }

    /// Teachers whose availability overlaps the given day and time range.
    pub fn available_substitutes_for_range(
        &self,
        day: &str,
        start_time: &str,
        end_time: &str,
    ) -> Vec<String> {
        AvailabilityIndex::new(&self.availability).find_overlapping(day, start_time, end_time)
    }

    /// All substitutions for one teacher on one date.
    pub fn substitutions_for(&self, teacher_id: &str, date: NaiveDate) -> Vec<&Substitution> {
        self.substitutions
            .iter()
            .filter(|s| s.teacher_id == teacher_id && s.date == date)
            .collect()
    }

    /// The substitution covering an exact period, if any.
    pub fn find_substitution(
        &self,
        teacher_id: &str,
        date: NaiveDate,
        start_time: &str,
        end_time: &str,
    ) -> Option<&Substitution> {
        let target = join_time_range(start_time, end_time);
        self.substitutions.iter().find(|s| {
            s.teacher_id == teacher_id
                && s.date == date
                && s.schedule.iter().any(|slot| slot.time == target)
        })
    }

    /// Absence counters for one date.
    pub fn stats_for(&self, date: NaiveDate) -> Stats {
        let active = self
            .substitutions
            .iter()
            .filter(|s| s.status == Substitution::STATUS_ACTIVE && s.date == date)
            .count();
        let covered = self
            .substitutions
            .iter()
            .filter(|s| s.status == Substitution::STATUS_COVERED && s.date == date)
            .count();
        Stats {
            active,
            covered,
            total: active + covered,
        }
    }

    /// Absence counters for today (UTC).
    pub fn stats_today(&self) -> Stats {
        self.stats_for(chrono::Utc::now().date_naive())
    }
}
