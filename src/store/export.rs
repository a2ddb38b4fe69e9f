//! Backup export and the one-shot migration helper.
//!
//! The export bundle is the manual backup/restore artifact: all four
//! collections plus a timestamp, written as pretty-printed JSON. The
//! migration helper pushes a local-only dataset into the remote backend,
//! writing a backup first.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Store;
use crate::db::{ErrorContext, StoreError, StoreResult};
use crate::models::{AvailabilityEntry, Subject, Substitution, Teacher};

/// Downloadable backup of the whole dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub teachers: Vec<Teacher>,
    pub subjects: Vec<Subject>,
    pub substitutions: Vec<Substitution>,
    pub substitution_schedule: Vec<AvailabilityEntry>,
    pub export_date: DateTime<Utc>,
}

/// Default backup file name for a given date.
pub fn backup_file_name(date: chrono::NaiveDate) -> String {
    format!("backup-control-sustituciones-{}.json", date.format("%Y-%m-%d"))
}

/// Per-record tally of a migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: usize,
    pub failed: usize,
}

impl Store {
    /// Snapshot the four collections into an export bundle.
    pub fn export_bundle(&self) -> ExportBundle {
        ExportBundle {
            teachers: self.teachers.clone(),
            subjects: self.subjects.clone(),
            substitutions: self.substitutions.clone(),
            substitution_schedule: self.availability.clone(),
            export_date: Utc::now(),
        }
    }

    /// Write the export bundle to an exact path.
    pub fn export_to_file(&self, path: &Path) -> StoreResult<()> {
        let bundle = self.export_bundle();
        let encoded = serde_json::to_vec_pretty(&bundle)?;
        fs::write(path, encoded).map_err(|err| {
            StoreError::io_with_context(
                err.to_string(),
                ErrorContext::new("export_to_file").with_details(path.display().to_string()),
            )
        })?;
        log::info!("backup exported to {}", path.display());
        Ok(())
    }

    /// Write a date-stamped backup file into `dir`, creating it if needed.
    /// Returns the path written.
    pub fn write_backup(&self, dir: &Path) -> StoreResult<PathBuf> {
        fs::create_dir_all(dir).map_err(|err| {
            StoreError::io_with_context(
                err.to_string(),
                ErrorContext::new("write_backup").with_details(dir.display().to_string()),
            )
        })?;
        let path = dir.join(backup_file_name(Utc::now().date_naive()));
        self.export_to_file(&path)?;
        Ok(path)
    }

    /// One-shot migration of the in-memory dataset into the remote backend.
    ///
    /// Requires the remote backend to be active and reachable. A backup is
    /// written into `backup_dir` before anything is pushed. Records are
    /// migrated one at a time, teachers first so the later collections can
    /// resolve teacher foreign keys; a failing record is tallied and
    /// skipped, never fatal. Confirmation prompts are the caller's concern.
    pub async fn migrate_to_remote(&mut self, backup_dir: &Path) -> StoreResult<MigrationReport> {
        if !self.remote_active() {
            return Err(StoreError::configuration(
                "remote backend is not active; nothing to migrate to",
            ));
        }

        log::info!("verifying remote backend connection");
        if !self.adapter.health_check().await? {
            return Err(StoreError::connection("backend health probe failed"));
        }

        let backup_path = self.write_backup(backup_dir)?;
        log::info!("pre-migration backup written to {}", backup_path.display());

        let total = self.teachers.len()
            + self.subjects.len()
            + self.availability.len()
            + self.substitutions.len();
        if total == 0 {
            log::warn!("no data to migrate");
            return Ok(MigrationReport::default());
        }
        log::info!(
            "migrating {} records ({} teachers, {} subjects, {} availability, {} substitutions)",
            total,
            self.teachers.len(),
            self.subjects.len(),
            self.availability.len(),
            self.substitutions.len()
        );

        let mut report = MigrationReport::default();

        // Teachers first; their backend ids resolve the foreign keys below.
        for index in 0..self.teachers.len() {
            let teacher = self.teachers[index].clone();
            let result = self
                .adapter
                .insert_teachers(std::slice::from_ref(&teacher))
                .await;
            match result {
                Ok(assignments) => {
                    self.apply_teacher_assignments(assignments);
                    report.migrated += 1;
                }
                Err(err) => {
                    log::error!("failed to migrate teacher {}: {err}", teacher.name);
                    report.failed += 1;
                }
            }
        }

        let roster = self.teachers.clone();

        for index in 0..self.subjects.len() {
            let subject = self.subjects[index].clone();
            let result = self
                .adapter
                .insert_subjects(std::slice::from_ref(&subject), &roster)
                .await;
            match result {
                Ok(assignments) => {
                    self.apply_subject_assignments(assignments);
                    report.migrated += 1;
                }
                Err(err) => {
                    log::error!("failed to migrate subject {}: {err}", subject.subject);
                    report.failed += 1;
                }
            }
        }

        for index in 0..self.availability.len() {
            let entry = self.availability[index].clone();
            let result = self
                .adapter
                .insert_availability(std::slice::from_ref(&entry), &roster)
                .await;
            match result {
                Ok(assignments) => {
                    self.apply_availability_assignments(assignments);
                    report.migrated += 1;
                }
                Err(err) => {
                    log::error!(
                        "failed to migrate availability for {}: {err}",
                        entry.teacher
                    );
                    report.failed += 1;
                }
            }
        }

        for index in 0..self.substitutions.len() {
            let substitution = self.substitutions[index].clone();
            let result = self
                .adapter
                .insert_substitution(&substitution, &roster)
                .await;
            match result {
                Ok(Some(assignment)) => {
                    if let Some(record) = self
                        .substitutions
                        .iter_mut()
                        .find(|s| s.id == assignment.client_ref)
                    {
                        record.id = assignment.backend_id;
                    }
                    report.migrated += 1;
                }
                Ok(None) => report.migrated += 1,
                Err(err) => {
                    log::error!(
                        "failed to migrate substitution for {}: {err}",
                        substitution.teacher_name
                    );
                    report.failed += 1;
                }
            }
        }

        // Ids were reconciled; bring the floor up to date.
        self.save_all()?;

        // Verification read so the tally can be checked against the backend.
        let verified = self.adapter.load_all().await;
        match verified {
            Ok(remote) => log::info!(
                "remote backend now holds {} teachers, {} subjects, {} substitutions, {} availability entries",
                remote.teachers.len(),
                remote.subjects.len(),
                remote.substitutions.len(),
                remote.availability.len()
            ),
            Err(err) => log::error!("post-migration verification read failed: {err}"),
        }

        log::info!(
            "migration finished: {} migrated, {} failed",
            report.migrated,
            report.failed
        );
        Ok(report)
    }
}
