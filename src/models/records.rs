//! Domain records for the four collections.
//!
//! Field names serialize in camelCase so the local fallback files and the
//! export bundle keep the shape the frontend already understands. The remote
//! backend's snake_case rows are a separate mapping owned by the Postgres
//! adapter.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Generate a fresh client-side record identity.
///
/// Identities are opaque strings: a UUID until the record has been
/// reconciled against the remote backend, the backend's serial id after.
pub fn fresh_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A staff member who can be absent or can cover for someone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub department: String,
}

impl Teacher {
    /// Case-insensitive name identity, the collection's uniqueness key.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// Input for creating a teacher; the store assigns the identity.
#[derive(Debug, Clone, Default)]
pub struct NewTeacher {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub department: String,
}

/// One recurring class session on the weekly timetable.
///
/// `teacher` is the denormalized teacher name, not a foreign key; `time` is
/// the combined `"HH:MM - HH:MM"` range string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    #[serde(default)]
    pub teacher: String,
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub course_group: String,
    /// Classroom code.
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub department: String,
}

impl Subject {
    /// Uniqueness key match: subject/teacher case-insensitive, the rest
    /// compared exactly.
    pub fn matches_key(&self, candidate: &NewSubject) -> bool {
        self.subject.to_lowercase() == candidate.subject.to_lowercase()
            && self.teacher.to_lowercase() == candidate.teacher.to_lowercase()
            && self.day == candidate.day
            && self.time == candidate.time
            && self.course_group == candidate.course_group
    }
}

/// Input for creating a subject.
#[derive(Debug, Clone, Default)]
pub struct NewSubject {
    pub teacher: String,
    pub day: String,
    pub time: String,
    pub subject: String,
    pub course_group: String,
    pub code: String,
    pub department: String,
}

/// A recurring weekly window during which a teacher can cover classes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityEntry {
    pub id: String,
    #[serde(default)]
    pub teacher: String,
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub options: String,
}

impl AvailabilityEntry {
    /// Uniqueness key match: teacher case-insensitive, day and both times
    /// compared exactly.
    pub fn matches_key(&self, candidate: &NewAvailability) -> bool {
        self.teacher.to_lowercase() == candidate.teacher.to_lowercase()
            && self.day == candidate.day
            && self.start_time == candidate.start_time
            && self.end_time == candidate.end_time
    }
}

/// Input for creating an availability entry.
#[derive(Debug, Clone, Default)]
pub struct NewAvailability {
    pub teacher: String,
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    pub options: String,
}

/// One covered class period within a substitution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    /// Combined `"HH:MM - HH:MM"` range string.
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub course_group: String,
    #[serde(default)]
    pub substitute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitute_id: Option<String>,
    #[serde(default)]
    pub exceptional_substitute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exceptional_substitute_id: Option<String>,
}

impl ScheduleSlot {
    /// A slot counts as covered exactly when a substitute name is present.
    pub fn is_covered(&self) -> bool {
        self.substitute.as_deref().is_some_and(|name| !name.is_empty())
    }
}

/// An absence record for one teacher on one calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Substitution {
    pub id: String,
    #[serde(default)]
    pub teacher_id: String,
    #[serde(default)]
    pub teacher_name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub substitute: Option<String>,
    #[serde(default)]
    pub schedule: Vec<ScheduleSlot>,
}

impl Substitution {
    /// Initial status of a freshly created absence.
    pub const STATUS_ACTIVE: &'static str = "active";
    /// Status once every period has a substitute.
    pub const STATUS_COVERED: &'static str = "covered";
}

/// Input for creating a substitution. Status defaults to
/// [`Substitution::STATUS_ACTIVE`] when not provided.
#[derive(Debug, Clone, Default)]
pub struct NewSubstitution {
    pub teacher_id: String,
    pub teacher_name: String,
    pub date: NaiveDate,
    pub reason: String,
    pub status: Option<String>,
    pub substitute: Option<String>,
    pub schedule: Vec<ScheduleSlot>,
}

/// Partial-field update for a substitution. `None` fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionPatch {
    pub status: Option<String>,
    pub reason: Option<String>,
    /// `Some(None)` clears the substitute, `Some(Some(..))` sets it.
    pub substitute: Option<Option<String>>,
    pub schedule: Option<Vec<ScheduleSlot>>,
}

/// Snapshot of all four collections, as loaded from a backend.
#[derive(Debug, Clone, Default)]
pub struct Collections {
    pub teachers: Vec<Teacher>,
    pub subjects: Vec<Subject>,
    pub substitutions: Vec<Substitution>,
    pub availability: Vec<AvailabilityEntry>,
}

/// Result of a single insert: either a new identity or a silent skip on a
/// uniqueness-key match. Hard failures travel through `StoreResult` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted { id: String },
    DuplicateSkipped,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted { .. })
    }
}

/// Tally of a bulk insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchInsertReport {
    pub requested: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// Remote batches that failed to propagate (the local inserts stand).
    pub failed_batches: usize,
}

/// Absence counters for one calendar date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub active: usize,
    pub covered: usize,
    pub total: usize,
}
