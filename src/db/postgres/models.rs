//! Row structs and the snake_case ↔ domain mapping.
//!
//! The backend stores split `time_start`/`time_end` columns where the
//! in-memory records carry a combined `"HH:MM - HH:MM"` string, and serial
//! ids where the in-memory records carry opaque strings. Every read and
//! write goes through the conversions in this module.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::{
    subjects, substitution_availability, substitution_schedules, substitutions, teachers,
};
use crate::models::{
    join_time_range, split_time_range, AvailabilityEntry, ScheduleSlot, Subject, Substitution,
    Teacher,
};

/// Fallback for a missing half of a time range, matching the column default.
const EMPTY_TIME: &str = "00:00:00";

fn time_or_default(raw: &str) -> String {
    if raw.is_empty() {
        EMPTY_TIME.to_string()
    } else {
        raw.to_string()
    }
}

fn optional_name(raw: String) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}

/// Resolve a denormalized teacher name to its backend id, when the roster
/// record has already been reconciled to a serial id.
pub fn resolve_teacher_id(roster: &[Teacher], name: &str) -> Option<i64> {
    roster
        .iter()
        .find(|t| t.name_matches(name))
        .and_then(|t| t.id.parse::<i64>().ok())
}

fn parse_backend_id(id: &str) -> Option<i64> {
    id.parse::<i64>().ok()
}

// ==================== teachers ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = teachers)]
#[allow(dead_code)] // Some fields used only for database operations
pub struct TeacherRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub department: String,
    pub client_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = teachers)]
pub struct NewTeacherRow {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub department: String,
    pub client_ref: Option<String>,
}

impl From<TeacherRow> for Teacher {
    fn from(row: TeacherRow) -> Self {
        Teacher {
            id: row.id.to_string(),
            name: row.name,
            email: row.email,
            phone: row.phone,
            department: row.department,
        }
    }
}

pub fn new_teacher_row(teacher: &Teacher) -> NewTeacherRow {
    NewTeacherRow {
        name: teacher.name.clone(),
        email: teacher.email.clone(),
        phone: teacher.phone.clone(),
        department: teacher.department.clone(),
        client_ref: Some(teacher.id.clone()),
    }
}

// ==================== subjects ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = subjects)]
#[allow(dead_code)] // Some fields used only for database operations
pub struct SubjectRow {
    pub id: i64,
    pub teacher_id: Option<i64>,
    pub teacher_name: String,
    pub day: String,
    pub time_start: String,
    pub time_end: String,
    pub subject_code: String,
    pub course_group: String,
    pub classroom: String,
    pub department: String,
    pub client_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subjects)]
pub struct NewSubjectRow {
    pub teacher_id: Option<i64>,
    pub teacher_name: String,
    pub day: String,
    pub time_start: String,
    pub time_end: String,
    pub subject_code: String,
    pub course_group: String,
    pub classroom: String,
    pub department: String,
    pub client_ref: Option<String>,
}

impl From<SubjectRow> for Subject {
    fn from(row: SubjectRow) -> Self {
        Subject {
            id: row.id.to_string(),
            teacher: row.teacher_name,
            day: row.day,
            time: join_time_range(&row.time_start, &row.time_end),
            subject: row.subject_code,
            course_group: row.course_group,
            code: row.classroom,
            department: row.department,
        }
    }
}

pub fn new_subject_row(subject: &Subject, roster: &[Teacher]) -> NewSubjectRow {
    let (start, end) = split_time_range(&subject.time);
    NewSubjectRow {
        teacher_id: resolve_teacher_id(roster, &subject.teacher),
        teacher_name: subject.teacher.clone(),
        day: subject.day.clone(),
        time_start: time_or_default(start),
        time_end: time_or_default(end),
        subject_code: subject.subject.clone(),
        course_group: subject.course_group.clone(),
        classroom: subject.code.clone(),
        department: subject.department.clone(),
        client_ref: Some(subject.id.clone()),
    }
}

// ==================== substitutions ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = substitutions)]
#[allow(dead_code)] // Some fields used only for database operations
pub struct SubstitutionRow {
    pub id: i64,
    pub teacher_id: Option<i64>,
    pub teacher_name: String,
    pub date: chrono::NaiveDate,
    pub reason: String,
    pub status: String,
    pub client_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = substitutions)]
pub struct NewSubstitutionRow {
    pub teacher_id: Option<i64>,
    pub teacher_name: String,
    pub date: chrono::NaiveDate,
    pub reason: String,
    pub status: String,
    pub client_ref: Option<String>,
}

/// Mutable fields pushed on update.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = substitutions)]
pub struct SubstitutionChanges {
    pub status: String,
    pub reason: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = substitution_schedules)]
#[allow(dead_code)] // Some fields used only for database operations
pub struct ScheduleSlotRow {
    pub id: i64,
    pub substitution_id: i64,
    pub time_start: String,
    pub time_end: String,
    pub subject_code: String,
    pub course_group: String,
    pub substitute_teacher_id: Option<i64>,
    pub substitute_name: String,
    pub exceptional_substitute_id: Option<i64>,
    pub exceptional_substitute_name: String,
    pub is_covered: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = substitution_schedules)]
pub struct NewScheduleSlotRow {
    pub substitution_id: i64,
    pub time_start: String,
    pub time_end: String,
    pub subject_code: String,
    pub course_group: String,
    pub substitute_teacher_id: Option<i64>,
    pub substitute_name: String,
    pub exceptional_substitute_id: Option<i64>,
    pub exceptional_substitute_name: String,
    pub is_covered: bool,
}

impl From<ScheduleSlotRow> for ScheduleSlot {
    fn from(row: ScheduleSlotRow) -> Self {
        ScheduleSlot {
            time: join_time_range(&row.time_start, &row.time_end),
            subject: row.subject_code,
            course_group: row.course_group,
            substitute_id: row.substitute_teacher_id.map(|id| id.to_string()),
            substitute: optional_name(row.substitute_name),
            exceptional_substitute_id: row.exceptional_substitute_id.map(|id| id.to_string()),
            exceptional_substitute: optional_name(row.exceptional_substitute_name),
        }
    }
}

/// Assemble a substitution from its main row and its slot rows.
///
/// The record-level `substitute` shortcut mirrors the first slot's
/// substitute, which is how the display layer summarizes coverage.
pub fn substitution_from_rows(row: SubstitutionRow, slot_rows: Vec<ScheduleSlotRow>) -> Substitution {
    let schedule: Vec<ScheduleSlot> = slot_rows.into_iter().map(ScheduleSlot::from).collect();
    let substitute = schedule.first().and_then(|slot| slot.substitute.clone());

    Substitution {
        id: row.id.to_string(),
        teacher_id: row
            .teacher_id
            .map(|id| id.to_string())
            .unwrap_or_default(),
        teacher_name: row.teacher_name,
        date: row.date,
        reason: row.reason,
        status: row.status,
        substitute,
        schedule,
    }
}

pub fn new_substitution_row(substitution: &Substitution, roster: &[Teacher]) -> NewSubstitutionRow {
    let teacher_id = parse_backend_id(&substitution.teacher_id)
        .or_else(|| resolve_teacher_id(roster, &substitution.teacher_name));

    NewSubstitutionRow {
        teacher_id,
        teacher_name: substitution.teacher_name.clone(),
        date: substitution.date,
        reason: substitution.reason.clone(),
        status: substitution.status.clone(),
        client_ref: Some(substitution.id.clone()),
    }
}

pub fn new_slot_rows(
    substitution_id: i64,
    substitution: &Substitution,
    roster: &[Teacher],
) -> Vec<NewScheduleSlotRow> {
    substitution
        .schedule
        .iter()
        .map(|slot| {
            let (start, end) = split_time_range(&slot.time);
            let substitute_name = slot.substitute.clone().unwrap_or_default();
            let exceptional_name = slot.exceptional_substitute.clone().unwrap_or_default();

            NewScheduleSlotRow {
                substitution_id,
                time_start: time_or_default(start),
                time_end: time_or_default(end),
                subject_code: slot.subject.clone(),
                course_group: slot.course_group.clone(),
                substitute_teacher_id: slot
                    .substitute_id
                    .as_deref()
                    .and_then(parse_backend_id)
                    .or_else(|| resolve_teacher_id(roster, &substitute_name)),
                substitute_name,
                exceptional_substitute_id: slot
                    .exceptional_substitute_id
                    .as_deref()
                    .and_then(parse_backend_id)
                    .or_else(|| resolve_teacher_id(roster, &exceptional_name)),
                exceptional_substitute_name: exceptional_name,
                is_covered: slot.is_covered(),
            }
        })
        .collect()
}

// ==================== availability ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = substitution_availability)]
#[allow(dead_code)] // Some fields used only for database operations
pub struct AvailabilityRow {
    pub id: i64,
    pub teacher_id: Option<i64>,
    pub teacher_name: String,
    pub day: String,
    pub time_start: String,
    pub time_end: String,
    pub options: String,
    pub client_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = substitution_availability)]
pub struct NewAvailabilityRow {
    pub teacher_id: Option<i64>,
    pub teacher_name: String,
    pub day: String,
    pub time_start: String,
    pub time_end: String,
    pub options: String,
    pub client_ref: Option<String>,
}

impl From<AvailabilityRow> for AvailabilityEntry {
    fn from(row: AvailabilityRow) -> Self {
        AvailabilityEntry {
            id: row.id.to_string(),
            teacher: row.teacher_name,
            day: row.day,
            start_time: row.time_start,
            end_time: row.time_end,
            options: row.options,
        }
    }
}

pub fn new_availability_row(entry: &AvailabilityEntry, roster: &[Teacher]) -> NewAvailabilityRow {
    NewAvailabilityRow {
        teacher_id: resolve_teacher_id(roster, &entry.teacher),
        teacher_name: entry.teacher.clone(),
        day: entry.day.clone(),
        time_start: time_or_default(&entry.start_time),
        time_end: time_or_default(&entry.end_time),
        options: entry.options.clone(),
        client_ref: Some(entry.id.clone()),
    }
}
