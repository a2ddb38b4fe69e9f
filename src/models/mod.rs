//! Domain model: records, canonical days, clock-time normalization.

pub mod day;
pub mod records;
pub mod time;

pub use day::CanonicalDay;
pub use records::{
    fresh_id, AvailabilityEntry, BatchInsertReport, Collections, InsertOutcome, NewAvailability,
    NewSubject, NewSubstitution, NewTeacher, ScheduleSlot, Stats, Subject, Substitution,
    SubstitutionPatch, Teacher,
};
pub use time::{join_time_range, minute_of_day, split_time_range, INVALID_MINUTE};
