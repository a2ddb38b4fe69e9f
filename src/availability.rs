//! Availability matching over the weekly substitution windows.
//!
//! Entries are matched in index order; a teacher listed twice for the same
//! window is reported twice, which the display layer uses as-is.

use crate::models::day::CanonicalDay;
use crate::models::time::{minute_of_day, INVALID_MINUTE};
use crate::models::AvailabilityEntry;

/// Read-only query view over an ordered sequence of availability entries.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityIndex<'a> {
    entries: &'a [AvailabilityEntry],
}

impl<'a> AvailabilityIndex<'a> {
    pub fn new(entries: &'a [AvailabilityEntry]) -> Self {
        Self { entries }
    }

    /// Teachers free at one instant.
    ///
    /// An entry matches iff its day canonicalizes to the same weekday as the
    /// query and `start <= time < end` (half-open: a window ending at 10:00
    /// does not cover a 10:00 query, and zero-width windows never match).
    /// An unrecognized day on either side matches nothing.
    pub fn find_at_instant(&self, day: &str, time: &str) -> Vec<String> {
        let Some(query_day) = CanonicalDay::parse(day) else {
            return Vec::new();
        };
        let target = minute_of_day(time);

        self.entries
            .iter()
            .filter(|entry| {
                CanonicalDay::parse(&entry.day) == Some(query_day)
                    && minute_of_day(&entry.start_time) <= target
                    && target < minute_of_day(&entry.end_time)
            })
            .map(|entry| entry.teacher.clone())
            .collect()
    }

    /// Teachers whose window overlaps the query range `[start, end)`.
    ///
    /// Returns nothing when either query bound is unparseable. Entries whose
    /// own bounds are unparseable are skipped: a window that cannot be placed
    /// on the clock overlaps nothing. Two half-open ranges overlap iff each
    /// starts before the other ends; windows that merely touch at an
    /// endpoint do not count.
    pub fn find_overlapping(&self, day: &str, start: &str, end: &str) -> Vec<String> {
        let Some(query_day) = CanonicalDay::parse(day) else {
            return Vec::new();
        };
        let query_start = minute_of_day(start);
        let query_end = minute_of_day(end);
        if query_start == INVALID_MINUTE || query_end == INVALID_MINUTE {
            return Vec::new();
        }

        self.entries
            .iter()
            .filter(|entry| {
                let entry_start = minute_of_day(&entry.start_time);
                let entry_end = minute_of_day(&entry.end_time);
                entry_start != INVALID_MINUTE
                    && entry_end != INVALID_MINUTE
                    && CanonicalDay::parse(&entry.day) == Some(query_day)
                    && query_start < entry_end
                    && entry_start < query_end
            })
            .map(|entry| entry.teacher.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(teacher: &str, day: &str, start: &str, end: &str) -> AvailabilityEntry {
        AvailabilityEntry {
            id: crate::models::fresh_id(),
            teacher: teacher.into(),
            day: day.into(),
            start_time: start.into(),
            end_time: end.into(),
            options: String::new(),
        }
    }

    #[test]
    fn test_instant_query_is_half_open() {
        let entries = vec![
            entry("Maria Garcia", "lunes", "08:00", "10:00"),
            entry("Juan Lopez", "lunes", "09:00", "09:00"),
            entry("Ana Martinez", "lunes", "08:00", "09:00"),
        ];
        let index = AvailabilityIndex::new(&entries);

        // Covers 09:00; the zero-width window and the one ending exactly at
        // 09:00 do not.
        assert_eq!(index.find_at_instant("Lunes", "09:00"), vec!["Maria Garcia"]);
    }

    #[test]
    fn test_instant_query_canonicalizes_both_sides() {
        let entries = vec![entry("Maria Garcia", "MIÉRCOLES", "08:00", "10:00")];
        let index = AvailabilityIndex::new(&entries);

        assert_eq!(index.find_at_instant("mie", "09:00"), vec!["Maria Garcia"]);
        assert_eq!(index.find_at_instant("martes", "09:00"), Vec::<String>::new());
    }

    #[test]
    fn test_unknown_days_match_nothing() {
        let entries = vec![entry("Maria Garcia", "someday", "08:00", "10:00")];
        let index = AvailabilityIndex::new(&entries);

        assert!(index.find_at_instant("someday", "09:00").is_empty());
        assert!(index.find_overlapping("someday", "08:00", "10:00").is_empty());
    }

    #[test]
    fn test_index_order_and_duplicates_preserved() {
        let entries = vec![
            entry("Carlos Ruiz", "viernes", "08:00", "14:00"),
            entry("Ana Martinez", "viernes", "08:00", "14:00"),
            entry("Carlos Ruiz", "viernes", "09:00", "11:00"),
        ];
        let index = AvailabilityIndex::new(&entries);

        assert_eq!(
            index.find_at_instant("viernes", "10:00"),
            vec!["Carlos Ruiz", "Ana Martinez", "Carlos Ruiz"]
        );
    }

    #[test]
    fn test_range_overlap_is_strict_at_endpoints() {
        let entries = vec![
            entry("A", "lunes", "08:30", "09:15"),
            entry("B", "lunes", "09:45", "10:15"),
            entry("C", "lunes", "07:00", "09:00"),
            entry("D", "lunes", "10:00", "11:00"),
        ];
        let index = AvailabilityIndex::new(&entries);

        // Partial overlaps on both ends match; touching windows do not.
        assert_eq!(
            index.find_overlapping("lunes", "09:00", "10:00"),
            vec!["A", "B"]
        );
    }

    #[test]
    fn test_range_query_rejects_invalid_bounds() {
        let entries = vec![entry("A", "lunes", "08:00", "14:00")];
        let index = AvailabilityIndex::new(&entries);

        assert!(index.find_overlapping("lunes", "", "10:00").is_empty());
        assert!(index.find_overlapping("lunes", "09:00", "oops").is_empty());
    }

    #[test]
    fn test_range_query_skips_unparseable_entries() {
        let entries = vec![
            entry("A", "lunes", "", "10:00"),
            entry("B", "lunes", "08:00", "14:00"),
        ];
        let index = AvailabilityIndex::new(&entries);

        assert_eq!(index.find_overlapping("lunes", "09:00", "10:00"), vec!["B"]);
    }
}
