//! Clock-time normalization.
//!
//! Times travel through the system as `"HH:MM"` (sometimes `"HH:MM:SS"`)
//! strings; class periods combine two of them into a single
//! `"HH:MM - HH:MM"` range string. Comparisons happen on the minute offset
//! from midnight.

/// Sentinel returned by [`minute_of_day`] for unparseable input.
pub const INVALID_MINUTE: i32 = -1;

/// Separator used inside combined time-range strings.
pub const RANGE_SEPARATOR: &str = " - ";

/// Convert a clock-time string to its minute offset from midnight.
///
/// Splits on `:` and parses the first two fields as integers; a trailing
/// seconds field is ignored. Returns [`INVALID_MINUTE`] when the string is
/// empty, has fewer than two fields, or a field is not an integer.
///
/// Out-of-range fields are accepted arithmetically (`"25:00"` → 1500):
/// imported timetables contain such values and the matching layer treats
/// them as ordinary offsets rather than rejecting the row.
pub fn minute_of_day(raw: &str) -> i32 {
    if raw.is_empty() {
        return INVALID_MINUTE;
    }
    let mut parts = raw.split(':');
    let (Some(hours), Some(minutes)) = (parts.next(), parts.next()) else {
        return INVALID_MINUTE;
    };
    let Ok(hours) = hours.trim().parse::<i32>() else {
        return INVALID_MINUTE;
    };
    let Ok(minutes) = minutes.trim().parse::<i32>() else {
        return INVALID_MINUTE;
    };
    hours * 60 + minutes
}

/// Split a combined `"HH:MM - HH:MM"` range string into its two halves.
///
/// The second half is empty when the separator is missing, mirroring how
/// the persisted `time_start`/`time_end` columns default when a range was
/// stored incomplete.
pub fn split_time_range(range: &str) -> (&str, &str) {
    match range.split_once(RANGE_SEPARATOR) {
        Some((start, end)) => (start, end),
        None => (range, ""),
    }
}

/// Join two clock times into the combined range string.
pub fn join_time_range(start: &str, end: &str) -> String {
    format!("{start}{RANGE_SEPARATOR}{end}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midnight_and_last_minute() {
        assert_eq!(minute_of_day("00:00"), 0);
        assert_eq!(minute_of_day("23:59"), 1439);
    }

    #[test]
    fn test_monotonic_over_the_day() {
        let samples = ["00:00", "07:30", "08:00", "08:01", "12:00", "23:59"];
        let minutes: Vec<i32> = samples.iter().map(|s| minute_of_day(s)).collect();
        for pair in minutes.windows(2) {
            assert!(pair[0] < pair[1], "expected {} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_invalid_inputs_yield_sentinel() {
        assert_eq!(minute_of_day(""), INVALID_MINUTE);
        assert_eq!(minute_of_day("12"), INVALID_MINUTE);
        assert_eq!(minute_of_day("ab:cd"), INVALID_MINUTE);
        assert_eq!(minute_of_day("12:xx"), INVALID_MINUTE);
    }

    #[test]
    fn test_seconds_ignored() {
        assert_eq!(minute_of_day("08:30:15"), 8 * 60 + 30);
    }

    #[test]
    fn test_out_of_range_accepted() {
        // Lenient by design; see the function docs.
        assert_eq!(minute_of_day("25:00"), 1500);
        assert_eq!(minute_of_day("10:75"), 675);
    }

    #[test]
    fn test_split_and_join_range() {
        assert_eq!(split_time_range("08:00 - 09:00"), ("08:00", "09:00"));
        assert_eq!(split_time_range("08:00"), ("08:00", ""));
        assert_eq!(join_time_range("08:00", "09:00"), "08:00 - 09:00");
    }
}
