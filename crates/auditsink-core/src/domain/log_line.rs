//! Audit file line parsing
//!
//! Only the leading `[YYYY-MM-DD` token of a line is contractual; everything
//! after it is opaque payload. A line whose first 11 bytes do not have that
//! exact shape, or whose date is not a real calendar day, is *not datable*.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Length of the `[YYYY-MM-DD` prefix in bytes
pub const DATE_PREFIX_LEN: usize = 11;

const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

/// Extracts the calendar date a raw audit line starts with
///
/// Works on bytes so lines with invalid UTF-8 in their payload are still
/// datable. Returns `None` for anything that deviates from `[YYYY-MM-DD`.
pub fn parse_line_date(line: &[u8]) -> Option<NaiveDate> {
    let prefix = line.get(..DATE_PREFIX_LEN)?;
    let (open, date) = prefix.split_first()?;
    if *open != b'[' {
        return None;
    }

    let well_formed = date.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !well_formed {
        return None;
    }

    let text = std::str::from_utf8(date).ok()?;
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// Whole days elapsed between local midnight of `date` and `now`
///
/// Floors towards negative infinity, so a date in the future yields a
/// negative age.
pub fn age_in_days(date: NaiveDate, now: NaiveDateTime) -> i64 {
    let midnight = date.and_time(NaiveTime::MIN);
    (now - midnight).num_seconds().div_euclid(SECONDS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parses_rendered_prefix() {
        let line = b"[2024-01-05 10:11:12] INFO: x [] []\n";
        assert_eq!(parse_line_date(line), Some(date(2024, 1, 5)));
    }

    #[test]
    fn test_only_prefix_matters() {
        assert_eq!(parse_line_date(b"[2024-01-05"), Some(date(2024, 1, 5)));
        assert_eq!(
            parse_line_date(b"[2024-01-05T00:00:00+00:00] garbage \xff\xfe"),
            Some(date(2024, 1, 5))
        );
    }

    #[test]
    fn test_rejects_malformed_prefixes() {
        assert_eq!(parse_line_date(b""), None);
        assert_eq!(parse_line_date(b"[2024-01-0"), None);
        assert_eq!(parse_line_date(b"2024-01-05 INFO"), None);
        assert_eq!(parse_line_date(b" [2024-01-05]"), None);
        assert_eq!(parse_line_date(b"[2024/01/05]"), None);
        assert_eq!(parse_line_date(b"[24-01-05 00]"), None);
        assert_eq!(parse_line_date(b"[2024-1-05 0]"), None);
        assert_eq!(parse_line_date(b"[+024-01-05]"), None);
        assert_eq!(parse_line_date(b"stack trace continuation\n"), None);
    }

    #[test]
    fn test_rejects_impossible_calendar_dates() {
        assert_eq!(parse_line_date(b"[2024-02-30]"), None);
        assert_eq!(parse_line_date(b"[2024-13-01]"), None);
        assert_eq!(parse_line_date(b"[2023-02-29]"), None);
        assert_eq!(parse_line_date(b"[2024-02-29]"), Some(date(2024, 2, 29)));
    }

    #[test]
    fn test_age_counts_from_local_midnight() {
        let now = date(2024, 1, 20).and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(age_in_days(date(2024, 1, 20), now), 0);
        assert_eq!(age_in_days(date(2024, 1, 19), now), 1);
        assert_eq!(age_in_days(date(2024, 1, 5), now), 15);

        let late = date(2024, 1, 20).and_hms_opt(23, 59, 59).unwrap();
        assert_eq!(age_in_days(date(2024, 1, 5), late), 15);
        assert_eq!(age_in_days(date(2024, 1, 4), late), 16);
    }

    #[test]
    fn test_future_dates_have_negative_age() {
        let now = date(2024, 1, 20).and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(age_in_days(date(2024, 1, 21), now), -1);
        assert_eq!(age_in_days(date(2024, 2, 20), now), -31);
    }
}
