//! Timestamp normalization for timeline date strings.
//!
//! Timelines display dates in a few shapes depending on the age of a post:
//!
//! | Shape | Example | Interpretation |
//! |-------|---------|----------------|
//! | Relative hours | `3h` | `now - 3 hours` |
//! | Date + clock | `Jun 13, 2025 · 7:57 PM UTC` | UTC midnight of the date |
//! | Date only | `Jun 13, 2025` | UTC midnight of the date |
//!
//! The clock portion of the second shape is dropped, so absolute dates only
//! carry day precision while the recency cutoff is hour-granular. Anything
//! that fails to parse maps to `now`.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::debug;

/// Separator between the date and the clock portion of a full timestamp.
const DATE_CLOCK_SEPARATOR: char = '·';

/// `chrono` format of the date portion, e.g. `Jun 13, 2025`.
const DATE_FORMAT: &str = "%b %d, %Y";

/// Convert a displayed timestamp into an absolute UTC instant.
///
/// # Arguments
///
/// * `raw` - The timestamp as displayed by the timeline
/// * `now` - The reference instant used for relative forms and as fallback
///
/// # Returns
///
/// The parsed instant, or `now` when the input is not recognized.
pub fn normalize(raw: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    match try_normalize(raw.trim(), now) {
        Some(ts) => ts,
        None => {
            debug!(raw, "Unparseable timestamp; using now");
            now
        }
    }
}

fn try_normalize(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if raw.contains('h') {
        let hours: i64 = raw.replace('h', "").trim().parse().ok()?;
        return now.checked_sub_signed(Duration::try_hours(hours)?);
    }

    let date_part = match raw.split_once(DATE_CLOCK_SEPARATOR) {
        Some((date, _clock)) => date.trim(),
        None => raw,
    };
    parse_date(date_part)
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, DATE_FORMAT).ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// Compute the recency cutoff `hours` before `now`.
pub fn cutoff_from_hours(hours: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(i64::from(hours))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 14, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_relative_hours() {
        assert_eq!(normalize("3h", now()), now() - Duration::hours(3));
        assert_eq!(normalize(" 12h ", now()), now() - Duration::hours(12));
    }

    #[test]
    fn test_date_with_clock_drops_time() {
        let ts = normalize("Jun 13, 2025 · 7:57 PM UTC", now());
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 6, 13, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_plain_date() {
        let ts = normalize("Jan 2, 2024", now());
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_garbage_falls_back_to_now() {
        assert_eq!(normalize("garbage", now()), now());
        assert_eq!(normalize("", now()), now());
    }

    #[test]
    fn test_h_branch_failure_does_not_try_dates() {
        // "ghost" contains an `h` but is not a count of hours
        assert_eq!(normalize("ghost", now()), now());
    }

    #[test]
    fn test_bad_date_after_separator_falls_back() {
        assert_eq!(normalize("Foo 99, 2025 · 7:57 PM UTC", now()), now());
    }

    #[test]
    fn test_cutoff_from_hours() {
        assert_eq!(cutoff_from_hours(48, now()), now() - Duration::hours(48));
    }
}
