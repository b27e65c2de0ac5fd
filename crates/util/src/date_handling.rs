//! # Date Handling Utilities
//!
//! Formatting of epoch-millisecond timestamps for display.

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

/// Display format for timestamps (date and 24h time).
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats epoch milliseconds in the given time zone.
///
/// Returns `None` when the value is absent or outside chrono's representable
/// range, so callers can substitute a placeholder.
///
/// # Example
/// ```rust
/// use advisory_util::date_handling::format_epoch_millis_in;
/// use chrono::Utc;
///
/// assert_eq!(
///     format_epoch_millis_in(Some(1_700_000_000_000), &Utc),
///     Some("2023-11-14 22:13:20".to_string())
/// );
/// assert_eq!(format_epoch_millis_in(None, &Utc), None);
/// ```
pub fn format_epoch_millis_in<Tz>(millis: Option<i64>, zone: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let date_time: DateTime<Tz> = zone.timestamp_millis_opt(millis?).single()?;
    Some(date_time.format(DATE_TIME_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn formats_in_requested_zone() {
        assert_eq!(format_epoch_millis_in(Some(0), &Utc), Some("1970-01-01 00:00:00".to_string()));

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            format_epoch_millis_in(Some(1_700_000_000_000), &plus_two),
            Some("2023-11-15 00:13:20".to_string())
        );
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert_eq!(format_epoch_millis_in(Some(i64::MAX), &Utc), None);
        assert_eq!(format_epoch_millis_in(None, &Utc), None);
    }
}
