//! Time and timestamp utilities

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Current UTC time as an ISO-8601 string (microsecond precision, `Z` suffix)
pub fn current_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Format a UTC instant as an ISO-8601 string
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Today's date in UTC
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Whole days from `today` until `date` (negative when `date` is in the past)
pub fn days_until(today: NaiveDate, date: NaiveDate) -> i64 {
    (date - today).num_days()
}
