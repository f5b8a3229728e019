//! Time sources and elapsed-time arithmetic
//!
//! Elapsed values are computed the way the checks have always reported them:
//! both instants are first truncated to a fixed textual precision (whole
//! seconds for backups, whole days for keys) and only then subtracted. The
//! sub-unit remainder is dropped, so a backup that ended at `10:00:00.900`
//! is 5 minutes old at `10:05:00.100`, not 4.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};

use crate::error::{Error, Result};

/// Format backups are compared in after truncation
pub const BACKUP_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format key creation dates are rendered in
pub const KEY_DATE_FORMAT: &str = "%d-%m-%Y";

/// Source of "now"
pub trait Clock: Send + Sync {
    /// Current UTC instant
    fn now(&self) -> DateTime<Utc>;

    /// Current UTC calendar date
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Parse a backup `endTime` such as `2024-01-01T10:00:00.123Z`.
///
/// Fractional seconds and the zone marker are discarded.
pub fn parse_backup_time(raw: &str) -> Result<NaiveDateTime> {
    let malformed = || Error::MalformedTimestamp(raw.to_string());

    let (date, time) = raw.split_once('T').ok_or_else(malformed)?;
    let time = time.split('Z').next().unwrap_or_default();
    let time = time.split('.').next().unwrap_or_default();

    NaiveDateTime::parse_from_str(&format!("{date} {time}"), BACKUP_TIME_FORMAT)
        .map_err(|_| malformed())
}

/// Parse the date part of a key `validAfterTime` such as `2024-01-01T08:15:00Z`
pub fn parse_key_date(raw: &str) -> Result<NaiveDate> {
    let date = raw.split('T').next().unwrap_or_default();
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| Error::MalformedTimestamp(raw.to_string()))
}

/// Whole minutes between a backup end time and `now`, both truncated to seconds.
///
/// Negative spans (clock skew) read as zero.
pub fn backup_age_minutes(end_time: NaiveDateTime, now: DateTime<Utc>) -> i64 {
    let now = truncate_to_seconds(now.naive_utc());
    let seconds = (now - end_time).num_seconds();
    seconds.div_euclid(60).max(0)
}

/// Whole days between a key creation date and today
pub fn calculate_key_days(key_date: NaiveDate, today: NaiveDate) -> i64 {
    (today - key_date).num_days().max(0)
}

/// Minutes since a raw backup `endTime`
pub fn elapsed_minutes(end_time: &str, now: DateTime<Utc>) -> Result<i64> {
    Ok(backup_age_minutes(parse_backup_time(end_time)?, now))
}

/// Days since a raw key `validAfterTime`
pub fn elapsed_days(valid_after: &str, today: NaiveDate) -> Result<i64> {
    Ok(calculate_key_days(parse_key_date(valid_after)?, today))
}

fn truncate_to_seconds(at: NaiveDateTime) -> NaiveDateTime {
    at.with_nanosecond(0).unwrap_or(at)
}
