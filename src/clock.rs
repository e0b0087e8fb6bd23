//! Timestamp formatting shared by the record store and snapshot labels.
//!
//! Record timestamps are UTC with a fixed microsecond width so that the
//! stored strings sort lexicographically in time order.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

const RECORD_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z");

const LABEL_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]-[hour][minute][second]");

/// Current time as a record timestamp.
pub fn now_timestamp() -> String {
    format_timestamp(OffsetDateTime::now_utc())
}

/// Format an instant as a record timestamp (converted to UTC first).
pub fn format_timestamp(at: OffsetDateTime) -> String {
    let utc = at.to_offset(time::UtcOffset::UTC);
    utc.format(RECORD_FORMAT)
        .unwrap_or_else(|_| utc.unix_timestamp().to_string())
}

/// Record timestamp of `now - age`, used for "recent" queries.
pub fn timestamp_before_now(age: Duration) -> String {
    format_timestamp(OffsetDateTime::now_utc() - age)
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// `YYYYMMDD-HHMMSS` in local time when the offset is known, UTC otherwise.
pub fn label_stamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format_label_stamp(now)
}

pub fn format_label_stamp(at: OffsetDateTime) -> String {
    at.format(LABEL_FORMAT)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn record_timestamps_have_fixed_width() {
        let a = format_timestamp(datetime!(2024-03-05 07:08:09.1 UTC));
        let b = format_timestamp(datetime!(2024-03-05 07:08:09.123456 UTC));
        assert_eq!(a, "2024-03-05T07:08:09.100000Z");
        assert_eq!(b, "2024-03-05T07:08:09.123456Z");
        assert!(a < b);
    }

    #[test]
    fn offsets_are_normalised_to_utc() {
        let ts = format_timestamp(datetime!(2024-03-05 09:00:00 +2));
        assert_eq!(ts, "2024-03-05T07:00:00.000000Z");
    }

    #[test]
    fn label_stamp_layout() {
        let stamp = format_label_stamp(datetime!(2025-01-02 03:04:05 UTC));
        assert_eq!(stamp, "20250102-030405");
    }
}
