use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Current UTC time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Fixed-width RFC 3339 (microseconds, `Z` suffix) so stored values sort
/// lexicographically in SQLite.
pub fn to_sqlite(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 timestamp as stored in SQLite.
pub fn from_sqlite(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    s.parse::<DateTime<Utc>>()
}

/// Start of a lookback window of `days` days ending now.
pub fn days_ago(days: u32) -> DateTime<Utc> {
    now() - Duration::days(i64::from(days))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let dt = now();
        let s = to_sqlite(&dt);
        let parsed = from_sqlite(&s).unwrap();
        assert_eq!(dt.timestamp_micros(), parsed.timestamp_micros());
    }

    #[test]
    fn test_sqlite_format_sorts() {
        let older = to_sqlite(&days_ago(3));
        let newer = to_sqlite(&now());
        assert!(older < newer);
        assert!(newer.ends_with('Z'));
    }

    #[test]
    fn test_from_sqlite_accepts_offsets_and_rejects_garbage() {
        let parsed = from_sqlite("2024-05-01T12:00:00+02:00").unwrap();
        assert_eq!(to_sqlite(&parsed), "2024-05-01T10:00:00.000000Z");
        assert!(from_sqlite("yesterday").is_err());
    }
}
