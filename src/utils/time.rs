use chrono::{SecondsFormat, Utc};

/// Milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// ISO-8601 UTC timestamp with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_utc_with_millis() {
        let ts = iso_timestamp();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2024-01-01T00:00:00.000Z".len());
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
