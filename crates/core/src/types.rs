//! Shared primitive types and lenient date parsing for backend payloads.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// All backend primary keys are PostgreSQL SERIAL integers.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = DateTime<Utc>;

/// Parse a calendar date from `YYYY-MM-DD`, RFC 3339, or a naive
/// ISO-8601 datetime (as emitted by Python's `isoformat()`).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

/// Parse a timestamp from RFC 3339, or a naive ISO-8601 datetime which is
/// taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
        .or_else(|| parse_date(raw).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|n| n.and_utc()))
}

/// Serde adapter for required dates.
pub mod flexible_date {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date '{raw}'")))
    }

    /// Serde adapter for optional dates; `null` and missing map to `None`.
    pub mod option {
        use chrono::NaiveDate;
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            date: &Option<NaiveDate>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDate>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::super::parse_date(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid date '{raw}'"))),
                None => Ok(None),
            }
        }
    }
}

/// Serde adapter for timestamps that may lack a UTC offset.
pub mod flexible_timestamp {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::Timestamp;

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_plain_date() {
        let d = parse_date("2026-10-20").unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (2026, 10, 20));
    }

    #[test]
    fn parses_date_from_rfc3339() {
        let d = parse_date("2026-10-20T15:30:00Z").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap());
    }

    #[test]
    fn parses_date_from_naive_datetime() {
        let d = parse_date("2026-10-20T15:30:00.123456").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap());
    }

    #[test]
    fn rejects_garbage_date() {
        assert!(parse_date("not a date").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn naive_timestamp_is_utc() {
        let ts = parse_timestamp("2026-10-19T08:15:00.500000").unwrap();
        assert_eq!(ts.hour(), 8);
        assert_eq!(ts.minute(), 15);
    }

    #[test]
    fn offset_timestamp_is_normalised() {
        let ts = parse_timestamp("2026-10-19T10:00:00+02:00").unwrap();
        assert_eq!(ts.hour(), 8);
    }
}
