//! Wire encodings for filter values
//!
//! Each field kind has one codec. Codecs are applied at the request boundary,
//! so a filter never holds a value that failed to decode.

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Value could not be decoded under its canonical encoding
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("expected {expected}: {reason}")]
pub struct CodecError {
    pub expected: &'static str,
    pub reason: String,
}

impl CodecError {
    fn new(expected: &'static str, reason: impl ToString) -> Self {
        Self {
            expected,
            reason: reason.to_string(),
        }
    }
}

/// Decode/encode strategy for one value type
pub trait ValueCodec<T>: Send + Sync {
    fn decode(&self, raw: &str) -> Result<T, CodecError>;
    fn encode(&self, value: &T) -> String;
}

pub struct IntegerCodec;
pub struct LongCodec;
pub struct DoubleCodec;
pub struct TextCodec;
pub struct BooleanCodec;
pub struct UuidCodec;
/// ISO-8601 calendar date (`2024-01-31`)
pub struct LocalDateCodec;
/// ISO-8601 extended date-time with offset, optionally followed by a bracketed
/// region id (`2024-01-31T10:15:30+01:00[Europe/Paris]`)
pub struct ZonedDateTimeCodec;
/// Same input format as [`ZonedDateTimeCodec`], normalized to UTC
pub struct InstantCodec;

impl ValueCodec<i32> for IntegerCodec {
    fn decode(&self, raw: &str) -> Result<i32, CodecError> {
        raw.trim()
            .parse()
            .map_err(|e| CodecError::new("32-bit integer", e))
    }

    fn encode(&self, value: &i32) -> String {
        value.to_string()
    }
}

impl ValueCodec<i64> for LongCodec {
    fn decode(&self, raw: &str) -> Result<i64, CodecError> {
        raw.trim()
            .parse()
            .map_err(|e| CodecError::new("64-bit integer", e))
    }

    fn encode(&self, value: &i64) -> String {
        value.to_string()
    }
}

impl ValueCodec<f64> for DoubleCodec {
    fn decode(&self, raw: &str) -> Result<f64, CodecError> {
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|e| CodecError::new("decimal number", e))?;
        if !value.is_finite() {
            return Err(CodecError::new("decimal number", "value is not finite"));
        }
        Ok(value)
    }

    fn encode(&self, value: &f64) -> String {
        value.to_string()
    }
}

impl ValueCodec<String> for TextCodec {
    fn decode(&self, raw: &str) -> Result<String, CodecError> {
        Ok(raw.to_string())
    }

    fn encode(&self, value: &String) -> String {
        value.clone()
    }
}

impl ValueCodec<bool> for BooleanCodec {
    fn decode(&self, raw: &str) -> Result<bool, CodecError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(CodecError::new(
                "boolean",
                format!("'{}' is not true or false", other),
            )),
        }
    }

    fn encode(&self, value: &bool) -> String {
        value.to_string()
    }
}

impl ValueCodec<Uuid> for UuidCodec {
    fn decode(&self, raw: &str) -> Result<Uuid, CodecError> {
        Uuid::parse_str(raw.trim()).map_err(|e| CodecError::new("UUID", e))
    }

    fn encode(&self, value: &Uuid) -> String {
        value.hyphenated().to_string()
    }
}

impl ValueCodec<NaiveDate> for LocalDateCodec {
    fn decode(&self, raw: &str) -> Result<NaiveDate, CodecError> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|e| CodecError::new("ISO-8601 date (YYYY-MM-DD)", e))
    }

    fn encode(&self, value: &NaiveDate) -> String {
        value.format("%Y-%m-%d").to_string()
    }
}

impl ValueCodec<DateTime<FixedOffset>> for ZonedDateTimeCodec {
    fn decode(&self, raw: &str) -> Result<DateTime<FixedOffset>, CodecError> {
        parse_zoned(raw)
    }

    fn encode(&self, value: &DateTime<FixedOffset>) -> String {
        value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl ValueCodec<DateTime<Utc>> for InstantCodec {
    fn decode(&self, raw: &str) -> Result<DateTime<Utc>, CodecError> {
        parse_zoned(raw).map(|dt| dt.with_timezone(&Utc))
    }

    fn encode(&self, value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

fn parse_zoned(raw: &str) -> Result<DateTime<FixedOffset>, CodecError> {
    let raw = raw.trim();
    // The region id is informational; the offset pins the instant
    let without_region = match raw.strip_suffix(']').and_then(|r| r.rsplit_once('[')) {
        Some((datetime, _region)) => datetime,
        None => raw,
    };
    DateTime::parse_from_rfc3339(without_region)
        .map_err(|e| CodecError::new("ISO-8601 date-time with offset", e))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn zoned_round_trip_preserves_instant_and_offset() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let original = offset
            .with_ymd_and_hms(2023, 11, 5, 8, 30, 15)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(250))
            .unwrap();

        let encoded = ZonedDateTimeCodec.encode(&original);
        let decoded = ZonedDateTimeCodec.decode(&encoded).unwrap();

        assert_eq!(encoded, "2023-11-05T08:30:15.250-05:00");
        assert_eq!(decoded, original);
        assert_eq!(decoded.offset(), original.offset());
    }

    #[test]
    fn instant_round_trip() {
        let original = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
        let encoded = InstantCodec.encode(&original);

        assert_eq!(encoded, "2024-02-29T23:59:59Z");
        assert_eq!(InstantCodec.decode(&encoded).unwrap(), original);
    }

    #[test]
    fn instant_normalizes_offsets() {
        let decoded = InstantCodec.decode("2024-01-01T01:00:00+01:00").unwrap();
        assert_eq!(decoded, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn zoned_accepts_region_suffix() {
        let decoded = ZonedDateTimeCodec
            .decode("2024-07-14T12:00:00+02:00[Europe/Paris]")
            .unwrap();
        assert_eq!(decoded.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn zoned_rejects_missing_offset() {
        let err = ZonedDateTimeCodec.decode("2024-07-14T12:00:00").unwrap_err();
        assert_eq!(err.expected, "ISO-8601 date-time with offset");
        assert!(ZonedDateTimeCodec.decode("2024-07-14").is_err());
        assert!(ZonedDateTimeCodec.decode("not a date").is_err());
    }

    #[test]
    fn local_date_round_trip() {
        let date = LocalDateCodec.decode("2020-02-29").unwrap();
        assert_eq!(LocalDateCodec.encode(&date), "2020-02-29");
        assert!(LocalDateCodec.decode("2021-02-29").is_err());
    }

    #[test]
    fn numeric_codecs() {
        assert_eq!(IntegerCodec.decode(" 42 ").unwrap(), 42);
        assert!(IntegerCodec.decode("3000000000").is_err());
        assert_eq!(LongCodec.decode("3000000000").unwrap(), 3_000_000_000);
        assert_eq!(DoubleCodec.decode("0.25").unwrap(), 0.25);
        assert!(DoubleCodec.decode("NaN").is_err());
        assert!(DoubleCodec.decode("inf").is_err());
    }

    #[test]
    fn boolean_codec_is_case_insensitive() {
        assert!(BooleanCodec.decode("TRUE").unwrap());
        assert!(!BooleanCodec.decode("false").unwrap());
        assert!(BooleanCodec.decode("yes").is_err());
    }

    #[test]
    fn uuid_codec() {
        let raw = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let id = UuidCodec.decode(raw).unwrap();
        assert_eq!(UuidCodec.encode(&id), raw);
        assert!(UuidCodec.decode("67e55044").is_err());
    }

    #[test]
    fn text_codec_is_identity() {
        assert_eq!(TextCodec.decode(" a b ").unwrap(), " a b ");
        assert_eq!(TextCodec.encode(&"x".to_string()), "x");
    }
}
