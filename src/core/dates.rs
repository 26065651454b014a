//! Date encoding with an ordered chain of decode strategies
//!
//! Dates are always written as RFC 3339 strings. Reading accepts files produced
//! by older versions and other tools, which may encode dates as epoch seconds or
//! as seconds since 2001-01-01 (the "reference date" default of some decoders).
//! A document is decoded under one strategy at a time; [`decode_json`] walks
//! [`DateStrategy::CHAIN`] in order and keeps the first success.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serializer};
use std::cell::Cell;
use thiserror::Error;

/// Seconds between 1970-01-01 and 2001-01-01
const REFERENCE_DATE_OFFSET: f64 = 978_307_200.0;

/// How dates are encoded in a document being decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStrategy {
    /// Number of seconds since the Unix epoch
    EpochSeconds,
    /// ISO-8601 / RFC 3339 string (also accepts a bare `YYYY-MM-DD`)
    Iso8601,
    /// Number of seconds since 2001-01-01T00:00:00Z
    ReferenceDate,
}

impl DateStrategy {
    /// Decode attempts, in order
    pub const CHAIN: [DateStrategy; 3] = [
        DateStrategy::EpochSeconds,
        DateStrategy::Iso8601,
        DateStrategy::ReferenceDate,
    ];
}

impl std::fmt::Display for DateStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStrategy::EpochSeconds => write!(f, "epoch-seconds"),
            DateStrategy::Iso8601 => write!(f, "iso-8601"),
            DateStrategy::ReferenceDate => write!(f, "reference-date"),
        }
    }
}

thread_local! {
    static ACTIVE: Cell<DateStrategy> = const { Cell::new(DateStrategy::Iso8601) };
}

/// Restores the previous strategy when dropped
struct StrategyGuard(DateStrategy);

impl Drop for StrategyGuard {
    fn drop(&mut self) {
        ACTIVE.with(|a| a.set(self.0));
    }
}

/// Run `f` with `strategy` as the active date decoding strategy on this thread
pub fn with_strategy<R>(strategy: DateStrategy, f: impl FnOnce() -> R) -> R {
    let previous = ACTIVE.with(|a| a.replace(strategy));
    let _guard = StrategyGuard(previous);
    f()
}

fn active() -> DateStrategy {
    ACTIVE.with(|a| a.get())
}

/// Every strategy in the chain failed
#[derive(Debug, Error)]
#[error("could not decode document with any date strategy ({})", .attempts.join("; "))]
pub struct DecodeError {
    /// One message per attempted strategy
    pub attempts: Vec<String>,
}

/// Decode a JSON document, trying each date strategy in order
pub fn decode_json<T: DeserializeOwned>(content: &str) -> Result<(T, DateStrategy), DecodeError> {
    let mut attempts = Vec::new();
    for strategy in DateStrategy::CHAIN {
        match with_strategy(strategy, || serde_json::from_str::<T>(content)) {
            Ok(value) => return Ok((value, strategy)),
            Err(e) => attempts.push(format!("{}: {}", strategy, e)),
        }
    }
    Err(DecodeError { attempts })
}

fn from_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    Utc.timestamp_opt(whole as i64, nanos.min(999_999_999)).single()
}

fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.to_rfc3339())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    use serde::de::Error;

    match active() {
        DateStrategy::Iso8601 => {
            let s = String::deserialize(deserializer)?;
            parse_iso(&s).ok_or_else(|| D::Error::custom(format!("invalid ISO-8601 date '{}'", s)))
        }
        DateStrategy::EpochSeconds => {
            let secs = f64::deserialize(deserializer)?;
            from_seconds(secs).ok_or_else(|| D::Error::custom("epoch seconds out of range"))
        }
        DateStrategy::ReferenceDate => {
            let secs = f64::deserialize(deserializer)?;
            from_seconds(secs + REFERENCE_DATE_OFFSET)
                .ok_or_else(|| D::Error::custom("reference-date seconds out of range"))
        }
    }
}

/// Same encoding for `Option<DateTime<Utc>>` fields
pub mod option {
    use super::*;

    struct Wrapped(DateTime<Utc>);

    impl<'de> Deserialize<'de> for Wrapped {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            super::deserialize(deserializer).map(Wrapped)
        }
    }

    pub fn serialize<S: Serializer>(
        date: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => super::serialize(d, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|w| w.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Serialize, Deserialize)]
    struct Stamp {
        #[serde(with = "crate::core::dates")]
        at: DateTime<Utc>,
        #[serde(default, with = "crate::core::dates::option")]
        until: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_iso_document_decodes_on_second_attempt() {
        let (stamp, strategy): (Stamp, _) =
            decode_json(r#"{"at": "2024-03-01T10:00:00Z", "until": null}"#).unwrap();
        assert_eq!(strategy, DateStrategy::Iso8601);
        assert_eq!(stamp.at, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
        assert!(stamp.until.is_none());
    }

    #[test]
    fn test_epoch_seconds_wins_first() {
        let (stamp, strategy): (Stamp, _) = decode_json(r#"{"at": 1709287200}"#).unwrap();
        assert_eq!(strategy, DateStrategy::EpochSeconds);
        assert_eq!(stamp.at, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_bare_date_is_accepted() {
        let (stamp, _): (Stamp, _) = decode_json(r#"{"at": "2024-03-01"}"#).unwrap();
        assert_eq!(stamp.at, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_reference_date_needs_explicit_strategy() {
        // Numbers always satisfy the epoch strategy first, so reference-date
        // decoding is only reached through with_strategy.
        let stamp: Stamp = with_strategy(DateStrategy::ReferenceDate, || {
            serde_json::from_str(r#"{"at": 0}"#)
        })
        .unwrap();
        assert_eq!(stamp.at, Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_all_strategies_fail() {
        let err = decode_json::<Stamp>(r#"{"at": true}"#).unwrap_err();
        assert_eq!(err.attempts.len(), 3);
    }

    #[test]
    fn test_strategy_restored_after_call() {
        with_strategy(DateStrategy::EpochSeconds, || {
            assert_eq!(active(), DateStrategy::EpochSeconds);
        });
        assert_eq!(active(), DateStrategy::Iso8601);
    }

    #[test]
    fn test_serialize_is_rfc3339() {
        let stamp = Stamp {
            at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            until: None,
        };
        let json = serde_json::to_string(&stamp).unwrap();
        assert!(json.contains("2024-03-01T10:00:00+00:00"));
    }
}
