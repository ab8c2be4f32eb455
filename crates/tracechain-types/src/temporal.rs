use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// A UTC instant with millisecond precision.
///
/// The canonical string form is ISO-8601 with exactly three fractional digits
/// and a `Z` suffix (`2024-03-01T08:30:00.000Z`). Block hashes and Merkle
/// leaves are computed over this form, so it must never change.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current wall-clock time truncated to milliseconds.
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(3))
    }

    /// Build from milliseconds since the UNIX epoch.
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// The UNIX epoch.
    pub fn epoch() -> Self {
        Self(DateTime::<Utc>::default())
    }

    /// Milliseconds since the UNIX epoch.
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Canonical ISO-8601 form used for hashing and on the wire.
    pub fn to_iso(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Parse an RFC 3339 / ISO-8601 string. Sub-millisecond digits are dropped.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| Self::from(dt.with_timezone(&Utc)))
            .map_err(|e| TypeError::InvalidTimestamp {
                value: s.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(3))
    }
}

impl FromStr for Timestamp {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.to_iso())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Source of timestamps for events and blocks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicI64::new(start.as_millis()),
        }
    }

    /// Move the clock forward by `millis` milliseconds.
    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Jump to an arbitrary instant (may move backwards).
    pub fn set(&self, at: Timestamp) {
        self.millis.store(at.as_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_else(Timestamp::epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_form_always_has_millis() {
        let ts = Timestamp::from_millis(1_700_000_000_000).unwrap();
        assert_eq!(ts.to_iso(), "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn now_is_truncated_to_millis() {
        let ts = Timestamp::now();
        assert_eq!(ts.as_datetime().timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn parse_accepts_offsets() {
        let ts = Timestamp::parse("2024-01-01T02:00:00.250+02:00").unwrap();
        assert_eq!(ts.to_iso(), "2024-01-01T00:00:00.250Z");
    }

    #[test]
    fn parse_drops_sub_millisecond_digits() {
        let ts = Timestamp::parse("2024-01-01T00:00:00.123456789Z").unwrap();
        assert_eq!(ts.to_iso(), "2024-01-01T00:00:00.123Z");
        assert_eq!(Timestamp::parse(&ts.to_iso()).unwrap(), ts);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Timestamp::parse("yesterday"),
            Err(TypeError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn serde_uses_canonical_form() {
        let ts = Timestamp::from_millis(0).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"1970-01-01T00:00:00.000Z\"");
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn manual_clock_advances_and_rewinds() {
        let clock = ManualClock::new(Timestamp::from_millis(1_000).unwrap());
        assert_eq!(clock.now().as_millis(), 1_000);
        clock.advance(500);
        assert_eq!(clock.now().as_millis(), 1_500);
        clock.set(Timestamp::epoch());
        assert_eq!(clock.now(), Timestamp::epoch());
    }

    #[test]
    fn ordering_follows_time() {
        let a = Timestamp::from_millis(1).unwrap();
        let b = Timestamp::from_millis(2).unwrap();
        assert!(a < b);
    }
}
