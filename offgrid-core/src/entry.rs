//! Values stamped with a write time and a time-to-live.
//!
//! A [`TimedEntry`] is logically absent once `now − timestamp > ttl`, even
//! while still physically stored. Caches resolve that lazily on read and
//! proactively during sweeps.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached value with its write timestamp and TTL.
///
/// ```
/// use std::time::Duration;
/// use offgrid_core::TimedEntry;
/// use chrono::Utc;
///
/// let written = Utc::now();
/// let entry = TimedEntry::new("cities", written, Duration::from_millis(100));
///
/// assert!(!entry.is_expired(written + chrono::Duration::milliseconds(100)));
/// assert!(entry.is_expired(written + chrono::Duration::milliseconds(150)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEntry<T> {
    value: T,
    timestamp: DateTime<Utc>,
    #[serde(with = "ttl_millis")]
    ttl: Duration,
}

impl<T> TimedEntry<T> {
    /// Stamps `value` as written at `timestamp`.
    pub fn new(value: T, timestamp: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            value,
            timestamp,
            ttl,
        }
    }

    /// The stored value, regardless of expiry.
    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consumes the entry and returns the value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// When the entry was written.
    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// How long the entry stays valid after it was written.
    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether more than `ttl` has elapsed between the write and `now`.
    ///
    /// An entry stamped in the future (clock skew) is never expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp)
            .to_std()
            .is_ok_and(|age| age > self.ttl)
    }
}

mod ttl_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ttl_serializes_as_milliseconds() {
        let written = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let entry = TimedEntry::new(42, written, Duration::from_secs(86_400));
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["ttl"], 86_400_000);
        assert_eq!(json["value"], 42);

        let back: TimedEntry<i32> = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn future_timestamps_never_expire() {
        let now = Utc::now();
        let entry = TimedEntry::new((), now + chrono::Duration::hours(1), Duration::ZERO);
        assert!(!entry.is_expired(now));
    }
}
