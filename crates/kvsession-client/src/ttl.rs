//! TTL encoding shared by every backend.
//!
//! A raw TTL is a 32-bit integer read with the memcached convention:
//! - `0` never expires
//! - values below [`RELATIVE_TTL_LIMIT`] are seconds from now
//! - anything else is an absolute Unix timestamp in seconds

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Number of seconds in 30 days. Raw TTLs at or above this are absolute.
pub const RELATIVE_TTL_LIMIT: i32 = 60 * 60 * 24 * 30;

/// How a raw TTL value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlKind {
    /// The record never expires.
    Forever,
    /// Seconds relative to the time of the write. Negative values are already expired.
    Relative(i32),
    /// Absolute Unix timestamp in seconds.
    Absolute(i32),
}

/// Time-to-live attached to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Ttl(i32);

impl Ttl {
    /// Never expires.
    pub const FOREVER: Ttl = Ttl(0);

    /// Wrap a raw TTL value as sent on the wire.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// TTL for a record that should live for `duration` after `now`.
    ///
    /// Short durations are encoded as relative seconds; durations of 30 days
    /// or more are converted to an absolute timestamp so they are not
    /// misread as one. Instants past the 32-bit range clamp to `i32::MAX`.
    pub fn after(duration: Duration, now: SystemTime) -> Self {
        let secs = duration.as_secs();
        if secs == 0 {
            // Sub-second lifetimes round up so they don't turn into "forever".
            return if duration.is_zero() { Self::FOREVER } else { Self(1) };
        }
        if secs < RELATIVE_TTL_LIMIT as u64 {
            Self(secs as i32)
        } else {
            now.checked_add(duration)
                .map_or(Self(i32::MAX), Self::at)
        }
    }

    /// TTL expiring at an absolute instant.
    pub fn at(instant: SystemTime) -> Self {
        let secs = instant
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs.clamp(RELATIVE_TTL_LIMIT as u64, i32::MAX as u64) as i32)
    }

    /// The raw wire value.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Returns true for the never-expiring TTL.
    pub const fn is_forever(self) -> bool {
        self.0 == 0
    }

    /// Classify the raw value.
    pub const fn kind(self) -> TtlKind {
        if self.0 == 0 {
            TtlKind::Forever
        } else if self.0 < RELATIVE_TTL_LIMIT {
            TtlKind::Relative(self.0)
        } else {
            TtlKind::Absolute(self.0)
        }
    }

    /// Absolute expiry instant for a write performed at `now`, or `None` for forever.
    pub fn expires_at(self, now: SystemTime) -> Option<SystemTime> {
        match self.kind() {
            TtlKind::Forever => None,
            TtlKind::Relative(secs) if secs >= 0 => Some(now + Duration::from_secs(secs as u64)),
            TtlKind::Relative(secs) => Some(
                now.checked_sub(Duration::from_secs(secs.unsigned_abs() as u64))
                    .unwrap_or(UNIX_EPOCH),
            ),
            TtlKind::Absolute(secs) => Some(UNIX_EPOCH + Duration::from_secs(secs as u64)),
        }
    }
}

impl From<i32> for Ttl {
    fn from(raw: i32) -> Self {
        Self::from_raw(raw)
    }
}

impl std::fmt::Display for Ttl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            TtlKind::Forever => write!(f, "forever"),
            TtlKind::Relative(secs) => write!(f, "{secs}s"),
            TtlKind::Absolute(secs) => write!(f, "until {secs}"),
        }
    }
}
