//! Claim-period arithmetic.
//!
//! Every track resets once per UTC day at a fixed `HH:MM`. All computation is
//! done on Unix milliseconds, which carry no timezone and no leap seconds, so
//! a day is always [`DAY_MS`] long.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ClaimError, ClaimResult};

pub const DAY_MS: u64 = 86_400_000;
const MINUTE_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetTime {
    hour: u8,
    minute: u8,
}

impl ResetTime {
    pub const MIDNIGHT: Self = Self { hour: 0, minute: 0 };

    pub fn new(hour: u8, minute: u8) -> ClaimResult<Self> {
        if hour > 23 || minute > 59 {
            return Err(ClaimError::Configuration(format!(
                "reset time {hour:02}:{minute:02} out of range"
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn parse(raw: &str) -> ClaimResult<Self> {
        let bad = || ClaimError::Configuration(format!("reset time {raw:?} must be HH:MM"));
        let (h, m) = raw.split_once(':').ok_or_else(bad)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(bad());
        }
        let hour = h.parse::<u8>().map_err(|_| bad())?;
        let minute = m.parse::<u8>().map_err(|_| bad())?;
        Self::new(hour, minute)
    }

    const fn offset_ms(self) -> u64 {
        (self.hour as u64 * 60 + self.minute as u64) * MINUTE_MS
    }

    /// Start of the period containing `now_ms`: today's boundary if it has
    /// passed, otherwise yesterday's.
    pub fn period_start(self, now_ms: u64) -> u64 {
        let boundary = now_ms - now_ms % DAY_MS + self.offset_ms();
        if now_ms < boundary {
            boundary.saturating_sub(DAY_MS)
        } else {
            boundary
        }
    }

    pub fn next_period_start(self, now_ms: u64) -> u64 {
        self.period_start(now_ms).saturating_add(DAY_MS)
    }

    pub fn claimed_this_period(self, last_claim_ms: u64, now_ms: u64) -> bool {
        last_claim_ms >= self.period_start(now_ms)
    }
}

impl fmt::Display for ResetTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ResetTime {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ResetTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResetTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DAY_INDEX: u64 = 20_000;

    fn at(day: u64, hour: u64, minute: u64) -> u64 {
        day * DAY_MS + (hour * 60 + minute) * MINUTE_MS
    }

    #[test]
    fn before_boundary_period_started_yesterday() {
        let reset = ResetTime::parse("08:20").unwrap();
        let now = at(DAY_INDEX, 8, 19);
        assert_eq!(reset.period_start(now), at(DAY_INDEX - 1, 8, 20));
    }

    #[test]
    fn after_boundary_period_started_today() {
        let reset = ResetTime::parse("08:20").unwrap();
        let now = at(DAY_INDEX, 8, 21);
        assert_eq!(reset.period_start(now), at(DAY_INDEX, 8, 20));
        assert_eq!(reset.next_period_start(now), at(DAY_INDEX + 1, 8, 20));
    }

    #[test]
    fn exactly_on_boundary_opens_new_period() {
        let reset = ResetTime::parse("08:20").unwrap();
        let now = at(DAY_INDEX, 8, 20);
        assert_eq!(reset.period_start(now), now);
        assert!(!reset.claimed_this_period(now - 1, now));
        assert!(reset.claimed_this_period(now, now));
    }

    #[test]
    fn yesterdays_late_claim_still_counts_before_boundary() {
        let reset = ResetTime::parse("08:20").unwrap();
        let last = at(DAY_INDEX - 1, 23, 0);
        assert!(reset.claimed_this_period(last, at(DAY_INDEX, 8, 0)));
        assert!(!reset.claimed_this_period(last, at(DAY_INDEX, 9, 0)));
    }

    #[test]
    fn parse_rejects_bad_reset_times() {
        for raw in ["8:20", "24:00", "12:60", "1200", "ab:cd", ""] {
            assert!(ResetTime::parse(raw).is_err(), "{raw:?} should be rejected");
        }
        assert_eq!(ResetTime::parse("00:00").unwrap(), ResetTime::MIDNIGHT);
        assert_eq!(ResetTime::parse("23:59").unwrap().to_string(), "23:59");
    }

    proptest! {
        #[test]
        fn period_start_brackets_now(now in DAY_MS..u64::MAX / 2, hour in 0u8..24, minute in 0u8..60) {
            let reset = ResetTime::new(hour, minute).unwrap();
            let start = reset.period_start(now);
            prop_assert!(start <= now);
            prop_assert!(now < start + DAY_MS);
            prop_assert_eq!(start % DAY_MS, reset.offset_ms());
        }
    }
}
