use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Time-of-day parsing helpers
// ---------------------------------------------------------------------------

const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S"];

/// A same-day clock time, stored as minutes since midnight.
///
/// Arithmetic never wraps past midnight: a match pushed beyond the end of the
/// day simply renders as `24:10`, which the validator then reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ClockTime(u32);

impl ClockTime {
    pub const fn from_minutes(minutes: u32) -> Self {
        ClockTime(minutes)
    }

    pub const fn from_hm(hour: u32, minute: u32) -> Self {
        ClockTime(hour * 60 + minute)
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    /// Parse `HH:MM` (or `HH:MM:SS`, as emitted by browser time inputs).
    /// Returns `None` for anything else, including blank strings.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        TIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
            .map(|t| ClockTime(t.hour() * 60 + t.minute()))
    }

    pub fn plus_minutes(self, minutes: u32) -> Self {
        ClockTime(self.0.saturating_add(minutes))
    }
}

impl Add<u32> for ClockTime {
    type Output = ClockTime;

    fn add(self, minutes: u32) -> ClockTime {
        self.plus_minutes(minutes)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid time of day '{0}'")]
pub struct InvalidTime(pub String);

/// Accepts everything `parse` does plus hours past midnight ("24:10"),
/// which a schedule can hold after manual edits push matches late.
impl FromStr for ClockTime {
    type Err = InvalidTime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(t) = ClockTime::parse(s) {
            return Ok(t);
        }
        let invalid = || InvalidTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let h: u32 = h.parse().map_err(|_| invalid())?;
        let m: u32 = m.get(..2).unwrap_or(m).parse().map_err(|_| invalid())?;
        if m >= 60 {
            return Err(invalid());
        }
        h.checked_mul(60)
            .and_then(|mins| mins.checked_add(m))
            .map(ClockTime::from_minutes)
            .ok_or_else(invalid)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
