//! Wall-clock times of day as they appear in reservation URLs and pages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A time of day with second precision. Displays as `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u32);

impl ClockTime {
    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Option<Self> {
        if hour < 24 && minute < 60 && second < 60 {
            Some(Self(hour * 3600 + minute * 60 + second))
        } else {
            None
        }
    }

    /// Seconds since midnight.
    pub fn seconds(self) -> u32 {
        self.0
    }

    /// Normalize a loosely formatted time.
    ///
    /// Accepts `HHMM`, `HHMMSS`, `HH:MM`, `HH:MM:SS`, `%3A`-encoded colons
    /// and a trailing `Z`. Anything out of range yields `None`.
    pub fn parse_loose(raw: &str) -> Option<Self> {
        let raw = raw.trim().replace("%3a", ":").replace("%3A", ":");
        let raw = raw
            .strip_suffix('Z')
            .or_else(|| raw.strip_suffix('z'))
            .unwrap_or(&raw);
        if raw.is_empty() {
            return None;
        }

        if raw.bytes().all(|b| b.is_ascii_digit()) {
            let num = |s: &str| s.parse::<u32>().ok();
            return match raw.len() {
                4 => Self::from_hms(num(&raw[..2])?, num(&raw[2..])?, 0),
                6 => Self::from_hms(num(&raw[..2])?, num(&raw[2..4])?, num(&raw[4..])?),
                _ => None,
            };
        }

        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() < 2 {
            return None;
        }
        let hour = parts[0].trim().parse().ok()?;
        let minute = parts[1].trim().parse().ok()?;
        let second = match parts.get(2) {
            Some(s) => s.trim().parse().ok()?,
            None => 0,
        };
        Self::from_hms(hour, minute, second)
    }

    /// Normalize a JSON value: strings as in [`ClockTime::parse_loose`],
    /// non-negative numbers as `HHMM` integers.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::parse_loose(s),
            Value::Number(n) => {
                let int = n
                    .as_u64()
                    .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.trunc() as u64))?;
                Self::parse_loose(&format!("{int:04}"))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.0 / 3600,
            (self.0 / 60) % 60,
            self.0 % 60
        )
    }
}

impl FromStr for ClockTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_loose(s).ok_or_else(|| format!("unrecognised time of day: {s:?}"))
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognised time of day: {value}")))
    }
}
