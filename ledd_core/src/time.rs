//! Time-of-day helpers.
//!
//! All schedule arithmetic happens in whole minutes since midnight; times are
//! exchanged as `HH:MM` strings in every file format.

use chrono::{NaiveTime, Timelike};

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Minutes since midnight (seconds are dropped)
pub fn to_minutes(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Time of day for a minute offset, saturating at 23:59
pub fn from_minutes(minutes: u32) -> NaiveTime {
    let minutes = minutes.min(MINUTES_PER_DAY - 1);
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap_or(NaiveTime::MIN)
}

/// Parse an `HH:MM` (or `HH:MM:SS`) cell
pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

/// Format as `HH:MM`
pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Serde adapter for `NaiveTime` as `HH:MM`
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_hhmm(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_hhmm(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid time of day '{}'", s)))
    }
}

/// Serde adapter for `Option<NaiveTime>` as `HH:MM`; blank strings read as `None`
pub mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => serializer.serialize_some(&super::format_hhmm(*t)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        match s {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => super::parse_hhmm(&s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid time of day '{}'", s))),
        }
    }
}
