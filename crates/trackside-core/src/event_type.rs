//! Event type enum as the single source of truth for event type strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Event types written by the timing software on events, rounds and races.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    Race,
    TimeTrial,
    Practice,
    CasualPractice,
    Freestyle,
    Endurance,
    AggregateLaps,
}

impl EventType {
    /// Returns the exact string the timing software writes.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Race => "Race",
            Self::TimeTrial => "TimeTrial",
            Self::Practice => "Practice",
            Self::CasualPractice => "CasualPractice",
            Self::Freestyle => "Freestyle",
            Self::Endurance => "Endurance",
            Self::AggregateLaps => "AggregateLaps",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "race" => Ok(Self::Race),
            "timetrial" | "time_trial" | "time trial" => Ok(Self::TimeTrial),
            "practice" => Ok(Self::Practice),
            "casualpractice" => Ok(Self::CasualPractice),
            "freestyle" => Ok(Self::Freestyle),
            "endurance" => Ok(Self::Endurance),
            "aggregatelaps" => Ok(Self::AggregateLaps),
            _ => Err(UnknownEventType(s.to_string())),
        }
    }
}

impl Serialize for EventType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown event type strings.
#[derive(Debug, Clone, Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(String);
