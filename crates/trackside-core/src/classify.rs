//! Classification of JSON payloads into record kinds.
//!
//! Files exported by the timing software are not reliably named or placed, so
//! each payload is classified by file name first and by shape second. The
//! checks run in a fixed order and later checks assume earlier ones did not
//! match:
//!
//! 1. Exact file name (case-insensitive): `event.json`, `pilots.json`,
//!    `rounds.json`, `race.json`, `result.json`.
//! 2. An empty array is [`RecordKind::Empty`].
//! 3. The first element of an array is checked for, in order: event, pilots,
//!    rounds, race, result, and finally a loose pilots fallback.
//! 4. A single object only gets the event, race and result checks.
//! 5. Anything else is [`RecordKind::Unknown`].

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::fields::{Object, has};

/// The kind of records a JSON payload holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Event,
    Pilots,
    Rounds,
    Race,
    Result,
    Empty,
    Unknown,
}

impl RecordKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Pilots => "pilots",
            Self::Rounds => "rounds",
            Self::Race => "race",
            Self::Result => "result",
            Self::Empty => "empty",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a parsed payload given the name of the file it came from.
pub fn classify(value: &Value, file_name: &str) -> RecordKind {
    if let Some(kind) = kind_from_file_name(file_name) {
        return kind;
    }

    match value {
        Value::Array(items) => match items.first() {
            None => RecordKind::Empty,
            Some(Value::Object(first)) => classify_array_element(first),
            Some(_) => RecordKind::Unknown,
        },
        Value::Object(obj) => classify_single_object(obj),
        _ => RecordKind::Unknown,
    }
}

fn kind_from_file_name(file_name: &str) -> Option<RecordKind> {
    let name = file_name.to_ascii_lowercase();
    match name.as_str() {
        "event.json" => Some(RecordKind::Event),
        "pilots.json" => Some(RecordKind::Pilots),
        "rounds.json" => Some(RecordKind::Rounds),
        "race.json" => Some(RecordKind::Race),
        "result.json" => Some(RecordKind::Result),
        _ => None,
    }
}

fn classify_array_element(obj: &Object) -> RecordKind {
    if looks_like_event(obj) {
        RecordKind::Event
    } else if looks_like_pilot(obj) {
        RecordKind::Pilots
    } else if looks_like_round(obj) {
        RecordKind::Rounds
    } else if looks_like_race(obj) {
        RecordKind::Race
    } else if looks_like_result(obj) {
        RecordKind::Result
    } else if has(obj, "ID")
        && has(obj, "Name")
        && !has(obj, "RoundNumber")
        && !has(obj, "Position")
        && !has(obj, "Laps")
    {
        RecordKind::Pilots
    } else {
        RecordKind::Unknown
    }
}

fn classify_single_object(obj: &Object) -> RecordKind {
    if looks_like_event(obj) {
        RecordKind::Event
    } else if looks_like_race(obj) {
        RecordKind::Race
    } else if looks_like_result(obj) {
        RecordKind::Result
    } else {
        RecordKind::Unknown
    }
}

fn looks_like_event(obj: &Object) -> bool {
    has(obj, "Name") && has(obj, "EventType") && has(obj, "Start")
}

fn looks_like_pilot(obj: &Object) -> bool {
    has(obj, "ID")
        && has(obj, "Name")
        && (has(obj, "Phonetic") || has(obj, "PhotoPath") || has(obj, "TimingSensitivityPercent"))
}

fn looks_like_round(obj: &Object) -> bool {
    has(obj, "RoundNumber") && has(obj, "EventType")
}

fn looks_like_race(obj: &Object) -> bool {
    has(obj, "Laps") || (has(obj, "RoundNumber") && (has(obj, "StartTime") || has(obj, "EndTime")))
}

fn looks_like_result(obj: &Object) -> bool {
    has(obj, "Position") && has(obj, "Pilot")
}
