//! Domain records reconstructed from timing-software exports.
//!
//! Each record has a lenient `from_json` constructor that reads the
//! PascalCase fields the timing software writes. Records serialize with
//! camelCase names for the reporting layer.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event_type::EventType;
use crate::fields::{self, Object};
use crate::types::{PilotId, RaceId, RoundId};

/// Laps at or above this length (seconds) are treated as timing glitches.
pub const MAX_VALID_LAP_SECONDS: f64 = 200.0;

/// A race-day event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Name of the directory the event file was found in.
    pub id: String,
    pub name: String,
    pub start: Option<String>,
    pub event_type: Option<EventType>,
    pub pilots_registered: Option<u32>,
    /// Race IDs the event declares.
    pub races: Vec<String>,
    /// Consecutive-lap count configured in the timing software.
    pub pb_laps: Option<u32>,
}

impl Event {
    pub(crate) fn from_json(id: &str, obj: &Object) -> Self {
        let races = obj
            .get("Races")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: id.to_string(),
            name: fields::string(obj, "Name").unwrap_or_default(),
            start: fields::string(obj, "Start"),
            event_type: parse_event_type(obj),
            pilots_registered: fields::unsigned(obj, "PilotsRegistered"),
            races,
            pb_laps: fields::unsigned(obj, "PBLaps"),
        }
    }
}

/// A registered pilot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pilot {
    pub id: PilotId,
    pub name: String,
    pub phonetic: Option<String>,
    pub photo_path: Option<String>,
    pub timing_sensitivity_percent: Option<f64>,
}

impl Pilot {
    pub(crate) fn from_json(obj: &Object) -> Option<Self> {
        let id = PilotId::new(fields::string(obj, "ID")?).ok()?;
        Some(Self {
            name: fields::string(obj, "Name").unwrap_or_else(|| id.to_string()),
            id,
            phonetic: fields::string(obj, "Phonetic"),
            photo_path: fields::string(obj, "PhotoPath"),
            timing_sensitivity_percent: fields::float(obj, "TimingSensitivityPercent"),
        })
    }
}

/// A round of racing, referenced by races through their `Round` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: RoundId,
    pub round_number: Option<u32>,
    pub event_type: Option<EventType>,
    /// Races of an invalid round are invalid too.
    pub valid: bool,
}

impl Round {
    pub(crate) fn from_json(obj: &Object) -> Option<Self> {
        Some(Self {
            id: RoundId::new(fields::string(obj, "ID")?).ok()?,
            round_number: fields::unsigned(obj, "RoundNumber"),
            event_type: parse_event_type(obj),
            valid: fields::boolean(obj, "Valid").unwrap_or(true),
        })
    }
}

/// One pilot's finishing result in a race.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceResult {
    pub pilot_id: PilotId,
    pub race_id: Option<RaceId>,
    /// 1-based finishing position.
    pub position: u32,
    /// Points as recorded by the timing software.
    pub points: i64,
    pub dnf: bool,
    pub result_type: Option<EventType>,
}

impl RaceResult {
    pub(crate) fn from_json(obj: &Object) -> Option<Self> {
        Some(Self {
            pilot_id: PilotId::new(fields::string(obj, "Pilot")?).ok()?,
            race_id: fields::string(obj, "Race").and_then(|id| RaceId::new(id).ok()),
            position: fields::unsigned(obj, "Position")?,
            points: fields::integer(obj, "Points").unwrap_or(0),
            dnf: fields::boolean(obj, "DNF").unwrap_or(false),
            result_type: event_type_field(obj, "ResultType"),
        })
    }
}

/// A single timed lap.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lap {
    pub pilot_id: PilotId,
    pub lap_number: i64,
    /// Lap length in seconds.
    pub length: f64,
    /// Seconds from race start to the end of this lap.
    pub race_time: Option<f64>,
    pub detection_valid: bool,
}

impl Lap {
    /// Whether this lap may contribute to any statistic.
    pub fn is_valid(&self) -> bool {
        self.detection_valid && self.length > 0.0 && self.length < MAX_VALID_LAP_SECONDS
    }
}

/// A race (heat) with its laps and, when available, its results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Race {
    pub id: RaceId,
    pub event_id: String,
    pub round_id: Option<RoundId>,
    pub round_number: Option<u32>,
    pub event_type: Option<EventType>,
    pub race_number: Option<u32>,
    pub valid: bool,
    pub start: Option<String>,
    pub end: Option<String>,
    pub target_laps: Option<u32>,
    pub laps: Vec<Lap>,
    /// `None` when no results file was found, which is normal for time trials.
    #[serde(rename = "result")]
    pub results: Option<Vec<RaceResult>>,
}

impl Race {
    /// Whether at least one result is attached.
    pub fn has_results(&self) -> bool {
        self.results.as_ref().is_some_and(|r| !r.is_empty())
    }

    /// Attached results, or an empty slice.
    pub fn results(&self) -> &[RaceResult] {
        self.results.as_deref().unwrap_or_default()
    }

    pub fn is_time_trial(&self) -> bool {
        self.event_type == Some(EventType::TimeTrial)
    }

    /// Pilots who took part: those with results, otherwise those with laps.
    pub fn participants(&self) -> Vec<&PilotId> {
        let mut seen = HashSet::new();
        let from_results: Vec<&PilotId> = self
            .results()
            .iter()
            .map(|r| &r.pilot_id)
            .filter(|id| seen.insert(*id))
            .collect();
        if !from_results.is_empty() {
            return from_results;
        }
        self.laps
            .iter()
            .map(|l| &l.pilot_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

pub(crate) fn parse_event_type(obj: &Object) -> Option<EventType> {
    event_type_field(obj, "EventType")
}

/// Reads an event type field, ignoring values the timing software may add later.
fn event_type_field(obj: &Object, key: &str) -> Option<EventType> {
    let raw = obj.get(key).filter(|v| !v.is_null())?;
    match EventType::deserialize(raw) {
        Ok(event_type) => Some(event_type),
        Err(e) => {
            tracing::debug!(field = key, error = %e, "ignoring event type");
            None
        }
    }
}

/// Reads a race's laps, resolving pilots through its detections.
///
/// A lap's own `Pilot` field wins; otherwise its `Detection` is looked up in
/// the race's `Detections`. Laps with no resolvable pilot are dropped.
pub(crate) fn parse_laps(race: &Object) -> Vec<Lap> {
    let detections: HashMap<String, &Object> = race
        .get("Detections")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|d| Some((fields::string(d, "ID")?, d)))
                .collect()
        })
        .unwrap_or_default();

    let race_start = fields::string(race, "Start").and_then(|s| parse_timestamp(&s));

    let mut laps: Vec<Lap> = race
        .get("Laps")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .filter_map(|lap| {
            let detection = fields::string(lap, "Detection").and_then(|id| detections.get(&id));
            let pilot = fields::string(lap, "Pilot")
                .or_else(|| detection.and_then(|d| fields::string(d, "Pilot")));
            let Some(pilot_id) = pilot.and_then(|p| PilotId::new(p).ok()) else {
                tracing::trace!("dropping lap without a resolvable pilot");
                return None;
            };

            let length = fields::float(lap, "LengthSeconds")
                .or_else(|| fields::float(lap, "Length"))
                .unwrap_or(0.0);

            let race_time = race_start.and_then(|start| {
                let end = parse_timestamp(&fields::string(lap, "EndTime")?)?;
                let elapsed_ms = (end - start).num_milliseconds();
                #[expect(clippy::cast_precision_loss, reason = "race durations are small")]
                let seconds = elapsed_ms as f64 / 1000.0;
                (elapsed_ms > 0).then_some(seconds)
            });

            Some(Lap {
                pilot_id,
                lap_number: fields::integer(lap, "LapNumber").unwrap_or(0),
                length,
                race_time,
                detection_valid: detection
                    .and_then(|d| fields::boolean(d, "Valid"))
                    .or_else(|| fields::boolean(lap, "Valid"))
                    .unwrap_or(true),
            })
        })
        .collect();

    fill_cumulative_race_time(&mut laps);
    laps
}

/// Fills missing race times with each pilot's running sum of lap lengths.
fn fill_cumulative_race_time(laps: &mut [Lap]) {
    if laps.iter().all(|l| l.race_time.is_some()) {
        return;
    }

    let mut order: Vec<usize> = (0..laps.len()).collect();
    order.sort_by(|&a, &b| {
        laps[a]
            .pilot_id
            .cmp(&laps[b].pilot_id)
            .then(laps[a].lap_number.cmp(&laps[b].lap_number))
    });

    let mut running: HashMap<PilotId, f64> = HashMap::new();
    for index in order {
        let lap = &mut laps[index];
        let total = running.entry(lap.pilot_id.clone()).or_insert(0.0);
        if lap.length > 0.0 {
            *total += lap.length;
        }
        if lap.race_time.is_none() {
            lap.race_time = Some(*total);
        }
    }
}

/// Parses the timestamp formats the timing software has been seen to write.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y/%m/%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}
