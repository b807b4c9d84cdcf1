//! Aggregation of classified JSON files into one record set.
//!
//! # Merge rules
//!
//! - Events are appended; the first is the primary event.
//! - Pilots are deduplicated by ID. A later file overwrites an earlier one,
//!   where "later" is sorted relative-path order.
//! - Rounds are indexed by ID for race backfill.
//! - Results are indexed by their `Race` field and by containing directory.
//! - Races are accepted when they carry any race-like field. Results attach by
//!   race ID first, then by directory. Missing round number and event type are
//!   filled in from the referenced round.
//!
//! Files that cannot be read or classified are reported in
//! [`AggregateReport`] and never abort the aggregation. Only a missing data
//! root is an error.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::classify::{RecordKind, classify};
use crate::fields::{self, Object, has};
use crate::record::{Event, Pilot, Race, RaceResult, Round, parse_event_type, parse_laps};
use crate::source::{
    DEFAULT_MAX_DEPTH, FileTree, FsTree, SkippedFile, SourceFile, discover_json_files,
    read_source, read_sources,
};
use crate::types::{PilotId, RaceId, RoundId};

const EVENT_FILE: &str = "Event.json";

/// Fields whose presence marks an object as a race.
const RACE_FIELDS: &[&str] = &[
    "Laps",
    "Detections",
    "RaceNumber",
    "Start",
    "PilotChannels",
    "Round",
    "Event",
];

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("data root not found: {}", .0.display())]
    MissingDataRoot(PathBuf),
}

/// Options for an aggregation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Maximum directory depth below the root to scan.
    pub max_depth: usize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// The canonical records reconstructed from one snapshot of a data root.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSet {
    pub events: Vec<Event>,
    pub pilots: Vec<Pilot>,
    pub rounds: Vec<Round>,
    pub races: Vec<Race>,
}

impl RecordSet {
    /// The first event found, if any.
    pub fn primary_event(&self) -> Option<&Event> {
        self.events.first()
    }

    pub fn pilot(&self, id: &PilotId) -> Option<&Pilot> {
        self.pilots.iter().find(|p| &p.id == id)
    }

    /// The pilot's display name, or the raw ID for unregistered pilots.
    pub fn pilot_name(&self, id: &PilotId) -> String {
        self.pilot(id)
            .map_or_else(|| id.to_string(), |p| p.name.clone())
    }

    pub fn round(&self, id: &RoundId) -> Option<&Round> {
        self.rounds.iter().find(|r| &r.id == id)
    }

    /// Races not explicitly flagged invalid by the timing software.
    pub fn valid_races(&self) -> impl Iterator<Item = &Race> {
        self.races.iter().filter(|r| r.valid)
    }
}

/// Diagnostics collected during aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub files_scanned: usize,
    /// Number of files per classified kind.
    pub kinds: BTreeMap<String, usize>,
    pub unknown_files: Vec<PathBuf>,
    pub empty_files: Vec<PathBuf>,
    pub skipped_files: Vec<SkippedFile>,
    /// Objects inside classified files that could not be interpreted.
    pub rejected_records: usize,
    pub races_with_results: usize,
}

/// Result of an aggregation run.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub records: RecordSet,
    pub report: AggregateReport,
}

/// Aggregates every JSON file below `root` on disk.
pub fn aggregate_dir(root: &Path, options: &AggregateOptions) -> Result<Aggregation, AggregateError> {
    let tree = FsTree::new(root);
    if !tree.root_exists() {
        return Err(AggregateError::MissingDataRoot(root.to_path_buf()));
    }
    Ok(aggregate_tree(&tree, options))
}

/// Aggregates every JSON file reachable in `tree`.
///
/// All files are read before classification starts.
pub fn aggregate_tree(tree: &dyn FileTree, options: &AggregateOptions) -> Aggregation {
    let paths = discover_json_files(tree, options.max_depth);
    let (sources, skipped) = read_sources(tree, &paths);

    let mut aggregation = aggregate_sources(&tree.root_name(), &sources);
    aggregation.report.files_scanned = paths.len();
    aggregation.report.skipped_files = skipped;

    tracing::info!(
        files = paths.len(),
        events = aggregation.records.events.len(),
        pilots = aggregation.records.pilots.len(),
        races = aggregation.records.races.len(),
        with_results = aggregation.report.races_with_results,
        "aggregated records"
    );
    aggregation
}

/// Classifies and merges already-parsed files.
///
/// `root_name` is the event ID used for files at the root.
pub fn aggregate_sources(root_name: &str, sources: &[SourceFile]) -> Aggregation {
    let mut aggregator = Aggregator::new(root_name);
    for source in sources {
        aggregator.add(source);
    }
    aggregator.finish()
}

/// Lists the events stored directly below the root, one per directory
/// holding a non-empty `Event.json` (matched case-insensitively).
///
/// Directories without an event file are skipped silently.
pub fn list_events(tree: &dyn FileTree) -> Vec<Event> {
    let entries = match tree.list_dir(Path::new("")) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(error = %err, "failed to list data root");
            return Vec::new();
        }
    };

    let mut dirs: Vec<String> = entries
        .into_iter()
        .filter(|e| e.is_dir)
        .map(|e| e.name)
        .collect();
    dirs.sort();

    dirs.into_iter()
        .filter_map(|dir| {
            let path = event_file_in(tree, &dir)?;
            let value = match read_source(tree, &path) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(path = ?path, error = %err, "skipping unreadable event file");
                    return None;
                }
            };
            objects(&value)
                .first()
                .map(|obj| Event::from_json(&dir, obj))
        })
        .collect()
}

/// The event file of a directory, whatever its case.
fn event_file_in(tree: &dyn FileTree, dir: &str) -> Option<PathBuf> {
    let entries = match tree.list_dir(Path::new(dir)) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %dir, error = %err, "failed to list event directory");
            return None;
        }
    };
    let found = entries
        .into_iter()
        .find(|e| !e.is_dir && e.name.eq_ignore_ascii_case(EVENT_FILE));
    if found.is_none() {
        tracing::trace!(dir = %dir, "directory has no event file");
    }
    found.map(|e| Path::new(dir).join(e.name))
}

/// A race object waiting for all results and rounds to be known.
struct PendingRace<'a> {
    obj: &'a Object,
    dir: &'a Path,
    /// How many ID-less races came before this one in the same directory.
    unnamed_index: usize,
}

struct Aggregator<'a> {
    root_name: String,
    report: AggregateReport,
    events: Vec<Event>,
    event_dirs: HashMap<PathBuf, String>,
    pilots: Vec<Pilot>,
    pilot_index: HashMap<PilotId, usize>,
    rounds: Vec<Round>,
    round_index: HashMap<RoundId, usize>,
    results_by_race: HashMap<RaceId, Vec<RaceResult>>,
    results_by_dir: HashMap<PathBuf, Vec<RaceResult>>,
    pending_races: Vec<PendingRace<'a>>,
    unnamed_races: HashMap<&'a Path, usize>,
}

impl<'a> Aggregator<'a> {
    fn new(root_name: &str) -> Self {
        Self {
            root_name: root_name.to_string(),
            report: AggregateReport::default(),
            events: Vec::new(),
            event_dirs: HashMap::new(),
            pilots: Vec::new(),
            pilot_index: HashMap::new(),
            rounds: Vec::new(),
            round_index: HashMap::new(),
            results_by_race: HashMap::new(),
            results_by_dir: HashMap::new(),
            pending_races: Vec::new(),
            unnamed_races: HashMap::new(),
        }
    }

    fn add(&mut self, source: &'a SourceFile) {
        let kind = classify(&source.value, source.file_name());
        *self.report.kinds.entry(kind.to_string()).or_insert(0) += 1;

        match kind {
            RecordKind::Event => self.add_events(source),
            RecordKind::Pilots => self.add_pilots(source),
            RecordKind::Rounds => self.add_rounds(source),
            RecordKind::Result => self.add_results(source),
            RecordKind::Race => {
                for obj in objects(&source.value) {
                    if RACE_FIELDS.iter().any(|f| has(obj, f)) {
                        let dir = source.dir();
                        let unnamed_index = if has(obj, "ID") {
                            0
                        } else {
                            let count = self.unnamed_races.entry(dir).or_insert(0);
                            *count += 1;
                            *count - 1
                        };
                        self.pending_races.push(PendingRace {
                            obj,
                            dir,
                            unnamed_index,
                        });
                    } else {
                        self.reject(source, "object has no race fields");
                    }
                }
            }
            RecordKind::Empty => self.report.empty_files.push(source.path.clone()),
            RecordKind::Unknown => {
                tracing::debug!(path = ?source.path, "could not classify JSON file");
                self.report.unknown_files.push(source.path.clone());
            }
        }
    }

    fn reject(&mut self, source: &SourceFile, reason: &str) {
        tracing::warn!(path = ?source.path, reason, "skipping record");
        self.report.rejected_records += 1;
    }

    fn dir_name(&self, dir: &Path) -> String {
        dir.file_name()
            .and_then(|n| n.to_str())
            .map_or_else(|| self.root_name.clone(), String::from)
    }

    fn add_events(&mut self, source: &SourceFile) {
        let event_id = self.dir_name(source.dir());
        for obj in objects(&source.value) {
            self.events.push(Event::from_json(&event_id, obj));
        }
        self.event_dirs
            .entry(source.dir().to_path_buf())
            .or_insert(event_id);
    }

    fn add_pilots(&mut self, source: &SourceFile) {
        for obj in objects(&source.value) {
            let Some(pilot) = Pilot::from_json(obj) else {
                self.reject(source, "pilot without ID");
                continue;
            };
            if let Some(&index) = self.pilot_index.get(&pilot.id) {
                let previous = &self.pilots[index];
                if previous.name != pilot.name {
                    tracing::debug!(
                        pilot = %pilot.id,
                        previous = %previous.name,
                        replacement = %pilot.name,
                        path = ?source.path,
                        "later pilot record overrides earlier one"
                    );
                }
                self.pilots[index] = pilot;
            } else {
                self.pilot_index.insert(pilot.id.clone(), self.pilots.len());
                self.pilots.push(pilot);
            }
        }
    }

    fn add_rounds(&mut self, source: &SourceFile) {
        for obj in objects(&source.value) {
            let Some(round) = Round::from_json(obj) else {
                self.reject(source, "round without ID");
                continue;
            };
            if let Some(&index) = self.round_index.get(&round.id) {
                self.rounds[index] = round;
            } else {
                self.round_index.insert(round.id.clone(), self.rounds.len());
                self.rounds.push(round);
            }
        }
    }

    fn add_results(&mut self, source: &SourceFile) {
        for obj in objects(&source.value) {
            let Some(result) = RaceResult::from_json(obj) else {
                self.reject(source, "result without pilot or position");
                continue;
            };
            if let Some(race_id) = &result.race_id {
                self.results_by_race
                    .entry(race_id.clone())
                    .or_default()
                    .push(result.clone());
            }
            self.results_by_dir
                .entry(source.dir().to_path_buf())
                .or_default()
                .push(result);
        }
    }

    fn event_id_for(&self, dir: &Path, obj: &Object) -> String {
        dir.ancestors()
            .find_map(|ancestor| self.event_dirs.get(ancestor).cloned())
            .or_else(|| fields::string(obj, "Event"))
            .unwrap_or_else(|| self.root_name.clone())
    }

    /// `ID`, else the directory name (suffixed from the second ID-less race
    /// in that directory on), else a composite of race number and round.
    fn race_id_for(&self, pending: &PendingRace<'_>) -> Option<RaceId> {
        let PendingRace {
            obj,
            dir,
            unnamed_index,
        } = pending;
        if let Some(id) = fields::string(obj, "ID") {
            return RaceId::new(id).ok();
        }
        if dir.file_name().is_some() {
            let name = self.dir_name(dir);
            return match unnamed_index {
                0 => RaceId::new(name).ok(),
                n => RaceId::new(format!("{name}-{}", n + 1)).ok(),
            };
        }
        let race_number = fields::unsigned(obj, "RaceNumber")
            .map_or_else(|| "x".to_string(), |n| n.to_string());
        let round = fields::string(obj, "Round")
            .or_else(|| fields::unsigned(obj, "RoundNumber").map(|n| n.to_string()))
            .unwrap_or_else(|| "x".to_string());
        RaceId::new(format!("race-{race_number}-{round}")).ok()
    }

    fn build_race(&self, pending: &PendingRace<'_>) -> Option<Race> {
        let id = self.race_id_for(pending)?;
        let PendingRace { obj, dir, .. } = pending;

        let round_id = fields::string(obj, "Round").and_then(|r| RoundId::new(r).ok());
        let round = round_id
            .as_ref()
            .and_then(|r| self.round_index.get(r))
            .map(|&index| &self.rounds[index]);
        if round_id.is_some() && round.is_none() {
            tracing::debug!(race = %id, "race references an unknown round");
        }

        let results = self
            .results_by_race
            .get(&id)
            .or_else(|| self.results_by_dir.get(*dir))
            .cloned();
        if results.is_none() {
            tracing::trace!(race = %id, "no results for race");
        }

        Some(Race {
            event_id: self.event_id_for(dir, obj),
            round_number: fields::unsigned(obj, "RoundNumber")
                .or_else(|| round.and_then(|r| r.round_number)),
            event_type: parse_event_type(obj).or_else(|| round.and_then(|r| r.event_type)),
            race_number: fields::unsigned(obj, "RaceNumber"),
            valid: fields::boolean(obj, "Valid").unwrap_or(true)
                && round.is_none_or(|r| r.valid),
            start: fields::string(obj, "Start"),
            end: fields::string(obj, "End"),
            target_laps: fields::unsigned(obj, "TargetLaps"),
            laps: parse_laps(obj),
            results,
            round_id,
            id,
        })
    }

    fn finish(mut self) -> Aggregation {
        let pending = std::mem::take(&mut self.pending_races);
        let mut races: Vec<Race> = Vec::with_capacity(pending.len());

        for item in &pending {
            let Some(race) = self.build_race(item) else {
                tracing::warn!(dir = ?item.dir, "skipping race without usable ID");
                self.report.rejected_records += 1;
                continue;
            };
            if races.iter().any(|r| r.id == race.id) {
                tracing::warn!(race = %race.id, "skipping duplicate race");
                self.report.rejected_records += 1;
                continue;
            }
            races.push(race);
        }

        self.report.races_with_results = races.iter().filter(|r| r.has_results()).count();

        Aggregation {
            records: RecordSet {
                events: self.events,
                pilots: self.pilots,
                rounds: self.rounds,
                races,
            },
            report: self.report,
        }
    }
}

/// The objects of a payload: each object of an array, or the object itself.
fn objects(value: &Value) -> Vec<&Object> {
    match value {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(obj) => vec![obj],
        _ => Vec::new(),
    }
}
