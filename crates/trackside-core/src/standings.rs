//! Season standings built on corrected points.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::aggregate::RecordSet;
use crate::analysis::AnalysisConfig;
use crate::event_type::EventType;
use crate::grading::{Grade, GradeAssignment, RoundStructure, assign_grades};
use crate::insights::chronological;
use crate::laps::{best_window, consistency, mean, valid_laps_by_pilot};
use crate::points::{CorrectedPoints, corrected_points_table};
use crate::seeding::{SeedingEntry, compute_seeding};
use crate::record::Lap;
use crate::types::{PilotId, RaceId};

/// One race result in a pilot's standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingRace {
    pub race_id: RaceId,
    pub round: Option<u32>,
    pub grade: Option<Grade>,
    pub position: u32,
    pub dnf: bool,
    /// Points recorded by the timing software.
    pub points: i64,
}

/// A pilot's time-trial record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTrialStats {
    /// Time trials with at least one valid lap.
    pub count: usize,
    /// Number of laps in the consecutive run: the event's `PBLaps`, else
    /// the configured default.
    pub consecutive_laps: usize,
    /// Fastest run of consecutive laps over all time-trial laps in order.
    pub best_consecutive: Option<f64>,
    /// Percent by which the average lap of the last time trial beats the
    /// first. Needs two time trials.
    pub improvement: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub position: usize,
    pub pilot_id: PilotId,
    pub pilot_name: String,
    /// Sum of corrected points over all rounds.
    pub corrected_points: u32,
    /// Sum of points recorded by the timing software.
    pub raw_points: i64,
    /// Ordered by round, then race ID.
    pub race_results: Vec<StandingRace>,
    /// Number of `Race`-type results.
    pub races: usize,
    pub wins: usize,
    pub podiums: usize,
    pub dnfs: usize,
    /// Percentages of `races`; `None` without races.
    pub win_rate: Option<f64>,
    pub dnf_rate: Option<f64>,
    /// Mean finishing position, DNFs included.
    pub average_position: Option<f64>,
    pub best_lap: Option<f64>,
    pub average_lap: Option<f64>,
    pub consistency: Option<f64>,
    pub time_trial: Option<TimeTrialStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedStandings {
    pub standings: Vec<Standing>,
    pub race_structure: Vec<RoundStructure>,
    pub grade_assignments: Vec<GradeAssignment>,
    pub corrected_points: CorrectedPoints,
    pub seeding: Vec<SeedingEntry>,
}

#[derive(Debug, Default)]
struct Tally<'a> {
    corrected_points: u32,
    raw_points: i64,
    race_results: Vec<StandingRace>,
    wins: usize,
    podiums: usize,
    dnfs: usize,
    laps: Vec<f64>,
    /// Valid laps of each time trial, in chronological order.
    time_trials: Vec<Vec<&'a Lap>>,
}

#[expect(clippy::cast_precision_loss, reason = "race counts are small")]
fn percentage(count: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| count as f64 / total as f64 * 100.0)
}

fn time_trial_stats(trials: &[Vec<&Lap>], consecutive_laps: usize) -> Option<TimeTrialStats> {
    let lengths = |laps: &Vec<&Lap>| laps.iter().map(|l| l.length).collect::<Vec<f64>>();
    let (first, last) = (trials.first()?, trials.last()?);

    let all_laps: Vec<&Lap> = trials.iter().flatten().copied().collect();
    let improvement = if trials.len() < 2 {
        None
    } else {
        match (mean(&lengths(first)), mean(&lengths(last))) {
            (Some(first), Some(last)) if first > 0.0 => Some((first - last) / first * 100.0),
            _ => None,
        }
    };

    Some(TimeTrialStats {
        count: trials.len(),
        consecutive_laps,
        best_consecutive: best_window(&all_laps, consecutive_laps).map(|w| w.sum),
        improvement,
    })
}

/// Runs seeding, grading and points, and ranks every pilot who took part
/// in a valid race.
///
/// Only results from `Race`-type races count toward wins, podiums and DNFs.
/// Time-trial runs use the primary event's `PBLaps` when it is set.
pub fn enhanced_standings(records: &RecordSet, config: &AnalysisConfig) -> EnhancedStandings {
    let seeding = compute_seeding(records, config);
    let grading = assign_grades(records, &seeding, config);
    let corrected_points = corrected_points_table(records, &grading, config);

    let grades: HashMap<&RaceId, Grade> = grading
        .assignments
        .iter()
        .map(|a| (&a.race_id, a.grade))
        .collect();
    let mut tallies: BTreeMap<&PilotId, Tally<'_>> = BTreeMap::new();

    for race in chronological(records) {
        if race.is_time_trial() {
            for (pilot_id, laps) in valid_laps_by_pilot(race) {
                tallies.entry(pilot_id).or_default().time_trials.push(laps);
            }
        }
    }

    for race in records.valid_races() {
        for (pilot_id, laps) in valid_laps_by_pilot(race) {
            tallies
                .entry(pilot_id)
                .or_default()
                .laps
                .extend(laps.iter().map(|l| l.length));
        }

        if race.event_type != Some(EventType::Race) {
            continue;
        }
        for result in race.results() {
            let tally = tallies.entry(&result.pilot_id).or_default();
            tally.raw_points += result.points;
            if result.dnf {
                tally.dnfs += 1;
            } else {
                tally.wins += usize::from(result.position == 1);
                tally.podiums += usize::from((1..=3).contains(&result.position));
            }
            tally.race_results.push(StandingRace {
                race_id: race.id.clone(),
                round: race.round_number,
                grade: grades.get(&race.id).copied(),
                position: result.position,
                dnf: result.dnf,
                points: result.points,
            });
        }
    }

    for round in corrected_points.values() {
        for (pilot_id, points) in round {
            tallies.entry(pilot_id).or_default().corrected_points += points;
        }
    }

    let consecutive_laps = records
        .primary_event()
        .and_then(|e| e.pb_laps)
        .and_then(|n| usize::try_from(n).ok())
        .filter(|&n| n > 0)
        .unwrap_or(config.consecutive_laps);

    let mut standings: Vec<Standing> = tallies
        .into_iter()
        .map(|(pilot_id, mut tally)| {
            tally.race_results.sort_by(|a, b| {
                let key = |r: &StandingRace| (r.round.is_none(), r.round);
                key(a).cmp(&key(b)).then_with(|| a.race_id.cmp(&b.race_id))
            });
            let races = tally.race_results.len();
            let positions: Vec<f64> = tally
                .race_results
                .iter()
                .map(|r| f64::from(r.position))
                .collect();
            Standing {
                position: 0,
                pilot_name: records.pilot_name(pilot_id),
                pilot_id: pilot_id.clone(),
                corrected_points: tally.corrected_points,
                raw_points: tally.raw_points,
                races,
                wins: tally.wins,
                podiums: tally.podiums,
                dnfs: tally.dnfs,
                win_rate: percentage(tally.wins, races),
                dnf_rate: percentage(tally.dnfs, races),
                average_position: mean(&positions),
                race_results: tally.race_results,
                best_lap: tally.laps.iter().copied().reduce(f64::min),
                average_lap: mean(&tally.laps),
                consistency: consistency(&tally.laps),
                time_trial: time_trial_stats(&tally.time_trials, consecutive_laps),
            }
        })
        .collect();

    standings.sort_by(|a, b| {
        b.corrected_points
            .cmp(&a.corrected_points)
            .then(b.wins.cmp(&a.wins))
            .then(b.podiums.cmp(&a.podiums))
            .then_with(|| a.pilot_name.cmp(&b.pilot_name))
            .then_with(|| a.pilot_id.cmp(&b.pilot_id))
    });
    for (index, standing) in standings.iter_mut().enumerate() {
        standing.position = index + 1;
    }

    EnhancedStandings {
        standings,
        race_structure: grading.race_structure,
        grade_assignments: grading.assignments,
        corrected_points,
        seeding,
    }
}
