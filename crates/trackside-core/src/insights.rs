//! Performance insights: fastest laps, hole-shots, gaps and personal bests.
//!
//! Every insight reads only valid laps of valid races. The engines are
//! independent of seeding and grading.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::aggregate::RecordSet;
use crate::analysis::AnalysisConfig;
use crate::laps::{best_window, consistency, fastest, mean, valid_laps_by_pilot, windows};
use crate::record::Race;
use crate::seeding::is_qualifying;
use crate::types::{PilotId, RaceId};

/// A pilot's place in the qualifying fastest-lap ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FastestLapEntry {
    pub position: usize,
    pub group: usize,
    pub pilot_id: PilotId,
    pub pilot: String,
    pub fastest_lap_time: f64,
    pub round: Option<u32>,
    pub best_consecutive_time: Option<f64>,
    pub hole_shot: Option<f64>,
    pub hole_shot_round: Option<u32>,
}

#[derive(Debug, Default)]
struct QualifyingBest {
    fastest: Option<(f64, Option<u32>)>,
    consecutive: Option<(f64, Option<f64>, Option<u32>)>,
}

/// Ranks pilots by their fastest valid lap in qualifying rounds.
pub fn fastest_lap_rankings(records: &RecordSet, config: &AnalysisConfig) -> Vec<FastestLapEntry> {
    let mut best: BTreeMap<&PilotId, QualifyingBest> = BTreeMap::new();

    for race in records.races.iter().filter(|r| is_qualifying(r, config)) {
        for (pilot_id, laps) in valid_laps_by_pilot(race) {
            let entry = best.entry(pilot_id).or_default();

            if let Some(lap) = fastest(&laps) {
                if entry.fastest.is_none_or(|(current, _)| lap < current) {
                    entry.fastest = Some((lap, race.round_number));
                }
            }

            if let Some(window) = best_window(&laps, config.consecutive_laps) {
                let improves = entry
                    .consecutive
                    .is_none_or(|(current, _, _)| window.sum < current);
                if improves {
                    entry.consecutive = Some((window.sum, window.hole_shot(), race.round_number));
                }
            }
        }
    }

    let mut rankings: Vec<FastestLapEntry> = best
        .into_iter()
        .filter_map(|(pilot_id, best)| {
            let (fastest_lap_time, round) = best.fastest?;
            let consecutive = best.consecutive;
            let hole_shot = consecutive.and_then(|(_, hole_shot, _)| hole_shot);
            Some(FastestLapEntry {
                position: 0,
                group: 0,
                pilot: records.pilot_name(pilot_id),
                pilot_id: pilot_id.clone(),
                fastest_lap_time,
                round,
                best_consecutive_time: consecutive.map(|(sum, _, _)| sum),
                hole_shot,
                hole_shot_round: hole_shot.and(consecutive.and_then(|(_, _, round)| round)),
            })
        })
        .collect();

    rankings.sort_by(|a, b| {
        a.fastest_lap_time
            .total_cmp(&b.fastest_lap_time)
            .then_with(|| a.pilot_id.cmp(&b.pilot_id))
    });
    let group_size = config.group_size.max(1);
    for (index, entry) in rankings.iter_mut().enumerate() {
        entry.position = index + 1;
        entry.group = entry.position.div_ceil(group_size);
    }
    rankings
}

/// One hole-shot measured over a window of consecutive laps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoleShotObservation {
    pub pilot_id: PilotId,
    /// Display name.
    pub pilot: String,
    pub race_id: RaceId,
    pub round: Option<u32>,
    /// Race time spent before the window started.
    pub hole_shot: f64,
    /// Summed lap lengths of the window.
    pub window_time: f64,
    /// Race time when the window's last lap ended.
    pub race_time: f64,
}

/// A pilot's place in the hole-shot ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoleShotRanking {
    /// 1-based, fastest hole-shot first.
    pub position: usize,
    pub pilot_id: PilotId,
    /// Display name.
    pub pilot: String,
    /// Smallest hole-shot over all the pilot's windows.
    pub best_hole_shot: f64,
    /// Round of the race that produced the best hole-shot.
    pub best_round: Option<u32>,
    /// Number of windows that produced a hole-shot.
    pub improvements: usize,
    pub average_hole_shot: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoleShotAnalysis {
    pub rankings: Vec<HoleShotRanking>,
    pub all_hole_shots: Vec<HoleShotObservation>,
}

/// Measures hole-shots over every window of every valid race.
pub fn hole_shot_analysis(records: &RecordSet, config: &AnalysisConfig) -> HoleShotAnalysis {
    let mut all_hole_shots = Vec::new();

    for race in records.valid_races() {
        for (pilot_id, laps) in valid_laps_by_pilot(race) {
            if laps.len() < config.consecutive_laps {
                continue;
            }
            for window in windows(&laps, config.consecutive_laps) {
                let (Some(hole_shot), Some(race_time)) = (window.hole_shot(), window.race_time_at_end)
                else {
                    continue;
                };
                all_hole_shots.push(HoleShotObservation {
                    pilot_id: pilot_id.clone(),
                    pilot: records.pilot_name(pilot_id),
                    race_id: race.id.clone(),
                    round: race.round_number,
                    hole_shot,
                    window_time: window.sum,
                    race_time,
                });
            }
        }
    }

    let mut by_pilot: BTreeMap<&PilotId, Vec<&HoleShotObservation>> = BTreeMap::new();
    for observation in &all_hole_shots {
        by_pilot.entry(&observation.pilot_id).or_default().push(observation);
    }

    let mut rankings: Vec<HoleShotRanking> = by_pilot
        .into_iter()
        .filter_map(|(pilot_id, observations)| {
            let best = observations
                .iter()
                .copied()
                .reduce(|a, b| if b.hole_shot < a.hole_shot { b } else { a })?;
            let values: Vec<f64> = observations.iter().map(|o| o.hole_shot).collect();
            Some(HoleShotRanking {
                position: 0,
                pilot_id: pilot_id.clone(),
                pilot: best.pilot.clone(),
                best_hole_shot: best.hole_shot,
                best_round: best.round,
                improvements: observations.len(),
                average_hole_shot: mean(&values)?,
            })
        })
        .collect();

    rankings.sort_by(|a, b| {
        a.best_hole_shot
            .total_cmp(&b.best_hole_shot)
            .then_with(|| a.pilot_id.cmp(&b.pilot_id))
    });
    for (index, ranking) in rankings.iter_mut().enumerate() {
        ranking.position = index + 1;
    }

    HoleShotAnalysis {
        rankings,
        all_hole_shots,
    }
}

/// One pilot's distance to the leader and to the pilot ahead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GapEntry {
    /// Position in the fastest-lap ranking.
    pub position: usize,
    pub pilot_id: PilotId,
    /// Display name.
    pub pilot: String,
    pub fastest_lap_time: f64,
    /// Seconds behind the leader; zero for the leader.
    pub gap_to_leader: f64,
    /// Seconds behind the pilot one place ahead; zero for the leader.
    pub gap_to_previous: f64,
    /// `gap_to_previous` as a percentage of the ahead pilot's lap.
    pub gap_percentage: f64,
    /// Whether `gap_to_previous` is under the close-gap threshold.
    pub is_close: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceGaps {
    pub gaps: Vec<GapEntry>,
    /// Non-leader pilots within the close-gap threshold of the pilot ahead.
    pub close_competition: Vec<GapEntry>,
    pub biggest_gap: Option<GapEntry>,
}

/// Gaps between consecutive pilots of the fastest-lap ranking.
pub fn performance_gaps(rankings: &[FastestLapEntry], config: &AnalysisConfig) -> PerformanceGaps {
    let Some(leader) = rankings.first() else {
        return PerformanceGaps::default();
    };

    let gaps: Vec<GapEntry> = rankings
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let (gap_to_previous, gap_percentage) = match index.checked_sub(1) {
                Some(previous_index) => {
                    let previous = rankings[previous_index].fastest_lap_time;
                    let gap = entry.fastest_lap_time - previous;
                    let percentage = if previous > 0.0 { gap / previous * 100.0 } else { 0.0 };
                    (gap, percentage)
                }
                None => (0.0, 0.0),
            };
            GapEntry {
                position: entry.position,
                pilot_id: entry.pilot_id.clone(),
                pilot: entry.pilot.clone(),
                fastest_lap_time: entry.fastest_lap_time,
                gap_to_leader: entry.fastest_lap_time - leader.fastest_lap_time,
                gap_to_previous,
                gap_percentage,
                is_close: index > 0 && gap_to_previous < config.close_gap_seconds,
            }
        })
        .collect();

    let close_competition = gaps.iter().skip(1).filter(|g| g.is_close).cloned().collect();
    let biggest_gap = gaps
        .iter()
        .skip(1)
        .reduce(|a, b| if b.gap_to_previous > a.gap_to_previous { b } else { a })
        .cloned();

    PerformanceGaps {
        gaps,
        close_competition,
        biggest_gap,
    }
}

/// A new personal best set in a race.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalBestEntry {
    pub time: f64,
    pub round: Option<u32>,
    pub race_number: Option<u32>,
    pub race_id: RaceId,
    /// Seconds gained over the previous best. Zero for the first.
    pub improvement: f64,
    /// Position of the race in chronological order.
    pub race_index: usize,
}

/// A pilot's laps in one round.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundForm {
    pub round: u32,
    pub best_lap: f64,
    pub average_lap: f64,
    pub lap_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PilotProgress {
    pub pilot_id: PilotId,
    pub pilot_name: String,
    #[serde(rename = "currentPB")]
    pub current_pb: f64,
    pub pb_count: usize,
    pub total_improvement: f64,
    pub average_time: f64,
    pub consistency: Option<f64>,
    pub personal_bests: Vec<PersonalBestEntry>,
    pub recent_form: Vec<RoundForm>,
    pub total_rounds: usize,
}

#[derive(Debug, Default)]
struct PilotHistory {
    bests: Vec<PersonalBestEntry>,
    laps: Vec<f64>,
    rounds: BTreeMap<u32, Vec<f64>>,
}

/// Races in chronological order: by round, then race number. Unknown rounds sort last.
pub(crate) fn chronological(records: &RecordSet) -> Vec<&Race> {
    let mut races: Vec<&Race> = records.valid_races().collect();
    races.sort_by(|a, b| compare_chronologically(a, b));
    races
}

fn compare_chronologically(a: &Race, b: &Race) -> Ordering {
    let key = |race: &Race| {
        (
            race.round_number.is_none(),
            race.round_number,
            race.race_number.is_none(),
            race.race_number,
        )
    };
    key(a).cmp(&key(b))
}

/// Personal-best progression for every pilot with at least one valid lap.
///
/// Sorted by current personal best, fastest first.
pub fn personal_bests(records: &RecordSet, config: &AnalysisConfig) -> Vec<PilotProgress> {
    let mut histories: HashMap<&PilotId, PilotHistory> = HashMap::new();

    for (race_index, race) in chronological(records).into_iter().enumerate() {
        for (pilot_id, laps) in valid_laps_by_pilot(race) {
            let Some(race_best) = fastest(&laps) else {
                continue;
            };
            let history = histories.entry(pilot_id).or_default();
            let lengths: Vec<f64> = laps.iter().map(|l| l.length).collect();
            history.laps.extend(&lengths);
            if let Some(round) = race.round_number {
                history.rounds.entry(round).or_default().extend(&lengths);
            }

            let previous = history.bests.last().map(|pb| pb.time);
            if previous.is_none_or(|pb| race_best < pb) {
                history.bests.push(PersonalBestEntry {
                    time: race_best,
                    round: race.round_number,
                    race_number: race.race_number,
                    race_id: race.id.clone(),
                    improvement: previous.map_or(0.0, |pb| pb - race_best),
                    race_index,
                });
            }
        }
    }

    let mut progress: Vec<PilotProgress> = histories
        .into_iter()
        .filter_map(|(pilot_id, history)| {
            let first = history.bests.first()?.time;
            let current = history.bests.last()?.time;
            let recent_form = history
                .rounds
                .iter()
                .rev()
                .take(config.recent_form_rounds)
                .rev()
                .filter_map(|(&round, laps)| {
                    Some(RoundForm {
                        round,
                        best_lap: laps.iter().copied().reduce(f64::min)?,
                        average_lap: mean(laps)?,
                        lap_count: laps.len(),
                    })
                })
                .collect();

            Some(PilotProgress {
                pilot_name: records.pilot_name(pilot_id),
                pilot_id: pilot_id.clone(),
                current_pb: current,
                pb_count: history.bests.len(),
                total_improvement: first - current,
                average_time: mean(&history.laps)?,
                consistency: consistency(&history.laps),
                total_rounds: history.rounds.len(),
                personal_bests: history.bests,
                recent_form,
            })
        })
        .collect();

    progress.sort_by(|a, b| {
        a.current_pb
            .total_cmp(&b.current_pb)
            .then_with(|| a.pilot_id.cmp(&b.pilot_id))
    });
    progress
}

/// All four insights for a record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub fastest_lap_rankings: Vec<FastestLapEntry>,
    pub hole_shot_analysis: HoleShotAnalysis,
    pub performance_gaps: PerformanceGaps,
    pub personal_bests: Vec<PilotProgress>,
}

pub fn compute_insights(records: &RecordSet, config: &AnalysisConfig) -> Insights {
    let fastest_lap_rankings = fastest_lap_rankings(records, config);
    let performance_gaps = performance_gaps(&fastest_lap_rankings, config);
    Insights {
        hole_shot_analysis: hole_shot_analysis(records, config),
        personal_bests: personal_bests(records, config),
        fastest_lap_rankings,
        performance_gaps,
    }
}
