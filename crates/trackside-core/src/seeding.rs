//! Qualifying seeding from time-trial rounds.

use std::collections::HashMap;

use serde::Serialize;

use crate::aggregate::RecordSet;
use crate::analysis::AnalysisConfig;
use crate::laps::{best_window, fastest, valid_laps_by_pilot};
use crate::record::Race;
use crate::types::{PilotId, RaceId};

/// One pilot's qualifying result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedingEntry {
    /// 1-based seed.
    pub position: usize,
    pub pilot_id: PilotId,
    /// Best sum of consecutive valid laps across qualifying races.
    pub best_consecutive_time: f64,
    /// Fastest single lap in the race that produced the best consecutive time.
    pub best_lap_time: f64,
    pub race_id: RaceId,
    pub round_number: u32,
}

/// Whether a race counts toward qualifying.
pub(crate) fn is_qualifying(race: &Race, config: &AnalysisConfig) -> bool {
    race.valid
        && race.is_time_trial()
        && race
            .round_number
            .is_some_and(|n| config.is_qualifying_round(n))
}

/// Ranks pilots by their best consecutive-lap time in qualifying.
///
/// Sorted ascending, ties broken by pilot ID.
pub fn compute_seeding(records: &RecordSet, config: &AnalysisConfig) -> Vec<SeedingEntry> {
    let mut best: HashMap<&PilotId, SeedingEntry> = HashMap::new();

    for race in records.races.iter().filter(|r| is_qualifying(r, config)) {
        let Some(round_number) = race.round_number else {
            continue;
        };
        for (pilot_id, laps) in valid_laps_by_pilot(race) {
            let (Some(window), Some(best_lap)) =
                (best_window(&laps, config.consecutive_laps), fastest(&laps))
            else {
                continue;
            };

            let improves = best
                .get(pilot_id)
                .is_none_or(|current| window.sum < current.best_consecutive_time);
            if improves {
                best.insert(
                    pilot_id,
                    SeedingEntry {
                        position: 0,
                        pilot_id: pilot_id.clone(),
                        best_consecutive_time: window.sum,
                        best_lap_time: best_lap,
                        race_id: race.id.clone(),
                        round_number,
                    },
                );
            }
        }
    }

    let mut seeding: Vec<SeedingEntry> = best.into_values().collect();
    seeding.sort_by(|a, b| {
        a.best_consecutive_time
            .total_cmp(&b.best_consecutive_time)
            .then_with(|| a.pilot_id.cmp(&b.pilot_id))
    });
    for (index, entry) in seeding.iter_mut().enumerate() {
        entry.position = index + 1;
    }

    tracing::debug!(seeded = seeding.len(), "computed seeding");
    seeding
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_type::EventType;
    use crate::laps::fixtures::{heat, race, time_trial};

    fn records(races: Vec<Race>) -> RecordSet {
        RecordSet {
            races,
            ..RecordSet::default()
        }
    }

    #[test]
    fn best_window_across_races() {
        let set = records(vec![
            time_trial("tt-1", 1, &[("p1", &[10.0, 10.0, 10.0])]),
            time_trial("tt-2", 2, &[("p1", &[9.0, 9.0, 9.0])]),
        ]);
        let seeding = compute_seeding(&set, &AnalysisConfig::default());

        assert_eq!(seeding.len(), 1);
        assert_eq!(seeding[0].best_consecutive_time, 27.0);
        assert_eq!(seeding[0].best_lap_time, 9.0);
        assert_eq!(seeding[0].race_id.as_str(), "tt-2");
    }

    #[test]
    fn equal_times_do_not_replace() {
        let set = records(vec![
            time_trial("tt-1", 1, &[("p1", &[10.0, 10.0, 10.0])]),
            time_trial("tt-2", 2, &[("p1", &[10.0, 10.0, 10.0])]),
        ]);
        let seeding = compute_seeding(&set, &AnalysisConfig::default());
        assert_eq!(seeding[0].race_id.as_str(), "tt-1");
    }

    #[test]
    fn pilots_need_enough_valid_laps() {
        let set = records(vec![time_trial(
            "tt-1",
            1,
            &[("short", &[10.0, 10.0]), ("glitch", &[10.0, 300.0, 10.0])],
        )]);
        assert!(compute_seeding(&set, &AnalysisConfig::default()).is_empty());
    }

    #[test]
    fn only_early_valid_time_trials_count() {
        let mut invalid = time_trial("tt-bad", 1, &[("p1", &[5.0, 5.0, 5.0])]);
        invalid.valid = false;
        let mut practice = time_trial("prac", 1, &[("p2", &[5.0, 5.0, 5.0])]);
        practice.event_type = Some(EventType::Practice);
        let set = records(vec![
            invalid,
            practice,
            time_trial("tt-late", 5, &[("p3", &[5.0, 5.0, 5.0])]),
            heat("heat", 1, 1, &["p4"]),
            race("unlinked", EventType::TimeTrial, None, 1),
        ]);
        assert!(compute_seeding(&set, &AnalysisConfig::default()).is_empty());
    }

    #[test]
    fn ties_break_by_pilot_id() {
        let set = records(vec![time_trial(
            "tt-1",
            1,
            &[("zed", &[10.0, 10.0, 10.0]), ("amy", &[10.0, 10.0, 10.0]), ("bo", &[9.0, 10.0, 10.0])],
        )]);
        let seeding = compute_seeding(&set, &AnalysisConfig::default());
        let order: Vec<(&str, usize)> = seeding
            .iter()
            .map(|e| (e.pilot_id.as_str(), e.position))
            .collect();
        assert_eq!(order, vec![("bo", 1), ("amy", 2), ("zed", 3)]);
    }
}
