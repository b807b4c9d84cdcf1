//! Corrected points from a cross-grade ranking.
//!
//! A round's races are ordered by grade, and each race's results are
//! appended in finishing order with DNFs last. The combined list is the
//! round's global ranking. Points start at [`AnalysisConfig::starting_points`]
//! for rank 0 and drop by one per rank, never below zero.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::aggregate::RecordSet;
use crate::analysis::AnalysisConfig;
use crate::grading::{Grade, Grading, group_rounds};
use crate::record::Race;
use crate::types::{PilotId, RaceId};

/// Round key → pilot → corrected points.
pub type CorrectedPoints = BTreeMap<String, BTreeMap<PilotId, u32>>;

/// A pilot's place in a round's global ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPilot {
    /// Zero-based global rank.
    pub rank: usize,
    pub pilot_id: PilotId,
    pub race_id: RaceId,
    pub grade: Grade,
    pub dnf: bool,
    pub points: u32,
}

/// Builds the global ranking for one round's graded races.
///
/// A pilot listed in more than one race keeps their first ranking. Later
/// entries for that pilot are skipped without using up a rank, so ranks
/// stay consecutive.
pub fn rank_round(races: &[(&Race, Grade)], starting_points: u32) -> Vec<RankedPilot> {
    let mut ordered: Vec<&(&Race, Grade)> = races.iter().collect();
    ordered.sort_by_key(|(race, grade)| (*grade, race.race_number.unwrap_or(u32::MAX)));

    let mut seen: HashSet<&PilotId> = HashSet::new();
    let mut ranking = Vec::new();

    for (race, grade) in ordered {
        let mut results: Vec<_> = race.results().iter().collect();
        results.sort_by_key(|r| (r.dnf, r.position));

        for result in results {
            if !seen.insert(&result.pilot_id) {
                tracing::debug!(
                    pilot = %result.pilot_id,
                    race = %race.id,
                    "pilot already ranked in this round"
                );
                continue;
            }
            let rank = ranking.len();
            let points = u32::try_from(rank)
                .map_or(0, |rank| starting_points.saturating_sub(rank));
            ranking.push(RankedPilot {
                rank,
                pilot_id: result.pilot_id.clone(),
                race_id: race.id.clone(),
                grade: *grade,
                dnf: result.dnf,
                points,
            });
        }
    }
    ranking
}

/// Applies [`rank_round`] to every racing round with lettered grades.
pub fn corrected_points_table(
    records: &RecordSet,
    grading: &Grading,
    config: &AnalysisConfig,
) -> CorrectedPoints {
    let grades: HashMap<&RaceId, Grade> = grading
        .assignments
        .iter()
        .map(|a| (&a.race_id, a.grade))
        .collect();
    let (groups, _unlinked) = group_rounds(records);
    let mut table = CorrectedPoints::new();

    for group in groups.iter().filter(|g| g.is_racing_round()) {
        let graded: Vec<(&Race, Grade)> = group
            .races
            .iter()
            .filter_map(|race| Some((*race, *grades.get(&race.id)?)))
            .collect();
        if !graded.iter().any(|(_, grade)| grade.is_letter()) {
            continue;
        }

        let points = rank_round(&graded, config.starting_points)
            .into_iter()
            .map(|ranked| (ranked.pilot_id, ranked.points))
            .collect();
        table.insert(group.key.clone(), points);
    }
    table
}
