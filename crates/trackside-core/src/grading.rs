//! Grade assignment for races within racing rounds.
//!
//! Races are grouped into rounds by [`round_key`]. In a racing round every
//! race gets a lettered grade from the average seed of its pilots, so that
//! the `A` race holds the fastest qualifiers.

use std::collections::HashMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::aggregate::RecordSet;
use crate::analysis::AnalysisConfig;
use crate::event_type::EventType;
use crate::record::Race;
use crate::seeding::SeedingEntry;
use crate::types::{PilotId, RaceId};

/// A race's grade. Letters sort before [`Grade::Ungraded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grade {
    /// Zero-based letter index: 0 is `A`.
    Letter(u8),
    /// Missing round linkage or race number.
    Ungraded,
}

impl Grade {
    pub const A: Self = Self::Letter(0);
    pub const B: Self = Self::Letter(1);
    pub const C: Self = Self::Letter(2);
    pub const D: Self = Self::Letter(3);

    /// The grade for a 1-based race number, e.g. race 2 is `B`.
    pub fn from_race_number(race_number: u32) -> Self {
        race_number
            .checked_sub(1)
            .and_then(|index| u8::try_from(index).ok())
            .filter(|&index| index < 26)
            .map_or(Self::Ungraded, Self::Letter)
    }

    pub const fn is_letter(self) -> bool {
        matches!(self, Self::Letter(_))
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Letter(index) => write!(f, "{}", char::from(b'A'.saturating_add(*index))),
            Self::Ungraded => f.write_str("U"),
        }
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The grade given to one race.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeAssignment {
    pub race_id: RaceId,
    /// `None` for races that could not be linked to a round.
    pub round_key: Option<String>,
    pub round_number: Option<u32>,
    pub race_number: Option<u32>,
    pub grade: Grade,
    /// Average seed of the race's pilots, when any was seeded.
    pub average_seed: Option<f64>,
}

/// Summary of one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStructure {
    pub key: String,
    pub round_number: Option<u32>,
    pub event_type: Option<EventType>,
    pub race_count: usize,
    pub is_racing_round: bool,
    pub pilots_per_grade: Option<usize>,
}

/// Round structure and grades for an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grading {
    pub race_structure: Vec<RoundStructure>,
    pub assignments: Vec<GradeAssignment>,
}

impl Grading {
    pub fn grade_of(&self, race_id: &RaceId) -> Option<Grade> {
        self.assignments
            .iter()
            .find(|a| &a.race_id == race_id)
            .map(|a| a.grade)
    }
}

/// The key grouping a race into a round: the referenced round ID, else
/// `{EventType}-R{n}`. `None` when the race has neither.
pub fn round_key(race: &Race) -> Option<String> {
    if let Some(round_id) = &race.round_id {
        return Some(round_id.to_string());
    }
    let number = race.round_number?;
    let event_type = race.event_type.map_or("Unknown", |t| t.as_str());
    Some(format!("{event_type}-R{number}"))
}

/// A group of races sharing a round key, in first-appearance order.
pub(crate) struct RoundGroup<'a> {
    pub key: String,
    pub races: Vec<&'a Race>,
}

impl RoundGroup<'_> {
    fn round_number(&self) -> Option<u32> {
        self.races.iter().find_map(|r| r.round_number)
    }

    fn event_type(&self) -> Option<EventType> {
        self.races.iter().find_map(|r| r.event_type)
    }

    /// More than one race with any results, or a `Race` round with any results.
    pub fn is_racing_round(&self) -> bool {
        let any_results = self.races.iter().any(|r| r.has_results());
        any_results && (self.races.len() > 1 || self.event_type() == Some(EventType::Race))
    }
}

/// Groups valid races by round key. Unlinked races are returned separately.
pub(crate) fn group_rounds(records: &RecordSet) -> (Vec<RoundGroup<'_>>, Vec<&Race>) {
    let mut groups: Vec<RoundGroup<'_>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unlinked = Vec::new();

    for race in records.valid_races() {
        let Some(key) = round_key(race) else {
            unlinked.push(race);
            continue;
        };
        if let Some(&i) = index.get(&key) {
            groups[i].races.push(race);
        } else {
            index.insert(key.clone(), groups.len());
            groups.push(RoundGroup {
                key,
                races: vec![race],
            });
        }
    }
    (groups, unlinked)
}

/// Assigns a grade to every race in every racing round.
///
/// Races with no round linkage are graded `U`. Races in non-racing rounds
/// get no assignment.
pub fn assign_grades(
    records: &RecordSet,
    seeding: &[SeedingEntry],
    config: &AnalysisConfig,
) -> Grading {
    let seeds: HashMap<&PilotId, usize> = seeding
        .iter()
        .map(|entry| (&entry.pilot_id, entry.position))
        .collect();
    let (groups, unlinked) = group_rounds(records);
    let mut grading = Grading::default();

    for group in &groups {
        let racing = group.is_racing_round();
        let pilots_per_grade = racing.then(|| seeding.len().div_ceil(group.races.len()).max(1));

        grading.race_structure.push(RoundStructure {
            key: group.key.clone(),
            round_number: group.round_number(),
            event_type: group.event_type(),
            race_count: group.races.len(),
            is_racing_round: racing,
            pilots_per_grade,
        });

        let Some(ppg) = pilots_per_grade else {
            continue;
        };
        for race in &group.races {
            let (grade, average_seed) = grade_race(race, &seeds, ppg, config);
            grading.assignments.push(GradeAssignment {
                race_id: race.id.clone(),
                round_key: Some(group.key.clone()),
                round_number: race.round_number,
                race_number: race.race_number,
                grade,
                average_seed,
            });
        }
    }

    for race in unlinked {
        tracing::debug!(race = %race.id, "race has no round linkage");
        grading.assignments.push(GradeAssignment {
            race_id: race.id.clone(),
            round_key: None,
            round_number: None,
            race_number: race.race_number,
            grade: Grade::Ungraded,
            average_seed: None,
        });
    }

    grading
}

#[expect(clippy::cast_precision_loss, reason = "seed positions are small")]
fn grade_race(
    race: &Race,
    seeds: &HashMap<&PilotId, usize>,
    pilots_per_grade: usize,
    config: &AnalysisConfig,
) -> (Grade, Option<f64>) {
    if race.round_number.is_none() {
        return (Grade::Ungraded, None);
    }

    let participants = race.participants();
    if !participants.iter().any(|p| seeds.contains_key(p)) {
        let grade = race
            .race_number
            .map_or(Grade::Ungraded, Grade::from_race_number);
        return (grade, None);
    }

    let unseeded = usize::try_from(config.unseeded_position).unwrap_or(usize::MAX);
    let total: usize = participants
        .iter()
        .map(|p| seeds.get(p).copied().unwrap_or(unseeded))
        .sum();
    let average = total as f64 / participants.len() as f64;
    let ppg = pilots_per_grade as f64;

    let grade = if average <= ppg {
        Grade::A
    } else if average <= 2.0 * ppg {
        Grade::B
    } else if average <= 3.0 * ppg {
        Grade::C
    } else {
        Grade::D
    };
    (grade, Some(average))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::laps::fixtures::{heat, pilot, race, time_trial};
    use crate::seeding::compute_seeding;
    use crate::types::RoundId;

    fn seeded(ids: &[&str]) -> Vec<SeedingEntry> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| SeedingEntry {
                position: i + 1,
                pilot_id: pilot(id),
                best_consecutive_time: 30.0 + f64::from(u32::try_from(i).unwrap()),
                best_lap_time: 10.0,
                race_id: RaceId::new("tt").unwrap(),
                round_number: 1,
            })
            .collect()
    }

    fn records(races: Vec<Race>) -> RecordSet {
        RecordSet {
            races,
            ..RecordSet::default()
        }
    }

    #[test]
    fn grade_display_and_order() {
        assert_eq!(Grade::A.to_string(), "A");
        assert_eq!(Grade::D.to_string(), "D");
        assert_eq!(Grade::Ungraded.to_string(), "U");
        assert_eq!(Grade::from_race_number(3), Grade::C);
        assert_eq!(Grade::from_race_number(0), Grade::Ungraded);
        assert!(Grade::D < Grade::Ungraded);
        assert_eq!(serde_json::to_string(&Grade::B).unwrap(), r#""B""#);
    }

    #[test]
    fn eight_seeded_pilots_over_two_races() {
        let seeding = seeded(&["p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8"]);
        let set = records(vec![
            heat("h1", 5, 1, &["p1", "p2", "p3", "p4"]),
            heat("h2", 5, 2, &["p5", "p6", "p7", "p8"]),
        ]);
        let grading = assign_grades(&set, &seeding, &AnalysisConfig::default());

        assert_eq!(grading.race_structure.len(), 1);
        assert_eq!(grading.race_structure[0].key, "Race-R5");
        assert_eq!(grading.race_structure[0].pilots_per_grade, Some(4));
        assert_eq!(grading.grade_of(&RaceId::new("h1").unwrap()), Some(Grade::A));
        assert_eq!(grading.grade_of(&RaceId::new("h2").unwrap()), Some(Grade::B));
    }

    #[test]
    fn grades_follow_average_seed() {
        let seeding = seeded(&["a", "b", "c", "d", "e", "f"]);
        let set = records(vec![
            heat("fast", 5, 2, &["a", "b"]),
            heat("mid", 5, 1, &["c", "d"]),
            heat("slow", 5, 3, &["e", "f", "newcomer"]),
        ]);
        let grading = assign_grades(&set, &seeding, &AnalysisConfig::default());
        let grades: Vec<Grade> = grading.assignments.iter().map(|a| a.grade).collect();

        // ppg = 2: averages 1.5, 3.5, (5 + 6 + 999) / 3
        assert_eq!(grades, vec![Grade::A, Grade::B, Grade::D]);
    }

    #[test]
    fn unseeded_races_fall_back_to_race_number() {
        let mut anonymous = heat("h3", 2, 3, &["x", "y"]);
        anonymous.results = Some(Vec::new());
        let mut no_number = heat("h4", 2, 1, &["z"]);
        no_number.race_number = None;
        let set = records(vec![heat("h1", 2, 1, &["x"]), anonymous, no_number]);

        let grading = assign_grades(&set, &[], &AnalysisConfig::default());
        let grades: Vec<Grade> = grading.assignments.iter().map(|a| a.grade).collect();
        assert_eq!(grades, vec![Grade::A, Grade::C, Grade::Ungraded]);
        assert_eq!(grading.race_structure[0].pilots_per_grade, Some(1));
    }

    #[test]
    fn time_trials_are_not_racing_rounds() {
        let set = records(vec![
            time_trial("tt1", 1, &[("p1", &[10.0, 10.0, 10.0])]),
            time_trial("tt2", 1, &[("p2", &[10.0, 10.0, 10.0])]),
        ]);
        let seeding = compute_seeding(&set, &AnalysisConfig::default());
        let grading = assign_grades(&set, &seeding, &AnalysisConfig::default());

        assert_eq!(grading.race_structure.len(), 1);
        assert!(!grading.race_structure[0].is_racing_round);
        assert!(grading.assignments.is_empty());
    }

    #[test]
    fn single_race_round_needs_race_type() {
        let mut practice = heat("p", 3, 1, &["a"]);
        practice.event_type = Some(EventType::Practice);
        let set = records(vec![practice, heat("r", 4, 1, &["a"])]);
        let grading = assign_grades(&set, &[], &AnalysisConfig::default());

        let racing: Vec<bool> = grading
            .race_structure
            .iter()
            .map(|r| r.is_racing_round)
            .collect();
        assert_eq!(racing, vec![false, true]);
    }

    #[test]
    fn unlinked_races_are_ungraded() {
        let mut by_reference = heat("ref", 1, 1, &["a"]);
        by_reference.round_id = Some(RoundId::new("round-x").unwrap());
        by_reference.round_number = None;
        let mut second = heat("ref-2", 1, 2, &["b"]);
        second.round_id = Some(RoundId::new("round-x").unwrap());
        second.round_number = None;
        let mut floating = race("floating", EventType::Race, None, 1);
        floating.results = Some(vec![]);

        let set = records(vec![by_reference, second, floating]);
        let grading = assign_grades(&set, &seeded(&["a", "b"]), &AnalysisConfig::default());

        assert!(grading.assignments.iter().all(|a| a.grade == Grade::Ungraded));
        assert_eq!(grading.assignments.len(), 3);
        assert_eq!(grading.assignments[2].round_key, None);
    }

    #[test]
    fn invalid_races_are_ignored() {
        let mut invalid = heat("h1", 1, 1, &["a"]);
        invalid.valid = false;
        let grading = assign_grades(&records(vec![invalid]), &[], &AnalysisConfig::default());
        assert!(grading.race_structure.is_empty());
    }
}
