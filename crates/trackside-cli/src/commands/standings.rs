//! Standings command: corrected points, race structure and grades.

use std::io::Write;

use anyhow::Result;
use trackside_core::{EnhancedStandings, Standing, enhanced_standings};

use crate::Config;
use crate::commands::{load_records, or_dash, seconds};

pub fn write_standings<W: Write>(writer: &mut W, standings: &EnhancedStandings) -> Result<()> {
    writeln!(writer, "STANDINGS")?;
    writeln!(writer, "─────────")?;
    if standings.standings.is_empty() {
        writeln!(writer, "No race results recorded.")?;
    }
    for standing in &standings.standings {
        writeln!(
            writer,
            "{:>3}. {:<12} {:>4} pts  (raw {}, {}W {}P {}DNF of {})  win {}  avg pos {}  best {}",
            standing.position,
            standing.pilot_name,
            standing.corrected_points,
            standing.raw_points,
            standing.wins,
            standing.podiums,
            standing.dnfs,
            standing.races,
            or_dash(standing.win_rate, |r| format!("{r:.1}%")),
            or_dash(standing.average_position, |p| format!("{p:.1}")),
            or_dash(standing.best_lap, seconds),
        )?;
    }

    write_time_trials(writer, &standings.standings)?;

    writeln!(writer)?;
    writeln!(writer, "ROUNDS")?;
    writeln!(writer, "──────")?;
    for round in &standings.race_structure {
        let mut line = format!(
            "{}: round {}, {}, {} races",
            round.key,
            or_dash(round.round_number, |n| n.to_string()),
            or_dash(round.event_type, |t| t.to_string()),
            round.race_count,
        );
        if let Some(ppg) = round.pilots_per_grade {
            line.push_str(&format!(", {ppg} pilots per grade"));
        }
        writeln!(writer, "{line}")?;
    }

    if !standings.grade_assignments.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "GRADES")?;
        writeln!(writer, "──────")?;
        for assignment in &standings.grade_assignments {
            writeln!(writer, "{}  {}", assignment.race_id, assignment.grade)?;
        }
    }
    Ok(())
}

/// Pilots who flew time trials, fastest consecutive run first.
fn write_time_trials<W: Write>(writer: &mut W, standings: &[Standing]) -> Result<()> {
    let mut flown: Vec<&Standing> = standings.iter().filter(|s| s.time_trial.is_some()).collect();
    if flown.is_empty() {
        return Ok(());
    }
    let best = |s: &Standing| s.time_trial.as_ref().and_then(|t| t.best_consecutive);
    flown.sort_by(|a, b| match (best(a), best(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.pilot_name.cmp(&b.pilot_name),
    });

    writeln!(writer)?;
    writeln!(writer, "TIME TRIALS")?;
    writeln!(writer, "───────────")?;
    for (index, standing) in flown.iter().enumerate() {
        let Some(stats) = &standing.time_trial else {
            continue;
        };
        writeln!(
            writer,
            "{:>3}. {:<12} {:>9}  {} laps, {} trials, improvement {}",
            index + 1,
            standing.pilot_name,
            or_dash(stats.best_consecutive, seconds),
            stats.consecutive_laps,
            stats.count,
            or_dash(stats.improvement, |p| format!("{p:+.1}%")),
        )?;
    }
    Ok(())
}

pub fn run<W: Write>(writer: &mut W, config: &Config, json: bool) -> Result<()> {
    let aggregation = load_records(config)?;
    let standings = enhanced_standings(&aggregation.records, &config.analysis);

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&standings)?)?;
    } else {
        write_standings(writer, &standings)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::commands::test_support::{config_for, render, write_second_event, write_season};

    fn grade_of<'a>(value: &'a serde_json::Value, race_id: &str) -> &'a str {
        value["gradeAssignments"]
            .as_array()
            .unwrap()
            .iter()
            .find(|a| a["raceId"] == race_id)
            .and_then(|a| a["grade"].as_str())
            .unwrap()
    }

    #[test]
    fn standings_command_text() {
        let temp = tempfile::tempdir().unwrap();
        write_season(temp.path());

        let config = config_for(temp.path());
        let output = render(|out| run(out, &config, false));

        assert_snapshot!(output, @"
        STANDINGS
        ─────────
          1. Bolt           20 pts  (raw 20, 1W 1P 0DNF of 1)  win 100.0%  avg pos 1.0  best 21.000s
          2. Ace            19 pts  (raw 19, 0W 1P 0DNF of 1)  win 0.0%  avg pos 2.0  best 20.000s
          3. Comet          18 pts  (raw 20, 1W 1P 0DNF of 1)  win 100.0%  avg pos 1.0  best 22.000s
          4. Dash           17 pts  (raw 0, 0W 0P 1DNF of 1)  win 0.0%  avg pos 2.0  best 23.000s

        TIME TRIALS
        ───────────
          1. Ace            60.000s  3 laps, 1 trials, improvement -
          2. Bolt           63.000s  3 laps, 1 trials, improvement -
          3. Comet          66.000s  3 laps, 1 trials, improvement -
          4. Dash           72.000s  3 laps, 1 trials, improvement -

        ROUNDS
        ──────
        round-2: round 2, Race, 2 races, 2 pilots per grade
        round-1: round 1, TimeTrial, 2 races

        GRADES
        ──────
        heat-1  A
        heat-2  B
        ");
    }

    #[test]
    fn standings_command_json() {
        let temp = tempfile::tempdir().unwrap();
        write_season(temp.path());

        let config = config_for(temp.path());
        let output = render(|out| run(out, &config, true));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["standings"][0]["pilotName"], "Bolt");
        assert_eq!(value["standings"][0]["correctedPoints"], 20);
        assert_eq!(value["correctedPoints"]["round-2"]["p-comet"], 18);
        assert_eq!(value["gradeAssignments"][1]["grade"], "B");
        assert_eq!(value["raceStructure"][0]["isRacingRound"], true);
        assert_eq!(value["standings"][0]["winRate"], 100.0);
        assert_eq!(value["standings"][3]["dnfRate"], 100.0);
        assert_eq!(value["standings"][1]["timeTrial"]["bestConsecutive"], 60.0);
    }

    #[test]
    fn event_scope_keeps_other_events_out_of_grading() {
        let temp = tempfile::tempdir().unwrap();
        write_season(temp.path());
        write_second_event(temp.path());

        let pooled = config_for(temp.path());
        let value: serde_json::Value =
            serde_json::from_str(&render(|out| run(out, &pooled, true))).unwrap();
        assert_eq!(value["seeding"].as_array().unwrap().len(), 8);
        assert_eq!(grade_of(&value, "heat-1"), "A");
        assert_eq!(grade_of(&value, "heat-2"), "A");

        let scoped = config_for(temp.path()).with_event(Some("club".to_string()));
        let value: serde_json::Value =
            serde_json::from_str(&render(|out| run(out, &scoped, true))).unwrap();
        assert_eq!(value["seeding"].as_array().unwrap().len(), 4);
        assert_eq!(grade_of(&value, "heat-1"), "A");
        assert_eq!(grade_of(&value, "heat-2"), "B");
        assert_eq!(value["standings"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn unknown_event_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        write_season(temp.path());

        let config = config_for(temp.path()).with_event(Some("winter".to_string()));
        let err = run(&mut Vec::new(), &config, false).unwrap_err();
        assert!(format!("{err:#}").contains("data root not found"));
    }
}
