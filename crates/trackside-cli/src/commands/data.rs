//! Data command: shows the aggregated record set.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use trackside_core::{AggregateReport, Aggregation, RecordSet};

use crate::Config;
use crate::commands::{load_records, or_dash};

/// The record set as served to reporting tools.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DataOutput<'a> {
    #[serde(flatten)]
    records: &'a RecordSet,
    report: &'a AggregateReport,
}

pub fn format_data_json(aggregation: &Aggregation) -> Result<String> {
    let output = DataOutput {
        records: &aggregation.records,
        report: &aggregation.report,
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

pub fn write_summary<W: Write>(writer: &mut W, aggregation: &Aggregation) -> Result<()> {
    let records = &aggregation.records;

    writeln!(writer, "DATA")?;
    writeln!(
        writer,
        "Events: {}  Pilots: {}  Rounds: {}  Races: {} ({} with results)",
        records.events.len(),
        records.pilots.len(),
        records.rounds.len(),
        records.races.len(),
        aggregation.report.races_with_results
    )?;

    if let Some(event) = records.primary_event() {
        writeln!(writer, "Primary event: {} ({})", event.name, event.id)?;
    }

    if records.races.is_empty() {
        return Ok(());
    }
    writeln!(writer)?;
    writeln!(writer, "RACES")?;
    for race in &records.races {
        let results = race
            .results
            .as_ref()
            .map_or_else(|| "no results".to_string(), |r| format!("{} results", r.len()));
        writeln!(
            writer,
            "{}  round {}  race {}  {}  {} laps  {}{}",
            race.id,
            or_dash(race.round_number, |n| n.to_string()),
            or_dash(race.race_number, |n| n.to_string()),
            or_dash(race.event_type, |t| t.to_string()),
            race.laps.len(),
            results,
            if race.valid { "" } else { "  (invalid)" },
        )?;
    }
    Ok(())
}

pub fn run<W: Write>(writer: &mut W, config: &Config, json: bool) -> Result<()> {
    let aggregation = load_records(config)?;
    if json {
        writeln!(writer, "{}", format_data_json(&aggregation)?)?;
    } else {
        write_summary(writer, &aggregation)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::commands::test_support::{config_for, render, write_season};

    #[test]
    fn data_command_summary() {
        let temp = tempfile::tempdir().unwrap();
        write_season(temp.path());

        let config = config_for(temp.path());
        let output = render(|out| run(out, &config, false));

        assert_snapshot!(output, @"
        DATA
        Events: 1  Pilots: 4  Rounds: 2  Races: 4 (2 with results)
        Primary event: Club Night (club)

        RACES
        heat-1  round 2  race 1  Race  0 laps  2 results
        heat-2  round 2  race 2  Race  0 laps  2 results
        tt-1  round 1  race 1  TimeTrial  6 laps  no results
        tt-2  round 1  race 2  TimeTrial  6 laps  no results
        ");
    }

    #[test]
    fn data_command_json_uses_camel_case() {
        let temp = tempfile::tempdir().unwrap();
        write_season(temp.path());

        let config = config_for(temp.path());
        let output = render(|out| run(out, &config, true));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["events"][0]["name"], "Club Night");
        assert_eq!(value["pilots"].as_array().unwrap().len(), 4);
        let heat = &value["races"][0];
        assert_eq!(heat["id"], "heat-1");
        assert_eq!(heat["eventId"], "club");
        assert_eq!(heat["roundNumber"], 2);
        assert_eq!(heat["eventType"], "Race");
        assert_eq!(heat["result"][0]["pilotId"], "p-bolt");
        assert!(value["races"][2]["result"].is_null());
        assert_eq!(value["report"]["filesScanned"], 9);
    }

    #[test]
    fn data_command_fails_without_root() {
        let temp = tempfile::tempdir().unwrap();
        let config = config_for(&temp.path().join("missing"));
        let mut output = Vec::new();
        let err = run(&mut output, &config, false).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
