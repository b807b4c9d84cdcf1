//! CLI subcommand implementations.

use anyhow::{Context, Result};
use trackside_core::{Aggregation, aggregate_dir};

use crate::Config;

pub mod data;
pub mod events;
pub mod insights;
pub mod standings;
pub mod status;

/// Aggregates every record below the data root, or below the selected event.
pub fn load_records(config: &Config) -> Result<Aggregation> {
    let root = config.source_root();
    aggregate_dir(&root, &config.aggregate_options())
        .with_context(|| format!("failed to read {}", root.display()))
}

/// Formats seconds for display, e.g. `21.000s`.
pub(crate) fn seconds(value: f64) -> String {
    format!("{value:.3}s")
}

/// Formats an optional value, or `-` when absent.
pub(crate) fn or_dash<T>(value: Option<T>, format: impl Fn(T) -> String) -> String {
    value.map_or_else(|| "-".to_string(), format)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! An FPVTrackside-style events directory used by the command tests.

    use std::path::Path;

    use serde_json::{Value, json};

    use crate::Config;

    fn write(root: &Path, relative: &str, value: &Value) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    }

    fn lap(pilot: &str, number: u32, length: f64, end: Option<&str>) -> Value {
        let mut lap = json!({"Pilot": pilot, "LapNumber": number, "LengthSeconds": length});
        if let Some(end) = end {
            lap["EndTime"] = json!(end);
        }
        lap
    }

    /// Writes a one-event season: two time trials, then two graded heats.
    pub fn write_season(root: &Path) {
        write(
            root,
            "club/Event.json",
            &json!([{
                "Name": "Club Night",
                "EventType": "Race",
                "Start": "2024-05-04T09:00:00",
                "PilotsRegistered": 4,
                "Races": ["tt-1", "tt-2", "heat-1", "heat-2"]
            }]),
        );
        write(
            root,
            "club/Pilots.json",
            &json!([
                {"ID": "p-ace", "Name": "Ace", "Phonetic": "ace"},
                {"ID": "p-bolt", "Name": "Bolt", "Phonetic": "bolt"},
                {"ID": "p-comet", "Name": "Comet", "Phonetic": "comet"},
                {"ID": "p-dash", "Name": "Dash", "Phonetic": "dash"}
            ]),
        );
        write(
            root,
            "club/Rounds.json",
            &json!([
                {"ID": "round-1", "RoundNumber": 1, "EventType": "TimeTrial", "Valid": true},
                {"ID": "round-2", "RoundNumber": 2, "EventType": "Race", "Valid": true}
            ]),
        );
        write(
            root,
            "club/tt-1/Race.json",
            &json!([{
                "ID": "tt-1",
                "Round": "round-1",
                "RaceNumber": 1,
                "Start": "2024-05-04T10:00:00",
                "Laps": [
                    lap("p-ace", 1, 20.0, Some("2024-05-04T10:00:24")),
                    lap("p-ace", 2, 20.0, Some("2024-05-04T10:00:44")),
                    lap("p-ace", 3, 20.0, Some("2024-05-04T10:01:04")),
                    lap("p-bolt", 1, 21.0, Some("2024-05-04T10:00:25")),
                    lap("p-bolt", 2, 21.0, Some("2024-05-04T10:00:46")),
                    lap("p-bolt", 3, 21.0, Some("2024-05-04T10:01:07"))
                ]
            }]),
        );
        write(
            root,
            "club/tt-2/Race.json",
            &json!([{
                "ID": "tt-2",
                "Round": "round-1",
                "RaceNumber": 2,
                "Laps": [
                    lap("p-comet", 1, 22.0, None),
                    lap("p-comet", 2, 22.0, None),
                    lap("p-comet", 3, 22.0, None),
                    lap("p-dash", 1, 24.0, None),
                    lap("p-dash", 2, 23.0, None),
                    lap("p-dash", 3, 25.0, None)
                ]
            }]),
        );
        write(
            root,
            "club/heat-1/Race.json",
            &json!([{"ID": "heat-1", "Round": "round-2", "RaceNumber": 1, "Laps": []}]),
        );
        write(
            root,
            "club/heat-1/Result.json",
            &json!([
                {"Pilot": "p-bolt", "Position": 1, "Points": 20, "DNF": false},
                {"Pilot": "p-ace", "Position": 2, "Points": 19, "DNF": false}
            ]),
        );
        write(
            root,
            "club/heat-2/Race.json",
            &json!([{"ID": "heat-2", "Round": "round-2", "RaceNumber": 2, "Laps": []}]),
        );
        write(
            root,
            "club/heat-2/Result.json",
            &json!([
                {"Pilot": "p-comet", "Position": 1, "Points": 20, "DNF": false},
                {"Pilot": "p-dash", "Position": 2, "Points": 0, "DNF": true}
            ]),
        );
    }

    /// Writes a second event next to the season: one time trial of four
    /// slower pilots and nothing else.
    pub fn write_second_event(root: &Path) {
        write(
            root,
            "summer/Event.json",
            &json!([{"Name": "Summer Open", "EventType": "Race", "Start": "2024-07-06T09:00:00"}]),
        );
        write(
            root,
            "summer/Rounds.json",
            &json!([{"ID": "summer-round-1", "RoundNumber": 1, "EventType": "TimeTrial"}]),
        );
        let laps: Vec<Value> = ["s-1", "s-2", "s-3", "s-4"]
            .iter()
            .flat_map(|pilot| (1..=3).map(move |n| lap(pilot, n, 30.0, None)))
            .collect();
        write(
            root,
            "summer/tt/Race.json",
            &json!([{"ID": "summer-tt", "Round": "summer-round-1", "RaceNumber": 1, "Laps": laps}]),
        );
    }

    pub fn config_for(root: &Path) -> Config {
        Config::default().with_data_root(Some(root.to_path_buf()))
    }

    pub fn render<F>(run: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> anyhow::Result<()>,
    {
        let mut output = Vec::new();
        run(&mut output).unwrap();
        String::from_utf8(output).unwrap()
    }
}
