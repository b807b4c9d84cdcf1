//! Events command: lists the event directories below the data root.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Result, bail};
use serde::Serialize;
use trackside_core::{Event, FileTree, FsTree, list_events};

use crate::Config;
use crate::commands::or_dash;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventListing<'a> {
    #[serde(flatten)]
    event: &'a Event,
    path: PathBuf,
}

pub fn run<W: Write>(writer: &mut W, config: &Config, json: bool) -> Result<()> {
    let tree = FsTree::new(&config.data_root);
    if !tree.root_exists() {
        bail!("data root not found: {}", config.data_root.display());
    }
    let events = list_events(&tree);

    if json {
        let listings: Vec<EventListing<'_>> = events
            .iter()
            .map(|event| EventListing {
                event,
                path: config.data_root.join(&event.id),
            })
            .collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&listings)?)?;
        return Ok(());
    }

    writeln!(writer, "EVENTS")?;
    if events.is_empty() {
        writeln!(writer, "No events found in {}.", config.data_root.display())?;
        return Ok(());
    }
    for event in &events {
        writeln!(
            writer,
            "{}  {}  ({}, {}, {} pilots)",
            event.id,
            event.name,
            or_dash(event.event_type, |t| t.to_string()),
            or_dash(event.start.as_deref(), str::to_string),
            or_dash(event.pilots_registered, |n| n.to_string()),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::commands::test_support::{config_for, render, write_season};

    #[test]
    fn events_command_lists_event_directories() {
        let temp = tempfile::tempdir().unwrap();
        write_season(temp.path());
        std::fs::create_dir_all(temp.path().join("scratch")).unwrap();

        let config = config_for(temp.path());
        let output = render(|out| run(out, &config, false));

        assert_snapshot!(output, @"
        EVENTS
        club  Club Night  (Race, 2024-05-04T09:00:00, 4 pilots)
        ");
    }

    #[test]
    fn events_command_json_includes_path() {
        let temp = tempfile::tempdir().unwrap();
        write_season(temp.path());

        let config = config_for(temp.path());
        let output = render(|out| run(out, &config, true));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value[0]["id"], "club");
        assert_eq!(value[0]["eventType"], "Race");
        assert_eq!(value[0]["pilotsRegistered"], 4);
        assert_eq!(
            value[0]["path"],
            temp.path().join("club").display().to_string()
        );
    }

    #[test]
    fn events_command_fails_without_root() {
        let temp = tempfile::tempdir().unwrap();
        let config = config_for(&temp.path().join("missing"));
        let mut output = Vec::new();
        assert!(run(&mut output, &config, false).is_err());
    }
}
