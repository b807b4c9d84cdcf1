//! Status command for showing where data comes from and what was found.

use std::io::Write;

use anyhow::Result;
use trackside_core::{FileTree, FsTree, aggregate_tree};

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let tree = FsTree::new(config.source_root());

    writeln!(writer, "Trackside status")?;
    writeln!(writer, "Data root: {}", config.data_root.display())?;
    if let Some(event) = &config.event {
        writeln!(writer, "Event: {event}")?;
    }

    if !tree.root_exists() {
        writeln!(writer, "Data root found: no")?;
        if config.event.is_some() {
            writeln!(writer, "Hint: `trackside events` lists the event directories.")?;
        } else {
            writeln!(writer, "Hint: pass --data-root or set TRACKSIDE_DATA_ROOT.")?;
        }
        return Ok(());
    }
    writeln!(writer, "Data root found: yes")?;

    let aggregation = aggregate_tree(&tree, &config.aggregate_options());
    let records = &aggregation.records;
    let report = &aggregation.report;

    writeln!(writer, "Files scanned: {}", report.files_scanned)?;
    writeln!(writer, "Events: {}", records.events.len())?;
    writeln!(writer, "Pilots: {}", records.pilots.len())?;
    writeln!(writer, "Rounds: {}", records.rounds.len())?;
    writeln!(
        writer,
        "Races: {} ({} with results)",
        records.races.len(),
        report.races_with_results
    )?;
    writeln!(writer, "Unknown files: {}", report.unknown_files.len())?;
    for path in &report.unknown_files {
        writeln!(writer, "- {}", path.display())?;
    }
    writeln!(writer, "Skipped files: {}", report.skipped_files.len())?;
    for skipped in &report.skipped_files {
        writeln!(writer, "- {}: {}", skipped.path.display(), skipped.reason)?;
    }

    Ok(())
}
