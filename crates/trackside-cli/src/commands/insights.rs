//! Insights command: fastest laps, hole-shots, gaps and personal bests.

use std::io::Write;

use anyhow::Result;
use trackside_core::{
    AnalysisConfig, FastestLapEntry, HoleShotAnalysis, PerformanceGaps, PilotProgress, RecordSet,
    fastest_lap_rankings, hole_shot_analysis, performance_gaps, personal_bests,
};

use crate::Config;
use crate::InsightKind;
use crate::commands::{load_records, or_dash, seconds};

fn write_fastest_laps<W: Write>(writer: &mut W, rankings: &[FastestLapEntry]) -> Result<()> {
    writeln!(writer, "FASTEST LAPS")?;
    if rankings.is_empty() {
        writeln!(writer, "No qualifying laps recorded.")?;
    }
    for entry in rankings {
        writeln!(
            writer,
            "{:>3}. {:<12} {:>9}  group {}  round {}  hole-shot {}",
            entry.position,
            entry.pilot,
            seconds(entry.fastest_lap_time),
            entry.group,
            or_dash(entry.round, |n| n.to_string()),
            or_dash(entry.hole_shot, seconds),
        )?;
    }
    Ok(())
}

fn write_hole_shots<W: Write>(writer: &mut W, analysis: &HoleShotAnalysis) -> Result<()> {
    writeln!(writer, "HOLE SHOTS")?;
    if analysis.rankings.is_empty() {
        writeln!(writer, "No hole-shots measured.")?;
    }
    for ranking in &analysis.rankings {
        writeln!(
            writer,
            "{:>3}. {:<12} {:>9}  (round {}, {} windows, avg {})",
            ranking.position,
            ranking.pilot,
            seconds(ranking.best_hole_shot),
            or_dash(ranking.best_round, |n| n.to_string()),
            ranking.improvements,
            seconds(ranking.average_hole_shot),
        )?;
    }
    Ok(())
}

fn write_gaps<W: Write>(writer: &mut W, gaps: &PerformanceGaps) -> Result<()> {
    writeln!(writer, "PERFORMANCE GAPS")?;
    if gaps.gaps.is_empty() {
        writeln!(writer, "No qualifying laps recorded.")?;
        return Ok(());
    }
    for gap in &gaps.gaps {
        if gap.position == 1 {
            writeln!(
                writer,
                "{:>3}. {:<12} {:>9}  leader",
                gap.position,
                gap.pilot,
                seconds(gap.fastest_lap_time)
            )?;
            continue;
        }
        writeln!(
            writer,
            "{:>3}. {:<12} {:>9}  +{} to leader  +{} ({:.2}%){}",
            gap.position,
            gap.pilot,
            seconds(gap.fastest_lap_time),
            seconds(gap.gap_to_leader),
            seconds(gap.gap_to_previous),
            gap.gap_percentage,
            if gap.is_close { "  close" } else { "" },
        )?;
    }

    let close: Vec<&str> = gaps.close_competition.iter().map(|g| g.pilot.as_str()).collect();
    writeln!(writer)?;
    if close.is_empty() {
        writeln!(writer, "Close battles: none")?;
    } else {
        writeln!(writer, "Close battles: {}", close.join(", "))?;
    }
    if let Some(biggest) = &gaps.biggest_gap {
        writeln!(
            writer,
            "Biggest gap: {} +{}",
            biggest.pilot,
            seconds(biggest.gap_to_previous)
        )?;
    }
    Ok(())
}

fn write_personal_bests<W: Write>(writer: &mut W, progress: &[PilotProgress]) -> Result<()> {
    writeln!(writer, "PERSONAL BESTS")?;
    if progress.is_empty() {
        writeln!(writer, "No valid laps recorded.")?;
    }
    for pilot in progress {
        writeln!(
            writer,
            "{}: {}  ({} PBs, improved {}, avg {}, consistency {})",
            pilot.pilot_name,
            seconds(pilot.current_pb),
            pilot.pb_count,
            seconds(pilot.total_improvement),
            seconds(pilot.average_time),
            or_dash(pilot.consistency, |c| format!("{c:.1}%")),
        )?;
        for form in &pilot.recent_form {
            writeln!(
                writer,
                "  round {}: best {}, avg {}, {} laps",
                form.round,
                seconds(form.best_lap),
                seconds(form.average_lap),
                form.lap_count
            )?;
        }
    }
    Ok(())
}

/// Computes and writes one insight.
pub fn write_insight<W: Write>(
    writer: &mut W,
    records: &RecordSet,
    analysis: &AnalysisConfig,
    kind: InsightKind,
    json: bool,
) -> Result<()> {
    match kind {
        InsightKind::FastestLaps => {
            let rankings = fastest_lap_rankings(records, analysis);
            if json {
                writeln!(writer, "{}", serde_json::to_string_pretty(&rankings)?)?;
            } else {
                write_fastest_laps(writer, &rankings)?;
            }
        }
        InsightKind::HoleShots => {
            let hole_shots = hole_shot_analysis(records, analysis);
            if json {
                writeln!(writer, "{}", serde_json::to_string_pretty(&hole_shots)?)?;
            } else {
                write_hole_shots(writer, &hole_shots)?;
            }
        }
        InsightKind::Gaps => {
            let gaps = performance_gaps(&fastest_lap_rankings(records, analysis), analysis);
            if json {
                writeln!(writer, "{}", serde_json::to_string_pretty(&gaps)?)?;
            } else {
                write_gaps(writer, &gaps)?;
            }
        }
        InsightKind::PersonalBests => {
            let progress = personal_bests(records, analysis);
            if json {
                writeln!(writer, "{}", serde_json::to_string_pretty(&progress)?)?;
            } else {
                write_personal_bests(writer, &progress)?;
            }
        }
    }
    Ok(())
}

pub fn run<W: Write>(writer: &mut W, config: &Config, kind: InsightKind, json: bool) -> Result<()> {
    let aggregation = load_records(config)?;
    write_insight(writer, &aggregation.records, &config.analysis, kind, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::commands::test_support::{config_for, render, write_season};

    fn season_output(kind: InsightKind, json: bool) -> String {
        let temp = tempfile::tempdir().unwrap();
        write_season(temp.path());
        let config = config_for(temp.path());
        render(|out| run(out, &config, kind, json))
    }

    #[test]
    fn fastest_laps_text() {
        assert_snapshot!(season_output(InsightKind::FastestLaps, false), @"
        FASTEST LAPS
          1. Ace            20.000s  group 1  round 1  hole-shot 4.000s
          2. Bolt           21.000s  group 1  round 1  hole-shot 4.000s
          3. Comet          22.000s  group 1  round 1  hole-shot -
          4. Dash           23.000s  group 1  round 1  hole-shot -
        ");
    }

    #[test]
    fn gaps_text() {
        let output = season_output(InsightKind::Gaps, false);
        assert!(output.contains("  1. Ace            20.000s  leader"));
        assert!(output.contains("+1.000s to leader  +1.000s (5.00%)"));
        assert!(output.contains("Close battles: none"));
        assert!(output.contains("Biggest gap: Bolt +1.000s"));
    }

    #[test]
    fn hole_shots_json() {
        let output = season_output(InsightKind::HoleShots, true);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        let rankings = value["rankings"].as_array().unwrap();
        assert_eq!(rankings.len(), 2);
        assert_eq!(rankings[0]["pilot"], "Ace");
        assert_eq!(rankings[0]["bestHoleShot"], 4.0);
        assert_eq!(value["allHoleShots"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn personal_bests_text() {
        let output = season_output(InsightKind::PersonalBests, false);
        assert!(output.starts_with("PERSONAL BESTS\nAce: 20.000s  (1 PBs"));
        assert!(output.contains("  round 1: best 23.000s, avg 24.000s, 3 laps"));
    }

    #[test]
    fn empty_data_root_has_friendly_messages() {
        let temp = tempfile::tempdir().unwrap();
        let config = config_for(temp.path());
        let output = render(|out| run(out, &config, InsightKind::Gaps, false));
        assert_eq!(output, "PERFORMANCE GAPS\nNo qualifying laps recorded.\n");
    }
}
