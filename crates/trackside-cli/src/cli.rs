//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Season standings and lap insights from FPVTrackside exports.
///
/// Reads the timing software's events directory, works out what each JSON
/// file holds, and recomputes grades, corrected points and lap statistics.
#[derive(Debug, Parser)]
#[command(name = "trackside", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Events directory to read instead of the configured one.
    #[arg(long, global = true)]
    pub data_root: Option<PathBuf>,

    /// Analyse one event directory below the data root.
    #[arg(short, long, global = true)]
    pub event: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show where data is read from and what was found.
    Status,

    /// List events stored in the data root.
    Events {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the aggregated records.
    Data {
        /// Output the full record set as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show standings with corrected points.
    Standings {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one of the performance insights.
    Insights {
        /// Which insight to show.
        #[arg(value_enum)]
        kind: InsightKind,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Insights that can be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InsightKind {
    /// Qualifying fastest-lap ranking.
    FastestLaps,
    /// Hole-shot rankings across all races.
    HoleShots,
    /// Gaps between pilots in the fastest-lap ranking.
    Gaps,
    /// Personal-best progression per pilot.
    PersonalBests,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_insight_kind_and_global_flags() {
        let cli = Cli::try_parse_from([
            "trackside",
            "insights",
            "hole-shots",
            "--json",
            "--data-root",
            "/data/events",
        ])
        .unwrap();

        assert_eq!(cli.data_root, Some(PathBuf::from("/data/events")));
        match cli.command {
            Some(Commands::Insights { kind, json }) => {
                assert_eq!(kind, InsightKind::HoleShots);
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_event_after_subcommand() {
        let cli = Cli::try_parse_from(["trackside", "standings", "--event", "spring"]).unwrap();
        assert_eq!(cli.event.as_deref(), Some("spring"));
        assert!(matches!(cli.command, Some(Commands::Standings { json: false })));
    }

    #[test]
    fn rejects_unknown_insight() {
        assert!(Cli::try_parse_from(["trackside", "insights", "lap-charts"]).is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
