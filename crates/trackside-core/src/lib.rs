//! Core domain logic for trackside.
//!
//! This crate turns a directory of race-timing JSON exports into a
//! consistent record set and derives season semantics from it:
//! - Classification: deciding what each JSON file holds
//! - Aggregation: merging many partial files into one [`RecordSet`]
//! - Seeding, grading and points: a corrected cross-grade points table
//! - Insights: fastest laps, hole-shots, gaps and personal bests

pub mod aggregate;
pub mod analysis;
pub mod classify;
pub mod event_type;
mod fields;
pub mod grading;
pub mod insights;
pub mod laps;
pub mod points;
pub mod record;
pub mod seeding;
pub mod source;
pub mod standings;
pub mod types;

pub use aggregate::{
    AggregateError, AggregateOptions, AggregateReport, Aggregation, RecordSet, aggregate_dir,
    aggregate_sources, aggregate_tree, list_events,
};
pub use analysis::AnalysisConfig;
pub use classify::{RecordKind, classify};
pub use event_type::{EventType, UnknownEventType};
pub use grading::{Grade, GradeAssignment, Grading, RoundStructure, assign_grades, round_key};
pub use insights::{
    FastestLapEntry, HoleShotAnalysis, Insights, PerformanceGaps, PilotProgress, compute_insights,
    fastest_lap_rankings, hole_shot_analysis, performance_gaps, personal_bests,
};
pub use points::{CorrectedPoints, RankedPilot, corrected_points_table, rank_round};
pub use record::{Event, Lap, MAX_VALID_LAP_SECONDS, Pilot, Race, RaceResult, Round};
pub use seeding::{SeedingEntry, compute_seeding};
pub use source::{
    DEFAULT_MAX_DEPTH, FileTree, FsTree, MemoryTree, SkippedFile, SourceError, SourceFile,
    TreeEntry, discover_json_files, read_sources,
};
pub use standings::{
    EnhancedStandings, Standing, StandingRace, TimeTrialStats, enhanced_standings,
};
pub use types::{PilotId, RaceId, RoundId, ValidationError};
