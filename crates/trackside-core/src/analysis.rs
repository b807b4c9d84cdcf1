//! Tunable parameters for seeding, grading, points and insights.

use serde::{Deserialize, Serialize};

/// Configuration shared by the analysis engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Length of the consecutive-lap window used for seeding and hole-shots.
    /// Default: 3.
    pub consecutive_laps: usize,

    /// Highest time-trial round that counts as qualifying.
    /// Default: 4.
    pub max_qualifying_round: u32,

    /// Number of pilots per group in the fastest-lap rankings.
    /// Default: 4.
    pub group_size: usize,

    /// Points for the top of a round's global ranking, decreasing by one per place.
    /// Default: 20.
    pub starting_points: u32,

    /// Gap to the previous pilot (seconds) below which competition is "close".
    /// Default: 0.5.
    pub close_gap_seconds: f64,

    /// Number of most recent rounds in a pilot's recent form.
    /// Default: 3.
    pub recent_form_rounds: usize,

    /// Seeding position assumed for pilots without a seed when grading.
    /// Default: 999.
    pub unseeded_position: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            consecutive_laps: 3,
            max_qualifying_round: 4,
            group_size: 4,
            starting_points: 20,
            close_gap_seconds: 0.5,
            recent_form_rounds: 3,
            unseeded_position: 999,
        }
    }
}

impl AnalysisConfig {
    /// Whether a round number falls inside the qualifying window.
    pub const fn is_qualifying_round(&self, round_number: u32) -> bool {
        round_number <= self.max_qualifying_round
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config: AnalysisConfig = serde_json::from_str(r#"{"group_size": 6}"#).unwrap();
        assert_eq!(config.group_size, 6);
        assert_eq!(config.consecutive_laps, 3);
        assert_eq!(config.unseeded_position, 999);
    }

    #[test]
    fn qualifying_window_is_inclusive() {
        let config = AnalysisConfig::default();
        assert!(config.is_qualifying_round(4));
        assert!(!config.is_qualifying_round(5));
    }
}
