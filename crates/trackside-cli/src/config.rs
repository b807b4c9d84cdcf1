//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use trackside_core::{AggregateOptions, AnalysisConfig, DEFAULT_MAX_DEPTH};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the timing software's `events` tree.
    pub data_root: PathBuf,

    /// Event directory below the data root to analyse on its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,

    /// Maximum directory depth scanned below the data root.
    pub max_depth: usize,

    /// Seeding, grading, points and insight parameters.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("data_root", &self.data_root)
            .field("event", &self.event)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: resolve_data_root(&data_root_candidates()),
            event: None,
            max_depth: DEFAULT_MAX_DEPTH,
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later layers win: defaults, the user config file, `config_path`,
    /// then `TRACKSIDE_*` environment variables. Nested keys use a double
    /// underscore, e.g. `TRACKSIDE_ANALYSIS__GROUP_SIZE`.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("TRACKSIDE_").split("__"));

        figment.extract()
    }

    /// Replaces the data root, e.g. from a command-line flag.
    #[must_use]
    pub fn with_data_root(mut self, data_root: Option<PathBuf>) -> Self {
        if let Some(root) = data_root {
            self.data_root = root;
        }
        self
    }

    /// Restricts analysis to one event directory, e.g. from a command-line flag.
    #[must_use]
    pub fn with_event(mut self, event: Option<String>) -> Self {
        if event.is_some() {
            self.event = event;
        }
        self
    }

    /// The directory to aggregate: the selected event, else the whole data root.
    pub fn source_root(&self) -> PathBuf {
        self.event
            .as_ref()
            .map_or_else(|| self.data_root.clone(), |event| self.data_root.join(event))
    }

    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            max_depth: self.max_depth,
        }
    }
}

/// Returns the platform-specific config directory for trackside.
///
/// On Linux: `~/.config/trackside`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("trackside"))
}

/// Places FPVTrackside is known to keep its `events` directory, most likely first.
fn data_root_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(local) = dirs::data_local_dir() {
        candidates.push(local.join("FPVTrackside").join("events"));
    }
    if let Some(home) = dirs::home_dir() {
        candidates.push(
            home.join("AppData")
                .join("Local")
                .join("FPVTrackside")
                .join("events"),
        );
    }
    candidates
}

/// The first existing candidate, else the first candidate, else `./events`.
fn resolve_data_root(candidates: &[PathBuf]) -> PathBuf {
    candidates
        .iter()
        .find(|path| path.is_dir())
        .or_else(|| candidates.first())
        .cloned()
        .unwrap_or_else(|| PathBuf::from("events"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_config_path_ends_with_trackside() {
        let path = dirs_config_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "trackside");
    }

    #[test]
    fn test_resolve_prefers_existing_candidate() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("missing");
        let present = temp.path().join("present");
        std::fs::create_dir(&present).unwrap();

        let resolved = resolve_data_root(&[missing.clone(), present.clone()]);
        assert_eq!(resolved, present);

        let fallback = resolve_data_root(std::slice::from_ref(&missing));
        assert_eq!(fallback, missing);

        assert_eq!(resolve_data_root(&[]), PathBuf::from("events"));
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config_path = temp.path().join("trackside.toml");
        std::fs::write(
            &config_path,
            "data_root = \"/srv/events\"\nmax_depth = 5\n\n[analysis]\ngroup_size = 6\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.data_root, PathBuf::from("/srv/events"));
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.analysis.group_size, 6);
        assert_eq!(config.analysis.consecutive_laps, 3);
    }

    #[test]
    fn test_flag_overrides_data_root() {
        let config = Config::default().with_data_root(Some(PathBuf::from("/tmp/races")));
        assert_eq!(config.data_root, PathBuf::from("/tmp/races"));
        assert_eq!(config.aggregate_options().max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_event_narrows_source_root() {
        let config = Config::default().with_data_root(Some(PathBuf::from("/tmp/races")));
        assert_eq!(config.source_root(), PathBuf::from("/tmp/races"));

        let config = config.with_event(Some("spring".to_string()));
        assert_eq!(config.source_root(), PathBuf::from("/tmp/races/spring"));

        let config = config.with_event(None);
        assert_eq!(config.event.as_deref(), Some("spring"));
    }

    #[test]
    fn test_event_from_config_file() {
        let temp = tempfile::tempdir().unwrap();
        let config_path = temp.path().join("trackside.toml");
        std::fs::write(&config_path, "data_root = \"/srv/events\"\nevent = \"summer\"\n").unwrap();

        let config = Config::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.source_root(), PathBuf::from("/srv/events/summer"));
    }
}
