//! Config discovery for logslice.
//!
//! Walks parent directories to find `logslice.yaml` and checks for global config
//! at `~/.config/logslice/config.yaml`.

use std::path::{Path, PathBuf};

/// Project config filename to search for in parent directories.
pub const PROJECT_CONFIG_NAME: &str = "logslice.yaml";

/// Global config filename within the logslice config directory.
pub const GLOBAL_CONFIG_NAME: &str = "config.yaml";

/// Result of config discovery.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryResult {
    /// Directory containing `logslice.yaml`.
    pub project_root: Option<PathBuf>,
    /// Full path to the project config file (`logslice.yaml`).
    pub project_config: Option<PathBuf>,
    /// Full path to the global config file (`~/.config/logslice/config.yaml`).
    pub global_config: Option<PathBuf>,
}

impl DiscoveryResult {
    /// Returns true if any config was found (project or global).
    pub fn has_config(&self) -> bool {
        self.project_config.is_some() || self.global_config.is_some()
    }
}

/// Discover config files starting from the current working directory.
pub fn discover() -> DiscoveryResult {
    discover_verbose().0
}

/// Same as [`discover`] but also returns every directory that was checked,
/// for `-v` output.
pub fn discover_verbose() -> (DiscoveryResult, Vec<PathBuf>) {
    let global = dirs::config_dir().map(|dir| dir.join("logslice").join(GLOBAL_CONFIG_NAME));

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.canonicalize().unwrap_or(dir),
        Err(_) => {
            let result = DiscoveryResult {
                global_config: global.filter(|path| is_file(path)),
                ..DiscoveryResult::default()
            };
            return (result, Vec::new());
        }
    };

    discover_from(&cwd, global.as_deref())
}

/// Walk `start` and its ancestors for a project config; check `global`.
pub fn discover_from(start: &Path, global: Option<&Path>) -> (DiscoveryResult, Vec<PathBuf>) {
    let mut result = DiscoveryResult {
        global_config: global.filter(|path| is_file(path)).map(Path::to_path_buf),
        ..DiscoveryResult::default()
    };
    let mut searched_paths = Vec::new();

    for ancestor in start.ancestors() {
        searched_paths.push(ancestor.to_path_buf());

        let config_path = ancestor.join(PROJECT_CONFIG_NAME);
        if is_file(&config_path) {
            result.project_root = Some(ancestor.to_path_buf());
            result.project_config = Some(config_path);
            break;
        }
    }

    (result, searched_paths)
}

fn is_file(path: &Path) -> bool {
    path.try_exists().unwrap_or(false) && path.is_file()
}
