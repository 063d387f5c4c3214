//! Config loading for logslice.
//!
//! Loads and validates YAML config files with path expansion.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::discovery::DiscoveryResult;
use crate::config::error::ConfigError;
use crate::config::types::{Config, RawConfig};

/// Expand tilde in path to home directory.
///
/// Handles the following cases:
/// - `~/foo` -> `/home/user/foo`
/// - `/absolute/path` -> unchanged
/// - `relative/path` -> unchanged
pub fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path_str == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }

    path.to_path_buf()
}

/// Load and parse a YAML config file.
fn load_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    // Comment-only files are an empty config
    let has_content = content
        .lines()
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with('#'));
    if !has_content {
        return Ok(RawConfig::default());
    }

    serde_saphyr::from_str(&content)
        .map_err(|e| ConfigError::from_saphyr_error(path.to_path_buf(), e))
}

/// Reject values the extractor cannot work with.
fn validate(path: &Path, raw: &RawConfig) -> Result<(), ConfigError> {
    let positive: [(&str, Option<u64>); 6] = [
        ("workers", raw.workers.map(|v| v as u64)),
        ("scan_window", raw.scan_window.map(|v| v as u64)),
        ("locate_window", raw.locate_window.map(|v| v as u64)),
        ("min_search_window", raw.min_search_window),
        ("max_probes", raw.max_probes.map(|v| v as u64)),
        ("max_chunk_bytes", raw.max_chunk_bytes),
    ];

    for (field, value) in positive {
        if value == Some(0) {
            return Err(ConfigError::Validation {
                path: path.to_path_buf(),
                message: format!("`{}` must be at least 1", field),
            });
        }
    }
    Ok(())
}

/// Overlay the values set in `raw` onto `config`, expanding paths.
fn apply(config: &mut Config, raw: RawConfig) {
    fn set<T>(slot: &mut Option<T>, value: Option<T>) {
        if value.is_some() {
            *slot = value;
        }
    }

    set(&mut config.workers, raw.workers);
    set(&mut config.scan_window, raw.scan_window);
    set(&mut config.locate_window, raw.locate_window);
    set(&mut config.min_search_window, raw.min_search_window);
    set(&mut config.margin_factor, raw.margin_factor);
    set(&mut config.max_probe_skip, raw.max_probe_skip);
    set(&mut config.max_probes, raw.max_probes);
    set(&mut config.max_widen_rounds, raw.max_widen_rounds);
    set(&mut config.max_chunk_bytes, raw.max_chunk_bytes);
    set(&mut config.output_dir, raw.output_dir.as_deref().map(expand_path));
    set(&mut config.format, raw.format);
    set(&mut config.log_file, raw.log_file.as_deref().map(expand_path));
}

/// Load a single config file on its own (for `--config`).
pub fn load_single_file(path: &Path) -> Result<Config, ConfigError> {
    let raw = load_file(path)?;
    validate(path, &raw)?;
    let mut config = Config::default();
    apply(&mut config, raw);
    Ok(config)
}

/// Load config from discovered config files.
///
/// The global config is applied first so the project config can override
/// it field by field. Returns an empty Config if no config files exist.
pub fn load(discovery: &DiscoveryResult) -> Result<Config, ConfigError> {
    let mut config = Config::default();

    for path in [&discovery.global_config, &discovery.project_config]
        .into_iter()
        .flatten()
    {
        let raw = load_file(path)?;
        validate(path, &raw)?;
        apply(&mut config, raw);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_expand_path_tilde() {
        let path = Path::new("~/logs/app.log");
        let expanded = expand_path(path);

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("logs/app.log"));
        } else {
            assert_eq!(expanded.to_string_lossy(), "~/logs/app.log");
        }
    }

    #[test]
    fn test_expand_path_absolute_and_relative() {
        assert_eq!(
            expand_path(Path::new("/var/log/app.log")),
            PathBuf::from("/var/log/app.log")
        );
        assert_eq!(
            expand_path(Path::new("logs/app.log")),
            PathBuf::from("logs/app.log")
        );
    }

    #[test]
    fn test_load_empty_discovery() {
        let config = load(&DiscoveryResult::default()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_comment_only_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logslice.yaml");
        fs::write(&path, "# nothing here yet\n\n").unwrap();

        assert_eq!(load_single_file(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_project_overrides_global() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("logslice.yaml");
        let global = temp.path().join("config.yaml");
        fs::write(&global, "workers: 2\nformat: compact\noutput_dir: /tmp/global\n").unwrap();
        fs::write(&project, "workers: 6\nlog_file: ~/app.log\n").unwrap();

        let discovery = DiscoveryResult {
            project_root: Some(temp.path().to_path_buf()),
            project_config: Some(project),
            global_config: Some(global),
        };
        let config = load(&discovery).unwrap();

        assert_eq!(config.workers, Some(6));
        assert_eq!(config.format, Some(OutputFormat::Compact));
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/global")));
        assert_eq!(config.log_file, Some(expand_path(Path::new("~/app.log"))));
    }

    #[test]
    fn test_unknown_field_error_suggests() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logslice.yaml");
        fs::write(&path, "wrokers: 4\n").unwrap();

        let err = load_single_file(&path).unwrap_err();
        let display = err.to_string();
        assert!(display.contains(&path.to_string_lossy().to_string()));
        assert!(display.contains("wrokers"));
        assert!(display.contains("did you mean `workers`"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logslice.yaml");
        fs::write(&path, "workers: 0\n").unwrap();

        match load_single_file(&path) {
            Err(ConfigError::Validation { message, .. }) => {
                assert!(message.contains("workers"))
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_single_file(Path::new("/nonexistent/logslice.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
