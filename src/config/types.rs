//! Config types for logslice.
//!
//! Defines structures for parsing and representing configuration files.

use serde::Deserialize;
use std::path::PathBuf;

use crate::context::ExtractOptions;
use crate::output::OutputFormat;

/// Input file used when neither the CLI nor a config names one.
pub const DEFAULT_LOG_FILE: &str = "logs_2024.log";

/// Directory for `output_<DATE>.txt` files.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Every field accepted in a config file (for typo suggestions).
pub const KNOWN_FIELDS: &[&str] = &[
    "workers",
    "scan_window",
    "locate_window",
    "min_search_window",
    "margin_factor",
    "max_probe_skip",
    "max_probes",
    "max_widen_rounds",
    "max_chunk_bytes",
    "output_dir",
    "format",
    "log_file",
];

/// Raw config file structure (used for parsing).
///
/// This struct directly mirrors the YAML config file structure.
/// Unknown fields are rejected with an error.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub workers: Option<usize>,
    pub scan_window: Option<usize>,
    pub locate_window: Option<usize>,
    pub min_search_window: Option<u64>,
    pub margin_factor: Option<u64>,
    pub max_probe_skip: Option<usize>,
    pub max_probes: Option<usize>,
    pub max_widen_rounds: Option<usize>,
    pub max_chunk_bytes: Option<u64>,
    /// Output directory (may contain tilde).
    pub output_dir: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    /// Default input file (may contain tilde).
    pub log_file: Option<PathBuf>,
}

/// Merged config from global and project files.
///
/// Project values (`logslice.yaml`) override global ones
/// (`~/.config/logslice/config.yaml`); unset fields keep built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub workers: Option<usize>,
    pub scan_window: Option<usize>,
    pub locate_window: Option<usize>,
    pub min_search_window: Option<u64>,
    pub margin_factor: Option<u64>,
    pub max_probe_skip: Option<usize>,
    pub max_probes: Option<usize>,
    pub max_widen_rounds: Option<usize>,
    pub max_chunk_bytes: Option<u64>,
    /// Expanded output directory.
    pub output_dir: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    /// Expanded default input file.
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Tuning options with config values applied over the defaults.
    pub fn extract_options(&self) -> ExtractOptions {
        let defaults = ExtractOptions::default();
        ExtractOptions {
            workers: self.workers.unwrap_or(defaults.workers),
            scan_window: self.scan_window.unwrap_or(defaults.scan_window),
            locate_window: self.locate_window.unwrap_or(defaults.locate_window),
            min_search_window: self.min_search_window.unwrap_or(defaults.min_search_window),
            margin_factor: self.margin_factor.unwrap_or(defaults.margin_factor),
            max_probe_skip: self.max_probe_skip.unwrap_or(defaults.max_probe_skip),
            max_probes: self.max_probes.unwrap_or(defaults.max_probes),
            max_widen_rounds: self.max_widen_rounds.unwrap_or(defaults.max_widen_rounds),
            max_chunk_bytes: self.max_chunk_bytes.or(defaults.max_chunk_bytes),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
    }

    pub fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }
}
