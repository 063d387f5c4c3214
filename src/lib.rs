// Library interface for logslice
// Exposes the extraction pipeline for the binary, benchmarks and external tools

pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod output;
pub mod reader;
pub mod scan;
pub mod search;
pub mod timestamp;

#[cfg(test)]
mod test_utils;

pub use context::{ExtractOptions, RunContext};
pub use error::{ExtractError, RunError, Stage};
pub use extract::{extract_file, Extraction, Extractor, RunReport, Strategy};
pub use output::{LineSink, OutputFormat, WriterSink};
pub use timestamp::TargetDate;
