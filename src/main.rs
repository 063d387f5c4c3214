use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use colored::Colorize;
use logslice::config::{self, Config, ConfigError};
use logslice::{extract_file, OutputFormat, RunError, RunReport, Strategy, TargetDate, WriterSink};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "logslice")]
#[command(version)]
#[command(about = "Extract every log line of one day from a large, time-ordered log file", long_about = None)]
struct Args {
    /// Date to extract (YYYY-MM-DD)
    #[arg(value_name = "DATE")]
    date: String,

    /// Log file to read (default: `log_file` from config, else logs_2024.log)
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Output file, `-` for stdout (default: <output_dir>/output_<DATE>.txt)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Number of scan workers (default: CPU count)
    #[arg(short, long, value_name = "N")]
    workers: Option<usize>,

    /// Output line format: `compact` trims lines and rewrites the timestamp
    /// (default), `raw` keeps them byte for byte
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Use this config file instead of discovering one
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Config errors come pre-formatted, cargo style
            match e.downcast_ref::<ConfigError>() {
                Some(config_error) => eprint!("{}", config_error),
                None => eprintln!("{} {:#}", "error:".red().bold(), e),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default = match verbose {
        0 => "logslice=warn",
        1 => "logslice=info",
        _ => "logslice=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    match explicit {
        Some(path) => config::load_single_file(path),
        None => {
            let (discovery, searched) = config::discover_verbose();
            tracing::debug!(
                dirs = searched.len(),
                project = ?discovery.project_config,
                global = ?discovery.global_config,
                "config discovery finished"
            );
            config::load(&discovery)
        }
    }
}

fn run(args: Args) -> Result<()> {
    let target: TargetDate = args.date.parse()?;
    let config = load_config(args.config.as_deref())?;

    let mut options = config.extract_options();
    if let Some(workers) = args.workers {
        if workers == 0 {
            bail!("--workers must be at least 1");
        }
        options.workers = workers;
    }
    let format = args.format.unwrap_or_else(|| config.format());
    let input = args.file.clone().unwrap_or_else(|| config.log_file());
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| config.output_dir().join(format!("output_{}.txt", target)));
    let to_stdout = output.as_os_str() == "-";
    if to_stdout && args.json {
        bail!("--json prints to stdout; choose an output file with -o");
    }

    eprintln!(
        "{} {} for {}",
        "Processing".cyan().bold(),
        input.display(),
        target.to_string().as_str().bold()
    );

    let extraction = extract_file(&input, target, options)?;
    let report = &extraction.report;
    print_date_range(report);

    if to_stdout {
        let stdout = io::stdout();
        let mut sink = WriterSink::new(BufWriter::new(stdout.lock()), format);
        extraction
            .write_to(&mut sink)
            .context("Failed to write to stdout")?;
        sink.flush().context("Failed to write to stdout")?;
    } else {
        write_file(&output, format, |sink| extraction.write_to(sink))?;
    }

    print_summary(report, (!to_stdout).then_some(output.as_path()));

    if args.json {
        let json = serde_json::to_string_pretty(report).context("Failed to encode run report")?;
        println!("{}", json);
    }
    Ok(())
}

fn write_file<F>(path: &Path, format: OutputFormat, write: F) -> Result<()>
where
    F: FnOnce(&mut WriterSink<BufWriter<File>>) -> Result<(), RunError>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;

    let mut sink = WriterSink::new(BufWriter::new(file), format);
    write(&mut sink).with_context(|| format!("Failed to write {}", path.display()))?;
    sink.flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn print_date_range(report: &RunReport) {
    match (report.file_dates.first, report.file_dates.last) {
        (Some(first), Some(last)) => eprintln!("File contains logs from {} to {}", first, last),
        _ => eprintln!("{} no dated lines near the start or end of the file", "warning:".yellow().bold()),
    }
}

fn print_summary(report: &RunReport, output: Option<&Path>) {
    if let Strategy::FullScan { reason } = report.strategy {
        eprintln!("{} scanned the whole file ({})", "note:".yellow().bold(), reason);
    }

    let count = report.matches.to_string();
    let count = if report.matches > 0 {
        count.as_str().green().bold()
    } else {
        count.as_str().yellow().bold()
    };
    eprintln!("Found {} log entries for {}", count, report.target);

    if let Some(path) = output {
        eprintln!("Output written to {}", path.display());
    }
    let elapsed = format!("Completed in {:.2} seconds", report.elapsed_ms as f64 / 1000.0);
    eprintln!("{}", elapsed.as_str().dimmed());
}
