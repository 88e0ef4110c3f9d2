//! Moments CLI - Command-line interface for Moment Insights
//!
//! Commands:
//! - windows: Print the three week windows for an instant
//! - insight: Classify one week of moment records into an insight payload
//! - interference: Summarize a calendar week of daily interference check-ins
//! - validate: Validate moment records
//! - doctor: Diagnose configuration and environment

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use moment_insights::adapter::{
    parse_records, parse_records_ndjson, records_for_owner, records_to_events, validate_records,
    MomentRecord,
};
use moment_insights::encoder::{InsightEncoder, InsightPayload, InterferencePayload};
use moment_insights::interference::{
    parse_checkins, parse_checkins_ndjson, InterferenceDomain, InterferenceLevel,
};
use moment_insights::phrasing::RandomPicker;
use moment_insights::{
    weekly_insight, weekly_interference, ComputeError, InsightClassifier, InsightConfig,
    MemoryEventStore, WeekWindowCalculator, WeeklyInterference, WindowInsight, WindowKey,
    INSIGHTS_VERSION, PRODUCER_NAME,
};

/// Owner every record is filed under once the input is read
const LOCAL_OWNER: &str = "local";

/// Moments - weekly response-pattern insights for logged moments
#[derive(Parser)]
#[command(name = "moments")]
#[command(author = "Moment Insights Contributors")]
#[command(version = INSIGHTS_VERSION)]
#[command(about = "Summarize how you responded to urges this week", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the three week windows
    Windows {
        /// Reference instant (RFC3339, defaults to now)
        #[arg(long)]
        now: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify one week of moments into an insight payload
    Insight {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Week to summarize (this-week, last-week, two-weeks-ago)
        #[arg(long, default_value = "this-week")]
        week: String,

        /// Keep only records whose user_id matches
        #[arg(long)]
        owner: Option<String>,

        /// Reference instant (RFC3339, defaults to now)
        #[arg(long)]
        now: Option<String>,

        /// Seed for reproducible sparse-tier wording
        #[arg(long)]
        seed: Option<u64>,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Summarize a calendar week of daily interference check-ins
    Interference {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Any day of the week to summarize (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Validate moment records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one moment per line)
    Ndjson,
    /// JSON array of moments
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Human-readable summary
    Text,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (warn)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr).compact())
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), MomentsCliError> {
    match cli.command {
        Commands::Windows { now, json } => cmd_windows(now.as_deref(), json),

        Commands::Insight {
            input,
            input_format,
            week,
            owner,
            now,
            seed,
            config,
            output_format,
        } => cmd_insight(
            &input,
            input_format,
            week.parse()?,
            owner.as_deref(),
            now.as_deref(),
            seed,
            config.as_deref(),
            output_format,
        ),

        Commands::Interference {
            input,
            input_format,
            date,
            config,
            output_format,
        } => cmd_interference(
            &input,
            input_format,
            date.as_deref(),
            config.as_deref(),
            output_format,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_windows(now: Option<&str>, json: bool) -> Result<(), MomentsCliError> {
    let now = parse_now(now)?;
    let windows = WeekWindowCalculator::compute_windows(now)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&windows)?);
    } else {
        println!("Week Windows (relative to {})", now.to_rfc3339());
        println!("==============");
        for window in &windows {
            println!(
                "  {:<12} {} .. {}",
                window.label,
                window.start.to_rfc3339(),
                window.end.to_rfc3339()
            );
        }
    }

    Ok(())
}

fn cmd_insight(
    input: &Path,
    input_format: InputFormat,
    week: WindowKey,
    owner: Option<&str>,
    now: Option<&str>,
    seed: Option<u64>,
    config: Option<&Path>,
    output_format: OutputFormat,
) -> Result<(), MomentsCliError> {
    let now = parse_now(now)?;
    let config = match config {
        Some(path) => InsightConfig::from_file(path)?,
        None => InsightConfig::default(),
    };

    let mut records = read_records(input, &input_format)?;
    if let Some(owner) = owner {
        records = records_for_owner(records, owner);
    }
    let events = records_to_events(&records)?;

    let mut store = MemoryEventStore::new();
    for event in events {
        store.record(LOCAL_OWNER, event)?;
    }

    let picker = match seed {
        Some(seed) => RandomPicker::seeded(seed),
        None => RandomPicker::new(),
    };
    let mut classifier = InsightClassifier::with_picker(config, picker);

    let (window, insight) = match weekly_insight(&store, LOCAL_OWNER, now, week, &mut classifier)? {
        WindowInsight::Loaded { window, insight } => (window, insight),
        WindowInsight::FetchFailed { reason, .. } => {
            return Err(MomentsCliError::FetchFailed(reason));
        }
    };

    let encoder = InsightEncoder::new();
    let output = match output_format {
        OutputFormat::Json => encoder.encode_to_json(&insight, Some(&window))?,
        OutputFormat::JsonPretty => encoder.encode_to_json_pretty(&insight, Some(&window))?,
        OutputFormat::Text => format_insight_text(&encoder.encode(&insight, Some(&window))),
    };

    println!("{}", output);
    Ok(())
}

fn cmd_interference(
    input: &Path,
    input_format: InputFormat,
    date: Option<&str>,
    config: Option<&Path>,
    output_format: OutputFormat,
) -> Result<(), MomentsCliError> {
    let day = match date {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map_err(|e| MomentsCliError::InvalidDate(format!("{}: {}", d, e)))?,
        None => Utc::now().date_naive(),
    };
    let config = match config {
        Some(path) => InsightConfig::from_file(path)?,
        None => InsightConfig::default(),
    };

    let input_data = read_input(input)?;
    let checkins = match input_format {
        InputFormat::Ndjson => parse_checkins_ndjson(&input_data)?,
        InputFormat::Json => parse_checkins(&input_data)?,
    };

    let mut store = MemoryEventStore::new();
    for checkin in checkins {
        store.record_checkin(LOCAL_OWNER, checkin)?;
    }

    let summary = match weekly_interference(&store, LOCAL_OWNER, day, &config)? {
        WeeklyInterference::Loaded { summary } => summary,
        WeeklyInterference::FetchFailed { reason, .. } => {
            return Err(MomentsCliError::FetchFailed(reason));
        }
    };

    let encoder = InsightEncoder::new();
    let output = match output_format {
        OutputFormat::Json => encoder.encode_interference_to_json(&summary)?,
        OutputFormat::JsonPretty => encoder.encode_interference_to_json_pretty(&summary)?,
        OutputFormat::Text => format_interference_text(&encoder.encode_interference(&summary)),
    };

    println!("{}", output);
    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    json: bool,
) -> Result<(), MomentsCliError> {
    let records = read_records(input, &input_format)?;
    let issues = validate_records(&records);

    let report = ValidationReport {
        total_moments: records.len(),
        valid_moments: records.len() - issues.len(),
        invalid_moments: issues.len(),
        errors: issues
            .iter()
            .map(|issue| ValidationErrorDetail {
                index: issue.index,
                moment_id: issue.id.clone(),
                error: issue.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total moments:   {}", report.total_moments);
        println!("Valid moments:   {}", report.valid_moments);
        println!("Invalid moments: {}", report.invalid_moments);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Moment {} (index {}): {}",
                    err.moment_id, err.index, err.error
                );
            }
        }
    }

    if report.invalid_moments > 0 {
        Err(MomentsCliError::ValidationFailed(report.invalid_moments))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), MomentsCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "insights_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Moment Insights version {}", INSIGHTS_VERSION),
    });

    checks.push(match WeekWindowCalculator::compute_windows(Utc::now()) {
        Ok(windows) => DoctorCheck {
            name: "windows".to_string(),
            status: CheckStatus::Ok,
            message: format!("This week starts {}", windows[0].start.to_rfc3339()),
        },
        Err(e) => DoctorCheck {
            name: "windows".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    });

    if let Some(config_path) = config {
        let check = if config_path.exists() {
            match InsightConfig::from_file(config_path) {
                Ok(config) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Config valid (sparse threshold {}, recent urge limit {})",
                        config.sparse_threshold, config.recent_urge_limit
                    ),
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            }
        } else {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist, defaults apply".to_string(),
            }
        };
        checks.push(check);
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: INSIGHTS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Moments Doctor Report");
        println!("=====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(MomentsCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn parse_now(now: Option<&str>) -> Result<DateTime<Utc>, MomentsCliError> {
    match now {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| MomentsCliError::InvalidNow(format!("{}: {}", s, e))),
        None => Ok(Utc::now()),
    }
}

fn read_input(input: &Path) -> Result<String, MomentsCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_records(
    input: &Path,
    input_format: &InputFormat,
) -> Result<Vec<MomentRecord>, MomentsCliError> {
    let input_data = read_input(input)?;

    let records = match input_format {
        InputFormat::Ndjson => parse_records_ndjson(&input_data)?,
        InputFormat::Json => parse_records(&input_data)?,
    };
    tracing::debug!(count = records.len(), "Read moment records");
    Ok(records)
}

fn format_insight_text(payload: &InsightPayload) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(window) = &payload.window {
        lines.push(format!(
            "{} ({} .. {})",
            window.label,
            window.start.format("%Y-%m-%d"),
            window.end.format("%Y-%m-%d")
        ));
    }
    lines.push(payload.headline.clone());
    if let Some(summary) = &payload.insight.summary_text {
        lines.push(summary.clone());
    }

    if !payload.frequency_labels.is_empty() {
        lines.push(String::new());
        for row in &payload.frequency_labels {
            lines.push(format!(
                "  {} {:<24} {}",
                row.category.symbol(),
                row.category.label(),
                row.label.as_text()
            ));
        }
    }

    if let Some(secondary) = &payload.insight.secondary_text {
        lines.push(String::new());
        lines.push(secondary.clone());
    }
    if let Some(remaining) = payload.insight.entries_until_full_analysis {
        lines.push(format!("{} more entries until pattern analysis", remaining));
    }

    lines.join("\n")
}

fn format_interference_text(payload: &InterferencePayload) -> String {
    let summary = &payload.summary;
    let mut lines = vec![format!(
        "Week of {} .. {} ({} check-ins)",
        summary.week.start, summary.week.end, summary.checkin_count
    )];

    for domain in InterferenceDomain::ALL {
        let average = match summary.averages.get(domain) {
            Some(avg) => format!("{:.1}/10", avg),
            None => "no ratings".to_string(),
        };
        lines.push(format!("  {:<24} {}", domain.label(), average));
    }

    let level = summary.level.map(|l| match l {
        InterferenceLevel::High => "high",
        InterferenceLevel::Low => "low",
        InterferenceLevel::Varied => "varied",
    });
    if let (Some(level), Some(text)) = (level, &summary.summary_text) {
        lines.push(String::new());
        lines.push(format!("[{}] {}", level, text));
    }

    lines.join("\n")
}

// Error types

enum MomentsCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    InvalidNow(String),
    InvalidDate(String),
    FetchFailed(String),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for MomentsCliError {
    fn from(e: io::Error) -> Self {
        MomentsCliError::Io(e)
    }
}

impl From<ComputeError> for MomentsCliError {
    fn from(e: ComputeError) -> Self {
        MomentsCliError::Compute(e)
    }
}

impl From<serde_json::Error> for MomentsCliError {
    fn from(e: serde_json::Error) -> Self {
        MomentsCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MomentsCliError> for CliError {
    fn from(e: MomentsCliError) -> Self {
        match e {
            MomentsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MomentsCliError::Compute(e) => {
                let hint = match e {
                    ComputeError::ConfigError(_) => "Check the configuration file",
                    ComputeError::InvalidResponseCategory(_) | ComputeError::InvalidMoment(_) => {
                        "Run 'moments validate' for details"
                    }
                    ComputeError::UnknownWindow(_) => {
                        "Use this-week, last-week or two-weeks-ago"
                    }
                    _ => "Ensure input is a list of moment records",
                };
                CliError {
                    code: "COMPUTE_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            MomentsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            MomentsCliError::InvalidNow(msg) => CliError {
                code: "INVALID_NOW".to_string(),
                message: msg,
                hint: Some("Use an RFC3339 timestamp, e.g. 2024-01-15T12:00:00Z".to_string()),
            },
            MomentsCliError::InvalidDate(msg) => CliError {
                code: "INVALID_DATE".to_string(),
                message: msg,
                hint: Some("Use a calendar date, e.g. 2024-01-15".to_string()),
            },
            MomentsCliError::FetchFailed(reason) => CliError {
                code: "FETCH_FAILED".to_string(),
                message: reason,
                hint: None,
            },
            MomentsCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} moments failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            MomentsCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_moments: usize,
    valid_moments: usize,
    invalid_moments: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    moment_id: String,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
