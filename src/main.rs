use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};

mod aggregate;
mod config;
mod error;
mod loader;
mod logging;
mod models;
mod normalize;
mod report;

use config::{CompletionMetric, ManagerFilter, ReportConfig, WeekBound, WindowMode};
use models::{NormalizedRecord, WeeklyOutcome};
use report::OutputFormat;

const NO_FILE_PROMPT: &str =
    "Provide an assessment export with --file (xlsx, xls or csv) to generate weekly performance insights.";
const NO_DATA_WARNING: &str = "No records available for this week/manager selection.";

#[derive(Parser)]
#[command(name = "weekly-report")]
#[command(about = "Weekly training and assessment summary per agent", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize one reporting week per manager and agent
    Summary {
        #[arg(long)]
        file: Option<PathBuf>,
        /// First day of the seven-day window (YYYY-MM-DD)
        #[arg(long)]
        week_start: NaiveDate,
        /// Exact manager name; omit or pass "All Managers" for everyone
        #[arg(long)]
        manager: Option<String>,
        #[arg(long, value_enum, env = "WEEKLY_REPORT_WINDOW_MODE", default_value_t = WindowMode::InclusiveOfPending)]
        window_mode: WindowMode,
        #[arg(long, value_enum, env = "WEEKLY_REPORT_WEEK_BOUND", default_value_t = WeekBound::Free)]
        week_bound: WeekBound,
        #[arg(long, value_enum, env = "WEEKLY_REPORT_COMPLETION_METRIC", default_value_t = CompletionMetric::NotCompleted)]
        completion_metric: CompletionMetric,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Write the summary to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the manager filter choices found in the file
    Managers {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Show the earliest and latest dates found in the file
    Range {
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn load_records(path: &Path) -> anyhow::Result<Vec<NormalizedRecord>> {
    let table = loader::load_table(path).map_err(|err| {
        let hint = if err.is_schema_error() {
            format!(" (expected columns: {})", loader::EXPECTED_COLUMNS.join(", "))
        } else {
            String::new()
        };
        anyhow::Error::new(err).context(format!("failed to load {}{hint}", path.display()))
    })?;
    Ok(normalize::normalize_table(&table))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Commands::Summary {
            file,
            week_start,
            manager,
            window_mode,
            week_bound,
            completion_metric,
            format,
            out,
        } => {
            let Some(file) = file else {
                println!("{NO_FILE_PROMPT}");
                return Ok(());
            };
            let records = load_records(&file)?;

            let config = ReportConfig {
                manager: ManagerFilter::from_arg(manager.as_deref()),
                window_mode,
                week_bound,
                completion_metric,
                ..ReportConfig::new(week_start)
            };
            aggregate::check_week_bound(&records, &config)?;

            let rows = match aggregate::weekly_summary(&records, &config)? {
                WeeklyOutcome::Summary(rows) => rows,
                WeeklyOutcome::NoData => {
                    println!("{NO_DATA_WARNING}");
                    return Ok(());
                }
            };

            let window = aggregate::report_window(week_start)?;
            let rendered = report::render(&rows, &window, &config, format)?;
            match out {
                Some(out) => {
                    std::fs::write(&out, rendered)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    println!("Summary written to {}.", out.display());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::Managers { file } => {
            let Some(file) = file else {
                println!("{NO_FILE_PROMPT}");
                return Ok(());
            };
            let records = load_records(&file)?;
            for name in aggregate::manager_options(&records) {
                println!("{name}");
            }
        }
        Commands::Range { file } => {
            let Some(file) = file else {
                println!("{NO_FILE_PROMPT}");
                return Ok(());
            };
            let records = load_records(&file)?;
            match aggregate::observed_date_range(&records) {
                Some((min, max)) => println!("Data covers {min} to {max}."),
                None => println!("No submitted or start dates found."),
            }
        }
    }

    Ok(())
}
