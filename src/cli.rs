//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::clock_adapter::SystemClock;
use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_store_adapter::JsonFileStore;
use crate::adapters::markdown_report_adapter::MarkdownReportAdapter;
use crate::adapters::report_dir_adapter::ReportDirAdapter;
use crate::domain::accuracy::aggregate;
use crate::domain::config_validation::{
    build_tracker_config, PriceBackend, StoreBackend, TrackerConfig,
};
use crate::domain::error::PredtrackError;
use crate::domain::extract::extract;
use crate::domain::history::import_history;
use crate::domain::prediction::{Horizon, PredictionSet};
use crate::domain::verification::{RunStatus, VerificationEngine, VerifyReport};
use crate::ports::clock_port::Clock;
use crate::ports::price_port::PricePort;
use crate::ports::report_port::{ReportContext, ReportPort};
use crate::ports::report_source_port::ReportSource;
use crate::ports::store_port::PredictionStore;

#[derive(Parser, Debug)]
#[command(name = "predtrack", about = "Prediction tracking and multi-horizon verification")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract predictions from a report and store them
    Extract {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        report: PathBuf,
        /// Reference date, overriding the date found in the report
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Verify every horizon maturing on a date (default: today)
    Verify {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Import archived daily reports and verify them forward
    #[command(group(ArgGroup::new("selection").required(true).args(["all", "dates"])))]
    ImportHistory {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long)]
        all: bool,
        #[arg(long, value_delimiter = ',')]
        dates: Vec<NaiveDate>,
    },
    /// Write the historical accuracy report
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the stored predictions for a date
    Show {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        date: NaiveDate,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Extract {
            config,
            report,
            date,
        } => run_extract(&config, &report, date),
        Command::Verify { config, date } => run_verify(&config, date),
        Command::ImportHistory {
            config,
            data_dir,
            all,
            dates,
        } => run_import_history(&config, &data_dir, all, dates),
        Command::Analyze { config, output } => run_analyze(&config, output.as_deref()),
        Command::Show { config, date } => run_show(&config, date),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, PredtrackError> {
    FileConfigAdapter::from_file(path).map_err(|e| PredtrackError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Config file to validated [`TrackerConfig`].
pub fn load_tracker_config(path: &Path) -> Result<TrackerConfig, PredtrackError> {
    let adapter = load_config(path)?;
    build_tracker_config(&adapter)
}

pub fn open_store(config: &TrackerConfig) -> Result<Box<dyn PredictionStore>, PredtrackError> {
    match config.store_backend {
        StoreBackend::Json => Ok(Box::new(
            JsonFileStore::open(&config.store_path)?.with_pretty(config.pretty_json),
        )),
        StoreBackend::Sqlite => {
            #[cfg(feature = "sqlite")]
            {
                use crate::adapters::sqlite_adapter::SqliteAdapter;
                Ok(Box::new(SqliteAdapter::open(&config.store_path)?))
            }
            #[cfg(not(feature = "sqlite"))]
            {
                Err(sqlite_required("store"))
            }
        }
    }
}

pub fn open_prices(config: &TrackerConfig) -> Result<Box<dyn PricePort>, PredtrackError> {
    match config.price_backend {
        PriceBackend::Csv => Ok(Box::new(CsvPriceAdapter::new(config.price_path.clone()))),
        PriceBackend::Sqlite => {
            #[cfg(feature = "sqlite")]
            {
                use crate::adapters::sqlite_adapter::SqliteAdapter;
                Ok(Box::new(SqliteAdapter::open(&config.price_path)?))
            }
            #[cfg(not(feature = "sqlite"))]
            {
                Err(sqlite_required("prices"))
            }
        }
    }
}

#[cfg(not(feature = "sqlite"))]
fn sqlite_required(section: &str) -> PredtrackError {
    PredtrackError::ConfigInvalid {
        section: section.to_string(),
        key: "backend".to_string(),
        reason: "sqlite feature is required for backend = sqlite".to_string(),
    }
}

fn run_extract(
    config_path: &Path,
    report_path: &Path,
    date_override: Option<NaiveDate>,
) -> Result<ExitCode, PredtrackError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_tracker_config(config_path)?;

    eprintln!("Reading report {}", report_path.display());
    let text = fs::read_to_string(report_path)?;
    let extraction = extract(&text);

    for diagnostic in &extraction.diagnostics {
        eprintln!("  skipped: {diagnostic}");
    }

    let Some(date) = date_override.or(extraction.reference_date) else {
        eprintln!("error: report has no date; pass --date");
        return Ok(ExitCode::from(4));
    };
    if extraction.records.is_empty() {
        eprintln!("No predictions found in {}", report_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let mut store = open_store(&config)?;
    let set = store.upsert(date, extraction.records)?;

    for record in &set.predictions {
        println!("{}", record_line(record));
    }
    eprintln!(
        "\nStored {} predictions for {} ({} discarded)",
        set.predictions.len(),
        date,
        extraction.diagnostics.len()
    );
    Ok(ExitCode::SUCCESS)
}

fn run_verify(config_path: &Path, date: Option<NaiveDate>) -> Result<ExitCode, PredtrackError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_tracker_config(config_path)?;
    let mut store = open_store(&config)?;
    let prices = open_prices(&config)?;
    let clock = SystemClock;

    let as_of = date.unwrap_or_else(|| clock.today());
    let engine = VerificationEngine::new(prices.as_ref(), &clock);
    let report = engine.verify(store.as_mut(), as_of)?;

    eprintln!("\n=== Verification as of {} ===", as_of);
    print_verify_report(&report);
    Ok(ExitCode::SUCCESS)
}

fn print_verify_report(report: &VerifyReport) {
    for run in &report.runs {
        match run.status {
            RunStatus::Deferred => {
                eprintln!("  {}: {} is in the future, skipped", run.horizon, run.as_of)
            }
            RunStatus::NoPredictions => {
                eprintln!("  {}: no predictions for {}", run.horizon, run.source_date)
            }
            RunStatus::Processed => eprintln!(
                "  {}: {} verified, {} pending, {} unresolved, {} already final ({})",
                run.horizon,
                run.verified,
                run.still_pending,
                run.unresolved,
                run.already_final,
                run.source_date
            ),
        }
    }
    eprintln!("Total verified: {}", report.total_verified());
}

fn run_import_history(
    config_path: &Path,
    data_dir: &Path,
    all: bool,
    dates: Vec<NaiveDate>,
) -> Result<ExitCode, PredtrackError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_tracker_config(config_path)?;
    let mut store = open_store(&config)?;
    let prices = open_prices(&config)?;
    let clock = SystemClock;
    let source = ReportDirAdapter::new(data_dir.to_path_buf());

    let mut dates = if all {
        source.available_dates()?
    } else {
        dates
    };
    dates.sort();
    dates.dedup();
    eprintln!("Importing {} days from {}", dates.len(), data_dir.display());

    let engine = VerificationEngine::new(prices.as_ref(), &clock);
    let summary = import_history(&source, store.as_mut(), &engine, &dates)?;

    for day in &summary.imported {
        eprintln!(
            "  {}: {} predictions ({:?}), {} discarded, {} verified",
            day.date, day.records, day.kind, day.discarded, day.verified
        );
    }
    for date in &summary.skipped {
        eprintln!("  {}: no predictions", date);
    }
    eprintln!(
        "\nImported {} days, {} predictions, {} verified",
        summary.imported.len(),
        summary.total_records(),
        summary.total_verified()
    );
    Ok(ExitCode::SUCCESS)
}

fn run_analyze(config_path: &Path, output: Option<&Path>) -> Result<ExitCode, PredtrackError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_tracker_config(config_path)?;
    let store = open_store(&config)?;

    let sets = store.load_all()?;
    let report = aggregate(&sets);

    eprintln!("\n=== Accuracy by Horizon ===");
    for h in &report.horizons {
        match h.accuracy {
            Some(acc) => eprintln!(
                "  {}: {:.1}% over {} samples",
                h.horizon,
                acc * 100.0,
                h.samples
            ),
            None => eprintln!("  {}: no verified samples", h.horizon),
        }
    }

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.report_output.clone());
    let ctx = ReportContext {
        report: &report,
        generated_on: SystemClock.today(),
    };
    MarkdownReportAdapter.write(&ctx, &output.to_string_lossy())?;
    eprintln!("\nReport written to: {}", output.display());
    Ok(ExitCode::SUCCESS)
}

fn run_show(config_path: &Path, date: NaiveDate) -> Result<ExitCode, PredtrackError> {
    let config = load_tracker_config(config_path)?;
    let store = open_store(&config)?;

    let Some(set) = store.get(date)? else {
        eprintln!("No predictions stored for {}", date);
        return Ok(ExitCode::from(1));
    };
    print!("{}", format_set(&set));
    Ok(ExitCode::SUCCESS)
}

fn record_line(record: &crate::domain::prediction::PredictionRecord) -> String {
    let target = match record.target {
        Some(t) => format!("{:.2}~{:.2}", t.min(), t.max()),
        None => match record.pct_range {
            Some(r) => format!("{:+.1}%~{:+.1}%", r.min_pct(), r.max_pct()),
            None => "-".to_string(),
        },
    };
    let prev = record
        .prev_close
        .map(|p| format!("{:.2}", p))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} {} {} target {} prev {}",
        record.symbol, record.name, record.direction, target, prev
    )
}

/// Human-readable listing of one set, one record per block.
pub fn format_set(set: &PredictionSet) -> String {
    let mut out = format!(
        "{}: {} predictions\n",
        set.reference_date,
        set.predictions.len()
    );
    for record in &set.predictions {
        out.push_str(&format!("  {}\n", record_line(record)));
        for h in Horizon::ALL {
            let Some(v) = record.verification.get(&h) else {
                continue;
            };
            match (v.close_price, v.change_pct) {
                (Some(close), Some(change)) => out.push_str(&format!(
                    "    {} {} close {:.2} ({:+.2}%)\n",
                    h, v.result, close, change
                )),
                _ => out.push_str(&format!("    {} {}\n", h, v.result)),
            }
        }
    }
    for (h, s) in &set.summary {
        let acc = s
            .accuracy
            .map(|a| format!("{:.1}%", a * 100.0))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "  {}: {}/{} verified, {} success, accuracy {}\n",
            h, s.verified, s.total, s.success, acc
        ));
    }
    out
}
