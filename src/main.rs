use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use aqhi_service::config::{self, AppConfig};
use aqhi_service::ingest::{RendererKind, fixture::FixtureRenderer, PageRenderer};
use aqhi_service::logging::{self, Component};
use aqhi_service::model::{DATE_FORMAT, PipelineError, StoreError};
use aqhi_service::store::{self, ObservationStore, PostgresStore, StoreKind};
use aqhi_service::{parse, pipeline};

const MAX_INTERVAL_MINUTES: u64 = 24 * 60;

#[derive(Parser)]
#[command(name = "aqhi_service", version, about = "Capture Hong Kong AQHI station readings")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "AQHI_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture the current snapshot once
    Run {
        /// Replay a saved page instead of fetching the live one
        #[arg(long)]
        fixture: Option<PathBuf>,
        /// Parse and validate but keep results in memory only
        #[arg(long)]
        dry_run: bool,
    },
    /// Capture repeatedly until interrupted
    Watch {
        /// Minutes between captures, at most one day
        #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_MINUTES))]
        interval_minutes: u64,
        /// Stop after this many runs
        #[arg(long)]
        max_runs: Option<usize>,
    },
    /// Print a stored snapshot as JSON
    Show {
        /// Date as dd/mm/yyyy
        #[arg(long)]
        date: String,
        /// End-of-hour, 1-24
        #[arg(long)]
        hour: u8,
    },
    /// Parse a saved page and print the observations as JSON
    ParseFile { path: PathBuf },
    /// Create the observation table if missing
    InitDb,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logger(
        config.logging.level,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    let result = match cli.command {
        Command::Run { fixture, dry_run } => run_once(config, fixture, dry_run),
        Command::Watch { interval_minutes, max_runs } => {
            watch(&config, interval_minutes, max_runs);
            Ok(())
        }
        Command::Show { date, hour } => show(&config, &date, hour),
        Command::ParseFile { path } => parse_file(path),
        Command::InitDb => init_db(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::log_run_failure(&e);
            ExitCode::FAILURE
        }
    }
}

fn run_once(mut config: AppConfig, fixture: Option<PathBuf>, dry_run: bool) -> Result<(), PipelineError> {
    if let Some(path) = fixture {
        config.renderer.kind = RendererKind::Fixture;
        config.renderer.fixture_path = Some(path);
    }
    if dry_run {
        config.store.kind = StoreKind::Memory;
    }

    let summary = pipeline::run(&config.renderer, &config.store)?;
    logging::log_run_summary(&summary);
    Ok(())
}

fn watch(config: &AppConfig, interval_minutes: u64, max_runs: Option<usize>) {
    let interval = Duration::from_secs(interval_minutes.clamp(1, MAX_INTERVAL_MINUTES) * 60);
    let (mut total, mut successful, mut failed) = (0, 0, 0);

    logging::info(
        Component::System,
        None,
        &format!("Capturing every {} minutes", interval.as_secs() / 60),
    );

    loop {
        total += 1;
        match pipeline::run(&config.renderer, &config.store) {
            Ok(summary) => {
                successful += 1;
                logging::log_run_summary(&summary);
            }
            Err(e) => {
                failed += 1;
                logging::log_run_failure(&e);
            }
        }

        if max_runs.is_some_and(|max| total >= max) {
            break;
        }
        thread::sleep(interval);
    }

    logging::log_watch_summary(total, successful, failed);
}

fn show(config: &AppConfig, date: &str, hour: u8) -> Result<(), PipelineError> {
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| {
        config::ConfigError::Invalid(format!("date '{}' is not dd/mm/yyyy", date))
    })?;

    let mut store = store::open(&config.store)?;
    let records = store.find(date, hour)?;
    if records.is_empty() {
        logging::warn(Component::Store, None, "No observations stored for that hour");
    }

    let json = serde_json::to_string_pretty(&records)
        .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn parse_file(path: PathBuf) -> Result<(), PipelineError> {
    let page = FixtureRenderer::new(&path).render(&path.display().to_string())?;
    let observations = parse::parse_page(&page)?;

    let json = serde_json::to_string_pretty(&observations)
        .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn init_db(config: &AppConfig) -> Result<(), PipelineError> {
    let url = config
        .store
        .database_url
        .as_deref()
        .ok_or_else(|| StoreError::Unavailable("DATABASE_URL not set".to_string()))?;
    let store = PostgresStore::new(url, &config.store.table);
    store.connect_and_verify()?;
    store.ensure_schema()?;
    Ok(())
}
