use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use trackrs::config::AppConfig;
use trackrs::error::TrackRsError;
use trackrs::logging::init_logging;
use trackrs::models::{Goal, GoalKind, Units};
use trackrs::record::SessionRecord;
use trackrs::replay::{run_session, synthesize_ticks, ReplayManager};
use trackrs::session::{SessionController, SessionOutput};
use trackrs::storage::RunStore;
use trackrs::sync::SyncService;
use trackrs::units::{format_distance, format_duration, format_pace, format_speed};

/// TrackRS - Activity Session Engine
///
/// Replays recorded wearable sensor logs through the session engine,
/// keeps a local run history and produces the sync document a phone
/// would fetch.
#[derive(Parser)]
#[command(name = "trackrs")]
#[command(author = "TrackRS Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Activity session engine CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded sensor log (CSV events or GPX track)
    Replay {
        /// Input file path
        #[arg(short, long)]
        file: PathBuf,

        /// Goal as kind:value: distance:5000 (m), time:1800000 (ms), steps:3000
        #[arg(short, long)]
        goal: Option<String>,

        /// Display units (metric, imperial)
        #[arg(short, long)]
        units: Option<String>,

        /// Save the finished run to history
        #[arg(short, long)]
        save: bool,
    },

    /// Show recent runs
    History {
        /// Number of runs to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print the sync document for the latest run
    Sync {
        /// Use a saved run file instead of the latest run
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Flag the run as synced in history
        #[arg(short, long)]
        mark: bool,
    },

    /// Configure application settings
    Config {
        /// Write a default config file
        #[arg(short, long)]
        init: bool,

        /// Show the active configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Distance")]
    distance: String,
    #[tabled(rename = "Pace")]
    pace: String,
    #[tabled(rename = "Steps")]
    steps: u32,
    #[tabled(rename = "Goal")]
    goal: String,
    #[tabled(rename = "Synced")]
    synced: String,
}

#[derive(Tabled)]
struct SplitRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Distance")]
    distance: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Pace")]
    pace: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };

    let mut log_config = config.logging.clone();
    log_config.level = log_config.level.raised_by(cli.verbose);
    init_logging(&log_config)?;

    if cli.verbose > 0 {
        eprintln!("{}", format!("Log level: {}", log_config.level.as_str()).dimmed());
    }

    let outcome = match cli.command {
        Commands::Replay {
            file,
            goal,
            units,
            save,
        } => replay(&config, &file, goal.as_deref(), units.as_deref(), save),
        Commands::History { limit } => history(&config, limit),
        Commands::Sync { file, mark } => sync(&config, file.as_deref(), mark),
        Commands::Config { init, show } => manage_config(config, cli.config, init, show),
    };

    if let Err(err) = outcome {
        if let Some(domain) = err.downcast_ref::<TrackRsError>() {
            eprintln!("{} {}", "✗".red().bold(), domain.user_message().red());
            std::process::exit(1);
        }
        return Err(err);
    }

    Ok(())
}

fn replay(
    config: &AppConfig,
    file: &Path,
    goal: Option<&str>,
    units: Option<&str>,
    save: bool,
) -> Result<()> {
    let tracker = &config.tracker;
    let goal = match goal {
        Some(text) => text
            .parse::<Goal>()
            .map_err(TrackRsError::Validation)?,
        None => tracker.goal(),
    };
    let units = match units {
        Some(text) => text.parse::<Units>().map_err(TrackRsError::Validation)?,
        None => tracker.units,
    };

    println!("{}", "Replaying sensor log...".green().bold());
    println!("  File: {:?}", file);

    let events = ReplayManager::new()
        .read_events(file)
        .map_err(TrackRsError::from)?;
    let timeline = synthesize_ticks(&events, tracker.tick_interval_ms as i64);

    let mut controller = SessionController::new(tracker.engine_config());
    let outcome = run_session(&mut controller, &timeline, goal, tracker.alert_interval())?;

    for output in &outcome.outputs {
        match output {
            SessionOutput::GoalCompleted { goal } => {
                println!("  {} Goal reached: {:?}", "★".yellow(), goal);
            }
            SessionOutput::MilestoneReached { threshold_meters, .. } => {
                println!(
                    "  {} Milestone: {}",
                    "●".cyan(),
                    format_distance(*threshold_meters, units)
                );
            }
            SessionOutput::SplitRecorded(_) | SessionOutput::RedrawNeeded => {}
        }
    }

    print_summary(&outcome.record, units);

    if save {
        let store = RunStore::open(&config.storage.data_dir).map_err(TrackRsError::from)?;
        let path = store.save(&outcome.record).map_err(TrackRsError::from)?;
        println!("{} Saved to {}", "✓".green(), path.display());
    }

    Ok(())
}

fn print_summary(record: &SessionRecord, units: Units) {
    println!();
    println!("{}", "Run summary".bold());
    println!("  Distance:  {}", format_distance(record.distance_meters, units));
    println!("  Duration:  {}", format_duration(record.duration_ms));
    println!("  Avg pace:  {}", format_pace(record.average_speed_mps(), units));
    println!("  Max speed: {}", format_speed(record.max_speed_mps, units));
    println!("  Steps:     {}", record.step_count);
    println!(
        "  Elevation: +{:.0} m / -{:.0} m",
        record.elevation_gain_meters, record.elevation_loss_meters
    );
    if record.goal_kind != GoalKind::None {
        let status = if record.goal_completed {
            "completed".green()
        } else {
            "not reached".yellow()
        };
        println!("  Goal:      {:?} ({})", record.goal(), status);
    }

    if !record.splits.is_empty() {
        let mut previous_ms = 0;
        let rows: Vec<SplitRow> = record
            .splits
            .iter()
            .enumerate()
            .map(|(index, split)| {
                let row = SplitRow {
                    index: index + 1,
                    distance: format_distance(split.cumulative_distance_meters, units),
                    time: format_duration(split.cumulative_duration_ms - previous_ms),
                    pace: format_pace(split.pace_meters_per_second, units),
                };
                previous_ms = split.cumulative_duration_ms;
                row
            })
            .collect();

        println!();
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
}

fn history(config: &AppConfig, limit: Option<usize>) -> Result<()> {
    let store = RunStore::open(&config.storage.data_dir).map_err(TrackRsError::from)?;
    let limit = limit.unwrap_or(config.storage.max_history);
    let runs = store.list(limit).map_err(TrackRsError::from)?;

    if runs.is_empty() {
        println!("{}", "No runs recorded yet".yellow());
        return Ok(());
    }

    let units = config.tracker.units;
    let rows: Vec<HistoryRow> = runs
        .iter()
        .map(|run| {
            let record = &run.record;
            HistoryRow {
                start: chrono::DateTime::from_timestamp_millis(record.started_at)
                    .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| record.started_at.to_string()),
                duration: format_duration(record.duration_ms),
                distance: format_distance(record.distance_meters, units),
                pace: format_pace(record.average_speed_mps(), units),
                steps: record.step_count,
                goal: match (record.goal_kind, record.goal_completed) {
                    (GoalKind::None, _) => "-".to_string(),
                    (kind, true) => format!("{} ✓", kind),
                    (kind, false) => kind.to_string(),
                },
                synced: if record.synced { "yes" } else { "no" }.to_string(),
            }
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}

fn sync(config: &AppConfig, file: Option<&Path>, mark: bool) -> Result<()> {
    let store = RunStore::open(&config.storage.data_dir).map_err(TrackRsError::from)?;
    let record = match file {
        Some(path) => Some(RunStore::read_file(path).map_err(TrackRsError::from)?),
        None => store
            .latest()
            .map_err(TrackRsError::from)?
            .map(|run| run.record),
    };

    let mut service = SyncService::new(config.sync.device_name.clone());
    if let Some(record) = &record {
        service
            .publish(record)
            .context("Failed to build sync document")?;
    }
    println!("{}", service.read());

    if mark {
        if let Some(record) = &record {
            store
                .mark_synced(record.started_at)
                .map_err(TrackRsError::from)?;
            eprintln!("{} Marked {} as synced", "✓".green(), record.session_id());
        }
    }

    Ok(())
}

fn manage_config(
    mut config: AppConfig,
    path: Option<PathBuf>,
    init: bool,
    show: bool,
) -> Result<()> {
    let path = path.unwrap_or_else(AppConfig::default_config_path);

    if init {
        config.save_to_file(&path)?;
        println!("{} Wrote {}", "✓".green(), path.display());
    }

    if show || !init {
        let content = toml::to_string_pretty(&config).context("Failed to render configuration")?;
        println!("{}", format!("# {}", path.display()).dimmed());
        println!("{}", content);
    }

    Ok(())
}
