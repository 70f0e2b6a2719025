use anyhow::{Context, Result};
use chaosvm::azure::format_azure_error;
use chaosvm::machine::{AzureMachineActions, MachineAction, RandomSource, SeededRandom, ThreadRandom};
use chaosvm::{ChaosError, Configuration, Secrets};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Chaos actions for Azure virtual machines
#[derive(Parser, Debug)]
#[command(name = "chaosvm", version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    action: Action,

    /// Resource Graph filter, e.g. "where resourceGroup=~'chaos-rg'"
    #[arg(short, long, global = true)]
    filter: Option<String>,

    /// Configuration file (.json, .yaml); defaults to the user config dir, then AZURE_SUBSCRIPTION_ID
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Secrets file (.json, .yaml); defaults to AZURE_* environment variables
    #[arg(short, long, global = true)]
    secrets: Option<PathBuf>,

    /// Seed the target picker for a reproducible run
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Write logs to the chaosvm log file instead of stderr
    #[arg(long, global = true)]
    log_file: bool,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Action {
    /// Delete one machine at random (irreversible)
    Delete,
    /// Power off one machine at random
    Stop,
    /// Restart one machine at random
    Restart,
    /// Start every stopped machine
    Start,
}

impl From<Action> for MachineAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Delete => MachineAction::Delete,
            Action::Stop => MachineAction::Stop,
            Action::Restart => MachineAction::Restart,
            Action::Start => MachineAction::Start,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn setup_logging(
    level: LogLevel,
    to_file: bool,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    let (writer, guard) = if to_file {
        let log_path = get_log_path();
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file {:?}", log_path))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(!to_file)
        .with_target(true)
        .with_file(to_file)
        .with_line_number(to_file)
        .init();

    Ok(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("chaosvm").join("chaosvm.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".chaosvm").join("chaosvm.log");
    }
    PathBuf::from("chaosvm.log")
}

/// Short message for the terminal; the full error goes to the log
fn describe(err: &ChaosError) -> String {
    match err {
        ChaosError::Upstream(e) => format_azure_error(e),
        other => other.to_string(),
    }
}

async fn run(args: &Args) -> Result<(), ChaosError> {
    let configuration = Configuration::resolve(args.config.as_deref())?;
    let secrets = Secrets::resolve(args.secrets.as_deref())?;

    let rng: Box<dyn RandomSource> = match args.seed {
        Some(seed) => {
            tracing::info!("Using seeded target picker: {}", seed);
            Box::new(SeededRandom::new(seed))
        }
        None => Box::new(ThreadRandom),
    };

    let mut actions = AzureMachineActions::azure(rng)?;
    actions
        .run(
            args.action.into(),
            args.filter.as_deref(),
            &configuration,
            &secrets,
        )
        .await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = match setup_logging(args.log_level, args.log_file) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Logging setup failed: {err:?}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("chaosvm {:?} started", args.action);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:?} failed: {:?}", args.action, err);
            eprintln!("Error: {}", describe(&err));
            ExitCode::FAILURE
        }
    }
}
