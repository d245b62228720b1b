//! telequeue CLI
//!
//! Command-line tool for inspecting and draining telequeue databases.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use telequeue_core::{Category, Config};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "telequeue")]
#[command(about = "telequeue - durable on-device telemetry queue")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Project token whose queues to operate on
    #[arg(long, global = true, env = "TELEQUEUE_TOKEN")]
    token: Option<String>,

    /// Directory holding the queue database (overrides config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue one or more JSON object records
    Push {
        /// Category to queue into
        category: Category,
        /// Records as JSON objects
        #[arg(required = true)]
        records: Vec<String>,
    },
    /// Show the oldest records without removing them
    Peek {
        category: Category,
        /// Number of records (defaults to the configured batch size)
        #[arg(short, long)]
        batch: Option<usize>,
    },
    /// Print and remove the oldest records
    Pop {
        category: Category,
        /// Number of records (defaults to the configured batch size)
        #[arg(short, long)]
        batch: Option<usize>,
    },
    /// Remove every record from one category, or from all of them
    Reset {
        category: Option<Category>,
    },
    /// Show or set the stored opt-out flag
    OptOut {
        /// New value (true or false)
        set: Option<bool>,
    },
    /// Show queued record counts
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, batch_size)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    // Commands that don't need the queue
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => commands::config::show(&config, &output),
            Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, &output),
        };
    }

    let token = commands::require_token(cli.token.as_deref())?;
    let mut queue = commands::open_queue(&config, token)?;

    match cli.command {
        Commands::Push { category, records } => {
            commands::queue::push(&mut queue, category, &records, &output)
        }
        Commands::Peek { category, batch } => {
            commands::queue::peek(&mut queue, category, batch, &output)
        }
        Commands::Pop { category, batch } => {
            commands::queue::pop(&mut queue, category, batch, &output)
        }
        Commands::Reset { category } => commands::queue::reset(&mut queue, category, &output),
        Commands::OptOut { set } => commands::queue::opt_out(&mut queue, set, &output),
        Commands::Status => commands::status::show(&mut queue, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

/// Log to stderr so command output stays clean
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("telequeue_core={},telequeue_cli={}", level, level))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();
}
