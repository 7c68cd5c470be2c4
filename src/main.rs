mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chat-topics", version, about = "Chat Topics: discover what a group chat is talking about")]
struct App {
    /// Config file (defaults to {config_dir}/chat-topics/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover discussion topics for a chat
    Topics {
        #[arg(long, allow_negative_numbers = true)]
        chat: i64,
        /// Lookback period, e.g. 3d (capped at the configured maximum)
        #[arg(long)]
        period: Option<String>,
        /// Ignore the cached result and recompute
        #[arg(long)]
        force: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show message and participant counts for a chat
    Stats {
        #[arg(long, allow_negative_numbers = true)]
        chat: i64,
        #[arg(long)]
        period: Option<String>,
    },
    /// Import a JSON array of messages into the archive
    Import {
        file: PathBuf,
    },
    /// Drop old cache entries and archived messages
    Purge {
        #[arg(long)]
        cache_days: Option<u32>,
        #[arg(long)]
        message_days: Option<u32>,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> ExitCode {
    let app = App::parse();

    let config = match cli::load_config(app.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    chat_topics::tracing_init::init_tracing(&config.logging);

    let result = match app.command {
        Commands::Topics { chat, period, force, json } => {
            cli::topics::run(&config, chat, period.as_deref(), force, json)
        }
        Commands::Stats { chat, period } => cli::stats::run(&config, chat, period.as_deref()),
        Commands::Import { file } => cli::import::run(&config, &file),
        Commands::Purge { cache_days, message_days } => cli::purge::run(&config, cache_days, message_days),
        Commands::Config => cli::config::run_show(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
