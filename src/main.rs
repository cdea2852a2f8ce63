use std::process::ExitCode;

use aoe4_scout::commands::{self, Context};
use aoe4_scout::config::Config;
use aoe4_scout::error::AppError;
use aoe4_scout::logging;
use clap::{Parser, Subcommand};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "aoe4-scout")]
#[command(about = "Follow an Age of Empires IV player's games on aoe4world.com", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track a player from their aoe4world profile URL
    Track {
        /// e.g. https://aoe4world.com/players/12345-Name
        url: String,
    },
    /// Stop tracking the current player
    Untrack,
    /// Show the tracked player
    Status,
    /// Poll the tracked player's current game
    Watch,
    /// Show the tracked player's frequent teammates
    Teammates {
        /// Number of recent games to analyze
        #[arg(long)]
        games: Option<u32>,
        /// Minimum shared games to list a teammate
        #[arg(long, default_value = "3")]
        min_games: u32,
        /// Maximum teammates to list
        #[arg(long, default_value = "5")]
        top: usize,
        /// List every teammate, ignoring --min-games and --top
        #[arg(long)]
        all: bool,
    },
    /// Search players by name
    Search { query: String },
    /// Show the tracked player's neighbourhood on a leaderboard
    Leaderboard {
        #[arg(default_value = "rm_solo")]
        leaderboard: String,
    },
    /// Show a single game
    Game { game_id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "❌ Command failed");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<(), AppError> {
    let config = Config::from_env()?;
    info!(api = %config.api_base_url, "🏰 Starting aoe4-scout");

    let ctx = Context::new(config).await?;

    match command {
        Commands::Track { url } => commands::track(&ctx, &url).await,
        Commands::Untrack => commands::untrack(&ctx).await,
        Commands::Status => commands::status(&ctx).await,
        Commands::Watch => commands::watch(&ctx).await,
        Commands::Teammates {
            games,
            min_games,
            top,
            all,
        } => {
            let games = games.unwrap_or(ctx.config.history_games);
            let (min_games, top) = if all { (0, usize::MAX) } else { (min_games, top) };
            commands::teammates(&ctx, games, min_games, top).await
        }
        Commands::Search { query } => commands::search(&ctx, &query).await,
        Commands::Leaderboard { leaderboard } => commands::leaderboard(&ctx, &leaderboard).await,
        Commands::Game { game_id } => commands::game(&ctx, &game_id).await,
    }
}
