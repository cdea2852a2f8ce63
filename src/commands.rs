use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::analysis::analyze_team_patterns;
use crate::aoe4::{Aoe4Api, Aoe4Client, Game, GameId, ProfileId};
use crate::config::Config;
use crate::db::Database;
use crate::display;
use crate::error::AppError;
use crate::poller::{GamePoller, PollTarget, PollerEvent, PollerHandle};
use crate::profile::{ProfileStore, TrackedProfile};

/// Shared data accessible in all commands
pub struct Context {
    pub config: Config,
    pub api: Arc<Aoe4Client>,
    pub store: ProfileStore,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("api", &self.api)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let api = Arc::new(Aoe4Client::from_config(&config)?);
        let db = Database::connect(&config.database_url).await?;
        let store = ProfileStore::new(
            db.repository(),
            config.profile_store_key.clone(),
            config.profile_expiry_days,
        );

        Ok(Self { config, api, store })
    }

    async fn tracked(&self) -> Result<TrackedProfile, AppError> {
        self.store.load().await?.ok_or(AppError::NoTrackedProfile)
    }
}

/// Track the player behind an aoe4world profile URL
#[instrument(skip(ctx))]
pub async fn track(ctx: &Context, url: &str) -> Result<(), AppError> {
    let profile = ctx.store.track_url(ctx.api.as_ref(), url).await?;
    println!("Tracking {}", display::render_player(&profile.player));
    Ok(())
}

/// Forget the tracked player
pub async fn untrack(ctx: &Context) -> Result<(), AppError> {
    ctx.store.clear().await?;
    info!("🗄️ Tracked profile cleared");
    println!("No profile tracked anymore");
    Ok(())
}

pub async fn status(ctx: &Context) -> Result<(), AppError> {
    match ctx.store.load().await? {
        Some(profile) => {
            println!("Tracking {}", display::render_player(&profile.player));
            println!("Profile URL: {}", profile.profile_url);
        }
        None => println!("No profile tracked. Use `track <url>` first."),
    }
    Ok(())
}

/// Aggregate teammates over the latest games of the tracked player
#[instrument(skip(ctx))]
pub async fn teammates(
    ctx: &Context,
    games: u32,
    min_games: u32,
    top: usize,
) -> Result<(), AppError> {
    let profile = ctx.tracked().await?;
    let history = fetch_history(ctx.api.as_ref(), &profile.profile_id, games).await?;
    let analysis = analyze_team_patterns(&history, &profile.profile_id);

    println!("{}", display::render_analysis(&analysis, min_games, top));
    Ok(())
}

/// Collect up to `limit` recent games, page by page.
pub async fn fetch_history<A: Aoe4Api + ?Sized>(
    api: &A,
    profile_id: &ProfileId,
    limit: u32,
) -> Result<Vec<Game>, AppError> {
    const MAX_PER_PAGE: u32 = 50;

    // Page offsets depend on per_page, so it stays fixed across pages.
    let per_page = limit.clamp(1, MAX_PER_PAGE);
    let mut games = Vec::new();
    let mut page = 1;
    while (games.len() as u32) < limit {
        let response = api.get_player_games(profile_id, page, per_page).await?;
        let fetched = response.games.len() as u32;
        games.extend(response.games);

        let exhausted = response
            .total
            .is_some_and(|total| games.len() as u64 >= total);
        if fetched < per_page || exhausted {
            break;
        }
        page += 1;
    }
    games.truncate(limit as usize);
    Ok(games)
}

pub async fn search(ctx: &Context, query: &str) -> Result<(), AppError> {
    let players = ctx.api.search_players(query).await?;
    if players.is_empty() {
        println!("No player found for \"{query}\"");
    }
    for player in players {
        println!("{}", display::render_player(&player));
    }
    Ok(())
}

pub async fn leaderboard(ctx: &Context, leaderboard: &str) -> Result<(), AppError> {
    let profile = ctx.tracked().await?;
    let entries = ctx
        .api
        .get_leaderboard(leaderboard, &profile.profile_id)
        .await?;

    for entry in entries {
        let marker = if ProfileId::Numeric(entry.profile_id).same_as(&profile.profile_id) {
            ">"
        } else {
            " "
        };
        println!(
            "{marker} #{:<6} {:<24} {} ({})",
            entry.rank,
            entry.name,
            entry.rating,
            display::rating_tier(entry.rating)
        );
    }
    Ok(())
}

pub async fn game(ctx: &Context, game_id: &str) -> Result<(), AppError> {
    let game = ctx.api.get_game(&GameId::from(game_id)).await?;
    let tracked = ctx.store.load().await?.map(|p| p.profile_id);
    println!("{}", display::render_game(&game, tracked.as_ref()));
    Ok(())
}

/// Poll the tracked player's latest game until stopped.
///
/// Stdin commands: `r` refresh now, `p` pause/resume, `q` quit.
pub async fn watch(ctx: &Context) -> Result<(), AppError> {
    let profile = ctx.tracked().await?;
    println!(
        "Watching {} (r: refresh, p: pause/resume, q: quit)",
        profile.player.name
    );

    let metrics = ctx.api.metrics();
    let metrics_task = tokio::spawn(async move { metrics.log_loop().await });

    let (handle, events) = GamePoller::spawn(
        ctx.api.clone(),
        ctx.config.polling_interval(),
        PollTarget::new(Some(profile.profile_id.clone()), true),
    );

    let printer = tokio::spawn(print_events(events, profile.profile_id.clone()));
    let result = read_controls(&handle).await;

    handle.stop();
    printer.abort();
    metrics_task.abort();
    result
}

async fn read_controls(handle: &PollerHandle) -> Result<(), AppError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            line = lines.next_line() => {
                let Ok(Some(line)) = line else {
                    // Stdin closed: keep polling until interrupted.
                    let _ = tokio::signal::ctrl_c().await;
                    return Ok(());
                };
                match line.trim() {
                    "r" => handle.refresh(),
                    "p" => {
                        let enabled = !handle.is_enabled();
                        handle.set_enabled(enabled);
                        println!("{}", if enabled { "Polling resumed" } else { "Polling paused" });
                    }
                    "q" => return Ok(()),
                    "" => {}
                    other => warn!(input = other, "Unknown command"),
                }
            }
        }
    }
}

async fn print_events(mut events: mpsc::Receiver<PollerEvent>, profile_id: ProfileId) {
    while let Some(event) = events.recv().await {
        println!("{}", announce(&event, &profile_id));
    }
}

/// One line of terminal output per poller event.
fn announce(event: &PollerEvent, profile_id: &ProfileId) -> String {
    match event {
        PollerEvent::GameStarted(game) => {
            let map = game.map.as_deref().map(display::map_name);
            format!(
                "\n>>> New game started on {}!",
                map.as_deref().unwrap_or("an unknown map")
            )
        }
        PollerEvent::GameEnded(game) => format!(
            "\n<<< Game ended: {}",
            display::result_label(game.won_by(profile_id))
        ),
        PollerEvent::MatchUpdated(Some(game)) => display::render_game(game, Some(profile_id)),
        PollerEvent::MatchUpdated(None) => "No current game".into(),
        PollerEvent::FetchFailed(message) => format!("! {message}"),
    }
}
