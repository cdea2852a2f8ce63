//! Human-readable names and formatting for terminal output.

use chrono::{DateTime, Utc};

use crate::analysis::TeamAnalysis;
use crate::aoe4::{Game, Player, ProfileId, TeamPlayer};

pub fn civilization_name(civ: &str) -> String {
    match civ {
        "english" => "English".into(),
        "french" => "French".into(),
        "holy_roman_empire" => "Holy Roman Empire".into(),
        "chinese" => "Chinese".into(),
        "delhi_sultanate" => "Delhi Sultanate".into(),
        "mongols" => "Mongols".into(),
        "rus" => "Rus".into(),
        "abbasid_dynasty" => "Abbasid Dynasty".into(),
        "malians" => "Malians".into(),
        "ottomans" => "Ottomans".into(),
        "byzantines" => "Byzantines".into(),
        "japanese" => "Japanese".into(),
        "jeanne_darc" => "Jeanne d'Arc".into(),
        "ayyubids" => "Ayyubids".into(),
        "zhu_xis_legacy" => "Zhu Xi's Legacy".into(),
        "order_of_the_dragon" => "Order of the Dragon".into(),
        "knights_templar" => "Knights Templar".into(),
        "house_of_lancaster" => "House of Lancaster".into(),
        other => title_case(other),
    }
}

/// Two-letter code used for civilization flags.
pub fn civilization_flag(civ: &str) -> Option<&'static str> {
    Some(match civ {
        "english" => "en",
        "french" => "fr",
        "holy_roman_empire" => "hr",
        "chinese" => "ch",
        "delhi_sultanate" => "de",
        "mongols" => "mo",
        "rus" => "ru",
        "abbasid_dynasty" => "ab",
        "malians" => "ma",
        "ottomans" => "ot",
        "byzantines" => "by",
        "japanese" => "ja",
        "jeanne_darc" => "je",
        "ayyubids" => "ay",
        "zhu_xis_legacy" => "zx",
        "order_of_the_dragon" => "od",
        "knights_templar" => "kt",
        "house_of_lancaster" => "hl",
        _ => return None,
    })
}

/// Map slugs are snake_case names, e.g. `dry_arabia`.
pub fn map_name(map: &str) -> String {
    match map {
        "king_of_the_hill" => "King of the Hill".into(),
        "hill_and_dale" => "Hill and Dale".into(),
        other => title_case(other),
    }
}

pub fn game_mode_name(kind: &str) -> String {
    match kind {
        "rm_1v1" => "1v1 Ranked".into(),
        "rm_2v2" => "2v2 Ranked".into(),
        "rm_3v3" => "3v3 Ranked".into(),
        "rm_4v4" => "4v4 Ranked".into(),
        "rm_team" => "Team Ranked".into(),
        other => other.to_string(),
    }
}

/// `gold_2` -> `Gold II`
pub fn rank_level_name(rank_level: &str) -> String {
    let (tier, level) = rank_level.rsplit_once('_').unwrap_or((rank_level, ""));
    let numeral = match level {
        "1" => "I",
        "2" => "II",
        "3" => "III",
        _ => return title_case(rank_level),
    };
    format!("{} {numeral}", title_case(tier))
}

/// Tier name for a rating, e.g. 1250 is `Gold II`.
pub fn rating_tier(rating: i32) -> &'static str {
    const TIERS: [(i32, &str); 16] = [
        (600, "Bronze I"),
        (700, "Bronze II"),
        (800, "Bronze III"),
        (900, "Silver I"),
        (1000, "Silver II"),
        (1100, "Silver III"),
        (1200, "Gold I"),
        (1300, "Gold II"),
        (1400, "Gold III"),
        (1500, "Platinum I"),
        (1600, "Platinum II"),
        (1700, "Platinum III"),
        (1800, "Diamond I"),
        (1900, "Diamond II"),
        (2000, "Diamond III"),
        (i32::MAX, "Conqueror"),
    ];

    TIERS
        .iter()
        .find(|(upper, _)| rating < *upper)
        .map(|(_, name)| *name)
        .unwrap_or("Conqueror")
}

/// `m:ss`
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub fn format_time_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let mins = (now - at).num_minutes();
    if mins < 1 {
        return "just now".into();
    }
    if mins < 60 {
        return format!("{mins}m ago");
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    let days = hours / 24;
    if days < 30 {
        return format!("{days}d ago");
    }
    format!("{}mo ago", days / 30)
}

fn title_case(slug: &str) -> String {
    slug.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn render_player(player: &Player) -> String {
    let mut out = format!("{} (#{})", player.name, player.profile_id);
    if let Some(country) = &player.country {
        out.push_str(&format!(" [{}]", country.to_uppercase()));
    }
    if let Some(mode) = player.solo_mode() {
        if let Some(rating) = mode.rating {
            let rank = mode
                .rank_level
                .as_deref()
                .map(rank_level_name)
                .unwrap_or_else(|| rating_tier(rating).to_string());
            out.push_str(&format!(" | solo {rating} {rank}"));
        }
        if let (Some(w), Some(l)) = (mode.wins_count, mode.losses_count) {
            out.push_str(&format!(" {w}W-{l}L"));
        }
    }
    if let Some(rating) = player.team_mode().and_then(|m| m.rating) {
        out.push_str(&format!(" | team {rating}"));
    }
    out
}

fn render_entry(entry: &TeamPlayer) -> String {
    let civ = match entry.civilization.as_deref() {
        Some(civ) => match civilization_flag(civ) {
            Some(flag) => format!("[{flag}] {}", civilization_name(civ)),
            None => civilization_name(civ),
        },
        None => "?".into(),
    };
    let mut out = format!("  - {} ({civ})", entry.display_name());
    if let Some(rating) = entry.rating {
        out.push_str(&format!(" {rating}"));
    }
    if let Some(diff) = entry.rating_diff {
        out.push_str(&format!(" ({diff:+})"));
    }
    if let Some(result) = &entry.result {
        out.push_str(&format!(" {result}"));
    }
    if let Some(player) = &entry.player {
        out.push_str(&format!("\n      {}", render_player(player)));
    }
    out
}

fn push_section<'a>(
    out: &mut String,
    title: &str,
    entries: impl IntoIterator<Item = &'a TeamPlayer>,
) {
    out.push('\n');
    out.push_str(title);
    for entry in entries {
        out.push('\n');
        out.push_str(&render_entry(entry));
    }
}

/// `Victory!` / `Defeat` for the tracked player once the game is decided.
pub fn result_label(won: Option<bool>) -> &'static str {
    match won {
        Some(true) => "Victory!",
        Some(false) => "Defeat",
        None => "Result unknown",
    }
}

/// Render a game. With a `tracked` player in the roster, entries are split
/// into teammates and opponents; otherwise teams are listed by number.
pub fn render_game(game: &Game, tracked: Option<&ProfileId>) -> String {
    let mode = game.kind.as_deref().map(game_mode_name).unwrap_or_default();
    let map = game.map.as_deref().map(map_name).unwrap_or_default();
    let status = if game.ongoing { "ongoing" } else { "finished" };
    let mut out = format!("Game {} | {mode} on {map} | {status}", game.game_id);
    if let Some(duration) = game.duration {
        out.push_str(&format!(" | {}", format_duration(duration)));
    }
    if let Some(started_at) = game.started_at {
        out.push_str(&format!(" | started {}", format_time_ago(started_at, Utc::now())));
    }

    if let Some(id) = tracked.filter(|id| game.team_of(id).is_some()) {
        if !game.ongoing {
            out.push_str(&format!("\n{}", result_label(game.won_by(id))));
        }
        let teammates = game.teammates_of(id);
        if !teammates.is_empty() {
            push_section(&mut out, "Teammates", teammates);
        }
        push_section(&mut out, "Opponents", game.opponents_of(id));
        return out;
    }

    for (i, team) in game.teams().iter().enumerate() {
        let marker = match team.winner {
            Some(true) => " (winner)",
            _ => "",
        };
        push_section(&mut out, &format!("Team {}{marker}", i + 1), &team.players);
    }
    out
}

pub fn render_analysis(analysis: &TeamAnalysis, min_games: u32, limit: usize) -> String {
    let mut out = format!(
        "{} games analyzed, {} with teammates, {} distinct teammates",
        analysis.total_games_analyzed, analysis.games_with_teammates, analysis.unique_teammates
    );
    let mut any = false;
    for t in analysis.frequent(min_games, limit) {
        any = true;
        out.push_str(&format!(
            "\n  {} - {} games together, {:.0}% win rate ({}W - {}L)",
            t.name,
            t.games_together,
            t.win_rate(),
            t.wins,
            t.losses
        ));
    }
    if !any {
        out.push_str("\nNo frequent teammates found");
    }
    out
}
