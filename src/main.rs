use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use mlb_live_wp::api;
use mlb_live_wp::batch::fetch_game;
use mlb_live_wp::config::Settings;
use mlb_live_wp::history::SqliteIndex;
use mlb_live_wp::provider::{StatsApi, parse_schedule_date};
use mlb_live_wp::slate;

const USAGE: &str = "usage: mlb_live_wp <command>

commands:
  today                          raw feed of every game on today's slate
  day MM/DD/YYYY                 raw feed of every game on the given date
  game <id> [timecode]           canonical snapshot of one game
  linescore <id> [timecode]      provider linescore of one game
  probability                    win record for every game on today's slate
  probability <id> [timecode]    win record for one game";

fn main() -> ExitCode {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    match run(&args) {
        Ok(value) => {
            println!("{value:#}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<Value> {
    let settings = Settings::from_env();
    let feed = StatsApi::from_settings(&settings);
    let command = args.first().map(String::as_str).unwrap_or_default();

    match command {
        "today" => {
            let items = slate::today_games(&feed, &settings)?;
            Ok(api::games_response(&items))
        }
        "day" => {
            let raw = args.get(1).ok_or_else(|| anyhow!("day needs a date\n\n{USAGE}"))?;
            let date = parse_schedule_date(raw)?;
            let items = slate::day_games(&feed, date, &settings)?;
            Ok(api::games_response(&items))
        }
        "game" => {
            let (event_id, time_code) = parse_game_args(&args[1..])?;
            let game = fetch_game(&feed, event_id, time_code)?;
            Ok(api::game_response(&game.state))
        }
        "linescore" => {
            let (event_id, time_code) = parse_game_args(&args[1..])?;
            let game = fetch_game(&feed, event_id, time_code)?;
            Ok(game.state.details.linescore)
        }
        "probability" => {
            let index = open_index(&settings)?;
            if args.len() > 1 {
                let (event_id, time_code) = parse_game_args(&args[1..])?;
                let game = fetch_game(&feed, event_id, time_code)?;
                api::single_probability_response(&game.state, &index, settings.years)
            } else {
                let items = slate::today_games(&feed, &settings)?;
                Ok(api::probability_response(&items, &index, settings.years))
            }
        }
        _ => Err(anyhow!("{USAGE}")),
    }
}

fn parse_game_args(args: &[String]) -> Result<(u64, Option<&str>)> {
    let raw = args
        .first()
        .ok_or_else(|| anyhow!("missing game id\n\n{USAGE}"))?;
    let event_id = raw
        .trim()
        .parse::<u64>()
        .with_context(|| format!("invalid game id {raw:?}"))?;
    Ok((event_id, args.get(1).map(String::as_str)))
}

fn open_index(settings: &Settings) -> Result<SqliteIndex> {
    let path = settings
        .history_db_path
        .as_deref()
        .context("unable to resolve history db path (set HISTORY_DB_PATH)")?;
    SqliteIndex::open(path)
}
