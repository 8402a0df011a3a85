use anyhow::{Context, Result};
use rayon::prelude::*;
use serde_json::Value;
use tracing::{info, warn};

use crate::provider::GameFeed;
use crate::state::{GameState, build_game_state};

/// Raw provider payload alongside the snapshot built from it.
#[derive(Debug, Clone)]
pub struct FetchedGame {
    pub payload: Value,
    pub state: GameState,
}

/// Outcome of one unit of a batch.
#[derive(Debug)]
pub struct BatchItem {
    pub event_id: u64,
    pub result: Result<FetchedGame>,
}

pub fn fetch_game(
    feed: &dyn GameFeed,
    event_id: u64,
    time_code: Option<&str>,
) -> Result<FetchedGame> {
    let payload = feed.fetch_game(event_id, time_code)?;
    let state = build_game_state(event_id, time_code, &payload)
        .with_context(|| format!("build state for game {event_id}"))?;
    Ok(FetchedGame { payload, state })
}

/// Fetches and builds every game on a bounded pool.
///
/// Output order follows `event_ids`. A failed game only fails its own slot.
/// The pool itself failing to start fails the whole call.
pub fn fetch_games(
    feed: &dyn GameFeed,
    event_ids: &[u64],
    parallelism: usize,
) -> Result<Vec<BatchItem>> {
    if event_ids.is_empty() {
        return Ok(Vec::new());
    }

    let pool = build_fetch_pool(parallelism)?;
    let results = pool.install(|| {
        event_ids
            .par_iter()
            .map(|&event_id| BatchItem {
                event_id,
                result: fetch_game(feed, event_id, None),
            })
            .collect::<Vec<_>>()
    });

    let mut failed = 0usize;
    for item in &results {
        if let Err(err) = &item.result {
            failed += 1;
            warn!(event_id = item.event_id, "game fetch failed: {err:#}");
        }
    }
    info!(games = event_ids.len(), failed, "batch fetch complete");
    Ok(results)
}

fn build_fetch_pool(threads: usize) -> Result<rayon::ThreadPool> {
    let threads = threads.max(1);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|idx| format!("game-fetch-{idx}"))
        .build()
        .with_context(|| format!("start fetch pool with {threads} workers"))
}
