use anyhow::Result;
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::batch::BatchItem;
use crate::history::{OutcomeIndex, YearRange, game_probability};
use crate::state::GameState;

/// `{"games": [...]}` with the raw provider payload of every game.
///
/// A game that failed to load keeps its slot as `{"eventId", "error"}`.
pub fn games_response(items: &[BatchItem]) -> Value {
    let games = items
        .iter()
        .map(|item| match &item.result {
            Ok(game) => game.payload.clone(),
            Err(err) => json!({
                "eventId": item.event_id,
                "error": format!("{err:#}"),
            }),
        })
        .collect::<Vec<_>>();
    json!({ "games": games })
}

/// Event id to `{wins, total, leverage}` or a `{message}` for games without a
/// live situation.
pub fn probability_response(
    items: &[BatchItem],
    index: &dyn OutcomeIndex,
    years: YearRange,
) -> Value {
    let mut out = Map::new();
    for item in items {
        let entry = match &item.result {
            Ok(game) => probability_entry(&game.state, index, years),
            Err(err) => json!({ "error": format!("{err:#}") }),
        };
        out.insert(item.event_id.to_string(), entry);
    }
    Value::Object(out)
}

pub fn game_response(state: &GameState) -> Value {
    state.canonical_json()
}

pub fn single_probability_response(
    state: &GameState,
    index: &dyn OutcomeIndex,
    years: YearRange,
) -> Result<Value> {
    let probability = game_probability(state, index, years)?;
    Ok(serde_json::to_value(probability)?)
}

fn probability_entry(state: &GameState, index: &dyn OutcomeIndex, years: YearRange) -> Value {
    match single_probability_response(state, index, years) {
        Ok(value) => value,
        Err(err) => {
            warn!(event_id = state.event_id, "probability lookup failed: {err:#}");
            json!({ "error": format!("{err:#}") })
        }
    }
}
