use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Settings;
use crate::http_client::{fetch_text, http_client};

/// Source of raw game payloads and day schedules.
pub trait GameFeed: Sync {
    fn fetch_game(&self, event_id: u64, time_code: Option<&str>) -> Result<Value>;

    fn fetch_schedule(&self, date: NaiveDate) -> Result<Vec<u64>>;
}

/// MLB Stats API.
#[derive(Debug, Clone)]
pub struct StatsApi {
    base_url: String,
    timeout_secs: u64,
}

impl StatsApi {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.statsapi_base_url.clone(), settings.http_timeout_secs)
    }

    pub fn game_url(&self, event_id: u64) -> String {
        format!("{}/api/v1.1/game/{event_id}/feed/live", self.base_url)
    }

    pub fn schedule_url(&self) -> String {
        format!("{}/api/v1/schedule", self.base_url)
    }
}

impl GameFeed for StatsApi {
    fn fetch_game(&self, event_id: u64, time_code: Option<&str>) -> Result<Value> {
        let client = http_client(self.timeout_secs)?;
        let url = self.game_url(event_id);
        let query = match time_code.and_then(non_empty) {
            Some(code) => vec![("timecode", code)],
            None => Vec::new(),
        };
        debug!(event_id, time_code, "fetching game feed");
        let body = fetch_text(client, &url, &query)?;
        parse_game_payload(&body).with_context(|| format!("game {event_id}"))
    }

    fn fetch_schedule(&self, date: NaiveDate) -> Result<Vec<u64>> {
        let client = http_client(self.timeout_secs)?;
        let date = schedule_date(date);
        let body = fetch_text(
            client,
            &self.schedule_url(),
            &[("sportId", "1"), ("date", date.as_str())],
        )?;
        parse_schedule_json(&body).with_context(|| format!("schedule for {date}"))
    }
}

/// `MM/DD/YYYY`, the format the schedule endpoint takes.
pub fn schedule_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

pub fn parse_schedule_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%m/%d/%Y")
        .with_context(|| format!("expected MM/DD/YYYY, got {raw:?}"))
}

pub fn parse_game_payload(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    let value: Value = serde_json::from_str(trimmed).context("invalid game feed json")?;
    if !value.is_object() {
        return Err(anyhow::anyhow!("game feed is not a json object"));
    }
    Ok(value)
}

#[derive(Debug, Deserialize)]
struct ScheduleResponse {
    #[serde(default)]
    dates: Vec<ScheduleDate>,
}

#[derive(Debug, Deserialize)]
struct ScheduleDate {
    #[serde(default)]
    games: Vec<ScheduleGame>,
}

#[derive(Debug, Deserialize)]
struct ScheduleGame {
    #[serde(rename = "gamePk")]
    game_pk: u64,
}

/// Event ids in schedule order, one per schedule entry. A resumed game is
/// listed once per date it appears on, so ids may repeat.
pub fn parse_schedule_json(raw: &str) -> Result<Vec<u64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let data: ScheduleResponse = serde_json::from_str(trimmed).context("invalid schedule json")?;
    Ok(data
        .dates
        .into_iter()
        .flat_map(|d| d.games)
        .map(|game| game.game_pk)
        .collect())
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}
