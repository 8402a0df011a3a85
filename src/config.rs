use std::env;
use std::path::PathBuf;

use crate::history::YearRange;

pub const DEFAULT_STATSAPI_BASE_URL: &str = "https://statsapi.mlb.com";
const DEFAULT_FETCH_PARALLELISM: usize = 16;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_ROLLOVER_HOUR: u32 = 8;
const INDEX_FILE: &str = "mlb_live_wp/history.sqlite";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub statsapi_base_url: String,
    pub fetch_parallelism: usize,
    pub http_timeout_secs: u64,
    pub years: YearRange,
    pub history_db_path: Option<PathBuf>,
    /// Local hour before which "today" still means the previous day's slate.
    pub rollover_hour: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let statsapi_base_url = lookup("STATSAPI_BASE_URL")
            .map(|val| val.trim().trim_end_matches('/').to_string())
            .filter(|val| !val.is_empty())
            .unwrap_or_else(|| DEFAULT_STATSAPI_BASE_URL.to_string());
        let fetch_parallelism = lookup("FETCH_PARALLELISM")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_FETCH_PARALLELISM)
            .clamp(1, 64);
        let http_timeout_secs = lookup("HTTP_TIMEOUT_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
            .clamp(1, 120);

        let defaults = YearRange::default();
        let start = lookup("HISTORY_START_YEAR")
            .and_then(|val| val.trim().parse::<i32>().ok())
            .unwrap_or(defaults.start);
        let end = lookup("HISTORY_END_YEAR")
            .and_then(|val| val.trim().parse::<i32>().ok())
            .unwrap_or(defaults.end);
        let years = if start <= end {
            YearRange { start, end }
        } else {
            YearRange {
                start: end,
                end: start,
            }
        };

        let history_db_path = lookup("HISTORY_DB_PATH")
            .filter(|val| !val.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| default_history_db_path(&lookup));
        let rollover_hour = lookup("SLATE_ROLLOVER_HOUR")
            .and_then(|val| val.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_ROLLOVER_HOUR)
            .min(23);

        Self {
            statsapi_base_url,
            fetch_parallelism,
            http_timeout_secs,
            years,
            history_db_path,
            rollover_hour,
        }
    }
}

fn default_history_db_path(lookup: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(base) = lookup("XDG_DATA_HOME").filter(|v| !v.trim().is_empty()) {
        return Some(PathBuf::from(base).join(INDEX_FILE));
    }
    let home = lookup("HOME").filter(|v| !v.trim().is_empty())?;
    Some(
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(INDEX_FILE),
    )
}
