use anyhow::Result;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::America::New_York;
use tracing::info;

use crate::batch::{BatchItem, fetch_games};
use crate::config::Settings;
use crate::provider::GameFeed;

/// Civil date of the current slate in New York time.
///
/// Before `rollover_hour` no game of the new day has started, so the previous
/// day's slate is still the current one.
pub fn slate_date(now: DateTime<Utc>, rollover_hour: u32) -> NaiveDate {
    let local = now.with_timezone(&New_York);
    let date = local.date_naive();
    if local.hour() < rollover_hour {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    }
}

pub fn today(settings: &Settings) -> NaiveDate {
    slate_date(Utc::now(), settings.rollover_hour)
}

pub fn day_games(
    feed: &dyn GameFeed,
    date: NaiveDate,
    settings: &Settings,
) -> Result<Vec<BatchItem>> {
    let ids = feed.fetch_schedule(date)?;
    info!(%date, games = ids.len(), "resolved slate");
    fetch_games(feed, &ids, settings.fetch_parallelism)
}

pub fn today_games(feed: &dyn GameFeed, settings: &Settings) -> Result<Vec<BatchItem>> {
    day_games(feed, today(settings), settings)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn before_rollover_uses_previous_day() {
        // 11:30 UTC is 07:30 EDT.
        assert_eq!(slate_date(utc(2024, 7, 4, 11, 30), 8), date(2024, 7, 3));
        // 12:00 UTC is 08:00 EDT.
        assert_eq!(slate_date(utc(2024, 7, 4, 12, 0), 8), date(2024, 7, 4));
    }

    #[test]
    fn winter_offset_is_five_hours() {
        // 12:30 UTC is 07:30 EST.
        assert_eq!(slate_date(utc(2024, 1, 15, 12, 30), 8), date(2024, 1, 14));
        assert_eq!(slate_date(utc(2024, 1, 15, 13, 0), 8), date(2024, 1, 15));
    }

    #[test]
    fn utc_midnight_is_still_yesterday_in_new_york() {
        assert_eq!(slate_date(utc(2024, 7, 5, 2, 0), 8), date(2024, 7, 4));
    }

    #[test]
    fn zero_rollover_never_rolls_back() {
        assert_eq!(slate_date(utc(2024, 7, 4, 4, 30), 0), date(2024, 7, 4));
    }
}
