use std::cell::RefCell;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use serde_json::json;

use mlb_live_wp::history::{
    LeverageRow, Outcome, OutcomeIndex, OutcomeRow, Probability, SqliteIndex, YearRange,
    game_probability, ingest_leverage, ingest_outcomes, open_index, upsert_leverage,
    upsert_outcome,
};
use mlb_live_wp::state::{GameState, build_game_state};

#[derive(Default)]
struct FakeIndex {
    outcome: Outcome,
    leverage: f64,
    outcome_calls: RefCell<Vec<(String, String, i32, i32)>>,
    leverage_calls: RefCell<Vec<String>>,
}

impl OutcomeIndex for FakeIndex {
    fn lookup_outcome(
        &self,
        state_key: &str,
        count_key: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Outcome> {
        self.outcome_calls.borrow_mut().push((
            state_key.to_string(),
            count_key.to_string(),
            start_year,
            end_year,
        ));
        Ok(self.outcome)
    }

    fn lookup_leverage(&self, state_key: &str) -> Result<f64> {
        self.leverage_calls.borrow_mut().push(state_key.to_string());
        Ok(self.leverage)
    }
}

struct BrokenIndex;

impl OutcomeIndex for BrokenIndex {
    fn lookup_outcome(&self, _: &str, _: &str, _: i32, _: i32) -> Result<Outcome> {
        Err(anyhow!("index offline"))
    }

    fn lookup_leverage(&self, _: &str) -> Result<f64> {
        Err(anyhow!("index offline"))
    }
}

fn state_with_status(code: &str) -> GameState {
    let payload = json!({
        "gameData": {"status": {"statusCode": code}},
        "liveData": {
            "linescore": {
                "currentInning": 7,
                "currentInningOrdinal": "7th",
                "inningHalf": "Bottom",
                "scheduledInnings": 9,
                "innings": [],
                "teams": {"home": {"runs": 5}, "away": {"runs": 3}},
                "offense": {"first": {"id": 1}, "third": {"id": 3}},
                "balls": 4,
                "strikes": 3,
                "outs": 3
            }
        }
    });
    build_game_state(42, None, &payload).expect("valid payload")
}

fn scratch_dir(name: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("mlb_live_wp_{name}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn pregame_state() -> GameState {
    let payload = json!({
        "gameData": {"status": {"statusCode": "P"}},
        "liveData": {"linescore": {"scheduledInnings": 9, "innings": []}}
    });
    build_game_state(43, None, &payload).expect("valid payload")
}

#[test]
fn live_game_issues_one_outcome_and_one_leverage_lookup() {
    let index = FakeIndex {
        outcome: Outcome { wins: 311, total: 702 },
        leverage: 1.7,
        ..FakeIndex::default()
    };
    let result = game_probability(&state_with_status("I"), &index, YearRange::default())
        .expect("lookup succeeds");

    assert_eq!(
        result,
        Probability::Estimate {
            wins: 311,
            total: 702,
            leverage: 1.7
        }
    );
    assert_eq!(
        *index.outcome_calls.borrow(),
        vec![("\"V\",7,2,6,-2".to_string(), "3,2".to_string(), 1957, 2020)]
    );
    assert_eq!(
        *index.leverage_calls.borrow(),
        vec!["\"V\",7,2,6,-2".to_string()]
    );
}

#[test]
fn not_started_game_short_circuits() {
    let index = FakeIndex::default();
    let result = game_probability(&pregame_state(), &index, YearRange::default())
        .expect("no lookup needed");

    assert_eq!(
        serde_json::to_value(&result).expect("serializes"),
        json!({"message": "Game has not started"})
    );
    assert!(index.outcome_calls.borrow().is_empty());
    assert!(index.leverage_calls.borrow().is_empty());
}

#[test]
fn finished_game_short_circuits() {
    let index = FakeIndex::default();
    let result = game_probability(&state_with_status("F"), &index, YearRange::default())
        .expect("no lookup needed");

    assert_eq!(
        serde_json::to_value(&result).expect("serializes"),
        json!({"message": "Game is finished"})
    );
    assert!(index.outcome_calls.borrow().is_empty());
}

#[test]
fn zero_total_is_reported_as_is() {
    let index = FakeIndex::default();
    let result = game_probability(&state_with_status("I"), &index, YearRange::default())
        .expect("lookup succeeds");

    let value = serde_json::to_value(&result).expect("serializes");
    assert_eq!(value["wins"], 0);
    assert_eq!(value["total"], 0);
    assert_eq!(value["leverage"], json!(0.0));
}

#[test]
fn index_failure_is_an_error() {
    let err = game_probability(&state_with_status("I"), &BrokenIndex, YearRange::default())
        .unwrap_err();
    assert!(format!("{err:#}").contains("index offline"));
}

#[test]
fn sqlite_index_sums_inclusive_year_range() {
    let mut index = SqliteIndex::in_memory().expect("in-memory index");
    let conn = index.connection();
    let rows = [
        (1956, 100, 100),
        (1957, 3, 10),
        (1990, 5, 8),
        (2020, 1, 2),
        (2021, 50, 50),
    ];
    for (year, wins, total) in rows {
        upsert_outcome(
            conn,
            &OutcomeRow {
                year,
                state_key: "\"V\",7,2,6,-2".to_string(),
                count_key: "3,2".to_string(),
                wins,
                total,
            },
        )
        .expect("upsert");
    }
    upsert_leverage(
        conn,
        &LeverageRow {
            state_key: "\"V\",7,2,6,-2".to_string(),
            value: 2.25,
        },
    )
    .expect("upsert leverage");

    let outcome = index
        .lookup_outcome("\"V\",7,2,6,-2", "3,2", 1957, 2020)
        .expect("lookup");
    assert_eq!(outcome, Outcome { wins: 9, total: 20 });
    assert_eq!(index.lookup_leverage("\"V\",7,2,6,-2").expect("leverage"), 2.25);

    let other_count = index
        .lookup_outcome("\"V\",7,2,6,-2", "0,0", 1957, 2020)
        .expect("lookup");
    assert_eq!(other_count, Outcome::default());
    assert_eq!(index.lookup_leverage("\"H\",1,0,1,0").expect("leverage"), 0.0);
}

#[test]
fn sqlite_index_end_to_end_with_state() {
    let mut index = SqliteIndex::in_memory().expect("in-memory index");
    upsert_outcome(
        index.connection(),
        &OutcomeRow {
            year: 2001,
            state_key: "\"V\",7,2,6,-2".to_string(),
            count_key: "3,2".to_string(),
            wins: 4,
            total: 9,
        },
    )
    .expect("upsert");

    let result = game_probability(&state_with_status("I"), &index, YearRange::default())
        .expect("lookup succeeds");
    assert_eq!(
        serde_json::to_value(&result).expect("serializes"),
        json!({"wins": 4, "total": 9, "leverage": 0.0})
    );
}

#[test]
fn upsert_rejects_more_wins_than_games() {
    let mut index = SqliteIndex::in_memory().expect("in-memory index");
    let row = OutcomeRow {
        year: 2001,
        state_key: "\"H\",1,0,1,0".to_string(),
        count_key: "0,0".to_string(),
        wins: 5,
        total: 4,
    };
    assert!(upsert_outcome(index.connection(), &row).is_err());
}

#[test]
fn ingest_loads_tab_separated_rows() {
    let mut index = SqliteIndex::in_memory().expect("in-memory index");
    let outcomes = "# year\tstate\tcount\twins\ttotal\n\
                    1999\t\"H\",1,0,1,0\t0,0\t30\t55\n\
                    \n\
                    2000\t\"H\",1,0,1,0\t0,0\t20\t45\n";
    let summary = ingest_outcomes(index.connection(), Cursor::new(outcomes)).expect("ingest");
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.skipped, 2);

    let leverage = "\"H\",1,0,1,0\t0.86\n";
    ingest_leverage(index.connection(), Cursor::new(leverage)).expect("ingest");

    assert_eq!(
        index
            .lookup_outcome("\"H\",1,0,1,0", "0,0", 1957, 2020)
            .expect("lookup"),
        Outcome { wins: 50, total: 100 }
    );
    assert_eq!(index.lookup_leverage("\"H\",1,0,1,0").expect("leverage"), 0.86);
}

#[test]
fn ingest_bad_line_rolls_back() {
    let mut index = SqliteIndex::in_memory().expect("in-memory index");
    let outcomes = "1999\t\"H\",1,0,1,0\t0,0\t30\t55\n1999\tbroken\n";
    let err = ingest_outcomes(index.connection(), Cursor::new(outcomes)).unwrap_err();
    assert!(format!("{err:#}").contains("line 2"));

    let outcome = index
        .lookup_outcome("\"H\",1,0,1,0", "0,0", 1957, 2020)
        .expect("lookup");
    assert_eq!(outcome, Outcome::default());
}

#[test]
fn opening_missing_index_fails_without_creating_it() {
    let dir = scratch_dir("missing_index");
    let path = dir.join("history.sqlite");

    let err = match SqliteIndex::open(&path) {
        Ok(_) => panic!("missing index should not open"),
        Err(err) => err,
    };
    assert!(format!("{err:#}").contains("history.sqlite"));
    assert!(!path.exists());
    assert!(!dir.exists());
}

#[test]
fn opened_index_reads_ingested_rows_and_rejects_writes() {
    let dir = scratch_dir("read_only_index");
    let path = dir.join("history.sqlite");
    {
        let conn = open_index(&path).expect("writable index");
        upsert_outcome(
            &conn,
            &OutcomeRow {
                year: 2010,
                state_key: "\"V\",7,2,6,-2".to_string(),
                count_key: "3,2".to_string(),
                wins: 2,
                total: 5,
            },
        )
        .expect("upsert");
    }

    let mut index = SqliteIndex::open(&path).expect("existing index opens");
    assert_eq!(
        index
            .lookup_outcome("\"V\",7,2,6,-2", "3,2", 1957, 2020)
            .expect("lookup"),
        Outcome { wins: 2, total: 5 }
    );
    let row = OutcomeRow {
        year: 2011,
        state_key: "\"V\",7,2,6,-2".to_string(),
        count_key: "3,2".to_string(),
        wins: 1,
        total: 1,
    };
    assert!(upsert_outcome(index.connection(), &row).is_err());

    drop(index);
    let _ = fs::remove_dir_all(&dir);
}
