use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::Serialize;
use tracing::debug;

use crate::error::EncodeError;
use crate::situation::encode_situation;
use crate::state::GameState;

pub const DEFAULT_START_YEAR: i32 = 1957;
pub const DEFAULT_END_YEAR: i32 = 2020;

/// Wins and total games seen from one situation. `total` may be 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Outcome {
    pub wins: u64,
    pub total: u64,
}

/// Read-only historical outcomes keyed by encoded situation.
pub trait OutcomeIndex {
    fn lookup_outcome(
        &self,
        state_key: &str,
        count_key: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Outcome>;

    fn lookup_leverage(&self, state_key: &str) -> Result<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_YEAR,
            end: DEFAULT_END_YEAR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Probability {
    Estimate { wins: u64, total: u64, leverage: f64 },
    NotApplicable { message: String },
}

impl Probability {
    pub fn not_applicable(reason: EncodeError) -> Self {
        Probability::NotApplicable {
            message: reason.to_string(),
        }
    }
}

/// Looks up the win record for the game's live situation.
///
/// Games that have not started or are already over return a message without
/// touching the index.
pub fn game_probability(
    state: &GameState,
    index: &dyn OutcomeIndex,
    years: YearRange,
) -> Result<Probability> {
    let key = match encode_situation(state) {
        Ok(key) => key,
        Err(reason) => return Ok(Probability::not_applicable(reason)),
    };

    let state_key = key.state_key();
    let count_key = key.count_key();
    let outcome = index
        .lookup_outcome(&state_key, &count_key, years.start, years.end)
        .with_context(|| format!("outcome lookup for {state_key},{count_key}"))?;
    let leverage = index
        .lookup_leverage(&state_key)
        .with_context(|| format!("leverage lookup for {state_key}"))?;

    debug!(
        event_id = state.event_id,
        %state_key,
        %count_key,
        wins = outcome.wins,
        total = outcome.total,
        "situation lookup"
    );

    Ok(Probability::Estimate {
        wins: outcome.wins,
        total: outcome.total,
        leverage,
    })
}

/// SQLite-backed index: per-year outcome rows plus one leverage value per state.
pub struct SqliteIndex {
    conn: Connection,
}

impl SqliteIndex {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens an existing index read-only. A missing file is an error, never an
    /// empty index.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(anyhow!("history index not found at {}", path.display()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("open history index {}", path.display()))?;
        Ok(Self::new(conn))
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite")?;
        init_schema(&conn)?;
        Ok(Self::new(conn))
    }

    pub fn connection(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl OutcomeIndex for SqliteIndex {
    fn lookup_outcome(
        &self,
        state_key: &str,
        count_key: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Outcome> {
        let (wins, total): (i64, i64) = self
            .conn
            .query_row(
                r#"
                SELECT COALESCE(SUM(wins), 0), COALESCE(SUM(total), 0)
                FROM outcomes
                WHERE state_key = ?1 AND count_key = ?2 AND year BETWEEN ?3 AND ?4
                "#,
                params![state_key, count_key, start_year, end_year],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .context("query outcomes")?;
        Ok(Outcome {
            wins: u64::try_from(wins).unwrap_or(0),
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    fn lookup_leverage(&self, state_key: &str) -> Result<f64> {
        let value: Option<f64> = self
            .conn
            .query_row(
                "SELECT value FROM leverage WHERE state_key = ?1",
                params![state_key],
                |row| row.get(0),
            )
            .optional()
            .context("query leverage")?;
        if value.is_none() {
            debug!(%state_key, "no leverage recorded");
        }
        Ok(value.unwrap_or(0.0))
    }
}

/// Opens the index for writing, creating the file and schema when missing.
pub fn open_index(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS outcomes (
            year INTEGER NOT NULL,
            state_key TEXT NOT NULL,
            count_key TEXT NOT NULL,
            wins INTEGER NOT NULL,
            total INTEGER NOT NULL,
            PRIMARY KEY (year, state_key, count_key)
        );
        CREATE INDEX IF NOT EXISTS idx_outcomes_key ON outcomes(state_key, count_key);

        CREATE TABLE IF NOT EXISTS leverage (
            state_key TEXT PRIMARY KEY,
            value REAL NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRow {
    pub year: i32,
    pub state_key: String,
    pub count_key: String,
    pub wins: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeverageRow {
    pub state_key: String,
    pub value: f64,
}

pub fn upsert_outcome(conn: &Connection, row: &OutcomeRow) -> Result<()> {
    if row.wins > row.total {
        return Err(anyhow!(
            "wins {} exceed total {} for {}",
            row.wins,
            row.total,
            row.state_key
        ));
    }
    conn.execute(
        r#"
        INSERT INTO outcomes (year, state_key, count_key, wins, total)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(year, state_key, count_key) DO UPDATE SET
            wins = excluded.wins,
            total = excluded.total
        "#,
        params![
            row.year,
            row.state_key,
            row.count_key,
            row.wins as i64,
            row.total as i64
        ],
    )
    .context("upsert outcome")?;
    Ok(())
}

pub fn upsert_leverage(conn: &Connection, row: &LeverageRow) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO leverage (state_key, value) VALUES (?1, ?2)
        ON CONFLICT(state_key) DO UPDATE SET value = excluded.value
        "#,
        params![row.state_key, row.value],
    )
    .context("upsert leverage")?;
    Ok(())
}

/// `year<TAB>state_key<TAB>count_key<TAB>wins<TAB>total`
pub fn parse_outcome_line(line: &str) -> Result<OutcomeRow> {
    let cols = line.split('\t').map(str::trim).collect::<Vec<_>>();
    let [year, state_key, count_key, wins, total] = cols.as_slice() else {
        return Err(anyhow!("expected 5 tab-separated columns, got {}", cols.len()));
    };
    Ok(OutcomeRow {
        year: year.parse().with_context(|| format!("bad year {year:?}"))?,
        state_key: state_key.to_string(),
        count_key: count_key.to_string(),
        wins: wins.parse().with_context(|| format!("bad wins {wins:?}"))?,
        total: total.parse().with_context(|| format!("bad total {total:?}"))?,
    })
}

/// `state_key<TAB>leverage`
pub fn parse_leverage_line(line: &str) -> Result<LeverageRow> {
    let cols = line.split('\t').map(str::trim).collect::<Vec<_>>();
    let [state_key, value] = cols.as_slice() else {
        return Err(anyhow!("expected 2 tab-separated columns, got {}", cols.len()));
    };
    Ok(LeverageRow {
        state_key: state_key.to_string(),
        value: value.parse().with_context(|| format!("bad leverage {value:?}"))?,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub rows: usize,
    pub skipped: usize,
}

pub fn ingest_outcomes(conn: &mut Connection, reader: impl BufRead) -> Result<IngestSummary> {
    ingest_lines(conn, reader, |tx, line| {
        upsert_outcome(tx, &parse_outcome_line(line)?)
    })
}

pub fn ingest_leverage(conn: &mut Connection, reader: impl BufRead) -> Result<IngestSummary> {
    ingest_lines(conn, reader, |tx, line| {
        upsert_leverage(tx, &parse_leverage_line(line)?)
    })
}

// Blank lines and `#` comments are skipped; any other bad line aborts the load.
fn ingest_lines(
    conn: &mut Connection,
    reader: impl BufRead,
    mut apply: impl FnMut(&Connection, &str) -> Result<()>,
) -> Result<IngestSummary> {
    let tx = conn.transaction().context("begin ingest transaction")?;
    let mut summary = IngestSummary::default();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.context("read ingest line")?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            summary.skipped += 1;
            continue;
        }
        apply(&*tx, trimmed).with_context(|| format!("line {}", idx + 1))?;
        summary.rows += 1;
    }
    tx.commit().context("commit ingest transaction")?;
    Ok(summary)
}
