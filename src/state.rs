use serde::Serialize;
use serde_json::{Value, json};

use crate::error::StateError;
use crate::innings::{RunsPerInning, align_runs};

const LINESCORE: &[&str] = &["liveData", "linescore"];
const BOXSCORE: &[&str] = &["liveData", "boxscore"];
const PLAYS: &[&str] = &["liveData", "plays"];

// Status codes that mean the first pitch has not been thrown yet.
const NOT_STARTED_CODES: &[&str] = &["S", "P"];
const FINISHED_CODES: &[&str] = &["F", "O"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InningHalf {
    Top,
    Bottom,
}

impl InningHalf {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "top" => Some(InningHalf::Top),
            "bottom" => Some(InningHalf::Bottom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Count {
    pub balls: u8,
    pub strikes: u8,
    pub outs: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Runners {
    pub first: bool,
    pub second: bool,
    pub third: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamPair {
    pub home: Value,
    pub away: Value,
}

/// Provider sections carried verbatim. Missing sections are `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct GameDetails {
    pub game: Value,
    pub game_info: Value,
    pub status: Value,
    pub weather: Value,
    pub venue: Value,
    pub alerts: Value,
    pub probable_pitchers: Value,
    pub players: Value,
    pub all_plays: Value,
    pub current_play: Option<Value>,
    pub plays_by_inning: Value,
    pub scoring_plays: Value,
    pub box_info: Value,
    pub innings_objs: Value,
    pub teams: TeamPair,
    pub officials: Value,
    pub pitching_notes: Value,
    pub linescore: Value,
}

/// One immutable snapshot of a game, built from a single provider payload.
///
/// Situational fields are `None` until the game has started, so a 0-0 score
/// always means the provider reported 0-0.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub event_id: u64,
    pub time_code: Option<String>,
    pub status_code: String,
    pub started: bool,
    pub finished: bool,
    pub score: Option<Score>,
    pub count: Option<Count>,
    pub runners: Option<Runners>,
    pub inning: Option<u32>,
    pub inning_half: Option<InningHalf>,
    pub inning_ordinal: Option<String>,
    pub scheduled_innings: u32,
    pub runs_per_inning: RunsPerInning,
    pub details: GameDetails,
}

impl GameState {
    /// Stable JSON rendering for downstream consumers.
    pub fn canonical_json(&self) -> Value {
        let d = &self.details;
        json!({
            "eventId": self.event_id,
            "timeCode": self.time_code,
            "gameData": {
                "game": d.game,
                "gameInfo": d.game_info,
                "status": d.status,
                "weather": d.weather,
                "venue": d.venue,
                // The provider has no separate no-hitter/perfect-game object.
                "flags": d.game_info,
                "alerts": d.alerts,
                "probablePitchers": d.probable_pitchers,
                "players": d.players,
                "started": self.started,
                "finished": self.finished,
            },
            "currentData": {
                "plays": {
                    "allPlays": d.all_plays,
                    "currentPlay": d.current_play,
                    "playsThisInning": d.plays_by_inning,
                    "playsByInning": d.plays_by_inning,
                    "scoringPlays": d.scoring_plays,
                },
                "score": self.score,
                "info": d.box_info,
                "scheduledInnings": self.scheduled_innings,
                "currentInning": self.inning,
                "inningHalf": self.inning_half,
                "inningOrdinal": self.inning_ordinal,
                "inningsObjs": d.innings_objs,
                "runsPerInning": self.runs_per_inning,
                "teams": d.teams,
                "officials": d.officials,
                "pitchingNotes": d.pitching_notes,
                "balls": self.count.map(|c| c.balls),
                "strikes": self.count.map(|c| c.strikes),
                "outs": self.count.map(|c| c.outs),
                "runners": self.runners,
            }
        })
    }
}

pub fn parse_game_state_json(
    event_id: u64,
    time_code: Option<&str>,
    raw: &str,
) -> Result<GameState, StateError> {
    let root: Value =
        serde_json::from_str(raw.trim()).map_err(|err| StateError::Json(err.to_string()))?;
    build_game_state(event_id, time_code, &root)
}

pub fn build_game_state(
    event_id: u64,
    time_code: Option<&str>,
    root: &Value,
) -> Result<GameState, StateError> {
    let status_code = status_code(root)?.to_string();
    let started = is_started(&status_code);
    let finished = is_finished(&status_code);

    let line = linescore(root)?;
    let scheduled_innings = scheduled_innings(line)?;
    let runs_per_inning = runs_per_inning(line, scheduled_innings)?;

    let (score, count, runners, inning, inning_half, inning_ordinal) = if started {
        (
            Some(score(line)?),
            Some(count(line)?),
            Some(runners(line)?),
            Some(current_inning(line)?),
            Some(inning_half(line)?),
            Some(inning_ordinal(line)?),
        )
    } else {
        (None, None, None, None, None, None)
    };

    Ok(GameState {
        event_id,
        time_code: time_code.map(str::to_string),
        status_code,
        started,
        finished,
        score,
        count,
        runners,
        inning,
        inning_half,
        inning_ordinal,
        scheduled_innings,
        runs_per_inning,
        details: details(root, started),
    })
}

pub fn status_code(root: &Value) -> Result<&str, StateError> {
    let path = ["gameData", "status", "statusCode"];
    let value = require(root, &[], &path)?;
    value
        .as_str()
        .ok_or_else(|| StateError::invalid(dotted(&[], &path), value))
}

/// True for every status except scheduled and pre-game, including finished games.
pub fn is_started(status_code: &str) -> bool {
    !NOT_STARTED_CODES.contains(&status_code)
}

pub fn is_finished(status_code: &str) -> bool {
    FINISHED_CODES.contains(&status_code)
}

pub fn linescore(root: &Value) -> Result<&Value, StateError> {
    require(root, &[], LINESCORE)
}

pub fn scheduled_innings(line: &Value) -> Result<u32, StateError> {
    require_int(line, LINESCORE, &["scheduledInnings"])
}

pub fn runs_per_inning(line: &Value, scheduled_innings: u32) -> Result<RunsPerInning, StateError> {
    let path = ["innings"];
    let value = require(line, LINESCORE, &path)?;
    let innings = value
        .as_array()
        .ok_or_else(|| StateError::invalid(dotted(LINESCORE, &path), value))?;
    Ok(align_runs(scheduled_innings as usize, innings))
}

pub fn score(line: &Value) -> Result<Score, StateError> {
    Ok(Score {
        home: require_int(line, LINESCORE, &["teams", "home", "runs"])?,
        away: require_int(line, LINESCORE, &["teams", "away", "runs"])?,
    })
}

pub fn count(line: &Value) -> Result<Count, StateError> {
    Ok(Count {
        balls: require_int(line, LINESCORE, &["balls"])?,
        strikes: require_int(line, LINESCORE, &["strikes"])?,
        outs: require_int(line, LINESCORE, &["outs"])?,
    })
}

/// A base missing from the offense object, or present as `null`, is unoccupied.
pub fn runners(line: &Value) -> Result<Runners, StateError> {
    let offense = require(line, LINESCORE, &["offense"])?;
    let occupied = |base: &str| offense.get(base).is_some_and(|v| !v.is_null());
    Ok(Runners {
        first: occupied("first"),
        second: occupied("second"),
        third: occupied("third"),
    })
}

pub fn current_inning(line: &Value) -> Result<u32, StateError> {
    require_int(line, LINESCORE, &["currentInning"])
}

pub fn inning_half(line: &Value) -> Result<InningHalf, StateError> {
    let path = ["inningHalf"];
    let value = require(line, LINESCORE, &path)?;
    value
        .as_str()
        .and_then(InningHalf::parse)
        .ok_or_else(|| StateError::invalid(dotted(LINESCORE, &path), value))
}

pub fn inning_ordinal(line: &Value) -> Result<String, StateError> {
    let path = ["currentInningOrdinal"];
    let value = require(line, LINESCORE, &path)?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| StateError::invalid(dotted(LINESCORE, &path), value))
}

fn details(root: &Value, started: bool) -> GameDetails {
    let boxscore = lookup(root, BOXSCORE).unwrap_or(&Value::Null);
    let plays = lookup(root, PLAYS).unwrap_or(&Value::Null);
    let line = lookup(root, LINESCORE).unwrap_or(&Value::Null);
    GameDetails {
        game: carry(root, &["gameData", "game"]),
        game_info: carry(root, &["gameData", "gameInfo"]),
        status: carry(root, &["gameData", "status"]),
        weather: carry(root, &["gameData", "weather"]),
        venue: carry(root, &["gameData", "venue"]),
        alerts: carry(root, &["gameData", "alerts"]),
        probable_pitchers: carry(root, &["gameData", "probablePitchers"]),
        players: carry(root, &["gameData", "players"]),
        all_plays: carry(plays, &["allPlays"]),
        current_play: started.then(|| carry(plays, &["currentPlay"])),
        plays_by_inning: carry(plays, &["playsByInning"]),
        scoring_plays: carry(plays, &["scoringPlays"]),
        box_info: carry(boxscore, &["info"]),
        innings_objs: carry(line, &["innings"]),
        teams: TeamPair {
            home: carry(boxscore, &["teams", "home", "team"]),
            away: carry(boxscore, &["teams", "away", "team"]),
        },
        officials: carry(boxscore, &["officials"]),
        pitching_notes: carry(boxscore, &["pitchingNotes"]),
        linescore: line.clone(),
    }
}

/// Reads an integer that may arrive as a JSON number or as numeric text.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |node, key| node.get(*key))
        .filter(|v| !v.is_null())
}

fn carry(root: &Value, path: &[&str]) -> Value {
    lookup(root, path).cloned().unwrap_or(Value::Null)
}

fn require<'a>(root: &'a Value, prefix: &[&str], path: &[&str]) -> Result<&'a Value, StateError> {
    lookup(root, path).ok_or_else(|| StateError::missing(dotted(prefix, path)))
}

fn require_int<T: TryFrom<i64>>(
    root: &Value,
    prefix: &[&str],
    path: &[&str],
) -> Result<T, StateError> {
    let value = require(root, prefix, path)?;
    value_as_i64(value)
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| StateError::invalid(dotted(prefix, path), value))
}

fn dotted(prefix: &[&str], path: &[&str]) -> String {
    prefix
        .iter()
        .chain(path.iter())
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}
