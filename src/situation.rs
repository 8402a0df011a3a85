use std::fmt;

use serde::Serialize;

use crate::error::EncodeError;
use crate::state::{Count, GameState, InningHalf, Runners, Score};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BattingSide {
    #[serde(rename = "H")]
    Home,
    #[serde(rename = "V")]
    Visitor,
}

impl BattingSide {
    pub fn letter(self) -> char {
        match self {
            BattingSide::Home => 'H',
            BattingSide::Visitor => 'V',
        }
    }
}

/// Balls/strikes suffix of a lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountKey {
    pub balls: u8,
    pub strikes: u8,
}

impl fmt::Display for CountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.balls, self.strikes)
    }
}

/// Encoded game situation in the historical index's key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SituationKey {
    pub batting_side: BattingSide,
    pub inning: u32,
    pub outs: u8,
    pub runners_code: u8,
    pub score_diff: i64,
    pub count: CountKey,
}

impl SituationKey {
    /// `"H",7,2,6,-2` — the leverage key and the prefix of the outcome key.
    pub fn state_key(&self) -> String {
        format!(
            "\"{}\",{},{},{},{}",
            self.batting_side.letter(),
            self.inning,
            self.outs,
            self.runners_code,
            self.score_diff
        )
    }

    pub fn count_key(&self) -> String {
        self.count.to_string()
    }

    pub fn outcome_key(&self) -> String {
        format!("{},{}", self.state_key(), self.count_key())
    }
}

pub fn encode_situation(state: &GameState) -> Result<SituationKey, EncodeError> {
    if !state.started {
        return Err(EncodeError::NotStarted);
    }
    if state.finished {
        return Err(EncodeError::AlreadyFinished);
    }

    // The builder fills every situational field once the game has started.
    let (Some(half), Some(inning), Some(count), Some(runners), Some(score)) = (
        state.inning_half,
        state.inning,
        state.count,
        state.runners,
        state.score,
    ) else {
        return Err(EncodeError::NotStarted);
    };

    Ok(encode_parts(half, inning, count, runners, score))
}

pub fn encode_parts(
    half: InningHalf,
    inning: u32,
    count: Count,
    runners: Runners,
    score: Score,
) -> SituationKey {
    let batting_side = batting_side(half);
    let score_diff = match batting_side {
        BattingSide::Home => i64::from(score.home) - i64::from(score.away),
        BattingSide::Visitor => i64::from(score.away) - i64::from(score.home),
    };

    SituationKey {
        batting_side,
        inning,
        outs: clamp_outs(count.outs),
        runners_code: runners_code(runners),
        score_diff,
        count: CountKey {
            balls: clamp_balls(count.balls),
            strikes: clamp_strikes(count.strikes),
        },
    }
}

/// The historical index labels the top half `H`.
pub fn batting_side(half: InningHalf) -> BattingSide {
    match half {
        InningHalf::Top => BattingSide::Home,
        InningHalf::Bottom => BattingSide::Visitor,
    }
}

/// 1 for empty bases up to 8 for loaded.
pub fn runners_code(runners: Runners) -> u8 {
    1 + u8::from(runners.first) + 2 * u8::from(runners.second) + 4 * u8::from(runners.third)
}

// Terminal values fold into their last non-terminal state.
pub fn clamp_outs(outs: u8) -> u8 {
    if outs == 3 { 2 } else { outs }
}

pub fn clamp_strikes(strikes: u8) -> u8 {
    if strikes == 3 { 2 } else { strikes }
}

pub fn clamp_balls(balls: u8) -> u8 {
    if balls == 4 { 3 } else { balls }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_strings() {
        let key = encode_parts(
            InningHalf::Top,
            3,
            Count {
                balls: 1,
                strikes: 2,
                outs: 0,
            },
            Runners::default(),
            Score { home: 1, away: 4 },
        );
        assert_eq!(key.state_key(), "\"H\",3,0,1,-3");
        assert_eq!(key.count_key(), "1,2");
        assert_eq!(key.outcome_key(), "\"H\",3,0,1,-3,1,2");
    }

    #[test]
    fn extreme_scores_do_not_overflow() {
        let key = encode_parts(
            InningHalf::Bottom,
            9,
            Count {
                balls: 0,
                strikes: 0,
                outs: 0,
            },
            Runners::default(),
            Score {
                home: u32::MAX,
                away: 0,
            },
        );
        assert_eq!(key.score_diff, -i64::from(u32::MAX));
    }

    #[test]
    fn clamps_leave_live_values() {
        for n in 0..3 {
            assert_eq!(clamp_outs(n), n);
            assert_eq!(clamp_strikes(n), n);
        }
        for n in 0..4 {
            assert_eq!(clamp_balls(n), n);
        }
    }
}
