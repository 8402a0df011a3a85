use serde::Serialize;
use serde_json::Value;

use crate::state::value_as_i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunsPerInning {
    pub home: Vec<Option<u32>>,
    pub away: Vec<Option<u32>>,
}

impl RunsPerInning {
    pub fn unplayed(scheduled_innings: usize) -> Self {
        Self {
            home: vec![None; scheduled_innings],
            away: vec![None; scheduled_innings],
        }
    }
}

/// Lines the provider's innings list up against the scheduled length.
///
/// Slots for innings not yet played stay `None`. Extra innings beyond the
/// schedule are appended, so each side ends up `max(scheduled, innings.len())`
/// long.
pub fn align_runs(scheduled_innings: usize, innings: &[Value]) -> RunsPerInning {
    let mut out = RunsPerInning::unplayed(scheduled_innings);
    if innings.is_empty() {
        return out;
    }

    align_side(&mut out.home, innings, "home");
    align_side(&mut out.away, innings, "away");
    out
}

fn align_side(slots: &mut Vec<Option<u32>>, innings: &[Value], side: &str) {
    for (idx, inning) in innings.iter().enumerate() {
        let runs = inning_runs(inning, side);
        if idx < slots.len() {
            slots[idx] = runs;
        } else {
            slots.push(runs);
        }
    }
}

fn inning_runs(inning: &Value, side: &str) -> Option<u32> {
    inning
        .get(side)
        .and_then(|v| v.get("runs"))
        .and_then(value_as_i64)
        .and_then(|runs| u32::try_from(runs).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn half_inning_in_progress_leaves_home_slot_open() {
        let innings = vec![
            json!({"num": 1, "home": {"runs": 0}, "away": {"runs": 2}}),
            json!({"num": 2, "home": {}, "away": {"runs": 1}}),
        ];
        let runs = align_runs(9, &innings);
        assert_eq!(runs.away[..3], [Some(2), Some(1), None]);
        assert_eq!(runs.home[..3], [Some(0), None, None]);
        assert_eq!(runs.home.len(), 9);
    }

    #[test]
    fn missing_side_object_is_unplayed() {
        let innings = vec![json!({"num": 1, "away": {"runs": 3}})];
        let runs = align_runs(7, &innings);
        assert_eq!(runs.home, vec![None; 7]);
        assert_eq!(runs.away[0], Some(3));
    }

    #[test]
    fn runs_as_text_are_read() {
        let innings = vec![json!({"home": {"runs": "4"}, "away": {"runs": 0}})];
        let runs = align_runs(9, &innings);
        assert_eq!(runs.home[0], Some(4));
    }
}
