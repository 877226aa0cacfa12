//! Live game-log sources consulted at prediction time

use crate::{GameId, Stat, StatLine, TeamId};
use chrono::NaiveDate;

/// One recent game as reported by a live source
///
/// Sources may omit stats; missing values stay `None` here and are zero-filled
/// only when the inference adapter averages them.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveGame {
    pub game: GameId,
    pub sequence: i64,
    pub date: Option<NaiveDate>,
    pub stats: [Option<f64>; Stat::COUNT],
}

impl LiveGame {
    pub fn stat(&self, stat: Stat) -> Option<f64> {
        self.stats[stat.index()]
    }

    /// Stat line with absent values replaced by zero
    pub fn zero_filled(&self) -> StatLine {
        StatLine(self.stats.map(|v| v.unwrap_or(0.0)))
    }

    /// Stats the source did not report
    pub fn missing_stats(&self) -> Vec<Stat> {
        Stat::ALL
            .into_iter()
            .filter(|s| self.stat(*s).is_none())
            .collect()
    }
}

/// Anything that can list a team's most recent games
pub trait GameLogSource {
    /// Up to `limit` games for `team`, most recent first
    fn recent_games(&self, team: TeamId, limit: usize) -> crate::Result<Vec<LiveGame>>;
}
