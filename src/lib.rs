//! Basketball matchup prediction from rolling box-score features
//!
//! Turns a per-team game log into paired feature rows for a win classifier and
//! rebuilds the same rows at prediction time from a live game-log source.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use thiserror::Error;

use crate::features::WindowPolicy;

/// Unique identifier for a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

/// Unique identifier for a game, shared by both teams' rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameId(pub i64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Game({})", self.0)
    }
}

/// Box-score statistics tracked per team per game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stat {
    Points,
    Rebounds,
    Assists,
    FieldGoalsMade,
    FieldGoalsAttempted,
    FieldGoalPct,
    ThreesMade,
    Steals,
    Blocks,
    Turnovers,
}

impl Stat {
    pub const COUNT: usize = 10;

    /// All tracked stats in feature order
    pub const ALL: [Stat; Stat::COUNT] = [
        Stat::Points,
        Stat::Rebounds,
        Stat::Assists,
        Stat::FieldGoalsMade,
        Stat::FieldGoalsAttempted,
        Stat::FieldGoalPct,
        Stat::ThreesMade,
        Stat::Steals,
        Stat::Blocks,
        Stat::Turnovers,
    ];

    /// Column name used in box-score files and feature names
    pub fn column(&self) -> &'static str {
        match self {
            Stat::Points => "PTS",
            Stat::Rebounds => "REB",
            Stat::Assists => "AST",
            Stat::FieldGoalsMade => "FGM",
            Stat::FieldGoalsAttempted => "FGA",
            Stat::FieldGoalPct => "FG_PCT",
            Stat::ThreesMade => "FG3M",
            Stat::Steals => "STL",
            Stat::Blocks => "BLK",
            Stat::Turnovers => "TO",
        }
    }

    /// Resolve a column name, accepting the `TOV` spelling some feeds use
    pub fn from_column(name: &str) -> Option<Self> {
        let upper = name.trim().to_uppercase();
        if upper == "TOV" {
            return Some(Stat::Turnovers);
        }
        Stat::ALL.into_iter().find(|s| s.column() == upper)
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Counting stats can be summed across player rows; percentages cannot
    pub fn is_counting(&self) -> bool {
        !matches!(self, Stat::FieldGoalPct)
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One value per tracked stat
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatLine(pub [f64; Stat::COUNT]);

impl StatLine {
    pub fn zeros() -> Self {
        Self::default()
    }

    /// Arithmetic mean of each stat across the given lines
    pub fn mean_of<'a>(lines: impl IntoIterator<Item = &'a StatLine>) -> Option<StatLine> {
        let mut sum = StatLine::zeros();
        let mut n = 0usize;
        for line in lines {
            for (acc, v) in sum.0.iter_mut().zip(line.0.iter()) {
                *acc += v;
            }
            n += 1;
        }
        if n == 0 {
            return None;
        }
        for acc in sum.0.iter_mut() {
            *acc /= n as f64;
        }
        Some(sum)
    }
}

impl Index<Stat> for StatLine {
    type Output = f64;

    fn index(&self, stat: Stat) -> &f64 {
        &self.0[stat.index()]
    }
}

impl IndexMut<Stat> for StatLine {
    fn index_mut(&mut self, stat: Stat) -> &mut f64 {
        &mut self.0[stat.index()]
    }
}

/// One team's box score in one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    pub team: TeamId,
    pub game: GameId,
    /// Chronological ordering key, monotonic per team (not wall-clock time)
    pub sequence: i64,
    pub date: Option<NaiveDate>,
    pub stats: StatLine,
    /// Row position at ingestion, used for stable side assignment
    pub ingest_index: usize,
}

impl StatRecord {
    pub fn points(&self) -> f64 {
        self.stats[Stat::Points]
    }
}

/// A basketball team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub abbreviation: Option<String>,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum HoopsError {
    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    #[error("Invalid value {value:?} in column {column} on line {line}")]
    InvalidValue {
        line: u64,
        column: String,
        value: String,
    },

    #[error("Missing {column} for team {team} in game {game}")]
    MissingStat {
        team: TeamId,
        game: GameId,
        column: String,
    },

    #[error("Tied outcome in {game}: both sides scored {points}")]
    TiedOutcome { game: GameId, points: f64 },

    #[error("Feature schema mismatch: model expects {expected}, computed {found}")]
    SchemaMismatch { expected: String, found: String },

    #[error("Live data source failed for {team}: {message}")]
    ExternalSource { team: TeamId, message: String },

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Model not trained - run `hoops train` first")]
    NoModel,

    #[error("Model error: {0}")]
    Model(String),

    #[error("No usable samples: {0}")]
    EmptyDataset(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HoopsError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub features: FeatureConfig,
    pub training: TrainingConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Number of trailing games averaged per feature
    pub window: usize,
    pub policy: WindowPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub hidden_dims: Vec<usize>,
    pub dropout: f64,
    /// Fraction of paired games held out for evaluation
    pub test_ratio: f32,
    pub seed: u64,
    pub early_stopping_patience: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub model_path: String,
    /// Input files carry one row per player rather than per team
    pub player_rows: bool,
    /// Column used as the per-team chronological ordering key
    pub order_column: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: 300,
            learning_rate: 0.05,
            hidden_dims: vec![32],
            dropout: 0.1,
            test_ratio: 0.2,
            seed: 200,
            early_stopping_patience: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            features: FeatureConfig {
                window: 10,
                policy: WindowPolicy::IncludeCurrent,
            },
            training: TrainingConfig::default(),
            data: DataConfig {
                database_path: "data/hoops.db".to_string(),
                model_path: "model/hoops_model".to_string(),
                player_rows: false,
                order_column: "GAME_ID".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HoopsError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| HoopsError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HoopsError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.features.window == 0 {
            return Err(HoopsError::Config("features.window must be at least 1".to_string()));
        }
        if !(0.0..1.0).contains(&self.training.test_ratio) {
            return Err(HoopsError::Config(format!(
                "training.test_ratio must be in [0, 1), got {}",
                self.training.test_ratio
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_columns_round_trip() {
        for stat in Stat::ALL {
            assert_eq!(Stat::from_column(stat.column()), Some(stat));
        }
        assert_eq!(Stat::from_column("TOV"), Some(Stat::Turnovers));
        assert_eq!(Stat::from_column("fg_pct"), Some(Stat::FieldGoalPct));
        assert_eq!(Stat::from_column("MIN"), None);
    }

    #[test]
    fn test_stat_line_mean() {
        let mut a = StatLine::zeros();
        a[Stat::Points] = 100.0;
        let mut b = StatLine::zeros();
        b[Stat::Points] = 90.0;
        b[Stat::Steals] = 4.0;

        let mean = StatLine::mean_of([&a, &b]).unwrap();
        assert_eq!(mean[Stat::Points], 95.0);
        assert_eq!(mean[Stat::Steals], 2.0);
        assert!(StatLine::mean_of(std::iter::empty()).is_none());
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.features.window, 10);
        assert_eq!(parsed.features.policy, WindowPolicy::IncludeCurrent);
        assert_eq!(parsed.training.seed, 200);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_training_defaults() {
        let training = TrainingConfig::default();
        assert_eq!(training.test_ratio, 0.2);
        assert_eq!(training.seed, 200);
        assert_eq!(training.hidden_dims, vec![32]);
        assert_eq!(Config::default().training.epochs, training.epochs);
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = Config::default();
        config.features.window = 0;
        assert!(matches!(config.validate(), Err(HoopsError::Config(_))));
    }
}
