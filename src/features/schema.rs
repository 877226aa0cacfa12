//! Feature schema shared by training and inference
//!
//! The schema fixes which stats are averaged, over how many games, and in what
//! order the two sides appear in a feature row. Both the training pipeline and
//! the inference adapter build rows exclusively through [`FeatureSchema::vector`],
//! so a model trained on one schema can only be fed rows of that schema.

use crate::features::WindowPolicy;
use crate::{FeatureConfig, HoopsError, Result, Stat, StatLine};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a team inside a paired row
///
/// Side A / side B is an assignment order, not home/away: training pairs take
/// the first-seen row as A, while live predictions put the first team passed
/// in (usually the home team) on side A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::A, Side::B];

    pub fn suffix(&self) -> &'static str {
        match self {
            Side::A => "A",
            Side::B => "B",
        }
    }

    /// Class label predicting a win for this side
    pub fn label(&self) -> u8 {
        match self {
            Side::A => 1,
            Side::B => 0,
        }
    }

    pub fn from_label(label: u8) -> Self {
        if label == 1 {
            Side::A
        } else {
            Side::B
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Side {}", self.suffix())
    }
}

/// Ordered feature layout: every stat for side A, then every stat for side B
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub window: usize,
    pub policy: WindowPolicy,
    pub stats: Vec<Stat>,
}

impl FeatureSchema {
    /// Bumped whenever the naming or ordering rules change
    pub const VERSION: u32 = 1;

    pub fn new(window: usize, policy: WindowPolicy) -> Result<Self> {
        if window == 0 {
            return Err(HoopsError::Config("window must be at least 1".to_string()));
        }
        Ok(FeatureSchema {
            window,
            policy,
            stats: Stat::ALL.to_vec(),
        })
    }

    pub fn from_config(config: &FeatureConfig) -> Result<Self> {
        Self::new(config.window, config.policy)
    }

    /// Number of values in a feature row
    pub fn len(&self) -> usize {
        self.stats.len() * Side::BOTH.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Feature names in row order, e.g. `PTS_rolling_A`
    pub fn names(&self) -> Vec<String> {
        Side::BOTH
            .iter()
            .flat_map(|side| {
                self.stats
                    .iter()
                    .map(move |stat| format!("{}_rolling_{}", stat.column(), side.suffix()))
            })
            .collect()
    }

    /// Stable identity string stored alongside trained models
    pub fn fingerprint(&self) -> String {
        let stats: Vec<&str> = self.stats.iter().map(|s| s.column()).collect();
        format!(
            "v{};window={};policy={};stats={}",
            Self::VERSION,
            self.window,
            self.policy,
            stats.join(",")
        )
    }

    /// Fail if a stored fingerprint was produced by a different schema
    pub fn ensure_matches(&self, stored_fingerprint: &str) -> Result<()> {
        let current = self.fingerprint();
        if current != stored_fingerprint {
            return Err(HoopsError::SchemaMismatch {
                expected: stored_fingerprint.to_string(),
                found: current,
            });
        }
        Ok(())
    }

    /// Build a feature row from the two sides' averaged stats
    pub fn vector(&self, side_a: &StatLine, side_b: &StatLine) -> FeatureVector {
        let values = [side_a, side_b]
            .iter()
            .flat_map(|line| self.stats.iter().map(move |stat| line[*stat] as f32))
            .collect();
        FeatureVector { values }
    }
}

/// A single classifier input row laid out by a [`FeatureSchema`]
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Pair each value with its schema name
    pub fn named(&self, schema: &FeatureSchema) -> Vec<(String, f32)> {
        schema.names().into_iter().zip(self.values.iter().copied()).collect()
    }
}
