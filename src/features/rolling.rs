//! Rolling box-score averages
//!
//! Per-team trailing means over the last N games, ordered by each team's
//! chronological key.

use crate::{StatLine, StatRecord, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

/// Which games a trailing window covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowPolicy {
    /// The current game plus the N-1 before it. Its own box score leaks into
    /// the feature row used to predict it.
    #[default]
    IncludeCurrent,
    /// The N games strictly before the current one
    PriorOnly,
}

impl WindowPolicy {
    /// Positions averaged for the record at `position`, or `None` while the
    /// team has too little history
    pub fn window_range(&self, position: usize, window: usize) -> Option<Range<usize>> {
        if window == 0 {
            return None;
        }
        match self {
            WindowPolicy::IncludeCurrent => {
                let end = position + 1;
                (end >= window).then(|| end - window..end)
            }
            WindowPolicy::PriorOnly => (position >= window).then(|| position - window..position),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WindowPolicy::IncludeCurrent => "include-current",
            WindowPolicy::PriorOnly => "prior-only",
        }
    }
}

impl fmt::Display for WindowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A box score plus its trailing averages
#[derive(Debug, Clone, PartialEq)]
pub struct RollingStatRecord {
    pub record: StatRecord,
    /// `None` until the team has a full window of games
    pub rolling: Option<StatLine>,
}

impl RollingStatRecord {
    pub fn is_defined(&self) -> bool {
        self.rolling.is_some()
    }
}

/// Computes trailing means for every record in a game log
#[derive(Debug, Clone, Copy)]
pub struct RollingAggregator {
    window: usize,
    policy: WindowPolicy,
}

impl RollingAggregator {
    pub fn new(window: usize, policy: WindowPolicy) -> Self {
        RollingAggregator { window, policy }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Produce one rolling record per input record, in input order
    pub fn aggregate(&self, records: &[StatRecord]) -> Vec<RollingStatRecord> {
        let mut by_team: HashMap<TeamId, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            by_team.entry(record.team).or_default().push(idx);
        }

        let mut rolling: Vec<Option<StatLine>> = vec![None; records.len()];
        let mut defined = 0usize;

        for (team, mut indices) in by_team {
            indices.sort_by_key(|&i| (records[i].sequence, records[i].ingest_index));

            for (position, &idx) in indices.iter().enumerate() {
                let Some(range) = self.policy.window_range(position, self.window) else {
                    continue;
                };
                rolling[idx] = StatLine::mean_of(indices[range].iter().map(|&i| &records[i].stats));
                defined += 1;
            }

            if indices.len() < self.window {
                log::debug!(
                    "{} has {} games, fewer than the {}-game window",
                    team,
                    indices.len(),
                    self.window
                );
            }
        }

        log::debug!(
            "Rolling window {} ({}): {} of {} records defined",
            self.window,
            self.policy,
            defined,
            records.len()
        );

        records
            .iter()
            .cloned()
            .zip(rolling)
            .map(|(record, rolling)| RollingStatRecord { record, rolling })
            .collect()
    }
}
