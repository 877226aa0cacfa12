//! Pairs the two teams of each game into one labelled row

use crate::features::label::derive_label;
use crate::features::rolling::RollingStatRecord;
use crate::features::schema::{FeatureSchema, FeatureVector, Side};
use crate::{GameId, Result, StatLine, TeamId};
use std::collections::HashMap;

/// One team's contribution to a paired game
#[derive(Debug, Clone, PartialEq)]
pub struct SideEntry {
    pub side: Side,
    pub team: TeamId,
    /// Trailing averages used as features
    pub rolling: StatLine,
    /// The game's own box score, used only for the label
    pub raw: StatLine,
}

/// Both sides of a game plus the outcome label
#[derive(Debug, Clone, PartialEq)]
pub struct PairedMatchRecord {
    pub game: GameId,
    pub sides: [SideEntry; 2],
    /// 1 if side A scored more points than side B
    pub label: u8,
}

impl PairedMatchRecord {
    pub fn side(&self, side: Side) -> &SideEntry {
        &self.sides[side.index()]
    }

    pub fn winner(&self) -> TeamId {
        self.side(Side::from_label(self.label)).team
    }

    pub fn features(&self, schema: &FeatureSchema) -> FeatureVector {
        schema.vector(&self.side(Side::A).rolling, &self.side(Side::B).rolling)
    }
}

/// Counts from a pairing pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairingSummary {
    pub games_seen: usize,
    pub paired: usize,
    /// Games with fewer than two defined rows
    pub dropped: usize,
    /// Games with more than two defined rows (extras ignored)
    pub oversized: usize,
}

/// Groups rolling records by game and joins the first two as sides A and B
#[derive(Debug, Clone, Copy, Default)]
pub struct PairAssembler;

impl PairAssembler {
    pub fn new() -> Self {
        PairAssembler
    }

    pub fn assemble(&self, rows: &[RollingStatRecord]) -> Result<Vec<PairedMatchRecord>> {
        self.assemble_with_summary(rows).map(|(pairs, _)| pairs)
    }

    /// Assemble pairs, also reporting how many games were dropped
    ///
    /// Rows without a defined rolling line are skipped. Within a game, sides
    /// follow ingestion order; games are emitted in order of first appearance.
    pub fn assemble_with_summary(
        &self,
        rows: &[RollingStatRecord],
    ) -> Result<(Vec<PairedMatchRecord>, PairingSummary)> {
        let mut defined: Vec<(&RollingStatRecord, &StatLine)> = rows
            .iter()
            .filter_map(|row| row.rolling.as_ref().map(|line| (row, line)))
            .collect();
        defined.sort_by_key(|(row, _)| row.record.ingest_index);

        let mut order: Vec<GameId> = Vec::new();
        let mut by_game: HashMap<GameId, Vec<(&RollingStatRecord, &StatLine)>> = HashMap::new();
        for entry in defined {
            let game = entry.0.record.game;
            by_game
                .entry(game)
                .or_insert_with(|| {
                    order.push(game);
                    Vec::new()
                })
                .push(entry);
        }

        let mut summary = PairingSummary {
            games_seen: count_games(rows),
            ..Default::default()
        };
        let mut pairs = Vec::with_capacity(order.len());

        for game in order {
            let members = &by_game[&game];
            if members.len() > 2 {
                log::debug!("{} has {} sides, using the first two", game, members.len());
                summary.oversized += 1;
            }
            let [(row_a, rolling_a), (row_b, rolling_b), ..] = members.as_slice() else {
                continue;
            };

            let label = derive_label(game, row_a.record.points(), row_b.record.points())?;
            pairs.push(PairedMatchRecord {
                game,
                sides: [
                    SideEntry {
                        side: Side::A,
                        team: row_a.record.team,
                        rolling: **rolling_a,
                        raw: row_a.record.stats,
                    },
                    SideEntry {
                        side: Side::B,
                        team: row_b.record.team,
                        rolling: **rolling_b,
                        raw: row_b.record.stats,
                    },
                ],
                label,
            });
        }

        summary.paired = pairs.len();
        summary.dropped = summary.games_seen - summary.paired;

        log::info!(
            "Paired {} of {} games ({} dropped for short history)",
            summary.paired,
            summary.games_seen,
            summary.dropped
        );

        Ok((pairs, summary))
    }
}

fn count_games(rows: &[RollingStatRecord]) -> usize {
    let mut games: Vec<GameId> = rows.iter().map(|r| r.record.game).collect();
    games.sort();
    games.dedup();
    games.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HoopsError, Stat, StatRecord};

    fn rolling_row(team: i64, game: i64, points: f64, idx: usize, defined: bool) -> RollingStatRecord {
        let mut stats = StatLine::zeros();
        stats[Stat::Points] = points;
        let mut rolling = StatLine::zeros();
        rolling[Stat::Points] = points - 1.0;
        RollingStatRecord {
            record: StatRecord {
                team: TeamId(team),
                game: GameId(game),
                sequence: game,
                date: None,
                stats,
                ingest_index: idx,
            },
            rolling: defined.then_some(rolling),
        }
    }

    #[test]
    fn test_pairs_first_seen_as_side_a() {
        let rows = vec![
            rolling_row(10, 1, 100.0, 0, true),
            rolling_row(20, 1, 95.0, 1, true),
        ];

        let pairs = PairAssembler::new().assemble(&rows).unwrap();

        assert_eq!(pairs.len(), 1);
        let pair = &pairs[0];
        assert_eq!(pair.game, GameId(1));
        assert_eq!(pair.side(Side::A).team, TeamId(10));
        assert_eq!(pair.side(Side::B).team, TeamId(20));
        assert_eq!(pair.label, 1);
        assert_eq!(pair.winner(), TeamId(10));
        assert_eq!(pair.side(Side::A).raw[Stat::Points], 100.0);
        assert_eq!(pair.side(Side::A).rolling[Stat::Points], 99.0);
    }

    #[test]
    fn test_side_order_uses_ingest_index_not_slice_order() {
        let rows = vec![
            rolling_row(20, 1, 95.0, 5, true),
            rolling_row(10, 1, 100.0, 2, true),
        ];

        let pairs = PairAssembler::new().assemble(&rows).unwrap();
        assert_eq!(pairs[0].side(Side::A).team, TeamId(10));
        assert_eq!(pairs[0].label, 1);
    }

    #[test]
    fn test_drops_games_without_two_defined_sides() {
        let rows = vec![
            rolling_row(10, 1, 100.0, 0, true),
            rolling_row(20, 1, 95.0, 1, false),
            rolling_row(30, 2, 80.0, 2, true),
            rolling_row(10, 3, 90.0, 3, true),
            rolling_row(30, 3, 99.0, 4, true),
        ];

        let (pairs, summary) = PairAssembler::new().assemble_with_summary(&rows).unwrap();

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].game, GameId(3));
        assert_eq!(pairs[0].label, 0);
        assert_eq!(summary.games_seen, 3);
        assert_eq!(summary.dropped, 2);
    }

    #[test]
    fn test_extra_sides_are_ignored() {
        let rows = vec![
            rolling_row(10, 1, 100.0, 0, true),
            rolling_row(20, 1, 95.0, 1, true),
            rolling_row(30, 1, 120.0, 2, true),
        ];

        let (pairs, summary) = PairAssembler::new().assemble_with_summary(&rows).unwrap();

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].side(Side::B).team, TeamId(20));
        assert_eq!(summary.oversized, 1);
    }

    #[test]
    fn test_tie_aborts_assembly() {
        let rows = vec![
            rolling_row(10, 7, 100.0, 0, true),
            rolling_row(20, 7, 100.0, 1, true),
        ];

        let err = PairAssembler::new().assemble(&rows).unwrap_err();
        assert!(matches!(err, HoopsError::TiedOutcome { game: GameId(7), .. }));
    }

    #[test]
    fn test_games_emitted_in_first_seen_order() {
        let rows = vec![
            rolling_row(1, 9, 90.0, 0, true),
            rolling_row(3, 4, 70.0, 1, true),
            rolling_row(2, 9, 80.0, 2, true),
            rolling_row(4, 4, 75.0, 3, true),
        ];

        let pairs = PairAssembler::new().assemble(&rows).unwrap();
        let games: Vec<GameId> = pairs.iter().map(|p| p.game).collect();
        assert_eq!(games, vec![GameId(9), GameId(4)]);
    }
}
