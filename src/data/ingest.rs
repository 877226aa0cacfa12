//! Box-score CSV ingestion
//!
//! Reads per-team (or per-player) box scores into an in-memory game log.

use crate::{DataConfig, GameId, HoopsError, Result, Stat, StatLine, StatRecord, Team, TeamId};
use chrono::NaiveDate;
use csv::StringRecord;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

pub const TEAM_ID_COLUMN: &str = "TEAM_ID";
pub const GAME_ID_COLUMN: &str = "GAME_ID";
pub const GAME_DATE_COLUMN: &str = "GAME_DATE";
pub const TEAM_NAME_COLUMN: &str = "TEAM_NAME";
pub const TEAM_ABBREVIATION_COLUMN: &str = "TEAM_ABBREVIATION";

/// How to interpret an input file
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Rows are per player and must be summed into team totals
    pub player_rows: bool,
    /// Column holding the per-team chronological ordering key
    pub order_column: String,
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestOptions {
            player_rows: false,
            order_column: GAME_ID_COLUMN.to_string(),
        }
    }
}

impl From<&DataConfig> for IngestOptions {
    fn from(config: &DataConfig) -> Self {
        IngestOptions {
            player_rows: config.player_rows,
            order_column: config.order_column.clone(),
        }
    }
}

/// Column positions resolved from the header row
struct ColumnMap {
    team: usize,
    game: usize,
    order: usize,
    date: Option<usize>,
    name: Option<usize>,
    abbreviation: Option<usize>,
    stats: [usize; Stat::COUNT],
}

impl ColumnMap {
    fn resolve(headers: &StringRecord, options: &IngestOptions) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| HoopsError::MissingColumn {
                column: name.to_string(),
            })
        };

        let mut stats = [0usize; Stat::COUNT];
        for stat in Stat::ALL {
            stats[stat.index()] = headers
                .iter()
                .position(|h| Stat::from_column(h) == Some(stat))
                .ok_or_else(|| HoopsError::MissingColumn {
                    column: stat.column().to_string(),
                })?;
        }

        Ok(ColumnMap {
            team: require(TEAM_ID_COLUMN)?,
            game: require(GAME_ID_COLUMN)?,
            order: require(options.order_column.as_str())?,
            date: find(GAME_DATE_COLUMN),
            name: find(TEAM_NAME_COLUMN),
            abbreviation: find(TEAM_ABBREVIATION_COLUMN),
            stats,
        })
    }
}

/// Immutable, ingestion-ordered box scores
#[derive(Debug, Clone, Default)]
pub struct GameLog {
    records: Vec<StatRecord>,
    /// Names seen in optional TEAM_NAME / TEAM_ABBREVIATION columns
    team_info: Vec<Team>,
}

impl GameLog {
    /// Build from records already in ingestion order
    pub fn from_records(records: Vec<StatRecord>) -> Self {
        let records = records
            .into_iter()
            .enumerate()
            .map(|(idx, record)| StatRecord {
                ingest_index: idx,
                ..record
            })
            .collect();
        GameLog {
            records,
            team_info: Vec::new(),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P, options: &IngestOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            HoopsError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        log::info!("Reading box scores from {}", path.display());
        Self::from_reader(file, options)
    }

    pub fn from_reader<R: Read>(reader: R, options: &IngestOptions) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let columns = ColumnMap::resolve(&headers, options)?;

        let mut rows = Vec::new();
        let mut team_info: Vec<Team> = Vec::new();
        for result in reader.records() {
            let row = result?;
            let record = parse_row(&row, &columns, options)?;
            if let Some(team) = team_of(&row, &columns, record.team) {
                if !team_info.iter().any(|t| t.id == team.id) {
                    team_info.push(team);
                }
            }
            rows.push(record);
        }

        let mut log = if options.player_rows {
            let player_count = rows.len();
            let log = Self::from_records(rollup_player_rows(rows));
            log::info!(
                "Rolled {} player rows into {} team box scores",
                player_count,
                log.len()
            );
            log
        } else {
            Self::from_records(rows)
        };

        log.team_info = team_info;

        log::info!("Loaded {} box scores for {} teams", log.len(), log.teams().len());
        Ok(log)
    }

    pub fn records(&self) -> &[StatRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<StatRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Team names and abbreviations found in the file, if any
    pub fn team_info(&self) -> &[Team] {
        &self.team_info
    }

    /// Distinct teams in ascending id order
    pub fn teams(&self) -> Vec<TeamId> {
        let mut teams: Vec<TeamId> = self.records.iter().map(|r| r.team).collect();
        teams.sort();
        teams.dedup();
        teams
    }
}

fn line_of(row: &StringRecord) -> u64 {
    row.position().map(|p| p.line()).unwrap_or(0)
}

fn cell<'a>(row: &'a StringRecord, idx: usize) -> &'a str {
    row.get(idx).unwrap_or("")
}

fn parse_int(row: &StringRecord, idx: usize, column: &str) -> Result<i64> {
    let raw = cell(row, idx);
    raw.parse::<i64>()
        .or_else(|_| {
            // Some exports write ids as floats ("1610612737.0")
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.fract() == 0.0)
                .map(|v| v as i64)
                .ok_or(())
        })
        .map_err(|_| HoopsError::InvalidValue {
            line: line_of(row),
            column: column.to_string(),
            value: raw.to_string(),
        })
}

fn team_of(row: &StringRecord, columns: &ColumnMap, id: TeamId) -> Option<Team> {
    let non_empty = |idx: Option<usize>| {
        idx.map(|i| cell(row, i))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let abbreviation = non_empty(columns.abbreviation);
    let name = non_empty(columns.name).or_else(|| abbreviation.clone())?;
    Some(Team {
        id,
        name,
        abbreviation,
    })
}

fn parse_row(row: &StringRecord, columns: &ColumnMap, options: &IngestOptions) -> Result<StatRecord> {
    let team = TeamId(parse_int(row, columns.team, TEAM_ID_COLUMN)?);
    let game = GameId(parse_int(row, columns.game, GAME_ID_COLUMN)?);
    let sequence = parse_int(row, columns.order, &options.order_column)?;

    let date = match columns.date.map(|idx| cell(row, idx)) {
        Some(raw) if !raw.is_empty() => {
            let day = raw.get(..10).unwrap_or(raw);
            let parsed = NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| {
                HoopsError::InvalidValue {
                    line: line_of(row),
                    column: GAME_DATE_COLUMN.to_string(),
                    value: raw.to_string(),
                }
            })?;
            Some(parsed)
        }
        _ => None,
    };

    let mut stats = StatLine::zeros();
    for stat in Stat::ALL {
        let raw = cell(row, columns.stats[stat.index()]);
        let value = if raw.is_empty() && options.player_rows {
            // Players who did not play have blank box-score cells
            0.0
        } else {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| HoopsError::InvalidValue {
                    line: line_of(row),
                    column: stat.column().to_string(),
                    value: raw.to_string(),
                })?
        };
        stats[stat] = value;
    }

    Ok(StatRecord {
        team,
        game,
        sequence,
        date,
        stats,
        ingest_index: 0,
    })
}

/// Sum player rows into one row per (team, game), in first-seen order
pub fn rollup_player_rows(rows: Vec<StatRecord>) -> Vec<StatRecord> {
    let mut totals: Vec<StatRecord> = Vec::new();
    let mut index: HashMap<(TeamId, GameId), usize> = HashMap::new();

    for row in rows {
        match index.get(&(row.team, row.game)) {
            Some(&pos) => {
                let total = &mut totals[pos];
                for stat in Stat::ALL.into_iter().filter(Stat::is_counting) {
                    total.stats[stat] += row.stats[stat];
                }
            }
            None => {
                index.insert((row.team, row.game), totals.len());
                totals.push(row);
            }
        }
    }

    for total in &mut totals {
        let attempts = total.stats[Stat::FieldGoalsAttempted];
        total.stats[Stat::FieldGoalPct] = if attempts > 0.0 {
            total.stats[Stat::FieldGoalsMade] / attempts
        } else {
            0.0
        };
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEAM_CSV: &str = "\
GAME_DATE,GAME_ID,TEAM_ID,TEAM_ABBREVIATION,PTS,REB,AST,FGM,FGA,FG_PCT,FG3M,STL,BLK,TO
2023-10-24,22300001,1610612743,DEN,119,58,29,48,91,0.527,14,8,3,12
2023-10-24,22300001,1610612747,LAL,107,44,23,41,90,0.456,10,5,4,12
2023-10-26,22300015,1610612743,DEN,108,47,27,42,88,0.477,9,6,5,10
";

    #[test]
    fn test_reads_team_rows() {
        let log = GameLog::from_reader(TEAM_CSV.as_bytes(), &IngestOptions::default()).unwrap();

        assert_eq!(log.len(), 3);
        let first = &log.records()[0];
        assert_eq!(first.team, TeamId(1610612743));
        assert_eq!(first.game, GameId(22300001));
        assert_eq!(first.sequence, 22300001);
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2023, 10, 24));
        assert_eq!(first.stats[Stat::Points], 119.0);
        assert_eq!(first.stats[Stat::FieldGoalPct], 0.527);
        assert_eq!(first.stats[Stat::Turnovers], 12.0);
        assert_eq!(log.records()[2].ingest_index, 2);
        assert_eq!(log.teams().len(), 2);

        let info = log.team_info();
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].name, "DEN");
        assert_eq!(info[1].abbreviation.as_deref(), Some("LAL"));
    }

    #[test]
    fn test_accepts_tov_spelling_and_extra_columns() {
        let csv = "\
TEAM_ID,GAME_ID,NICKNAME,PTS,REB,AST,FGM,FGA,FG_PCT,FG3M,STL,BLK,TOV,PLUS_MINUS
1,10,x,100,40,20,40,80,0.5,10,5,5,11,4
";
        let log = GameLog::from_reader(csv.as_bytes(), &IngestOptions::default()).unwrap();
        assert_eq!(log.records()[0].stats[Stat::Turnovers], 11.0);
        assert_eq!(log.records()[0].date, None);
    }

    #[test]
    fn test_missing_stat_column_is_fatal() {
        let csv = "TEAM_ID,GAME_ID,PTS,REB,AST,FGM,FGA,FG_PCT,FG3M,STL,TO\n1,10,100,40,20,40,80,0.5,10,5,11\n";
        let err = GameLog::from_reader(csv.as_bytes(), &IngestOptions::default()).unwrap_err();
        match err {
            HoopsError::MissingColumn { column } => assert_eq!(column, "BLK"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_order_column_is_fatal() {
        let options = IngestOptions {
            order_column: "SEASON_GAME_NO".to_string(),
            ..Default::default()
        };
        let err = GameLog::from_reader(TEAM_CSV.as_bytes(), &options).unwrap_err();
        assert!(matches!(err, HoopsError::MissingColumn { column } if column == "SEASON_GAME_NO"));
    }

    #[test]
    fn test_blank_cell_in_team_rows_is_rejected() {
        let csv = "TEAM_ID,GAME_ID,PTS,REB,AST,FGM,FGA,FG_PCT,FG3M,STL,BLK,TO\n1,10,100,,20,40,80,0.5,10,5,5,11\n";
        let err = GameLog::from_reader(csv.as_bytes(), &IngestOptions::default()).unwrap_err();
        match err {
            HoopsError::InvalidValue { line, column, .. } => {
                assert_eq!(line, 2);
                assert_eq!(column, "REB");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_player_rows_roll_up_to_team_totals() {
        let csv = "\
GAME_ID,TEAM_ID,PLAYER_NAME,MIN,PTS,REB,AST,FGM,FGA,FG_PCT,FG3M,STL,BLK,TO
10,1,A,30:00,20,5,4,8,16,0.5,2,1,0,2
10,2,C,28:00,30,8,2,12,20,0.6,3,0,1,3
10,1,B,25:00,10,3,6,4,4,1.0,0,2,1,1
10,1,DNP,,,,,,,,,,,
";
        let options = IngestOptions {
            player_rows: true,
            ..Default::default()
        };
        let log = GameLog::from_reader(csv.as_bytes(), &options).unwrap();

        assert_eq!(log.len(), 2);
        let team1 = &log.records()[0];
        assert_eq!(team1.team, TeamId(1));
        assert_eq!(team1.stats[Stat::Points], 30.0);
        assert_eq!(team1.stats[Stat::FieldGoalsMade], 12.0);
        assert_eq!(team1.stats[Stat::FieldGoalsAttempted], 20.0);
        assert_eq!(team1.stats[Stat::FieldGoalPct], 0.6);
        assert_eq!(team1.ingest_index, 0);
        assert_eq!(log.records()[1].team, TeamId(2));
    }
}
