//! SQLite storage for team game logs

use crate::data::source::{GameLogSource, LiveGame};
use crate::{GameId, HoopsError, Result, Stat, StatLine, StatRecord, Team, TeamId};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQL column holding each stat (`to` is a reserved word)
fn sql_column(stat: Stat) -> &'static str {
    match stat {
        Stat::Points => "pts",
        Stat::Rebounds => "reb",
        Stat::Assists => "ast",
        Stat::FieldGoalsMade => "fgm",
        Stat::FieldGoalsAttempted => "fga",
        Stat::FieldGoalPct => "fg_pct",
        Stat::ThreesMade => "fg3m",
        Stat::Steals => "stl",
        Stat::Blocks => "blk",
        Stat::Turnovers => "tov",
    }
}

fn stat_columns() -> String {
    Stat::ALL
        .iter()
        .map(|s| sql_column(*s))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A stored game-log row before NULL handling
struct StoredGame {
    team: TeamId,
    game: LiveGame,
}

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                abbreviation TEXT
            );

            CREATE TABLE IF NOT EXISTS game_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                team_id INTEGER NOT NULL,
                game_id INTEGER NOT NULL,
                sequence INTEGER NOT NULL,
                game_date TEXT,
                pts REAL,
                reb REAL,
                ast REAL,
                fgm REAL,
                fga REAL,
                fg_pct REAL,
                fg3m REAL,
                stl REAL,
                blk REAL,
                tov REAL,
                UNIQUE(team_id, game_id)
            );

            CREATE INDEX IF NOT EXISTS idx_game_logs_team_seq ON game_logs(team_id, sequence);
            "#,
        )?;
        Ok(())
    }

    // ==================== Team Operations ====================

    /// Insert or rename a team
    pub fn upsert_team(&self, team: &Team) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO teams (id, name, abbreviation) VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                abbreviation = COALESCE(excluded.abbreviation, abbreviation)
            "#,
            params![team.id.0, team.name, team.abbreviation],
        )?;
        Ok(())
    }

    /// Find a team by name or abbreviation (case-insensitive)
    pub fn find_team_by_name(&self, name: &str) -> Result<Option<Team>> {
        let team = self
            .conn
            .query_row(
                "SELECT id, name, abbreviation FROM teams
                 WHERE LOWER(name) = LOWER(?1) OR LOWER(abbreviation) = LOWER(?1)
                 ORDER BY id LIMIT 1",
                params![name.trim()],
                Self::row_to_team,
            )
            .optional()?;
        Ok(team)
    }

    /// Get team by ID
    pub fn get_team(&self, id: TeamId) -> Result<Option<Team>> {
        let team = self
            .conn
            .query_row(
                "SELECT id, name, abbreviation FROM teams WHERE id = ?1",
                params![id.0],
                Self::row_to_team,
            )
            .optional()?;
        Ok(team)
    }

    /// Get all teams
    pub fn get_all_teams(&self) -> Result<Vec<Team>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, abbreviation FROM teams ORDER BY name")?;
        let teams = stmt
            .query_map([], Self::row_to_team)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(teams)
    }

    /// Resolve a numeric team id, a name, or an abbreviation
    pub fn resolve_team(&self, query: &str) -> Result<Team> {
        if let Ok(raw_id) = query.trim().parse::<i64>() {
            let id = TeamId(raw_id);
            return Ok(self.get_team(id)?.unwrap_or(Team {
                id,
                name: id.to_string(),
                abbreviation: None,
            }));
        }
        self.find_team_by_name(query)?
            .ok_or_else(|| HoopsError::UnknownTeam(query.to_string()))
    }

    fn row_to_team(row: &rusqlite::Row) -> rusqlite::Result<Team> {
        Ok(Team {
            id: TeamId(row.get(0)?),
            name: row.get(1)?,
            abbreviation: row.get(2)?,
        })
    }

    // ==================== Game Log Operations ====================

    /// Insert or update one box score
    pub fn upsert_record(&self, record: &StatRecord) -> Result<()> {
        let stats = record.stats.0.map(Some);
        self.upsert_row(record.team, record.game, record.sequence, record.date, &stats)
    }

    fn upsert_row(
        &self,
        team: TeamId,
        game: GameId,
        sequence: i64,
        date: Option<NaiveDate>,
        stats: &[Option<f64>; Stat::COUNT],
    ) -> Result<()> {
        let date_str = date.map(|d| d.format("%Y-%m-%d").to_string());
        self.conn.execute(
            r#"
            INSERT INTO game_logs (team_id, game_id, sequence, game_date,
                                   pts, reb, ast, fgm, fga, fg_pct, fg3m, stl, blk, tov)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(team_id, game_id) DO UPDATE SET
                sequence = excluded.sequence,
                game_date = COALESCE(excluded.game_date, game_date),
                pts = excluded.pts,
                reb = excluded.reb,
                ast = excluded.ast,
                fgm = excluded.fgm,
                fga = excluded.fga,
                fg_pct = excluded.fg_pct,
                fg3m = excluded.fg3m,
                stl = excluded.stl,
                blk = excluded.blk,
                tov = excluded.tov
            "#,
            params![
                team.0, game.0, sequence, date_str, stats[0], stats[1], stats[2], stats[3],
                stats[4], stats[5], stats[6], stats[7], stats[8], stats[9],
            ],
        )?;
        Ok(())
    }

    /// Insert multiple box scores in one transaction
    pub fn upsert_records(&self, records: &[StatRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        for record in records {
            self.upsert_record(record)?;
            count += 1;
        }
        tx.commit()?;
        Ok(count)
    }

    /// All stored box scores in insertion order
    ///
    /// Every stat must be present: a NULL is reported as an invalid value
    /// rather than being zero-filled.
    pub fn get_all_records(&self) -> Result<Vec<StatRecord>> {
        let stored = self.query_games(
            &format!(
                "SELECT id, team_id, game_id, sequence, game_date, {} FROM game_logs ORDER BY id",
                stat_columns()
            ),
            &[],
        )?;

        stored
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                let mut stats = StatLine::zeros();
                for stat in Stat::ALL {
                    stats[stat] = row.game.stat(stat).ok_or_else(|| HoopsError::MissingStat {
                        team: row.team,
                        game: row.game.game,
                        column: stat.column().to_string(),
                    })?;
                }
                Ok(StatRecord {
                    team: row.team,
                    game: row.game.game,
                    sequence: row.game.sequence,
                    date: row.game.date,
                    stats,
                    ingest_index: idx,
                })
            })
            .collect()
    }

    /// Most recent games for a team, newest first
    pub fn get_recent_team_games(&self, team: TeamId, limit: usize) -> Result<Vec<LiveGame>> {
        let stored = self.query_games(
            &format!(
                "SELECT id, team_id, game_id, sequence, game_date, {} FROM game_logs
                 WHERE team_id = ?1
                 ORDER BY sequence DESC, id DESC
                 LIMIT ?2",
                stat_columns()
            ),
            &[&team.0, &(limit as i64)],
        )?;
        Ok(stored.into_iter().map(|row| row.game).collect())
    }

    fn query_games(&self, query: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<StoredGame>> {
        let mut stmt = self.conn.prepare(query)?;
        let rows = stmt
            .query_map(args, Self::row_to_game)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn row_to_game(row: &rusqlite::Row) -> rusqlite::Result<StoredGame> {
        let date_str: Option<String> = row.get(4)?;
        let date = date_str.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok());

        let mut stats = [None; Stat::COUNT];
        for (i, slot) in stats.iter_mut().enumerate() {
            *slot = row.get(5 + i)?;
        }

        Ok(StoredGame {
            team: TeamId(row.get(1)?),
            game: LiveGame {
                game: GameId(row.get(2)?),
                sequence: row.get(3)?,
                date,
                stats,
            },
        })
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let team_count: i64 = self
            .conn
            .query_row("SELECT COUNT(DISTINCT team_id) FROM game_logs", [], |row| row.get(0))?;

        let record_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM game_logs", [], |row| row.get(0))?;

        let game_count: i64 = self
            .conn
            .query_row("SELECT COUNT(DISTINCT game_id) FROM game_logs", [], |row| row.get(0))?;

        let min_date: Option<String> = self
            .conn
            .query_row("SELECT MIN(game_date) FROM game_logs", [], |row| row.get(0))
            .optional()?
            .flatten();

        let max_date: Option<String> = self
            .conn
            .query_row("SELECT MAX(game_date) FROM game_logs", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            team_count: team_count as usize,
            record_count: record_count as usize,
            game_count: game_count as usize,
            earliest_game: min_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            latest_game: max_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        })
    }
}

impl GameLogSource for Database {
    fn recent_games(&self, team: TeamId, limit: usize) -> Result<Vec<LiveGame>> {
        self.get_recent_team_games(team, limit)
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub team_count: usize,
    pub record_count: usize,
    pub game_count: usize,
    pub earliest_game: Option<NaiveDate>,
    pub latest_game: Option<NaiveDate>,
}
