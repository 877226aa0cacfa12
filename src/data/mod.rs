//! Data ingestion, storage and datasets

pub mod database;
pub mod dataset;
pub mod ingest;
pub mod source;

pub use database::{Database, DatabaseStats};
pub use dataset::{FeatureNormalization, MatchupBatch, MatchupBatcher, MatchupDataset, MatchupSample};
pub use ingest::{rollup_player_rows, GameLog, IngestOptions};
pub use source::{GameLogSource, LiveGame};
