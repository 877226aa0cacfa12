//! Basketball win prediction CLI
//!
//! Rolling box-score averages paired into matchups and scored by an MLP.

use clap::{Parser, Subcommand};
use hoops::{Config, Result};

#[derive(Parser)]
#[command(name = "hoops")]
#[command(about = "Basketball game outcome prediction from rolling box-score averages", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Export paired feature rows built from a box-score CSV
    Features {
        /// Input box-score CSV
        input: String,
        /// Output CSV path
        #[arg(short, long)]
        output: String,
        /// Input rows are per player
        #[arg(long)]
        player_rows: bool,
    },
    /// Train the win classifier
    Train {
        /// Box-score CSV (defaults to the imported game logs)
        input: Option<String>,
        /// Override number of epochs
        #[arg(long)]
        epochs: Option<usize>,
        /// Override learning rate
        #[arg(long)]
        lr: Option<f64>,
        /// Input rows are per player
        #[arg(long)]
        player_rows: bool,
    },
    /// Predict the winner of a matchup
    Predict {
        /// Home team (side A): id, name or abbreviation
        home: String,
        /// Visiting team (side B): id, name or abbreviation
        away: String,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Import box scores from a CSV file into the game-log database
    Import {
        /// Input box-score CSV
        input: String,
        /// Input rows are per player
        #[arg(long)]
        player_rows: bool,
    },
    /// List known teams
    Teams,
    /// Show database status
    Status,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show model information
    Info,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Import { input, player_rows } => {
                commands::data_import(&config, &input, player_rows)
            }
            DataCommands::Teams => commands::data_teams(&config),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Features {
            input,
            output,
            player_rows,
        } => commands::features(&config, &input, &output, player_rows),
        Commands::Train {
            input,
            epochs,
            lr,
            player_rows,
        } => commands::train(&config, input.as_deref(), epochs, lr, player_rows),
        Commands::Predict { home, away, format } => commands::predict(&config, &home, &away, format),
        Commands::Model { action } => match action {
            ModelCommands::Info => commands::model_info(&config),
        },
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use hoops::data::{Database, GameLog, IngestOptions, MatchupDataset};
    use hoops::features::{build_pairs, FeatureSchema, Side};
    use hoops::model::{ModelMetadata, TrainedModel};
    use hoops::predict::{format_prediction, InferenceAdapter};
    use hoops::training::ClassifierTrainer;
    use hoops::{HoopsError, StatRecord};
    use std::path::Path;

    type MyBackend = NdArray<f32>;
    type MyAutodiffBackend = Autodiff<MyBackend>;

    fn ingest_options(config: &Config, player_rows: bool) -> IngestOptions {
        let mut options = IngestOptions::from(&config.data);
        options.player_rows |= player_rows;
        options
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        // Create data directory
        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all("model")?;
        println!("Created data/ and model/ directories");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'hoops data import <box_scores.csv>' to load game logs");
        println!("  3. Run 'hoops train' to train the model");
        println!("  4. Run 'hoops predict \"Home\" \"Away\"' to make predictions");

        Ok(())
    }

    pub fn data_import(config: &Config, input: &str, player_rows: bool) -> Result<()> {
        let log = GameLog::from_path(input, &ingest_options(config, player_rows))?;
        let db = Database::open(&config.data.database_path)?;

        for team in log.team_info() {
            db.upsert_team(team)?;
        }
        let count = db.upsert_records(log.records())?;
        println!(
            "Stored {} box scores for {} teams in {}",
            count,
            log.teams().len(),
            config.data.database_path
        );

        Ok(())
    }

    pub fn data_teams(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let teams = db.get_all_teams()?;
        if teams.is_empty() {
            println!("No named teams. Import a CSV with TEAM_NAME or TEAM_ABBREVIATION columns.");
            return Ok(());
        }

        println!("{:<12} {:<6} Name", "ID", "Abbr");
        println!("───────────────────────────────────────────");
        for team in teams {
            println!(
                "{:<12} {:<6} {}",
                team.id.0,
                team.abbreviation.as_deref().unwrap_or("-"),
                team.name
            );
        }

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:        {}", config.data.database_path);
        println!("  Teams:       {}", stats.team_count);
        println!("  Games:       {}", stats.game_count);
        println!("  Box scores:  {}", stats.record_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_game, stats.latest_game) {
            println!("  Range:       {} to {}", earliest, latest);
        }

        Ok(())
    }

    /// Records from a CSV if given, otherwise everything imported so far
    fn load_records(config: &Config, input: Option<&str>, player_rows: bool) -> Result<Vec<StatRecord>> {
        match input {
            Some(path) => Ok(GameLog::from_path(path, &ingest_options(config, player_rows))?.into_records()),
            None => {
                let db = Database::open(&config.data.database_path)?;
                let records = db.get_all_records()?;
                if records.is_empty() {
                    return Err(HoopsError::EmptyDataset(
                        "no game logs in database. Run 'hoops data import <csv>' first.".to_string(),
                    ));
                }
                Ok(records)
            }
        }
    }

    pub fn features(config: &Config, input: &str, output: &str, player_rows: bool) -> Result<()> {
        let schema = FeatureSchema::from_config(&config.features)?;
        let records = load_records(config, Some(input), player_rows)?;
        let (pairs, summary) = build_pairs(&records, &schema)?;

        if let Some(parent) = Path::new(output).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = csv::Writer::from_path(output)?;

        let mut header = vec![
            "GAME_ID".to_string(),
            "TEAM_ID_A".to_string(),
            "TEAM_ID_B".to_string(),
        ];
        header.extend(schema.names());
        header.push("label".to_string());
        writer.write_record(&header)?;

        for pair in &pairs {
            let mut row = vec![
                pair.game.0.to_string(),
                pair.side(Side::A).team.0.to_string(),
                pair.side(Side::B).team.0.to_string(),
            ];
            row.extend(pair.features(&schema).as_slice().iter().map(|v| v.to_string()));
            row.push(pair.label.to_string());
            writer.write_record(&row)?;
        }
        writer.flush()?;

        println!(
            "Wrote {} paired games to {} ({} of {} games dropped for short history)",
            pairs.len(),
            output,
            summary.dropped,
            summary.games_seen
        );
        println!("Schema: {}", schema.fingerprint());

        Ok(())
    }

    pub fn train(
        config: &Config,
        input: Option<&str>,
        epochs: Option<usize>,
        lr: Option<f64>,
        player_rows: bool,
    ) -> Result<()> {
        let mut training_config = config.training.clone();
        if let Some(e) = epochs {
            training_config.epochs = e;
        }
        if let Some(lr) = lr {
            training_config.learning_rate = lr;
        }

        println!("Initializing training...");

        let schema = FeatureSchema::from_config(&config.features)?;
        let records = load_records(config, input, player_rows)?;
        let dataset = MatchupDataset::from_records(&records, &schema)?;
        println!("  Box scores:   {}", records.len());
        println!("  Paired games: {}", dataset.len());
        println!("  Schema:       {}", schema.fingerprint());

        let device = Default::default();
        let trainer = ClassifierTrainer::<MyAutodiffBackend>::new(training_config, device);
        let (model, report) = trainer.train(dataset, &schema)?;

        let model_path = Path::new(&config.data.model_path);
        model.save(model_path)?;

        println!("\nTraining complete!");
        println!("  Epochs run:   {}", report.history.epochs());
        println!("  Best epoch:   {}", report.history.best_epoch + 1);
        println!("  Train/test:   {}/{}", report.train_samples, report.test_samples);
        match &report.test_metrics {
            Some(m) => println!("  Test accuracy: {:.2}%", m.accuracy() * 100.0),
            None => println!("  Test accuracy: n/a (no held-out games)"),
        }
        println!("  Model saved to {}.mpk", config.data.model_path);

        Ok(())
    }

    pub fn predict(config: &Config, home: &str, away: &str, format: OutputFormat) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let home_team = db.resolve_team(home)?;
        let away_team = db.resolve_team(away)?;

        let schema = FeatureSchema::from_config(&config.features)?;
        let device = Default::default();
        let model = TrainedModel::<MyBackend>::load(Path::new(&config.data.model_path), &schema, &device)?;

        let adapter = InferenceAdapter::new(&db, &model, schema)?;
        let pred = adapter.predict(home_team.id, away_team.id)?;
        let winner = if pred.winner == home_team.id {
            &home_team.name
        } else {
            &away_team.name
        };

        match format {
            OutputFormat::Table => {
                println!("{}", format_prediction(&pred, &home_team.name, &away_team.name));
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "home": home_team.name,
                    "away": away_team.name,
                    "winner": winner,
                    "confidence_pct": pred.confidence_pct,
                    "home_win_prob": pred.probability_a(),
                    "home_form": pred.form_a,
                    "away_form": pred.form_b,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Csv => {
                let confidence = format!("{:.1}", pred.confidence_pct);
                let home_prob = format!("{:.4}", pred.probability_a());
                let mut writer = csv::Writer::from_writer(std::io::stdout());
                writer.write_record(["home", "away", "winner", "confidence_pct", "home_win_prob"])?;
                writer.write_record([
                    home_team.name.as_str(),
                    away_team.name.as_str(),
                    winner.as_str(),
                    confidence.as_str(),
                    home_prob.as_str(),
                ])?;
                writer.flush()?;
            }
        }

        Ok(())
    }

    pub fn model_info(config: &Config) -> Result<()> {
        let metadata = ModelMetadata::load(Path::new(&config.data.model_path))?;

        println!("Model Information");
        println!("───────────────────────────────");
        println!("  Path:           {}.mpk", config.data.model_path);
        println!("  Schema:         {}", metadata.fingerprint);
        println!("  Features:       {}", metadata.feature_names.len());
        println!("  Hidden layers:  {:?}", metadata.network.hidden_dims);
        println!("  Dropout:        {}", metadata.network.dropout);
        println!("  Train/test:     {}/{}", metadata.train_samples, metadata.test_samples);
        match metadata.test_accuracy {
            Some(acc) => println!("  Test accuracy:  {:.2}%", acc * 100.0),
            None => println!("  Test accuracy:  n/a"),
        }
        println!("  Trained at:     {}", metadata.trained_at.format("%Y-%m-%d %H:%M UTC"));

        let current = FeatureSchema::from_config(&config.features)?;
        if current.fingerprint() != metadata.fingerprint {
            println!("\n  Warning: config schema {} differs; predictions will fail", current.fingerprint());
        }

        Ok(())
    }
}
