//! Live matchup predictions
//!
//! Fetches each team's most recent games, averages them, and feeds the
//! averages through the same [`FeatureSchema`] the classifier was trained on.

use serde::Serialize;

use crate::data::source::{GameLogSource, LiveGame};
use crate::features::{FeatureSchema, FeatureVector, Side};
use crate::model::{ClassProbabilities, Classifier};
use crate::{GameId, HoopsError, Result, Stat, StatLine, TeamId};

/// A team's recent form as fed to the classifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamForm {
    pub team: TeamId,
    /// Games averaged; less than the window when history is short
    pub games_used: usize,
    pub averages: StatLine,
    /// Stats that were absent in at least one game and counted as 0
    pub zero_filled: Vec<Stat>,
    pub latest_game: Option<GameId>,
}

/// Predicted outcome of one matchup
#[derive(Debug, Clone, Serialize)]
pub struct MatchupPrediction {
    /// Side A: the home (first-named) team
    pub form_a: TeamForm,
    /// Side B: the visiting (second-named) team
    pub form_b: TeamForm,
    pub probabilities: ClassProbabilities,
    pub predicted_side: Side,
    pub winner: TeamId,
    pub confidence_pct: f32,
}

impl MatchupPrediction {
    pub fn team_a(&self) -> TeamId {
        self.form_a.team
    }

    pub fn team_b(&self) -> TeamId {
        self.form_b.team
    }

    /// Win probability for side A
    pub fn probability_a(&self) -> f32 {
        self.probabilities.probability(Side::A.label())
    }
}

/// Builds feature rows from a live source and scores them
pub struct InferenceAdapter<'a, S: GameLogSource, C: Classifier> {
    source: &'a S,
    classifier: &'a C,
    schema: FeatureSchema,
}

impl<'a, S: GameLogSource, C: Classifier> InferenceAdapter<'a, S, C> {
    /// Fails if `schema` differs from the one the classifier was trained on
    pub fn new(source: &'a S, classifier: &'a C, schema: FeatureSchema) -> Result<Self> {
        schema.ensure_matches(&classifier.schema().fingerprint())?;
        Ok(InferenceAdapter {
            source,
            classifier,
            schema,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Mean of the team's last `window` games, absent stats counted as 0
    pub fn team_form(&self, team: TeamId) -> Result<TeamForm> {
        let window = self.schema.window;
        let mut games: Vec<LiveGame> = self
            .source
            .recent_games(team, window)
            .map_err(|e| match e {
                HoopsError::ExternalSource { .. } => e,
                other => HoopsError::ExternalSource {
                    team,
                    message: other.to_string(),
                },
            })?;

        if games.is_empty() {
            return Err(HoopsError::ExternalSource {
                team,
                message: "no recent games available".to_string(),
            });
        }
        games.truncate(window);
        // Source order is newest first
        games.reverse();

        if games.len() < window {
            log::warn!(
                "{} has only {} of {} games; averaging what is available",
                team,
                games.len(),
                window
            );
        }

        let mut zero_filled: Vec<Stat> = games.iter().flat_map(LiveGame::missing_stats).collect();
        zero_filled.sort_by_key(Stat::index);
        zero_filled.dedup();
        if !zero_filled.is_empty() {
            log::debug!("{} is missing {:?} in some games; counted as 0", team, zero_filled);
        }

        let lines: Vec<StatLine> = games.iter().map(LiveGame::zero_filled).collect();
        let averages = StatLine::mean_of(&lines).unwrap_or_default();

        Ok(TeamForm {
            team,
            games_used: games.len(),
            averages,
            zero_filled,
            latest_game: games.last().map(|g| g.game),
        })
    }

    /// Feature row with `team_a` on side A and `team_b` on side B
    pub fn feature_vector(&self, team_a: TeamId, team_b: TeamId) -> Result<(FeatureVector, TeamForm, TeamForm)> {
        let form_a = self.team_form(team_a)?;
        let form_b = self.team_form(team_b)?;
        let row = self.schema.vector(&form_a.averages, &form_b.averages);
        Ok((row, form_a, form_b))
    }

    /// Predict the winner of `team_a` (home) against `team_b` (visitor)
    pub fn predict(&self, team_a: TeamId, team_b: TeamId) -> Result<MatchupPrediction> {
        let (row, form_a, form_b) = self.feature_vector(team_a, team_b)?;

        let probabilities = self
            .classifier
            .predict_proba(std::slice::from_ref(&row))?
            .into_iter()
            .next()
            .ok_or_else(|| HoopsError::Model("classifier returned no probabilities".to_string()))?;

        let predicted_side = probabilities.predicted_side();
        let winner = match predicted_side {
            Side::A => form_a.team,
            Side::B => form_b.team,
        };

        Ok(MatchupPrediction {
            form_a,
            form_b,
            probabilities,
            predicted_side,
            winner,
            confidence_pct: probabilities.confidence_pct(),
        })
    }
}

/// Format a prediction for display
pub fn format_prediction(pred: &MatchupPrediction, name_a: &str, name_b: &str) -> String {
    let winner = match pred.predicted_side {
        Side::A => name_a,
        Side::B => name_b,
    };

    format!(
        r#"
┌─────────────────────────────────────────────────┐
│  {} vs {}
├─────────────────────────────────────────────────┤
│  Predicted winner: {}
│  Confidence:       {:.1}%
│  Form ({} games):  {} {:.1} pts / {} {:.1} pts
└─────────────────────────────────────────────────┘
"#,
        name_a,
        name_b,
        winner,
        pred.confidence_pct,
        pred.form_a.games_used.min(pred.form_b.games_used),
        name_a,
        pred.form_a.averages[Stat::Points],
        name_b,
        pred.form_b.averages[Stat::Points],
    )
}
