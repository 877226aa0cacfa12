//! Prediction and inference
//!
//! Turn live game logs into feature rows and score them with a trained model.

pub mod inference;

pub use inference::{format_prediction, InferenceAdapter, MatchupPrediction, TeamForm};
pub use crate::model::{ClassProbabilities, Classifier};
