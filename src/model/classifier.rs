//! Classifier abstraction used by inference

use crate::features::{FeatureSchema, FeatureVector, Side};
use crate::Result;
use serde::Serialize;

/// Class probabilities indexed by label: `[P(label 0), P(label 1)]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassProbabilities(pub [f32; 2]);

impl ClassProbabilities {
    /// Build from P(side A wins)
    pub fn from_win_probability(p_a: f32) -> Self {
        let p_a = p_a.clamp(0.0, 1.0);
        ClassProbabilities([1.0 - p_a, p_a])
    }

    pub fn probability(&self, label: u8) -> f32 {
        self.0[usize::from(label == 1)]
    }

    /// Argmax label; an exact tie goes to label 0
    pub fn predicted_label(&self) -> u8 {
        if self.0[1] > self.0[0] {
            1
        } else {
            0
        }
    }

    pub fn predicted_side(&self) -> Side {
        Side::from_label(self.predicted_label())
    }

    /// Probability of the predicted label as a percentage
    pub fn confidence_pct(&self) -> f32 {
        self.probability(self.predicted_label()) * 100.0
    }
}

/// Anything that scores feature rows laid out by a schema
pub trait Classifier {
    /// Schema the classifier was trained on
    fn schema(&self) -> &FeatureSchema;

    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<ClassProbabilities>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_and_confidence() {
        let probs = ClassProbabilities([0.3, 0.7]);
        assert_eq!(probs.predicted_label(), 1);
        assert_eq!(probs.predicted_side(), Side::A);
        assert!((probs.confidence_pct() - 70.0).abs() < 1e-4);

        let probs = ClassProbabilities::from_win_probability(0.25);
        assert_eq!(probs.predicted_label(), 0);
        assert!((probs.confidence_pct() - 75.0).abs() < 1e-4);
    }

    #[test]
    fn test_tie_resolves_to_label_zero() {
        let probs = ClassProbabilities([0.5, 0.5]);
        assert_eq!(probs.predicted_label(), 0);
        assert_eq!(probs.predicted_side(), Side::B);
        assert_eq!(probs.confidence_pct(), 50.0);
    }
}
