//! Training metrics and evaluation

use std::fmt;

/// Loss and accuracy for one pass over a split
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    /// Mean binary cross-entropy
    pub loss: f64,
    pub correct: usize,
    pub total: usize,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score win probabilities against 0/1 targets
    ///
    /// A probability of exactly 0.5 counts as predicting label 0, matching
    /// `ClassProbabilities::predicted_label`.
    pub fn from_predictions(loss: f32, probs: &[f32], targets: &[f32]) -> Self {
        let correct = probs
            .iter()
            .zip(targets.iter())
            .filter(|(p, t)| (**p > 0.5) == (**t >= 0.5))
            .count();
        Metrics {
            loss: loss as f64,
            correct,
            total: probs.len(),
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loss: {:.4} | Acc: {:.2}% ({}/{})",
            self.loss,
            self.accuracy() * 100.0,
            self.correct,
            self.total
        )
    }
}

/// Training history for tracking progress
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    pub train_losses: Vec<f64>,
    pub val_losses: Vec<f64>,
    pub train_accuracies: Vec<f64>,
    pub val_accuracies: Vec<f64>,
    pub best_val_loss: f64,
    pub best_epoch: usize,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self {
            best_val_loss: f64::INFINITY,
            ..Default::default()
        }
    }

    /// Record metrics for an epoch; without a held-out split the training
    /// loss stands in for validation
    pub fn record_epoch(&mut self, epoch: usize, train: &Metrics, val: Option<&Metrics>) {
        let val = val.unwrap_or(train);
        self.train_losses.push(train.loss);
        self.val_losses.push(val.loss);
        self.train_accuracies.push(train.accuracy());
        self.val_accuracies.push(val.accuracy());

        if val.loss < self.best_val_loss {
            self.best_val_loss = val.loss;
            self.best_epoch = epoch;
        }
    }

    pub fn epochs(&self) -> usize {
        self.val_losses.len()
    }

    /// True once `patience` epochs have passed without improvement; 0 disables
    pub fn should_early_stop(&self, patience: usize) -> bool {
        if patience == 0 || self.val_losses.len() < patience {
            return false;
        }
        let current_epoch = self.val_losses.len() - 1;
        current_epoch - self.best_epoch >= patience
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_treats_half_as_label_zero() {
        let m = Metrics::from_predictions(0.5, &[0.9, 0.5, 0.2, 0.6], &[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(m.correct, 3);
        assert_eq!(m.total, 4);
        assert_eq!(m.accuracy(), 0.75);
    }

    #[test]
    fn test_early_stopping() {
        let mut history = TrainingHistory::new();
        let losses = [0.7, 0.6, 0.65, 0.66, 0.67];
        for (epoch, loss) in losses.iter().enumerate() {
            let m = Metrics {
                loss: *loss,
                ..Default::default()
            };
            history.record_epoch(epoch, &m, None);
        }

        assert_eq!(history.best_epoch, 1);
        assert_eq!(history.best_val_loss, 0.6);
        assert!(history.should_early_stop(3));
        assert!(!history.should_early_stop(4));
        assert!(!history.should_early_stop(0));
    }
}
