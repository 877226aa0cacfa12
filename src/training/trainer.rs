//! Full-batch SGD training for the win classifier

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer, SgdConfig};
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};

use crate::data::dataset::{
    FeatureNormalization, MatchupBatch, MatchupBatcher, MatchupDataset, MatchupSample,
};
use crate::features::FeatureSchema;
use crate::model::{ModelMetadata, TrainedModel, WinClassifier, WinClassifierConfig};
use crate::training::metrics::{Metrics, TrainingHistory};
use crate::{HoopsError, Result, TrainingConfig};

/// Outcome of a training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub history: TrainingHistory,
    pub train_samples: usize,
    pub test_samples: usize,
    /// Held-out metrics of the returned model, if a test split exists
    pub test_metrics: Option<Metrics>,
}

/// Normalized full-batch tensors for one split
struct SplitTensors<B: Backend> {
    features: Tensor<B, 2>,
    /// [batch, 1]
    labels: Tensor<B, 2>,
}

impl<B: Backend> SplitTensors<B> {
    fn new(dataset: &MatchupDataset, norm: &FeatureNormalization, device: &B::Device) -> Self {
        let items: Vec<MatchupSample> = dataset.iter().collect();
        let batch: MatchupBatch<B> = MatchupBatcher.batch(items, device);
        SplitTensors {
            features: norm.normalize(batch.features),
            labels: batch.labels.unsqueeze_dim(1),
        }
    }
}

/// Binary cross-entropy on probabilities, clamped away from 0 and 1
fn binary_cross_entropy<B: Backend>(probs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let eps = 1e-7;
    let probs_clamped = probs.clamp(eps, 1.0 - eps);
    let loss = targets.clone().neg() * probs_clamped.clone().log()
        - (targets.neg() + 1.0) * (probs_clamped.neg() + 1.0).log();
    loss.mean()
}

fn tensor_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| HoopsError::Model(format!("reading tensor: {:?}", e)))
}

fn score<B: Backend>(probs: Tensor<B, 2>, split: &SplitTensors<B>) -> Result<Metrics> {
    let loss: f32 = binary_cross_entropy(probs.clone(), split.labels.clone())
        .into_scalar()
        .elem();
    let probs = tensor_values(probs)?;
    let targets = tensor_values(split.labels.clone())?;
    Ok(Metrics::from_predictions(loss, &probs, &targets))
}

/// Evaluate a model without gradient tracking
fn evaluate<B: Backend>(model: &WinClassifier<B>, split: &SplitTensors<B>) -> Result<Metrics> {
    let probs = sigmoid(model.forward(split.features.clone()));
    score(probs, split)
}

/// Trains a [`WinClassifier`] on paired matchup rows
pub struct ClassifierTrainer<B: AutodiffBackend> {
    config: TrainingConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> ClassifierTrainer<B>
where
    B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
    B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
{
    pub fn new(config: TrainingConfig, device: B::Device) -> Self {
        ClassifierTrainer { config, device }
    }

    /// Split, fit normalization on the training part, train, and evaluate
    ///
    /// Returns the model from the epoch with the lowest held-out loss.
    pub fn train(
        &self,
        dataset: MatchupDataset,
        schema: &FeatureSchema,
    ) -> Result<(TrainedModel<B::InnerBackend>, TrainingReport)> {
        if dataset.is_empty() {
            return Err(HoopsError::EmptyDataset(
                "no paired games; is the window longer than every team's history?".into(),
            ));
        }
        if let Some(sample) = dataset.samples().first() {
            if sample.features.len() != schema.len() {
                return Err(HoopsError::SchemaMismatch {
                    expected: schema.fingerprint(),
                    found: format!("samples with {} features", sample.features.len()),
                });
            }
        }
        log::info!(
            "Training on {} paired games ({:.1}% side A wins)",
            dataset.len(),
            dataset.positive_rate() * 100.0
        );

        let (train_set, test_set) = dataset.split(self.config.test_ratio, self.config.seed);
        if train_set.is_empty() {
            return Err(HoopsError::EmptyDataset("training split is empty".into()));
        }

        // Fit on the training split only
        let norm = FeatureNormalization::fit(&train_set)?;
        log::debug!("Feature normalization: mean={:?}, std={:?}", norm.mean, norm.std);

        let network_config = WinClassifierConfig::new(
            schema.len(),
            self.config.hidden_dims.clone(),
            self.config.dropout,
        );
        B::seed(self.config.seed);
        let mut model: WinClassifier<B> = network_config.init(&self.device);
        let mut optimizer = SgdConfig::new().init::<B, WinClassifier<B>>();

        let train = SplitTensors::<B>::new(&train_set, &norm, &self.device);
        let test = (!test_set.is_empty())
            .then(|| SplitTensors::<B::InnerBackend>::new(&test_set, &norm, &self.device));

        let epochs = self.config.epochs;
        let mut history = TrainingHistory::new();
        let mut best_model = model.clone();

        log::info!("Starting training for {} epochs", epochs);

        for epoch in 0..epochs {
            let probs = sigmoid(model.forward(train.features.clone()));
            let loss = binary_cross_entropy(probs.clone(), train.labels.clone());
            let train_metrics = score(probs, &train)?;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(self.config.learning_rate, model, grads);

            let val_metrics = match &test {
                Some(split) => Some(evaluate(&model.valid(), split)?),
                None => None,
            };

            let previous_best = history.best_val_loss;
            history.record_epoch(epoch, &train_metrics, val_metrics.as_ref());
            if history.best_val_loss < previous_best {
                best_model = model.clone();
            }

            if epoch % 10 == 0 || epoch + 1 == epochs {
                match &val_metrics {
                    Some(val) => log::info!(
                        "Epoch {}/{}: Train: {} | Test: {}",
                        epoch + 1,
                        epochs,
                        train_metrics,
                        val
                    ),
                    None => log::info!("Epoch {}/{}: Train: {}", epoch + 1, epochs, train_metrics),
                }
            }

            if history.should_early_stop(self.config.early_stopping_patience) {
                log::info!(
                    "Early stopping at epoch {} (best was epoch {})",
                    epoch + 1,
                    history.best_epoch + 1
                );
                break;
            }
        }

        let network = best_model.valid();
        let test_metrics = match &test {
            Some(split) => Some(evaluate(&network, split)?),
            None => {
                log::warn!("No held-out games; accuracy is not reported");
                None
            }
        };
        if let Some(m) = &test_metrics {
            log::info!("Held-out accuracy: {:.2}% ({}/{})", m.accuracy() * 100.0, m.correct, m.total);
        }

        let mut metadata = ModelMetadata::new(schema.clone(), norm, network_config);
        metadata.train_samples = train_set.len();
        metadata.test_samples = test_set.len();
        metadata.test_accuracy = test_metrics.as_ref().map(Metrics::accuracy);

        let report = TrainingReport {
            history,
            train_samples: train_set.len(),
            test_samples: test_set.len(),
            test_metrics,
        };

        Ok((
            TrainedModel::new(network, metadata, self.device.clone()),
            report,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::WindowPolicy;
    use crate::model::Classifier;
    use crate::{GameId, Stat, StatLine, TeamId};
    use burn::backend::{Autodiff, NdArray};

    type TrainBackend = Autodiff<NdArray<f32>>;

    /// Side A wins exactly when it averages more points
    fn separable_dataset(schema: &FeatureSchema, n: usize) -> MatchupDataset {
        let samples = (0..n)
            .map(|i| {
                let a_better = i % 2 == 0;
                let spread = 2.0 + (i % 7) as f64;
                let mut a = StatLine::zeros();
                let mut b = StatLine::zeros();
                a[Stat::Points] = if a_better { 110.0 + spread } else { 100.0 - spread };
                b[Stat::Points] = 105.0;
                MatchupSample {
                    game: GameId(i as i64),
                    team_a: TeamId(1),
                    team_b: TeamId(2),
                    features: schema.vector(&a, &b).into_values(),
                    label: if a_better { 1.0 } else { 0.0 },
                }
            })
            .collect();
        MatchupDataset::from_samples(samples)
    }

    fn config(epochs: usize) -> TrainingConfig {
        TrainingConfig {
            epochs,
            learning_rate: 0.5,
            hidden_dims: vec![],
            dropout: 0.0,
            early_stopping_patience: 0,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_learns_separable_rows() {
        let schema = FeatureSchema::new(10, WindowPolicy::IncludeCurrent).unwrap();
        let dataset = separable_dataset(&schema, 40);
        let trainer = ClassifierTrainer::<TrainBackend>::new(config(200), Default::default());

        let (model, report) = trainer.train(dataset, &schema).unwrap();

        assert_eq!(report.train_samples, 32);
        assert_eq!(report.test_samples, 8);
        assert_eq!(report.history.epochs(), 200);
        let test = report.test_metrics.unwrap();
        assert!(test.accuracy() >= 0.99, "held-out accuracy {}", test);
        assert_eq!(model.metadata().fingerprint, schema.fingerprint());
        assert_eq!(model.metadata().test_accuracy, Some(test.accuracy()));

        let mut strong = StatLine::zeros();
        strong[Stat::Points] = 120.0;
        let mut weak = StatLine::zeros();
        weak[Stat::Points] = 105.0;
        let probs = model.predict_proba(&[schema.vector(&strong, &weak)]).unwrap();
        assert_eq!(probs[0].predicted_label(), 1);
    }

    #[test]
    fn test_empty_dataset_is_an_error() {
        let schema = FeatureSchema::new(10, WindowPolicy::IncludeCurrent).unwrap();
        let trainer = ClassifierTrainer::<TrainBackend>::new(config(5), Default::default());
        let err = trainer.train(MatchupDataset::default(), &schema).unwrap_err();
        assert!(matches!(err, HoopsError::EmptyDataset(_)));
    }
}
