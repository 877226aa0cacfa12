//! Burn Dataset implementation for paired matchup rows
//!
//! Turns paired, labelled games into training samples and tensors.

use crate::features::{build_pairs, FeatureSchema, PairedMatchRecord};
use crate::{GameId, HoopsError, Result, StatRecord, TeamId};
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// A single training sample
#[derive(Debug, Clone, PartialEq)]
pub struct MatchupSample {
    pub game: GameId,
    pub team_a: TeamId,
    pub team_b: TeamId,
    /// Feature row in schema order
    pub features: Vec<f32>,
    /// 1.0 if side A won
    pub label: f32,
}

impl MatchupSample {
    pub fn from_pair(pair: &PairedMatchRecord, schema: &FeatureSchema) -> Self {
        MatchupSample {
            game: pair.game,
            team_a: pair.sides[0].team,
            team_b: pair.sides[1].team,
            features: pair.features(schema).into_values(),
            label: pair.label as f32,
        }
    }
}

/// Dataset of paired matchups
#[derive(Debug, Clone, Default)]
pub struct MatchupDataset {
    samples: Vec<MatchupSample>,
}

impl MatchupDataset {
    pub fn from_samples(samples: Vec<MatchupSample>) -> Self {
        MatchupDataset { samples }
    }

    pub fn from_pairs(pairs: &[PairedMatchRecord], schema: &FeatureSchema) -> Self {
        let samples = pairs
            .iter()
            .map(|pair| MatchupSample::from_pair(pair, schema))
            .collect();
        MatchupDataset { samples }
    }

    /// Run rolling aggregation and pairing over raw box scores
    pub fn from_records(records: &[StatRecord], schema: &FeatureSchema) -> Result<Self> {
        let (pairs, _) = build_pairs(records, schema)?;
        Ok(Self::from_pairs(&pairs, schema))
    }

    pub fn samples(&self) -> &[MatchupSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Share of samples where side A won
    pub fn positive_rate(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let wins = self.samples.iter().filter(|s| s.label >= 0.5).count();
        wins as f64 / self.samples.len() as f64
    }

    /// Seeded shuffle, then split into (train, test)
    ///
    /// The test share is rounded down but kept non-empty whenever there are at
    /// least two samples and `test_ratio > 0`.
    pub fn split(self, test_ratio: f32, seed: u64) -> (Self, Self) {
        let mut samples = self.samples;
        let n = samples.len();

        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        samples.shuffle(&mut rng);

        let mut n_test = (n as f32 * test_ratio) as usize;
        if test_ratio > 0.0 && n >= 2 {
            n_test = n_test.clamp(1, n - 1);
        }
        let test_samples = samples.split_off(n - n_test);

        log::info!(
            "Split {} samples: train={}, test={}",
            n,
            samples.len(),
            test_samples.len()
        );

        (
            MatchupDataset { samples },
            MatchupDataset {
                samples: test_samples,
            },
        )
    }
}

impl Dataset<MatchupSample> for MatchupDataset {
    fn get(&self, index: usize) -> Option<MatchupSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Z-score parameters for feature rows, fitted on the training split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureNormalization {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl FeatureNormalization {
    /// Floor for the standard deviation of constant columns
    pub const MIN_STD: f32 = 0.001;

    pub fn fit(dataset: &MatchupDataset) -> Result<Self> {
        let first = dataset
            .samples
            .first()
            .ok_or_else(|| HoopsError::EmptyDataset("no samples to fit normalization".into()))?;
        let dim = first.features.len();

        let mut sum = vec![0.0f64; dim];
        let mut sum_sq = vec![0.0f64; dim];
        for sample in &dataset.samples {
            for (j, v) in sample.features.iter().enumerate() {
                sum[j] += *v as f64;
                sum_sq[j] += (*v as f64) * (*v as f64);
            }
        }

        let n = dataset.len() as f64;
        let mean: Vec<f64> = sum.iter().map(|s| s / n).collect();
        let std = sum_sq
            .iter()
            .zip(mean.iter())
            .map(|(sq, m)| ((sq / n - m * m).max(0.0).sqrt() as f32).max(Self::MIN_STD))
            .collect();

        Ok(FeatureNormalization {
            mean: mean.into_iter().map(|m| m as f32).collect(),
            std,
        })
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Normalize a `[batch, features]` tensor: (x - mean) / std
    pub fn normalize<B: Backend>(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = features.device();
        let mean = Tensor::<B, 1>::from_floats(self.mean.as_slice(), &device).unsqueeze_dim(0);
        let std = Tensor::<B, 1>::from_floats(self.std.as_slice(), &device).unsqueeze_dim(0);
        (features - mean) / std
    }

    pub fn normalize_row(&self, row: &[f32]) -> Vec<f32> {
        row.iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }
}

/// Batch of matchup samples
#[derive(Debug, Clone)]
pub struct MatchupBatch<B: Backend> {
    /// Raw feature rows: [batch, features]
    pub features: Tensor<B, 2>,
    /// Side A win labels: [batch]
    pub labels: Tensor<B, 1>,
}

/// Builds tensors from samples
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchupBatcher;

impl<B: Backend> Batcher<B, MatchupSample, MatchupBatch<B>> for MatchupBatcher {
    fn batch(&self, items: Vec<MatchupSample>, device: &B::Device) -> MatchupBatch<B> {
        let batch_size = items.len();
        let feature_dim = items.first().map(|s| s.features.len()).unwrap_or(0);

        let mut feature_data = Vec::with_capacity(batch_size * feature_dim);
        let mut label_data = Vec::with_capacity(batch_size);
        for sample in &items {
            feature_data.extend_from_slice(&sample.features);
            label_data.push(sample.label);
        }

        let features = Tensor::<B, 1>::from_floats(feature_data.as_slice(), device)
            .reshape([batch_size, feature_dim]);
        let labels = Tensor::<B, 1>::from_floats(label_data.as_slice(), device);

        MatchupBatch { features, labels }
    }
}
