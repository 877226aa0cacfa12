//! Trained model on disk: weights plus JSON metadata
//!
//! A model saved at `model/hoops_model` is written as `model/hoops_model.mpk`
//! (burn record) and `model/hoops_model.json` ([`ModelMetadata`]).

use crate::data::dataset::FeatureNormalization;
use crate::features::{FeatureSchema, FeatureVector};
use crate::model::classifier::{ClassProbabilities, Classifier};
use crate::model::mlp::{WinClassifier, WinClassifierConfig};
use crate::{HoopsError, Result};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything needed to rebuild and validate a trained classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub fingerprint: String,
    pub schema: FeatureSchema,
    pub feature_names: Vec<String>,
    pub normalization: FeatureNormalization,
    pub network: WinClassifierConfig,
    pub train_samples: usize,
    pub test_samples: usize,
    pub test_accuracy: Option<f64>,
    pub trained_at: DateTime<Utc>,
}

impl ModelMetadata {
    pub fn new(
        schema: FeatureSchema,
        normalization: FeatureNormalization,
        network: WinClassifierConfig,
    ) -> Self {
        ModelMetadata {
            fingerprint: schema.fingerprint(),
            feature_names: schema.names(),
            schema,
            normalization,
            network,
            train_samples: 0,
            test_samples: 0,
            test_accuracy: None,
            trained_at: Utc::now(),
        }
    }

    pub fn path_for(base: &Path) -> PathBuf {
        PathBuf::from(format!("{}.json", base.display()))
    }

    pub fn save(&self, base: &Path) -> Result<()> {
        let path = Self::path_for(base);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn load(base: &Path) -> Result<Self> {
        let path = Self::path_for(base);
        if !path.exists() {
            return Err(HoopsError::NoModel);
        }
        let file = std::fs::File::open(&path)?;
        let metadata: ModelMetadata = serde_json::from_reader(file)?;

        // A hand-edited file must still describe a consistent schema
        metadata.schema.ensure_matches(&metadata.fingerprint)?;
        Ok(metadata)
    }
}

/// A classifier network bundled with its schema and normalization
#[derive(Debug)]
pub struct TrainedModel<B: Backend> {
    network: WinClassifier<B>,
    metadata: ModelMetadata,
    device: B::Device,
}

impl<B: Backend> TrainedModel<B>
where
    B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
    B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
{
    pub fn new(network: WinClassifier<B>, metadata: ModelMetadata, device: B::Device) -> Self {
        TrainedModel {
            network,
            metadata,
            device,
        }
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn network(&self) -> &WinClassifier<B> {
        &self.network
    }

    pub fn save(&self, base: &Path) -> Result<()> {
        if let Some(parent) = base.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.network.save(base)?;
        self.metadata.save(base)?;
        log::info!("Saved model to {}", base.display());
        Ok(())
    }

    /// Load a model and check it was trained on `expected`
    pub fn load(base: &Path, expected: &FeatureSchema, device: &B::Device) -> Result<Self> {
        let metadata = ModelMetadata::load(base)?;
        expected.ensure_matches(&metadata.fingerprint)?;

        let network = WinClassifier::load(device, base, &metadata.network)?;
        log::debug!("Loaded model {} ({})", base.display(), metadata.fingerprint);

        Ok(TrainedModel {
            network,
            metadata,
            device: device.clone(),
        })
    }

    fn row_width_check(&self, row: &FeatureVector) -> Result<()> {
        let expected = self.metadata.schema.len();
        if row.len() != expected {
            return Err(HoopsError::SchemaMismatch {
                expected: format!("{} ({} features)", self.metadata.fingerprint, expected),
                found: format!("row with {} features", row.len()),
            });
        }
        Ok(())
    }
}

impl<B: Backend> Classifier for TrainedModel<B>
where
    B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
    B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
{
    fn schema(&self) -> &FeatureSchema {
        &self.metadata.schema
    }

    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<ClassProbabilities>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let width = self.metadata.schema.len();
        let mut data = Vec::with_capacity(rows.len() * width);
        for row in rows {
            self.row_width_check(row)?;
            data.extend(self.metadata.normalization.normalize_row(row.as_slice()));
        }

        let features =
            Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([rows.len(), width]);
        let probs = self
            .network
            .win_probability(features)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| HoopsError::Model(format!("reading probabilities: {:?}", e)))?;

        Ok(probs
            .into_iter()
            .map(ClassProbabilities::from_win_probability)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::WindowPolicy;
    use crate::StatLine;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn temp_base(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hoops-artifact-{}-{}", name, std::process::id()));
        dir.join("model")
    }

    fn model(schema: &FeatureSchema) -> TrainedModel<TestBackend> {
        let device = Default::default();
        let network_config = WinClassifierConfig::new(schema.len(), vec![4], 0.0);
        let normalization = FeatureNormalization {
            mean: vec![0.0; schema.len()],
            std: vec![1.0; schema.len()],
        };
        let metadata = ModelMetadata::new(schema.clone(), normalization, network_config.clone());
        TrainedModel::new(network_config.init(&device), metadata, device)
    }

    #[test]
    fn test_round_trip_through_disk() {
        let schema = FeatureSchema::new(10, WindowPolicy::IncludeCurrent).unwrap();
        let trained = model(&schema);
        let base = temp_base("round-trip");
        trained.save(&base).unwrap();

        let device = Default::default();
        let loaded = TrainedModel::<TestBackend>::load(&base, &schema, &device).unwrap();
        assert_eq!(loaded.metadata(), trained.metadata());

        let row = schema.vector(&StatLine::zeros(), &StatLine::zeros());
        let a = trained.predict_proba(&[row.clone()]).unwrap();
        let b = loaded.predict_proba(&[row]).unwrap();
        assert_eq!(a, b);

        std::fs::remove_dir_all(base.parent().unwrap()).ok();
    }

    #[test]
    fn test_load_with_different_window_is_schema_mismatch() {
        let schema = FeatureSchema::new(10, WindowPolicy::IncludeCurrent).unwrap();
        let base = temp_base("mismatch");
        model(&schema).save(&base).unwrap();

        let other = FeatureSchema::new(5, WindowPolicy::IncludeCurrent).unwrap();
        let device = Default::default();
        let err = TrainedModel::<TestBackend>::load(&base, &other, &device).unwrap_err();
        assert!(matches!(err, HoopsError::SchemaMismatch { .. }));

        let prior_only = FeatureSchema::new(10, WindowPolicy::PriorOnly).unwrap();
        let err = TrainedModel::<TestBackend>::load(&base, &prior_only, &device).unwrap_err();
        assert!(matches!(err, HoopsError::SchemaMismatch { .. }));

        std::fs::remove_dir_all(base.parent().unwrap()).ok();
    }

    #[test]
    fn test_missing_model_is_no_model() {
        let schema = FeatureSchema::new(10, WindowPolicy::IncludeCurrent).unwrap();
        let device = Default::default();
        let err = TrainedModel::<TestBackend>::load(&temp_base("absent"), &schema, &device)
            .unwrap_err();
        assert!(matches!(err, HoopsError::NoModel));
    }

    #[test]
    fn test_rejects_rows_of_wrong_width() {
        let schema = FeatureSchema::new(10, WindowPolicy::IncludeCurrent).unwrap();
        let narrow = FeatureSchema {
            stats: schema.stats[..3].to_vec(),
            ..schema.clone()
        };
        let row = narrow.vector(&StatLine::zeros(), &StatLine::zeros());

        let err = model(&schema).predict_proba(&[row]).unwrap_err();
        assert!(matches!(err, HoopsError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let schema = FeatureSchema::new(10, WindowPolicy::IncludeCurrent).unwrap();
        let row = schema.vector(&StatLine::zeros(), &StatLine::zeros());
        let probs = model(&schema).predict_proba(&[row.clone(), row]).unwrap();
        assert_eq!(probs.len(), 2);
        for p in probs {
            assert!((p.0[0] + p.0[1] - 1.0).abs() < 1e-6);
        }
    }
}
