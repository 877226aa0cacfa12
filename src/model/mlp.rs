//! MLP win classifier
//!
//! Architecture: Input(20) → [Linear → ReLU → Dropout] × hidden_dims.len()
//!                        → win_head(1)

use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn::tensor::activation::{relu, sigmoid};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::HoopsError;

/// Configuration for the classifier network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinClassifierConfig {
    /// Feature row width
    pub input_dim: usize,
    /// Hidden layer widths, e.g. `[32]` or `[64, 32]`
    pub hidden_dims: Vec<usize>,
    pub dropout: f64,
}

impl WinClassifierConfig {
    pub fn new(input_dim: usize, hidden_dims: Vec<usize>, dropout: f64) -> Self {
        WinClassifierConfig {
            input_dim,
            hidden_dims,
            dropout,
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> WinClassifier<B> {
        WinClassifier::new(device, self)
    }
}

/// A single hidden layer block: Linear → ReLU → Dropout
#[derive(Module, Debug)]
pub struct HiddenBlock<B: Backend> {
    linear: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> HiddenBlock<B> {
    pub fn new(device: &B::Device, in_dim: usize, out_dim: usize, dropout: f64) -> Self {
        HiddenBlock {
            linear: LinearConfig::new(in_dim, out_dim).init(device),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.linear.forward(x);
        let x = relu(x);
        self.dropout.forward(x)
    }
}

/// Binary classifier: logit for "side A wins"
#[derive(Module, Debug)]
pub struct WinClassifier<B: Backend> {
    hidden: Vec<HiddenBlock<B>>,
    win_head: Linear<B>,
}

impl<B: Backend> WinClassifier<B> {
    pub fn new(device: &B::Device, config: &WinClassifierConfig) -> Self {
        let mut hidden = Vec::with_capacity(config.hidden_dims.len());
        let mut in_dim = config.input_dim;
        for &out_dim in &config.hidden_dims {
            hidden.push(HiddenBlock::new(device, in_dim, out_dim, config.dropout));
            in_dim = out_dim;
        }

        WinClassifier {
            hidden,
            win_head: LinearConfig::new(in_dim, 1).init(device),
        }
    }

    /// Win logits `[batch, 1]` for normalized feature rows `[batch, input_dim]`
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self
            .hidden
            .iter()
            .fold(features, |x, block| block.forward(x));
        self.win_head.forward(x)
    }

    /// P(side A wins) per row, `[batch]`
    pub fn win_probability(&self, features: Tensor<B, 2>) -> Tensor<B, 1> {
        sigmoid(self.forward(features)).flatten(0, 1)
    }

    /// Save weights; the recorder appends `.mpk`
    pub fn save(&self, path: &Path) -> crate::Result<()>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(self.clone().into_record(), path.to_path_buf())
            .map_err(|e| HoopsError::Model(format!("saving weights: {}", e)))
    }

    pub fn load(device: &B::Device, path: &Path, config: &WinClassifierConfig) -> crate::Result<Self>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(path.to_path_buf(), device)
            .map_err(|e| HoopsError::Model(format!("loading weights: {}", e)))?;

        Ok(Self::new(device, config).load_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_output_shapes() {
        let device = Default::default();
        let config = WinClassifierConfig::new(20, vec![32, 16], 0.1);
        let model = config.init::<TestBackend>(&device);

        let features = Tensor::random(
            [4, 20],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );

        assert_eq!(model.forward(features.clone()).dims(), [4, 1]);

        let probs = model.win_probability(features);
        assert_eq!(probs.dims(), [4]);
        for p in probs.into_data().to_vec::<f32>().unwrap() {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_no_hidden_layers_is_logistic_regression() {
        let device = Default::default();
        let model = WinClassifierConfig::new(3, vec![], 0.0).init::<TestBackend>(&device);
        let features = Tensor::<TestBackend, 2>::zeros([2, 3], &device);
        assert_eq!(model.forward(features).dims(), [2, 1]);
    }

    #[test]
    fn test_save_and_load_weights() {
        let device = Default::default();
        let config = WinClassifierConfig::new(4, vec![8], 0.0);
        let model = config.init::<TestBackend>(&device);

        let dir = std::env::temp_dir().join(format!("hoops-mlp-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("weights");
        model.save(&path).unwrap();
        assert!(dir.join("weights.mpk").exists());

        let loaded = WinClassifier::<TestBackend>::load(&device, &path, &config).unwrap();
        let features = Tensor::<TestBackend, 2>::ones([1, 4], &device);
        let before = model.forward(features.clone()).into_data().to_vec::<f32>().unwrap();
        let after = loaded.forward(features).into_data().to_vec::<f32>().unwrap();
        assert_eq!(before, after);

        std::fs::remove_dir_all(&dir).ok();
    }
}
