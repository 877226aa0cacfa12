//! Win classifier network and its on-disk artifact

pub mod artifact;
pub mod classifier;
pub mod mlp;

pub use artifact::{ModelMetadata, TrainedModel};
pub use classifier::{ClassProbabilities, Classifier};
pub use mlp::{WinClassifier, WinClassifierConfig};
