//! Tomato leaf disease classification on top of a TensorFlow SavedModel.
//!
//! The pipeline is `bytes -> decode -> preprocess -> Classifier::infer -> Predictor`.
//! Front-ends (HTTP, CLI) load one [`TfClassifier`] at start-up, wrap it in a
//! [`Predictor`] and share that for the lifetime of the process.

mod classifier;
mod decode;
mod error;
pub mod labels;
mod manifest;
mod predict;
mod preprocess;
mod timer;

pub use classifier::{Classifier, Distribution, TfClassifier};
pub use decode::{decode, PixelArray};
pub use error::{Error, Result};
pub use manifest::{ModelManifest, MANIFEST_FILE};
pub use predict::{
    argmax, round_confidence, ErrorResponse, Prediction, PredictionResult, Predictor, RawUpload,
    StageTimings, PROCESSING_ERROR,
};
pub use preprocess::{preprocess, InputSpec, InputTensor, PixelRange};
pub use timer::Timer;
