use thiserror::Error;

/// Failures of the classification pipeline.
///
/// `ModelLoad` only happens while the service starts; the other variants are
/// per-prediction and never fatal.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not load model: {0}")]
    ModelLoad(String),

    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Could not preprocess image: {0}")]
    Preprocess(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

impl Error {
    /// Whether the failure was caused by the uploaded data rather than the model.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Decode(_) | Error::Preprocess(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
