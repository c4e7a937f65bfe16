//! Rating network
//!
//! Embedding + dense regression network predicting a user's rating for a
//! book. One embedding table per categorical input (width from
//! `book_features::embedding_dim`), flattened and concatenated with the
//! numeric vector, then Dense 128 → 64 → 32 (ReLU, dropout after the first
//! two) → 1.
//!
//! The trainer fits it on the autodiff backend; the service loads the saved
//! artifact on the plain ndarray backend.

pub mod artifact;
pub mod network;

pub use artifact::{load_artifact, save_artifact, CONFIG_FILE, WEIGHTS_FILE};
pub use network::{batch_tensors, predict, RatingNetwork, RatingNetworkConfig};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model artifact error: {0}")]
    Artifact(String),

    #[error("Model inference failed: {0}")]
    Inference(String),

    #[error("Code {code} is outside embedding {input} (size {size})")]
    CodeOutOfRange {
        input: &'static str,
        code: i64,
        size: usize,
    },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
