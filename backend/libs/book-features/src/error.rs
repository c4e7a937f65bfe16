use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeatureError>;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Unknown category {value:?} for field {field}")]
    UnknownCategory { field: String, value: String },

    #[error("Code {code} is outside the vocabulary of field {field}")]
    UnknownCode { field: String, code: i64 },

    #[error("Unknown book index: {0}")]
    UnknownBook(i64),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
