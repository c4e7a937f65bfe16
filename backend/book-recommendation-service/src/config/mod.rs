use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Service configuration, read from the environment (and `.env`).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_app_env")]
    pub app_env: String,
    #[serde(default = "default_app_host")]
    pub app_host: String,
    #[serde(default = "default_app_port")]
    pub app_port: u16,

    /// Encoded rating rows; the book table is derived from it.
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,
    #[serde(default = "default_encoders_path")]
    pub encoders_path: PathBuf,
    /// ONNX file or native artifact directory.
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    #[serde(default)]
    pub model_format: ModelFormat,

    #[serde(default = "default_scoring_batch_size")]
    pub scoring_batch_size: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_related_k")]
    pub related_k: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    #[default]
    Auto,
    Onnx,
    Native,
}

impl ModelFormat {
    /// `auto` resolves to native for a directory and ONNX for anything else.
    pub fn resolve(self, model_path: &Path) -> ModelFormat {
        match self {
            ModelFormat::Auto if model_path.is_dir() => ModelFormat::Native,
            ModelFormat::Auto => ModelFormat::Onnx,
            explicit => explicit,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenv::dotenv().ok();
        envy::from_env()
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(pairs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app_host, self.app_port)
    }
}

fn default_app_env() -> String {
    "development".to_string()
}

fn default_app_host() -> String {
    "0.0.0.0".to_string()
}

fn default_app_port() -> u16 {
    5000
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("model/data.csv")
}

fn default_encoders_path() -> PathBuf {
    PathBuf::from("model/encoders.json")
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model/t_book_recommender.onnx")
}

fn default_scoring_batch_size() -> usize {
    128
}

fn default_top_k() -> usize {
    5
}

fn default_related_k() -> usize {
    5
}
