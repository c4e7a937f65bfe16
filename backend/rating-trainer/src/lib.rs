//! Offline training for the book rating network
//!
//! - **split**: seeded 80/10/10 train/validation/test split
//! - **trainer**: Adam/MSE mini-batch loop with early stopping
//! - **metrics**: MSE, RMSE, MAE and R²
//! - **pipeline**: `prepare` and `train` commands

pub mod early_stopping;
pub mod metrics;
pub mod pipeline;
pub mod split;
pub mod trainer;

pub use metrics::RegressionMetrics;
pub use pipeline::{prepare, train, TrainingReport, TrainingRun, METRICS_FILE};
pub use split::{split, DatasetSplit};
pub use trainer::{fit, FitOutcome, TrainingOptions};
