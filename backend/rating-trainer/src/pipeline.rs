/// End-to-end trainer commands: dataset preparation and training.
use crate::metrics::RegressionMetrics;
use crate::split::split;
use crate::trainer::{evaluate, fit, EpochReport, LabeledRows, TrainingOptions};
use anyhow::{bail, Context, Result};
use book_features::{
    dataset::{encode_records, fit_encoders},
    AgeScaler, Dataset, EncoderStore, RawRatingRecord,
};
use rating_model::{save_artifact, RatingNetworkConfig};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const METRICS_FILE: &str = "metrics.json";

/// Fit encoders on a raw CSV, then write the encoded dataset and the encoder
/// bundle the service loads.
pub fn prepare(raw: &Path, dataset: &Path, encoders: &Path) -> Result<Dataset> {
    let records = RawRatingRecord::read_csv(raw)
        .with_context(|| format!("failed to read raw ratings from {}", raw.display()))?;
    let store = fit_encoders(&records, AgeScaler::default());
    let encoded = encode_records(&records, &store)?;

    create_parent(dataset)?;
    create_parent(encoders)?;
    encoded.write_csv(dataset)?;
    store.save(encoders)?;

    info!(
        rows = encoded.len(),
        dataset = %dataset.display(),
        encoders = %encoders.display(),
        "Prepared training data"
    );
    Ok(encoded)
}

#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub dataset: PathBuf,
    pub encoders: Option<PathBuf>,
    pub output: PathBuf,
    pub options: TrainingOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub rows: usize,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub test_rows: usize,
    pub best_epoch: usize,
    pub epochs_run: usize,
    pub stopped_early: bool,
    pub options: TrainingOptions,
    pub validation: RegressionMetrics,
    pub test: RegressionMetrics,
    pub history: Vec<EpochReport>,
}

pub fn train(run: &TrainingRun) -> Result<TrainingReport> {
    let dataset = Dataset::from_path(&run.dataset)
        .with_context(|| format!("failed to load dataset {}", run.dataset.display()))?;
    let store = match &run.encoders {
        Some(path) => Some(
            EncoderStore::load(path)
                .with_context(|| format!("failed to load encoders {}", path.display()))?,
        ),
        None => None,
    };

    let config = RatingNetworkConfig::from_dataset(&dataset, store.as_ref());
    let parts = split(dataset.records(), run.options.seed);
    if parts.validation.is_empty() || parts.test.is_empty() {
        bail!(
            "dataset has {} rows, too few to hold out validation and test splits",
            dataset.len()
        );
    }

    let train_rows = LabeledRows::from_records(&parts.train)?;
    let validation_rows = LabeledRows::from_records(&parts.validation)?;
    let test_rows = LabeledRows::from_records(&parts.test)?;

    let outcome = fit(&config, &run.options, &train_rows, &validation_rows)?;
    let validation = evaluate(&outcome.network, &validation_rows, run.options.batch_size)?;
    let test = evaluate(&outcome.network, &test_rows, run.options.batch_size)?;

    info!(
        r2 = validation.r2,
        mse = validation.mse,
        mae = validation.mae,
        "Validation metrics"
    );
    info!(rmse = test.rmse, mae = test.mae, r2 = test.r2, "Test metrics");

    save_artifact(&outcome.network, &config, &run.output)?;

    let report = TrainingReport {
        rows: dataset.len(),
        train_rows: train_rows.len(),
        validation_rows: validation_rows.len(),
        test_rows: test_rows.len(),
        best_epoch: outcome.best_epoch,
        epochs_run: outcome.history.len(),
        stopped_early: outcome.stopped_early,
        options: run.options.clone(),
        validation,
        test,
        history: outcome.history,
    };
    let metrics_path = run.output.join(METRICS_FILE);
    fs::write(&metrics_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("failed to write {}", metrics_path.display()))?;

    Ok(report)
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use book_features::CategoricalField;
    use rating_model::{load_artifact, CONFIG_FILE};
    use std::fmt::Write as _;

    fn raw_csv() -> String {
        let mut csv = String::from(
            "title,author,category,preferred_topics,country,gender,is_new_muslim,born_muslim,\
             education_level,religious_level,age,average_rating,user_rating_count,rating\n",
        );
        for i in 0..30 {
            writeln!(
                csv,
                "Book {b},Author {a},Cat {c},Topic {t},Country {k},{g},No,Yes,Level {e},{r},{age},{avg},{cnt},{rating}",
                b = i % 7,
                a = i % 7 % 3,
                c = i % 7 % 2,
                t = i % 4,
                k = i % 3,
                g = if i % 2 == 0 { "Male" } else { "Female" },
                e = i % 3,
                r = i % 5,
                age = 20 + i,
                avg = 3.0 + (i % 7) as f32 * 0.25,
                cnt = 10 + i % 7,
                rating = 1 + i % 5,
            )
            .unwrap();
        }
        csv
    }

    #[test]
    fn test_prepare_then_train() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw.csv");
        fs::write(&raw, raw_csv()).unwrap();

        let dataset_path = dir.path().join("model/data.csv");
        let encoders_path = dir.path().join("model/encoders.json");
        let prepared = prepare(&raw, &dataset_path, &encoders_path).unwrap();
        assert_eq!(prepared.len(), 30);
        assert_eq!(prepared.vocab_size(CategoricalField::BookIdx), 7);

        let run = TrainingRun {
            dataset: dataset_path,
            encoders: Some(encoders_path),
            output: dir.path().join("model/native"),
            options: TrainingOptions {
                epochs: 2,
                batch_size: 8,
                ..TrainingOptions::default()
            },
        };
        let report = train(&run).unwrap();

        assert_eq!(report.rows, 30);
        assert_eq!(report.test_rows, 3);
        assert_eq!(report.validation_rows, 3);
        assert_eq!(report.train_rows, 24);
        assert!(report.test.rmse.is_finite());

        assert!(run.output.join(CONFIG_FILE).exists());
        assert!(run.output.join(METRICS_FILE).exists());
        let (config, _) = load_artifact::<burn::backend::NdArray>(&run.output, &Default::default()).unwrap();
        assert_eq!(config.input_sizes[CategoricalField::BookIdx.position()], 7);
    }

    #[test]
    fn test_train_rejects_tiny_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw.csv");
        let csv: String = raw_csv().lines().take(2).map(|l| format!("{}\n", l)).collect();
        fs::write(&raw, csv).unwrap();

        let dataset_path = dir.path().join("data.csv");
        prepare(&raw, &dataset_path, &dir.path().join("encoders.json")).unwrap();

        let run = TrainingRun {
            dataset: dataset_path,
            encoders: None,
            output: dir.path().join("native"),
            options: TrainingOptions::default(),
        };
        assert!(train(&run).is_err());
    }
}
