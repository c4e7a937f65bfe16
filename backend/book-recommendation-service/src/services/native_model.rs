/// Native rating model written by `rating-trainer`, run on burn's ndarray
/// backend. Inference is serialised behind a mutex.
use super::scorer::RatingPredictor;
use crate::error::{AppError, Result};
use book_features::FeatureBatch;
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::NdArray;
use rating_model::{load_artifact, predict, RatingNetwork, RatingNetworkConfig};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub struct NativeRatingModel {
    network: Mutex<RatingNetwork<NdArray>>,
    config: RatingNetworkConfig,
    device: NdArrayDevice,
}

impl NativeRatingModel {
    pub fn load(dir: &Path) -> Result<Self> {
        let device = NdArrayDevice::default();
        let (config, network) = load_artifact::<NdArray>(dir, &device)
            .map_err(|e| AppError::ModelLoad(format!("{}: {}", dir.display(), e)))?;

        info!(path = %dir.display(), "Native rating model loaded");
        Ok(Self::from_network(config, network))
    }

    pub fn from_network(config: RatingNetworkConfig, network: RatingNetwork<NdArray>) -> Self {
        Self {
            network: Mutex::new(network),
            config,
            device: NdArrayDevice::default(),
        }
    }
}

impl RatingPredictor for NativeRatingModel {
    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<f32>> {
        self.config.check_batch(batch)?;

        let network = self
            .network
            .lock()
            .map_err(|_| AppError::Inference("native model lock poisoned".to_string()))?;
        Ok(predict(&network, batch, &self.device)?)
    }

    fn backend(&self) -> &'static str {
        "native"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use book_features::{Dataset, RatingRecord};
    use rating_model::{save_artifact, ModelError};

    fn dataset() -> Dataset {
        Dataset::new(
            (0..4)
                .map(|i| RatingRecord {
                    book_idx: i,
                    topic_idx: i % 2,
                    author_idx: i % 3,
                    country: 0,
                    gender: 1,
                    is_new_muslim: 0,
                    born_muslim: 1,
                    education_level: 0,
                    religious_level: 0,
                    category: i % 2,
                    age: 0.1,
                    average_rating: 4.0,
                    user_rating_count: 30.0,
                    rating: Some(4.0),
                })
                .collect(),
        )
    }

    #[test]
    fn test_load_and_predict() {
        let data = dataset();
        let config = RatingNetworkConfig::from_dataset(&data, None);
        let network = config.init::<NdArray>(&NdArrayDevice::default());
        let dir = tempfile::tempdir().unwrap();
        save_artifact(&network, &config, dir.path()).unwrap();

        let model = NativeRatingModel::load(dir.path()).unwrap();
        let batch = FeatureBatch::from_records(data.records());
        let scores = model.predict(&batch).unwrap();
        assert_eq!(scores.len(), 4);
        assert_eq!(model.backend(), "native");
    }

    #[test]
    fn test_out_of_range_code_is_rejected() {
        let data = dataset();
        let config = RatingNetworkConfig::from_dataset(&data, None);
        let network = config.init::<NdArray>(&NdArrayDevice::default());
        let model = NativeRatingModel::from_network(config, network);

        let mut records = data.into_records();
        records[0].book_idx = 40;
        let result = model.predict(&FeatureBatch::from_records(&records));
        assert!(matches!(
            result,
            Err(AppError::Model(ModelError::CodeOutOfRange { code: 40, .. }))
        ));
    }

    #[test]
    fn test_missing_artifact_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            NativeRatingModel::load(dir.path()),
            Err(AppError::ModelLoad(_))
        ));
    }
}
