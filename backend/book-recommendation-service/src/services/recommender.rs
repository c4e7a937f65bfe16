/// Recommender context
///
/// Built once at startup from the configured artifacts and shared
/// read-only by every request.
use super::assembler::{assemble, Recommendation};
use super::native_model::NativeRatingModel;
use super::neighbors::NeighborIndex;
use super::onnx_model::OnnxRatingModel;
use super::scorer::{top_k, RatingPredictor, Scorer};
use crate::config::{Config, ModelFormat};
use crate::error::Result;
use book_features::{BookFeatureTable, Dataset, EncoderStore, FeatureBatch, UserProfile};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
pub struct RecommenderSettings {
    pub batch_size: usize,
    pub top_k: usize,
    pub related_k: usize,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            batch_size: 128,
            top_k: 5,
            related_k: 5,
        }
    }
}

impl From<&Config> for RecommenderSettings {
    fn from(config: &Config) -> Self {
        Self {
            batch_size: config.scoring_batch_size,
            top_k: config.top_k,
            related_k: config.related_k,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub backend: &'static str,
    pub books: usize,
    pub vocab_sizes: BTreeMap<String, usize>,
    pub batch_size: usize,
    pub top_k: usize,
    pub related_k: usize,
    pub loaded_at: DateTime<Utc>,
}

pub struct Recommender {
    encoders: EncoderStore,
    books: BookFeatureTable,
    neighbors: NeighborIndex,
    predictor: Box<dyn RatingPredictor>,
    scorer: Scorer,
    top_k: usize,
    loaded_at: DateTime<Utc>,
}

impl Recommender {
    /// Every book in the table must decode to a title.
    pub fn new(
        encoders: EncoderStore,
        books: BookFeatureTable,
        predictor: Box<dyn RatingPredictor>,
        settings: RecommenderSettings,
    ) -> Result<Self> {
        for book_idx in 0..books.len() {
            encoders.decode_title(book_idx as i64)?;
        }

        let neighbors = NeighborIndex::build(&books, settings.related_k);
        Ok(Self {
            encoders,
            books,
            neighbors,
            predictor,
            scorer: Scorer::new(settings.batch_size),
            top_k: settings.top_k,
            loaded_at: Utc::now(),
        })
    }

    pub fn load(config: &Config) -> Result<Self> {
        let encoders = EncoderStore::load(&config.encoders_path)?;
        encoders.validate()?;

        let dataset = Dataset::from_path(&config.dataset_path)?;
        let books = BookFeatureTable::from_records(dataset.records())?;

        let settings = RecommenderSettings::from(config);
        let predictor: Box<dyn RatingPredictor> =
            match config.model_format.resolve(&config.model_path) {
                ModelFormat::Native => Box::new(NativeRatingModel::load(&config.model_path)?),
                _ => Box::new(OnnxRatingModel::load(&config.model_path, settings.batch_size)?),
            };

        let recommender = Self::new(encoders, books, predictor, settings)?;
        info!(
            books = recommender.books.len(),
            backend = recommender.predictor.backend(),
            "Recommender ready"
        );
        Ok(recommender)
    }

    pub fn recommend(&self, profile: &UserProfile) -> Result<Recommendation> {
        let user = profile.encode(&self.encoders)?;
        let batch = FeatureBatch::for_user(&user, &self.books);
        let scores = self.scorer.score(self.predictor.as_ref(), &batch)?;
        let top = top_k(&scores, self.top_k);

        debug!(candidates = scores.len(), top = ?top, "Books ranked");
        Ok(assemble(&top, &self.encoders, &self.neighbors)?)
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            backend: self.predictor.backend(),
            books: self.books.len(),
            vocab_sizes: self.encoders.vocab_sizes(),
            batch_size: self.scorer.batch_size(),
            top_k: self.top_k,
            related_k: self.neighbors.k(),
            loaded_at: self.loaded_at,
        }
    }
}
