/// Scoring and top-k ranking
use crate::error::{AppError, Result};
use book_features::FeatureBatch;
use std::cmp::Ordering;
use tracing::debug;

/// A trained rating model: one predicted rating per batch row.
pub trait RatingPredictor: Send + Sync {
    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<f32>>;

    /// Short backend name reported by `/model-info`.
    fn backend(&self) -> &'static str;
}

/// Runs a predictor over a full batch in fixed-size chunks.
#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    batch_size: usize,
}

impl Scorer {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn score(&self, predictor: &dyn RatingPredictor, batch: &FeatureBatch) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(batch.len());

        for chunk in batch.chunks(self.batch_size) {
            let predicted = predictor.predict(&chunk)?;
            if predicted.len() != chunk.len() {
                return Err(AppError::Inference(format!(
                    "{} model returned {} scores for {} rows",
                    predictor.backend(),
                    predicted.len(),
                    chunk.len()
                )));
            }
            scores.extend(predicted);
        }

        if scores.len() != batch.len() {
            return Err(AppError::Inference(format!(
                "scored {} of {} rows",
                scores.len(),
                batch.len()
            )));
        }

        debug!(rows = scores.len(), batch_size = self.batch_size, "Batch scored");
        Ok(scores)
    }
}

/// Indices of the `k` highest scores, best first.
///
/// Ties keep ascending index order; NaN ranks below every number.
pub fn top_k(scores: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| descending(scores[a], scores[b]));
    order.truncate(k);
    order
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use book_features::RatingRecord;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    /// Scores each row by its average rating and counts calls.
    struct AverageRating {
        calls: AtomicUsize,
    }

    impl RatingPredictor for AverageRating {
        fn predict(&self, batch: &FeatureBatch) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(batch.numeric().column(1).to_vec())
        }

        fn backend(&self) -> &'static str {
            "test"
        }
    }

    struct Truncating;

    impl RatingPredictor for Truncating {
        fn predict(&self, batch: &FeatureBatch) -> Result<Vec<f32>> {
            Ok(vec![0.0; batch.len().saturating_sub(1)])
        }

        fn backend(&self) -> &'static str {
            "truncating"
        }
    }

    fn batch(n: i64) -> FeatureBatch {
        let records: Vec<RatingRecord> = (0..n)
            .map(|i| RatingRecord {
                book_idx: i,
                topic_idx: 0,
                author_idx: 0,
                country: 0,
                gender: 0,
                is_new_muslim: 0,
                born_muslim: 0,
                education_level: 0,
                religious_level: 0,
                category: 0,
                age: 0.0,
                average_rating: i as f32,
                user_rating_count: 1.0,
                rating: None,
            })
            .collect();
        FeatureBatch::from_records(&records)
    }

    #[test]
    fn test_top_k_orders_descending() {
        assert_eq!(top_k(&[0.2, 0.9, 0.5], 5), vec![1, 2, 0]);
        assert_eq!(top_k(&[0.1, 0.4, 0.3, 0.8, 0.7, 0.6], 5), vec![3, 4, 5, 1, 2]);
    }

    #[test]
    fn test_top_k_ties_and_nan() {
        assert_eq!(top_k(&[0.5, f32::NAN, 0.5, 0.7], 4), vec![3, 0, 2, 1]);
        assert_eq!(top_k(&[f32::NAN, f32::NAN], 1), vec![0]);
        assert!(top_k(&[], 5).is_empty());
    }

    #[test]
    fn test_score_in_chunks() {
        let predictor = AverageRating {
            calls: AtomicUsize::new(0),
        };
        let scores = Scorer::new(4).score(&predictor, &batch(10)).unwrap();

        assert_eq!(scores.len(), 10);
        assert_eq!(scores[7], 7.0);
        assert_eq!(predictor.calls.load(AtomicOrdering::SeqCst), 3);
    }

    #[test]
    fn test_score_rejects_short_output() {
        let result = Scorer::new(128).score(&Truncating, &batch(3));
        assert!(matches!(result, Err(AppError::Inference(_))));
    }
}
