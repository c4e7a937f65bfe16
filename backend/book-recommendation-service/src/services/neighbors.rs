/// Cosine nearest-neighbour index over book feature vectors
use book_features::{BookFeatureTable, FeatureError};
use ndarray::Array2;

/// Built once at startup. Rows are unit-normalised so cosine distance is
/// `1 - dot`; a zero vector stays zero and sits at distance 1 from
/// everything.
#[derive(Debug, Clone)]
pub struct NeighborIndex {
    unit_vectors: Array2<f32>,
    k: usize,
}

impl NeighborIndex {
    pub fn build(table: &BookFeatureTable, k: usize) -> Self {
        let mut unit_vectors = table.feature_matrix();
        for mut row in unit_vectors.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|value| value / norm);
            }
        }
        Self { unit_vectors, k }
    }

    pub fn len(&self) -> usize {
        self.unit_vectors.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn distance(&self, a: usize, b: usize) -> f32 {
        1.0 - self.unit_vectors.row(a).dot(&self.unit_vectors.row(b))
    }

    /// Up to `k` other books closest to `book_idx`, nearest first. The
    /// query book is never part of the result.
    pub fn neighbors(&self, book_idx: usize) -> Result<Vec<usize>, FeatureError> {
        if book_idx >= self.len() {
            return Err(FeatureError::UnknownBook(book_idx as i64));
        }

        let query = self.unit_vectors.row(book_idx);
        let mut candidates: Vec<(f32, usize)> = self
            .unit_vectors
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(other, _)| *other != book_idx)
            .map(|(other, row)| (1.0 - query.dot(&row), other))
            .collect();

        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        Ok(candidates
            .into_iter()
            .take(self.k)
            .map(|(_, other)| other)
            .collect())
    }
}
