/// Train / validation / test split
///
/// 20% of the rows are held out with a seeded shuffle, then the held-out
/// rows are halved into validation and test (80/10/10). Held-out sizes are
/// rounded up.
use book_features::RatingRecord;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

pub const DEFAULT_SEED: u64 = 42;

const HOLDOUT_SHARE: f64 = 0.2;
const TEST_SHARE_OF_HOLDOUT: f64 = 0.5;

#[derive(Debug, Clone, Default)]
pub struct DatasetSplit {
    pub train: Vec<RatingRecord>,
    pub validation: Vec<RatingRecord>,
    pub test: Vec<RatingRecord>,
}

pub fn split(records: &[RatingRecord], seed: u64) -> DatasetSplit {
    let (train, holdout) = shuffle_split(records, HOLDOUT_SHARE, seed);
    let (validation, test) = shuffle_split(&holdout, TEST_SHARE_OF_HOLDOUT, seed);
    DatasetSplit {
        train,
        validation,
        test,
    }
}

/// Returns `(kept, held_out)`.
fn shuffle_split<T: Clone>(items: &[T], held_out_share: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));

    let held_out = ((items.len() as f64) * held_out_share).ceil() as usize;
    let (held, kept) = order.split_at(held_out.min(items.len()));

    let pick = |indices: &[usize]| indices.iter().map(|&i| items[i].clone()).collect();
    (pick(kept), pick(held))
}
