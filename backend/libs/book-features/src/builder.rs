/// Feature Builder
///
/// Turns one user's attributes into a full batch of model inputs, one row
/// per known book, in ascending `book_idx` order. The same `FeatureBatch`
/// is built from dataset rows for training.
use crate::book_table::BookFeatureTable;
use crate::dataset::RatingRecord;
use crate::encoder::EncoderStore;
use crate::error::Result;
use crate::schema::{CategoricalField, CATEGORICAL_WIDTH, NUMERIC_WIDTH};
use ndarray::{s, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Deserializer, Serialize};
use std::ops::Range;

/// Raw user attributes as they arrive with a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub age: f64,
    #[serde(deserialize_with = "category_value")]
    pub country: String,
    #[serde(deserialize_with = "category_value")]
    pub gender: String,
    #[serde(deserialize_with = "category_value")]
    pub is_new_muslim: String,
    #[serde(deserialize_with = "category_value")]
    pub born_muslim: String,
    #[serde(deserialize_with = "category_value")]
    pub education_level: String,
    #[serde(deserialize_with = "category_value")]
    pub religious_level: String,
    #[serde(deserialize_with = "category_value")]
    pub preferred_topic: String,
}

/// Categorical values may be sent as strings or as numbers.
fn category_value<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCategory {
        Text(String),
        Integer(i64),
        Number(f64),
    }

    Ok(match RawCategory::deserialize(deserializer)? {
        RawCategory::Text(text) => text,
        RawCategory::Integer(value) => value.to_string(),
        RawCategory::Number(value) => value.to_string(),
    })
}

impl UserProfile {
    fn raw(&self, field: CategoricalField) -> Option<&str> {
        match field {
            CategoricalField::Country => Some(&self.country),
            CategoricalField::Gender => Some(&self.gender),
            CategoricalField::IsNewMuslim => Some(&self.is_new_muslim),
            CategoricalField::BornMuslim => Some(&self.born_muslim),
            CategoricalField::EducationLevel => Some(&self.education_level),
            CategoricalField::ReligiousLevel => Some(&self.religious_level),
            CategoricalField::TopicIdx => Some(&self.preferred_topic),
            _ => None,
        }
    }

    /// Encode through the trained vocabularies and the fixed age scaler.
    pub fn encode(&self, store: &EncoderStore) -> Result<UserFeatures> {
        let code = |field: CategoricalField| store.encode_field(field, self.raw(field).unwrap_or_default());

        Ok(UserFeatures {
            age: store.age_scaler().transform(self.age),
            country: code(CategoricalField::Country)?,
            gender: code(CategoricalField::Gender)?,
            is_new_muslim: code(CategoricalField::IsNewMuslim)?,
            born_muslim: code(CategoricalField::BornMuslim)?,
            education_level: code(CategoricalField::EducationLevel)?,
            religious_level: code(CategoricalField::ReligiousLevel)?,
            topic_idx: code(CategoricalField::TopicIdx)?,
        })
    }
}

/// Encoded attributes of one user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserFeatures {
    /// Scaled age.
    pub age: f32,
    pub country: i64,
    pub gender: i64,
    pub is_new_muslim: i64,
    pub born_muslim: i64,
    pub education_level: i64,
    pub religious_level: i64,
    pub topic_idx: i64,
}

impl UserFeatures {
    fn categorical(&self, field: CategoricalField) -> Option<i64> {
        match field {
            CategoricalField::Country => Some(self.country),
            CategoricalField::Gender => Some(self.gender),
            CategoricalField::IsNewMuslim => Some(self.is_new_muslim),
            CategoricalField::BornMuslim => Some(self.born_muslim),
            CategoricalField::EducationLevel => Some(self.education_level),
            CategoricalField::ReligiousLevel => Some(self.religious_level),
            CategoricalField::TopicIdx => Some(self.topic_idx),
            _ => None,
        }
    }
}

/// Aligned model inputs.
///
/// `categorical` is `N x 10` in `CategoricalField::ALL` order, `numeric` is
/// `N x 3` as `[age, average_rating, user_rating_count]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBatch {
    categorical: Array2<i64>,
    numeric: Array2<f32>,
}

impl FeatureBatch {
    /// Broadcast one user across every book of the table.
    ///
    /// Row i always describes book i.
    pub fn for_user(user: &UserFeatures, table: &BookFeatureTable) -> Self {
        let books: Vec<_> = table.iter().collect();
        let n_books = books.len();

        let categorical = Array2::from_shape_fn((n_books, CATEGORICAL_WIDTH), |(row, column)| {
            let book = books[row];
            match CategoricalField::ALL[column] {
                CategoricalField::BookIdx => row as i64,
                CategoricalField::AuthorIdx => book.author_idx,
                CategoricalField::Category => book.category,
                user_field => user.categorical(user_field).unwrap_or_default(),
            }
        });

        let numeric = Array2::from_shape_fn((n_books, NUMERIC_WIDTH), |(row, column)| {
            let book = books[row];
            match column {
                0 => user.age,
                1 => book.average_rating,
                _ => book.user_rating_count,
            }
        });

        Self {
            categorical,
            numeric,
        }
    }

    /// One row per dataset record, in record order.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a RatingRecord>,
    {
        let records: Vec<&RatingRecord> = records.into_iter().collect();

        let categorical = Array2::from_shape_fn((records.len(), CATEGORICAL_WIDTH), |(row, column)| {
            records[row].categorical(CategoricalField::ALL[column])
        });
        let numeric = Array2::from_shape_fn((records.len(), NUMERIC_WIDTH), |(row, column)| {
            records[row].numeric()[column]
        });

        Self {
            categorical,
            numeric,
        }
    }

    pub fn len(&self) -> usize {
        self.categorical.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn categorical(&self) -> ArrayView2<'_, i64> {
        self.categorical.view()
    }

    pub fn numeric(&self) -> ArrayView2<'_, f32> {
        self.numeric.view()
    }

    pub fn column(&self, field: CategoricalField) -> ArrayView1<'_, i64> {
        self.categorical.column(field.position())
    }

    /// Copy of the rows in `range`.
    pub fn rows(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        Self {
            categorical: self.categorical.slice(s![start..end, ..]).to_owned(),
            numeric: self.numeric.slice(s![start..end, ..]).to_owned(),
        }
    }

    /// Consecutive sub-batches of at most `size` rows.
    pub fn chunks(&self, size: usize) -> impl Iterator<Item = FeatureBatch> + '_ {
        let size = size.max(1);
        (0..self.len())
            .step_by(size)
            .map(move |start| self.rows(start..start + size))
    }

    /// Rows picked by index, in the given order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            categorical: self.categorical.select(ndarray::Axis(0), indices),
            numeric: self.numeric.select(ndarray::Axis(0), indices),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::LabelEncoder;
    use crate::schema::AgeScaler;

    fn user() -> UserFeatures {
        UserFeatures {
            age: 0.5,
            country: 3,
            gender: 1,
            is_new_muslim: 0,
            born_muslim: 1,
            education_level: 2,
            religious_level: 4,
            topic_idx: 6,
        }
    }

    fn record(book_idx: i64, author_idx: i64, category: i64, average_rating: f32) -> RatingRecord {
        RatingRecord {
            book_idx,
            topic_idx: 9,
            author_idx,
            country: 0,
            gender: 0,
            is_new_muslim: 0,
            born_muslim: 0,
            education_level: 0,
            religious_level: 0,
            category,
            age: -1.0,
            average_rating,
            user_rating_count: 100.0 + book_idx as f32,
            rating: None,
        }
    }

    #[test]
    fn test_broadcasts_user_over_books() {
        let records = vec![record(0, 10, 1, 4.0), record(1, 11, 2, 3.0), record(2, 12, 1, 5.0)];
        let table = BookFeatureTable::from_records(&records).unwrap();
        let batch = FeatureBatch::for_user(&user(), &table);

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.column(CategoricalField::BookIdx).to_vec(), vec![0, 1, 2]);
        assert_eq!(batch.column(CategoricalField::AuthorIdx).to_vec(), vec![10, 11, 12]);
        assert_eq!(batch.column(CategoricalField::Category).to_vec(), vec![1, 2, 1]);
        assert_eq!(batch.column(CategoricalField::TopicIdx).to_vec(), vec![6, 6, 6]);
        assert_eq!(batch.column(CategoricalField::Country).to_vec(), vec![3, 3, 3]);
        assert_eq!(batch.numeric().row(1).to_vec(), vec![0.5, 3.0, 101.0]);
    }

    #[test]
    fn test_row_order_ignores_dataset_order() {
        let forward = vec![record(0, 10, 1, 4.0), record(1, 11, 2, 3.0), record(2, 12, 1, 5.0)];
        let shuffled = vec![forward[2].clone(), forward[0].clone(), forward[1].clone()];

        let a = FeatureBatch::for_user(&user(), &BookFeatureTable::from_records(&forward).unwrap());
        let b = FeatureBatch::for_user(&user(), &BookFeatureTable::from_records(&shuffled).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_records_keeps_record_values() {
        let records = vec![record(1, 11, 2, 3.0), record(0, 10, 1, 4.0)];
        let batch = FeatureBatch::from_records(&records);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.column(CategoricalField::BookIdx).to_vec(), vec![1, 0]);
        assert_eq!(batch.column(CategoricalField::TopicIdx).to_vec(), vec![9, 9]);
        assert_eq!(batch.numeric().row(0).to_vec(), vec![-1.0, 3.0, 101.0]);
    }

    #[test]
    fn test_chunks_cover_every_row() {
        let records: Vec<_> = (0..7).map(|i| record(i, i, 0, 1.0)).collect();
        let batch = FeatureBatch::from_records(&records);

        let sizes: Vec<usize> = batch.chunks(3).map(|chunk| chunk.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);

        let last = batch.chunks(3).last().unwrap();
        assert_eq!(last.column(CategoricalField::BookIdx).to_vec(), vec![6]);
    }

    #[test]
    fn test_select_reorders_rows() {
        let records: Vec<_> = (0..4).map(|i| record(i, i, 0, 1.0)).collect();
        let batch = FeatureBatch::from_records(&records).select(&[3, 1]);
        assert_eq!(batch.column(CategoricalField::BookIdx).to_vec(), vec![3, 1]);
    }

    #[test]
    fn test_profile_encoding() {
        let mut store = EncoderStore::new(AgeScaler::default());
        store.insert("country", LabelEncoder::fit(["Egypt", "Malaysia"]));
        store.insert("gender", LabelEncoder::fit(["female", "male"]));
        store.insert("is_new_muslim", LabelEncoder::fit(["No", "Yes"]));
        store.insert("born_muslim", LabelEncoder::fit(["No", "Yes"]));
        store.insert("education_level", LabelEncoder::fit(["1", "2", "3"]));
        store.insert("religious_level", LabelEncoder::fit(["Low", "High"]));
        store.insert("preferred_topics", LabelEncoder::fit(["Fiqh", "Seerah"]));

        let profile: UserProfile = serde_json::from_value(serde_json::json!({
            "age": 24,
            "country": "Malaysia",
            "gender": "female",
            "is_new_muslim": "Yes",
            "born_muslim": "No",
            "education_level": 3,
            "religious_level": "High",
            "preferred_topic": "Seerah"
        }))
        .unwrap();

        let features = profile.encode(&store).unwrap();
        assert_eq!(features.country, 1);
        assert_eq!(features.gender, 0);
        assert_eq!(features.education_level, 2);
        assert_eq!(features.religious_level, 0);
        assert_eq!(features.topic_idx, 1);
        assert!((features.age - (24.0 - 37.5) / 13.0).abs() < 1e-6);
    }

    #[test]
    fn test_profile_missing_age_fails_to_parse() {
        let result: std::result::Result<UserProfile, _> = serde_json::from_value(serde_json::json!({
            "country": "Malaysia",
            "gender": "female",
            "is_new_muslim": "Yes",
            "born_muslim": "No",
            "education_level": "3",
            "religious_level": "High",
            "preferred_topic": "Seerah"
        }));
        assert!(result.is_err());
    }
}
