/// Rating dataset
///
/// Rows are (user, book, rating) triples. The encoded form holds integer
/// codes for the 10 categorical columns and the 3 numeric columns; raw
/// headers (`title`, `author`, `preferred_topics`) are accepted as aliases
/// of their renamed columns.
use crate::encoder::{EncoderStore, LabelEncoder};
use crate::error::{FeatureError, Result};
use crate::schema::{AgeScaler, CategoricalField, NUMERIC_WIDTH};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    #[serde(alias = "title")]
    pub book_idx: i64,
    #[serde(alias = "preferred_topics")]
    pub topic_idx: i64,
    #[serde(alias = "author")]
    pub author_idx: i64,
    pub country: i64,
    pub gender: i64,
    pub is_new_muslim: i64,
    pub born_muslim: i64,
    pub education_level: i64,
    pub religious_level: i64,
    pub category: i64,
    /// Already scaled with the bundle's `AgeScaler`.
    pub age: f32,
    pub average_rating: f32,
    pub user_rating_count: f32,
    #[serde(default)]
    pub rating: Option<f32>,
}

impl RatingRecord {
    pub fn categorical(&self, field: CategoricalField) -> i64 {
        match field {
            CategoricalField::BookIdx => self.book_idx,
            CategoricalField::TopicIdx => self.topic_idx,
            CategoricalField::AuthorIdx => self.author_idx,
            CategoricalField::Country => self.country,
            CategoricalField::Gender => self.gender,
            CategoricalField::IsNewMuslim => self.is_new_muslim,
            CategoricalField::BornMuslim => self.born_muslim,
            CategoricalField::EducationLevel => self.education_level,
            CategoricalField::ReligiousLevel => self.religious_level,
            CategoricalField::Category => self.category,
        }
    }

    pub fn numeric(&self) -> [f32; NUMERIC_WIDTH] {
        [self.age, self.average_rating, self.user_rating_count]
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<RatingRecord>,
}

impl Dataset {
    pub fn new(records: Vec<RatingRecord>) -> Self {
        Self { records }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = csv::Reader::from_path(path)?;
        let dataset = Self::from_csv(reader)?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            "Rating dataset loaded"
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let records = reader
            .deserialize()
            .collect::<std::result::Result<Vec<RatingRecord>, csv::Error>>()?;
        Ok(Self { records })
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn records(&self) -> &[RatingRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<RatingRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct codes in a categorical column.
    pub fn vocab_size(&self, field: CategoricalField) -> usize {
        self.records
            .iter()
            .map(|record| record.categorical(field))
            .collect::<HashSet<_>>()
            .len()
    }

    /// Largest code seen in a categorical column, if any row exists.
    pub fn max_code(&self, field: CategoricalField) -> Option<i64> {
        self.records.iter().map(|record| record.categorical(field)).max()
    }
}

/// A row before label encoding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawRatingRecord {
    pub title: String,
    pub author: String,
    pub preferred_topics: String,
    pub country: String,
    pub gender: String,
    pub is_new_muslim: String,
    pub born_muslim: String,
    pub education_level: String,
    pub religious_level: String,
    pub category: String,
    /// Age in years.
    pub age: f64,
    pub average_rating: f32,
    pub user_rating_count: f32,
    #[serde(default)]
    pub rating: Option<f32>,
}

impl RawRatingRecord {
    pub fn raw(&self, field: CategoricalField) -> &str {
        match field {
            CategoricalField::BookIdx => &self.title,
            CategoricalField::TopicIdx => &self.preferred_topics,
            CategoricalField::AuthorIdx => &self.author,
            CategoricalField::Country => &self.country,
            CategoricalField::Gender => &self.gender,
            CategoricalField::IsNewMuslim => &self.is_new_muslim,
            CategoricalField::BornMuslim => &self.born_muslim,
            CategoricalField::EducationLevel => &self.education_level,
            CategoricalField::ReligiousLevel => &self.religious_level,
            CategoricalField::Category => &self.category,
        }
    }

    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let mut reader = csv::Reader::from_path(path)?;
        let records = reader
            .deserialize()
            .collect::<std::result::Result<Vec<Self>, csv::Error>>()?;
        Ok(records)
    }
}

/// Fit one label encoder per categorical column of the raw rows.
pub fn fit_encoders(records: &[RawRatingRecord], age_scaler: AgeScaler) -> EncoderStore {
    let mut store = EncoderStore::new(age_scaler);
    for field in CategoricalField::ALL {
        let encoder = LabelEncoder::fit(records.iter().map(|record| record.raw(field)));
        debug!(
            field = field.encoder_key(),
            vocab_size = encoder.len(),
            "Fitted label encoder"
        );
        store.insert(field.encoder_key(), encoder);
    }
    store
}

/// Encode raw rows into the model schema: codes for categorical columns,
/// scaled age, numeric columns passed through.
pub fn encode_records(records: &[RawRatingRecord], store: &EncoderStore) -> Result<Dataset> {
    let scaler = store.age_scaler();
    let encoded = records
        .iter()
        .map(|raw| -> Result<RatingRecord> {
            let code = |field: CategoricalField| store.encode_field(field, raw.raw(field));
            Ok(RatingRecord {
                book_idx: code(CategoricalField::BookIdx)?,
                topic_idx: code(CategoricalField::TopicIdx)?,
                author_idx: code(CategoricalField::AuthorIdx)?,
                country: code(CategoricalField::Country)?,
                gender: code(CategoricalField::Gender)?,
                is_new_muslim: code(CategoricalField::IsNewMuslim)?,
                born_muslim: code(CategoricalField::BornMuslim)?,
                education_level: code(CategoricalField::EducationLevel)?,
                religious_level: code(CategoricalField::ReligiousLevel)?,
                category: code(CategoricalField::Category)?,
                age: scaler.transform(raw.age),
                average_rating: raw.average_rating,
                user_rating_count: raw.user_rating_count,
                rating: raw.rating,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if encoded.is_empty() {
        return Err(FeatureError::SchemaMismatch(
            "raw dataset has no rows".to_string(),
        ));
    }

    Ok(Dataset::new(encoded))
}
