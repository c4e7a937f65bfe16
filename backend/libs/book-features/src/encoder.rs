/// Label encoders
///
/// A `LabelEncoder` maps a raw categorical value to its position in the
/// sorted vocabulary it was fitted on. The `EncoderStore` bundles one
/// encoder per raw column plus the age scaler and is loaded read-only by
/// the service.
use crate::error::{FeatureError, Result};
use crate::schema::{AgeScaler, CategoricalField};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::debug;

/// Encoder key of the title column, whose codes are book indices.
pub const TITLE_ENCODER: &str = "title";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, i64>,
}

impl From<Vec<String>> for LabelEncoder {
    fn from(classes: Vec<String>) -> Self {
        let index = classes
            .iter()
            .enumerate()
            .map(|(code, class)| (class.clone(), code as i64))
            .collect();
        Self { classes, index }
    }
}

impl From<LabelEncoder> for Vec<String> {
    fn from(encoder: LabelEncoder) -> Self {
        encoder.classes
    }
}

impl LabelEncoder {
    /// Fit on raw values. The vocabulary is deduplicated and sorted;
    /// numerically when every value parses as a number, lexically otherwise.
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = values
            .into_iter()
            .map(|value| value.as_ref().to_string())
            .collect();
        let mut classes: Vec<String> = distinct.into_iter().collect();

        let numeric: Option<Vec<f64>> = classes.iter().map(|c| c.trim().parse().ok()).collect();
        if let Some(numbers) = numeric {
            let mut keyed: Vec<(f64, String)> = numbers.into_iter().zip(classes).collect();
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
            classes = keyed.into_iter().map(|(_, class)| class).collect();
        }

        Self::from(classes)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn transform(&self, value: &str) -> Option<i64> {
        self.index.get(value).copied()
    }

    pub fn inverse_transform(&self, code: i64) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|position| self.classes.get(position))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncoderStore {
    encoders: BTreeMap<String, LabelEncoder>,
    #[serde(default)]
    age_scaler: AgeScaler,
}

impl EncoderStore {
    pub fn new(age_scaler: AgeScaler) -> Self {
        Self {
            encoders: BTreeMap::new(),
            age_scaler,
        }
    }

    /// Load a JSON encoder bundle.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let store: Self = serde_json::from_reader(reader)?;
        debug!(
            path = %path.display(),
            encoders = store.encoders.len(),
            "Encoder bundle loaded"
        );
        Ok(store)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn insert(&mut self, key: impl Into<String>, encoder: LabelEncoder) {
        self.encoders.insert(key.into(), encoder);
    }

    pub fn get(&self, key: &str) -> Option<&LabelEncoder> {
        self.encoders.get(key)
    }

    pub fn age_scaler(&self) -> AgeScaler {
        self.age_scaler
    }

    /// Map a raw value to its code.
    pub fn encode(&self, key: &str, raw: &str) -> Result<i64> {
        self.get(key)
            .and_then(|encoder| encoder.transform(raw))
            .ok_or_else(|| FeatureError::UnknownCategory {
                field: key.to_string(),
                value: raw.to_string(),
            })
    }

    /// Map a code back to its raw value.
    pub fn decode(&self, key: &str, code: i64) -> Result<&str> {
        self.get(key)
            .and_then(|encoder| encoder.inverse_transform(code))
            .ok_or_else(|| FeatureError::UnknownCode {
                field: key.to_string(),
                code,
            })
    }

    pub fn encode_field(&self, field: CategoricalField, raw: &str) -> Result<i64> {
        self.encode(field.encoder_key(), raw)
    }

    pub fn decode_title(&self, book_idx: i64) -> Result<&str> {
        self.decode(TITLE_ENCODER, book_idx)
    }

    /// Vocabulary size per encoder key.
    pub fn vocab_sizes(&self) -> BTreeMap<String, usize> {
        self.encoders
            .iter()
            .map(|(key, encoder)| (key.clone(), encoder.len()))
            .collect()
    }

    /// Every categorical model input must have an encoder.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = CategoricalField::ALL
            .iter()
            .map(|field| field.encoder_key())
            .filter(|key| !self.encoders.contains_key(*key))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(FeatureError::SchemaMismatch(format!(
                "encoder bundle is missing: {}",
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gender_store() -> EncoderStore {
        let mut store = EncoderStore::default();
        store.insert("gender", LabelEncoder::fit(["male", "female", "male"]));
        store
    }

    #[test]
    fn test_fit_sorts_and_deduplicates() {
        let encoder = LabelEncoder::fit(["pear", "apple", "fig", "apple"]);
        assert_eq!(encoder.classes(), ["apple", "fig", "pear"]);
        assert_eq!(encoder.transform("fig"), Some(1));
    }

    #[test]
    fn test_fit_sorts_numbers_numerically() {
        let encoder = LabelEncoder::fit(["10", "9", "100", "1"]);
        assert_eq!(encoder.classes(), ["1", "9", "10", "100"]);
    }

    #[test]
    fn test_round_trip_over_vocabulary() {
        let store = gender_store();
        for value in ["female", "male"] {
            let code = store.encode("gender", value).unwrap();
            assert_eq!(store.decode("gender", code).unwrap(), value);
        }
    }

    #[test]
    fn test_unseen_value_is_rejected() {
        let store = gender_store();
        let err = store.encode("gender", "unknown").unwrap_err();
        assert!(matches!(err, FeatureError::UnknownCategory { .. }));

        let err = store.encode("country", "Egypt").unwrap_err();
        assert!(matches!(err, FeatureError::UnknownCategory { .. }));
    }

    #[test]
    fn test_decode_outside_range() {
        let store = gender_store();
        assert!(matches!(
            store.decode("gender", 2),
            Err(FeatureError::UnknownCode { code: 2, .. })
        ));
        assert!(store.decode("gender", -1).is_err());
    }

    #[test]
    fn test_bundle_serializes_as_class_lists() {
        let store = gender_store();
        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["encoders"]["gender"], serde_json::json!(["female", "male"]));
        assert_eq!(json["age_scaler"]["mean"], serde_json::json!(37.5));

        let restored: EncoderStore = serde_json::from_value(json).unwrap();
        assert_eq!(restored, store);
    }

    #[test]
    fn test_validate_reports_missing_encoders() {
        let err = gender_store().validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("title"));
        assert!(!message.contains("gender"));
    }
}
