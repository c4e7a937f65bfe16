/// Model input schema
///
/// The network takes one integer input per categorical field, named
/// `{column}_in`, plus one float input `num_in` holding
/// `[age, average_rating, user_rating_count]`. Column order below is the
/// order the embeddings are concatenated in; changing it invalidates every
/// trained artifact.
use serde::{Deserialize, Serialize};

/// Name of the numeric model input.
pub const NUMERIC_INPUT: &str = "num_in";

/// Name of the model output.
pub const RATING_OUTPUT: &str = "rating";

/// Numeric columns, in `num_in` order.
pub const NUMERIC_FIELDS: [&str; 3] = ["age", "average_rating", "user_rating_count"];

pub const NUMERIC_WIDTH: usize = NUMERIC_FIELDS.len();

/// Columns of the per-book vectors the neighbor index is fitted on.
pub const BOOK_FEATURE_COLUMNS: [&str; 5] = [
    "topic_idx",
    "author_idx",
    "category",
    "average_rating",
    "user_rating_count",
];

pub const BOOK_FEATURE_WIDTH: usize = BOOK_FEATURE_COLUMNS.len();

pub const CATEGORICAL_WIDTH: usize = CategoricalField::ALL.len();

const MIN_EMBEDDING_DIM: usize = 2;
const MAX_EMBEDDING_DIM: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    BookIdx,
    TopicIdx,
    AuthorIdx,
    Country,
    Gender,
    IsNewMuslim,
    BornMuslim,
    EducationLevel,
    ReligiousLevel,
    Category,
}

impl CategoricalField {
    /// Every categorical input, in model order.
    pub const ALL: [CategoricalField; 10] = [
        CategoricalField::BookIdx,
        CategoricalField::TopicIdx,
        CategoricalField::AuthorIdx,
        CategoricalField::Country,
        CategoricalField::Gender,
        CategoricalField::IsNewMuslim,
        CategoricalField::BornMuslim,
        CategoricalField::EducationLevel,
        CategoricalField::ReligiousLevel,
        CategoricalField::Category,
    ];

    /// Fields that describe the user and are broadcast across all books.
    pub const USER: [CategoricalField; 7] = [
        CategoricalField::Country,
        CategoricalField::Gender,
        CategoricalField::IsNewMuslim,
        CategoricalField::BornMuslim,
        CategoricalField::EducationLevel,
        CategoricalField::ReligiousLevel,
        CategoricalField::TopicIdx,
    ];

    /// Column name in the encoded dataset.
    pub fn column(self) -> &'static str {
        match self {
            CategoricalField::BookIdx => "book_idx",
            CategoricalField::TopicIdx => "topic_idx",
            CategoricalField::AuthorIdx => "author_idx",
            CategoricalField::Country => "country",
            CategoricalField::Gender => "gender",
            CategoricalField::IsNewMuslim => "is_new_muslim",
            CategoricalField::BornMuslim => "born_muslim",
            CategoricalField::EducationLevel => "education_level",
            CategoricalField::ReligiousLevel => "religious_level",
            CategoricalField::Category => "category",
        }
    }

    /// Key of the label encoder fitted on the raw column.
    pub fn encoder_key(self) -> &'static str {
        match self {
            CategoricalField::BookIdx => "title",
            CategoricalField::TopicIdx => "preferred_topics",
            CategoricalField::AuthorIdx => "author",
            other => other.column(),
        }
    }

    /// Name of the model input fed by this field.
    pub fn input_name(self) -> &'static str {
        match self {
            CategoricalField::BookIdx => "book_idx_in",
            CategoricalField::TopicIdx => "topic_idx_in",
            CategoricalField::AuthorIdx => "author_idx_in",
            CategoricalField::Country => "country_in",
            CategoricalField::Gender => "gender_in",
            CategoricalField::IsNewMuslim => "is_new_muslim_in",
            CategoricalField::BornMuslim => "born_muslim_in",
            CategoricalField::EducationLevel => "education_level_in",
            CategoricalField::ReligiousLevel => "religious_level_in",
            CategoricalField::Category => "category_in",
        }
    }

    /// Column position inside a feature batch.
    pub fn position(self) -> usize {
        self as usize
    }

    pub fn from_input_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.input_name() == name)
    }
}

/// Fixed linear scaler for the user's age.
///
/// Fitted once on historical training data; requests are never refit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeScaler {
    pub mean: f64,
    pub scale: f64,
}

impl Default for AgeScaler {
    fn default() -> Self {
        Self {
            mean: 37.5,
            scale: 13.0,
        }
    }
}

impl AgeScaler {
    pub fn transform(&self, age: f64) -> f32 {
        ((age - self.mean) / self.scale) as f32
    }
}

/// Embedding width for a categorical field: `round(vocab^0.25)` in `[2, 50]`.
pub fn embedding_dim(vocab_size: usize) -> usize {
    let dim = (vocab_size as f64).powf(0.25).round() as usize;
    dim.clamp(MIN_EMBEDDING_DIM, MAX_EMBEDDING_DIM)
}
