//! Shared feature schema for the book recommender
//!
//! Both the offline trainer and the recommendation service build model
//! inputs through this crate, so field order, input names, the age scaler
//! and the embedding-dimension policy cannot drift between the two paths.
//!
//! - **schema**: categorical/numeric field lists and ONNX input names
//! - **encoder**: label encoders and the encoder bundle
//! - **dataset**: encoded rating rows and raw-data preparation
//! - **book_table**: one first-seen feature row per book
//! - **builder**: user profile encoding and batch construction

pub mod book_table;
pub mod builder;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod schema;

pub use book_table::{BookFeatureTable, BookFeatures};
pub use builder::{FeatureBatch, UserFeatures, UserProfile};
pub use dataset::{Dataset, RatingRecord, RawRatingRecord};
pub use encoder::{EncoderStore, LabelEncoder};
pub use error::{FeatureError, Result};
pub use schema::{embedding_dim, AgeScaler, CategoricalField};
