//! Book recommendation service
//!
//! Scores every known book for one user with a trained rating model,
//! returns the five best and, for each, five related books found by
//! cosine similarity over book features.

pub mod config;
pub mod error;
pub mod handlers;
pub mod services;

pub use config::{Config, ModelFormat};
pub use error::{AppError, Result};
pub use services::{Recommendation, Recommender, RecommenderSettings};
