pub mod assembler;
pub mod native_model;
pub mod neighbors;
pub mod onnx_model;
pub mod recommender;
pub mod scorer;

pub use assembler::{assemble, Recommendation, RelatedBooks};
pub use native_model::NativeRatingModel;
pub use neighbors::NeighborIndex;
pub use onnx_model::OnnxRatingModel;
pub use recommender::{ModelInfo, Recommender, RecommenderSettings};
pub use scorer::{top_k, RatingPredictor, Scorer};
