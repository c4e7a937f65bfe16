//! HTTP handlers
//!
//! - `POST /recommend`: top books plus related books for one user
//! - `GET /model-info`: loaded backend, book count, vocabulary sizes
//! - `GET /health`

pub mod info;
pub mod recommendation;

use crate::error::AppError;
use actix_web::{error::JsonPayloadError, web, HttpRequest};
use tracing::warn;

pub use info::{health, model_info};
pub use recommendation::recommend;

/// Register routes and the JSON extractor config on an app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(recommend)
        .service(model_info)
        .service(health);
}

/// Malformed or incomplete bodies answer like any other failure: 500 with
/// `{"error": ...}`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, req: &HttpRequest| {
        warn!(path = %req.path(), error = %err, "Rejected request body");
        AppError::SchemaMismatch(err.to_string()).into()
    })
}
