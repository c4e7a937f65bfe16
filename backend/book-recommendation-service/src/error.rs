/// Error types for the recommendation service
///
/// Every failure on the request path answers HTTP 500 with
/// `{"error": message}`; clients never receive a partial result.
use actix_web::{error::BlockingError, http::StatusCode, HttpResponse, ResponseError};
use book_features::FeatureError;
use rating_model::ModelError;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Feature(#[from] FeatureError),

    #[error("{0}")]
    Model(#[from] ModelError),

    #[error("Invalid request: {0}")]
    SchemaMismatch(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

impl From<BlockingError> for AppError {
    fn from(err: BlockingError) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_every_error_is_a_500_with_error_body() {
        let errors = [
            AppError::Feature(FeatureError::UnknownCategory {
                field: "country".to_string(),
                value: "Atlantis".to_string(),
            }),
            AppError::SchemaMismatch("missing field `age`".to_string()),
            AppError::Inference("shape".to_string()),
        ];

        for err in errors {
            let response = err.error_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let body = to_bytes(response.into_body()).await.unwrap();
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["error"], err.to_string());
        }
    }
}
