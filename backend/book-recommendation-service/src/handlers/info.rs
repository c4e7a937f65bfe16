use crate::services::Recommender;
use actix_web::{get, web, HttpResponse, Responder};

/// GET /health
#[get("/health")]
pub async fn health() -> impl Responder {
    "OK"
}

/// GET /model-info
#[get("/model-info")]
pub async fn model_info(state: web::Data<Recommender>) -> HttpResponse {
    HttpResponse::Ok().json(state.info())
}
