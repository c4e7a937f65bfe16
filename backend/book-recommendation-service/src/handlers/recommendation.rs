use crate::error::Result;
use crate::services::Recommender;
use actix_web::{post, web, HttpResponse};
use book_features::UserProfile;
use tracing::{debug, warn};
use uuid::Uuid;

/// POST /recommend
#[post("/recommend")]
pub async fn recommend(
    state: web::Data<Recommender>,
    body: web::Json<UserProfile>,
) -> Result<HttpResponse> {
    let request_id = Uuid::new_v4();
    let profile = body.into_inner();
    debug!(%request_id, ?profile, "Recommendation requested");

    let recommender = state.into_inner();
    match web::block(move || recommender.recommend(&profile)).await? {
        Ok(recommendation) => {
            debug!(%request_id, top_books = ?recommendation.top_books, "Recommendation served");
            Ok(HttpResponse::Ok().json(recommendation))
        }
        Err(err) => {
            warn!(%request_id, error = %err, "Recommendation failed");
            Err(err)
        }
    }
}
