use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Extension, Json, Router};

use crate::{
    db::gigdb::GigExt,
    dtos::gigdtos::ApiResponse,
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn bids_handler() -> Router {
    Router::new().route("/mine", get(get_my_bids))
}

/// The freelancer's bids with their persisted status. Clients that missed a
/// hire notification reconcile from here.
pub async fn get_my_bids(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let bids = app_state
        .db_client
        .list_bids_for_freelancer(auth.user.id)
        .await?;

    Ok(Json(ApiResponse::success("Bids retrieved successfully", bids)))
}
