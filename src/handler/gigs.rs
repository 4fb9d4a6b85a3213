use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::gigdb::GigExt,
    dtos::gigdtos::*,
    error::HttpError,
    middleware::JWTAuthMiddeware,
    service::error::ServiceError,
    AppState,
};

pub fn gigs_handler() -> Router {
    Router::new()
        .route("/", get(list_open_gigs).post(create_gig))
        .route("/:gig_id", get(get_gig_details))
        .route("/:gig_id/bids", get(get_gig_bids).post(place_bid))
        .route("/:gig_id/bids/:bid_id/hire", put(hire_bid))
}

pub async fn create_gig(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateGigDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let gig = app_state
        .gig_service
        .create_gig(auth.user.id, body.title, body.description, body.budget)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Gig created successfully", gig)),
    ))
}

pub async fn list_open_gigs(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let gigs = app_state.db_client.get_open_gigs().await?;

    Ok(Json(ApiResponse::success("Open gigs retrieved successfully", gigs)))
}

pub async fn get_gig_details(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(gig_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let gig = app_state
        .db_client
        .get_gig(gig_id)
        .await?
        .ok_or(ServiceError::GigNotFound(gig_id))?;

    let bid_count = app_state.db_client.get_bids_by_gig(gig_id).await?.len();

    Ok(Json(ApiResponse::success(
        "Gig retrieved successfully",
        GigDetailDto { gig, bid_count },
    )))
}

pub async fn place_bid(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(gig_id): Path<Uuid>,
    Json(body): Json<CreateBidDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let bid = app_state
        .gig_service
        .place_bid(auth.user.id, gig_id, body.message, body.price)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Bid placed successfully", bid)),
    ))
}

pub async fn get_gig_bids(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(gig_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let bids = app_state
        .gig_service
        .bids_for_owner(auth.user.id, gig_id)
        .await?;

    Ok(Json(ApiResponse::success("Bids retrieved successfully", bids)))
}

pub async fn hire_bid(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path((gig_id, bid_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .hire_service
        .hire(auth.user.id, gig_id, bid_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Freelancer hired successfully",
        HireResponseDto::from(outcome),
    )))
}
