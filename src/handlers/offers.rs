use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::{
    auth::AuthUser,
    errors::ApiError,
    handlers::common::{created_response, parse_path_id, success_response, validate_input},
    search::model::OfferSummary,
    search::params::PageParams,
    search::ranking::Page,
    services::ratings::{CreateRatingRequest, RatingView},
    AppState,
};

pub fn offer_routes() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_offer))
        .route("/:id/ratings", get(list_offer_ratings).post(rate_offer))
}

#[utoipa::path(
    get,
    path = "/api/v1/offers/:id",
    params(("id" = i64, Path, description = "Offer ID")),
    responses(
        (status = 200, description = "Offer fetched", body = OfferSummary),
        (status = 404, description = "Offer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "offers"
)]
pub async fn get_offer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let offer = state.services.catalog.get_offer(parse_path_id(&id)?).await?;
    Ok(success_response(offer))
}

/// Ratings left on an offer, newest first
#[utoipa::path(
    get,
    path = "/api/v1/offers/:id/ratings",
    params(("id" = i64, Path, description = "Offer ID"), PageParams),
    responses(
        (status = 200, description = "Ratings page", body = Page<RatingView>),
        (status = 404, description = "Offer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "ratings"
)]
pub async fn list_offer_ratings(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let offer_id = parse_path_id(&id)?;
    let page = params.into_request(&state.services.search.limits())?;
    let ratings = state.services.ratings.list_for_offer(offer_id, page).await?;
    Ok(success_response(ratings))
}

/// Rate an offer as the authenticated user
#[utoipa::path(
    post,
    path = "/api/v1/offers/:id/ratings",
    params(("id" = i64, Path, description = "Offer ID")),
    request_body = CreateRatingRequest,
    responses(
        (status = 201, description = "Rating created", body = RatingView),
        (status = 400, description = "Invalid rating", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Offer not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Offer already rated by this user", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "ratings"
)]
pub async fn rate_offer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<CreateRatingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let offer_id = parse_path_id(&id)?;
    validate_input(&payload)?;
    let created = state
        .services
        .ratings
        .create(user.user_id, offer_id, payload)
        .await?;
    Ok(created_response(created))
}
