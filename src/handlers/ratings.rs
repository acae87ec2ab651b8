use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::put,
    Json, Router,
};

use crate::{
    auth::AuthUser,
    errors::ApiError,
    handlers::common::{no_content_response, parse_path_id, success_response, validate_input},
    services::ratings::{RatingView, UpdateRatingRequest},
    AppState,
};

pub fn rating_routes() -> Router<AppState> {
    Router::new().route("/:id", put(update_rating).delete(delete_rating))
}

/// Change the score or comment of one of your ratings
#[utoipa::path(
    put,
    path = "/api/v1/ratings/:id",
    params(("id" = i64, Path, description = "Rating ID")),
    request_body = UpdateRatingRequest,
    responses(
        (status = 200, description = "Rating updated", body = RatingView),
        (status = 400, description = "Invalid rating", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
        (status = 403, description = "Rating belongs to another user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Rating not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "ratings"
)]
pub async fn update_rating(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateRatingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rating_id = parse_path_id(&id)?;
    validate_input(&payload)?;
    let updated = state
        .services
        .ratings
        .update(user.user_id, rating_id, payload)
        .await?;
    Ok(success_response(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/ratings/:id",
    params(("id" = i64, Path, description = "Rating ID")),
    responses(
        (status = 204, description = "Rating deleted"),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
        (status = 403, description = "Rating belongs to another user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Rating not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "ratings"
)]
pub async fn delete_rating(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .ratings
        .delete(user.user_id, parse_path_id(&id)?)
        .await?;
    Ok(no_content_response())
}
