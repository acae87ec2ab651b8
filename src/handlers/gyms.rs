use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::{
    errors::ApiError,
    handlers::common::{parse_path_id, success_response},
    search::model::GymSummary,
    search::params::GymSearchParams,
    search::ranking::Page,
    AppState,
};

pub fn gym_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_gyms))
        .route("/:id", get(get_gym))
}

/// List or search active gyms
#[utoipa::path(
    get,
    path = "/api/v1/gyms",
    params(GymSearchParams),
    responses(
        (status = 200, description = "Gyms page", body = Page<GymSummary>),
        (status = 400, description = "Invalid parameter", body = crate::errors::ErrorResponse)
    ),
    tag = "gyms"
)]
pub async fn list_gyms(
    State(state): State<AppState>,
    Query(params): Query<GymSearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.services.search.search_gyms(params).await?;
    Ok(success_response(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/gyms/:id",
    params(("id" = i64, Path, description = "Gym ID")),
    responses(
        (status = 200, description = "Gym fetched", body = GymSummary),
        (status = 404, description = "Gym not found", body = crate::errors::ErrorResponse)
    ),
    tag = "gyms"
)]
pub async fn get_gym(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let gym = state.services.catalog.get_gym(parse_path_id(&id)?).await?;
    Ok(success_response(gym))
}
