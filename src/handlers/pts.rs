use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::{
    errors::ApiError,
    handlers::common::{parse_path_id, success_response},
    search::model::PtSummary,
    search::params::PtSearchParams,
    search::ranking::Page,
    AppState,
};

pub fn pt_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pts))
        .route("/:id", get(get_pt))
}

/// List or search active personal trainers
#[utoipa::path(
    get,
    path = "/api/v1/pts",
    params(PtSearchParams),
    responses(
        (status = 200, description = "Trainers page", body = Page<PtSummary>),
        (status = 400, description = "Invalid parameter", body = crate::errors::ErrorResponse)
    ),
    tag = "pts"
)]
pub async fn list_pts(
    State(state): State<AppState>,
    Query(params): Query<PtSearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.services.search.search_pts(params).await?;
    Ok(success_response(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/pts/:id",
    params(("id" = i64, Path, description = "PT profile ID")),
    responses(
        (status = 200, description = "Trainer fetched", body = PtSummary),
        (status = 404, description = "Trainer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "pts"
)]
pub async fn get_pt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let pt = state.services.catalog.get_pt(parse_path_id(&id)?).await?;
    Ok(success_response(pt))
}
