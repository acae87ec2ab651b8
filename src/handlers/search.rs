use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::{
    errors::ApiError,
    handlers::common::success_response,
    search::model::{NearbyResponse, OfferSummary, SearchAllResponse},
    search::params::{NearbyParams, OfferSearchParams, SearchAllParams},
    search::ranking::Page,
    AppState,
};

/// Creates the router for search endpoints
pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(search_all))
        .route("/nearby", get(search_nearby))
        .route("/offers", get(search_offers))
}

/// Gyms and personal trainers within a radius, nearest first
#[utoipa::path(
    get,
    path = "/api/v1/search/nearby",
    params(NearbyParams),
    responses(
        (status = 200, description = "Results sorted by distance", body = NearbyResponse),
        (status = 400, description = "Missing or out-of-range parameter", body = crate::errors::ErrorResponse),
        (status = 500, description = "Storage failure", body = crate::errors::ErrorResponse)
    ),
    tag = "search"
)]
pub async fn search_nearby(
    State(state): State<AppState>,
    Query(params): Query<NearbyParams>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.services.search.nearby(params).await?;
    Ok(success_response(response))
}

/// Combined search over gyms, trainers and offers
#[utoipa::path(
    get,
    path = "/api/v1/search",
    params(SearchAllParams),
    responses(
        (status = 200, description = "Independently paged lists per kind", body = SearchAllResponse),
        (status = 400, description = "Invalid parameter", body = crate::errors::ErrorResponse),
        (status = 500, description = "Storage failure", body = crate::errors::ErrorResponse)
    ),
    tag = "search"
)]
pub async fn search_all(
    State(state): State<AppState>,
    Query(params): Query<SearchAllParams>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.services.search.search_all(params).await?;
    Ok(success_response(response))
}

/// Offer search with type, price, rating and owner filters
#[utoipa::path(
    get,
    path = "/api/v1/search/offers",
    params(OfferSearchParams),
    responses(
        (status = 200, description = "Offers by rating then recency", body = Page<OfferSummary>),
        (status = 400, description = "Invalid parameter", body = crate::errors::ErrorResponse)
    ),
    tag = "search"
)]
pub async fn search_offers(
    State(state): State<AppState>,
    Query(params): Query<OfferSearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.services.search.search_offers(params).await?;
    Ok(success_response(page))
}
