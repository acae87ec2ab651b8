use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FitMarket API",
        version = "1.0.0",
        description = r#"
# FitMarket Search API

Discovery of gyms, personal trainers and their offers.

## Features

- **Nearby search**: gyms and trainers inside a radius, nearest first
- **Combined search**: one query over gyms, trainers and approved offers
- **Offer filters**: type, price range, minimum rating, owner
- **Ratings**: one rating per user and offer, with derived averages

## Authentication

Read endpoints are public. Rating writes need a bearer token:

```
Authorization: Bearer <your-jwt-token>
```

## Pagination

List endpoints accept `page` (0-based, default 0) and `size`
(default 20, clamped to 1..=100).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "search", description = "Proximity and filtered search"),
        (name = "gyms", description = "Gym listings"),
        (name = "pts", description = "Personal trainer listings"),
        (name = "offers", description = "Offer lookups"),
        (name = "ratings", description = "Offer ratings"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        // Search
        crate::handlers::search::search_nearby,
        crate::handlers::search::search_all,
        crate::handlers::search::search_offers,

        // Listings
        crate::handlers::gyms::list_gyms,
        crate::handlers::gyms::get_gym,
        crate::handlers::pts::list_pts,
        crate::handlers::pts::get_pt,
        crate::handlers::offers::get_offer,

        // Ratings
        crate::handlers::offers::list_offer_ratings,
        crate::handlers::offers::rate_offer,
        crate::handlers::ratings::update_rating,
        crate::handlers::ratings::delete_rating,

        // Health
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            // Search types
            crate::search::model::NearbyResponse,
            crate::search::model::NearbyResult,
            crate::search::model::NearbyCriteria,
            crate::search::model::PaginationInfo,
            crate::search::model::SearchAllResponse,
            crate::search::model::GymSummary,
            crate::search::model::PtSummary,
            crate::search::model::OfferSummary,
            crate::search::model::LocationView,

            // Rating types
            crate::services::ratings::CreateRatingRequest,
            crate::services::ratings::UpdateRatingRequest,
            crate::services::ratings::RatingView,

            // Health
            crate::handlers::health::HealthResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_search_routes() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("FitMarket API"));
        assert!(json.contains("/api/v1/search/nearby"));
        assert!(json.contains("/api/v1/offers/:id/ratings"));
        assert!(json.contains("bearer_auth"));
    }
}
