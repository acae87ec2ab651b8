#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value;
use tower::ServiceExt;

use fitmarket_api::{
    auth::{encode_token, Claims},
    config::AppConfig,
    db,
    entities::{
        gym, location,
        offer::{self, OfferStatus, OfferType},
        pt_user,
        user::{self, UserRole},
    },
    AppState,
};

pub const TEST_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

/// Who publishes an offer
pub enum Owner<'a> {
    Gym(&'a gym::Model),
    Pt(&'a pt_user::Model),
}

/// Helper harness for spinning up an application state backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Same as [`TestApp::new`] but lets the caller tweak the configuration first.
    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A single connection keeps every query on the same in-memory database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        tweak(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = fitmarket_api::app_router(state.clone());

        Self { router, state }
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.state.db.as_ref()
    }

    /// Bearer token for `user_id`, valid for an hour.
    pub fn token_for(&self, user_id: i64) -> String {
        let claims = Claims::for_user(user_id, vec!["CLIENT".into()], chrono::Duration::hours(1));
        encode_token(&self.state.config.jwt_secret, &claims).expect("encode access token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// GET `uri` and decode the JSON body.
    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let response = self.request(Method::GET, uri, None, None).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    /// Authenticated JSON request; returns status and decoded body (Null when empty).
    pub async fn send_as(
        &self,
        user_id: i64,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let token = self.token_for(user_id);
        let response = self.request(method, uri, body, Some(&token)).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn seed_user(&self, email: &str, role: UserRole) -> user::Model {
        user::ActiveModel {
            email: Set(email.to_string()),
            first_name: Set("Test".to_string()),
            last_name: Set(email.split('@').next().unwrap_or("user").to_string()),
            role: Set(role),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed user")
    }

    pub async fn seed_location(&self, latitude: f64, longitude: f64) -> location::Model {
        location::ActiveModel {
            latitude: Set(latitude),
            longitude: Set(longitude),
            address: Set(format!("{:.4}, {:.4}", latitude, longitude)),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed location")
    }

    /// Active gym with its own owner account; `at` places it on the map.
    pub async fn seed_gym(&self, name: &str, at: Option<(f64, f64)>) -> gym::Model {
        let owner = self
            .seed_user(&format!("{}@gyms.test", slug(name)), UserRole::GymAdmin)
            .await;
        let location_id = match at {
            Some((lat, lon)) => Some(self.seed_location(lat, lon).await.id),
            None => None,
        };
        gym::ActiveModel {
            name: Set(name.to_string()),
            description: Set(Some(format!("{} description", name))),
            owner_id: Set(owner.id),
            location_id: Set(location_id),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed gym")
    }

    pub async fn seed_pt(
        &self,
        handle: &str,
        specializations: &str,
        hourly_rate: Option<Decimal>,
        at: Option<(f64, f64)>,
    ) -> pt_user::Model {
        let account = self
            .seed_user(&format!("{}@pts.test", slug(handle)), UserRole::PtUser)
            .await;
        let location_id = match at {
            Some((lat, lon)) => Some(self.seed_location(lat, lon).await.id),
            None => None,
        };
        pt_user::ActiveModel {
            user_id: Set(account.id),
            bio: Set(Some(format!("Coach {}", handle))),
            specializations: Set(Some(specializations.to_string())),
            hourly_rate: Set(hourly_rate),
            location_id: Set(location_id),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed pt")
    }

    /// Approved, active offer.
    pub async fn seed_offer(&self, title: &str, owner: Owner<'_>, price: Decimal) -> offer::Model {
        self.seed_offer_with_status(title, owner, price, OfferStatus::Approved)
            .await
    }

    pub async fn seed_offer_with_status(
        &self,
        title: &str,
        owner: Owner<'_>,
        price: Decimal,
        status: OfferStatus,
    ) -> offer::Model {
        let (offer_type, gym_id, pt_user_id, created_by) = match owner {
            Owner::Gym(g) => (OfferType::GymOffer, Some(g.id), None, g.owner_id),
            Owner::Pt(p) => (OfferType::PtOffer, None, Some(p.id), p.user_id),
        };
        offer::ActiveModel {
            title: Set(title.to_string()),
            offer_type: Set(offer_type),
            gym_id: Set(gym_id),
            pt_user_id: Set(pt_user_id),
            created_by: Set(created_by),
            price: Set(price),
            status: Set(status),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed offer")
    }

    pub async fn deactivate_gym(&self, model: gym::Model) {
        let mut active: gym::ActiveModel = model.into();
        active.active = Set(false);
        active.update(self.db()).await.expect("deactivate gym");
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is json")
    }
}

fn slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}
