//! Seed data script - populates the database with demo gyms, trainers and offers
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - 1 client, 2 gym admins and 2 trainer accounts
//! - 2 gyms and 2 PT profiles around Ho Chi Minh City
//! - 4 approved offers and a handful of ratings
//!
//! It finishes by printing a bearer token for the client account.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing::info;

use fitmarket_api::{
    auth::{encode_token, Claims},
    config::load_config,
    db::{establish_connection_from_app_config, run_migrations},
    entities::{
        gym, location,
        offer::{self, OfferStatus, OfferType},
        pt_user,
        user::{self, UserRole},
    },
    services::ratings::{CreateRatingRequest, RatingService},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("=== FitMarket Seed Data ===");

    let cfg = load_config()?;
    info!("Connecting to database: {}", cfg.database_url);
    let db = establish_connection_from_app_config(&cfg).await?;
    run_migrations(&db).await?;
    info!("Connected and migrated");

    let client = create_user(&db, "client@fitmarket.dev", "Lan", "Nguyen", UserRole::Client).await?;
    let owner_a = create_user(&db, "owner.a@fitmarket.dev", "Minh", "Tran", UserRole::GymAdmin).await?;
    let owner_b = create_user(&db, "owner.b@fitmarket.dev", "Hoa", "Le", UserRole::GymAdmin).await?;
    let coach_a = create_user(&db, "coach.a@fitmarket.dev", "Bao", "Pham", UserRole::PtUser).await?;
    let coach_b = create_user(&db, "coach.b@fitmarket.dev", "Thu", "Vo", UserRole::PtUser).await?;

    info!("Creating gyms...");
    let gym_a = create_gym(&db, &owner_a, "Saigon Iron Gym", 10.7769, 106.7009, "District 1").await?;
    let gym_b = create_gym(&db, &owner_b, "Thao Dien Fitness", 10.8031, 106.7380, "Thu Duc").await?;

    info!("Creating trainers...");
    let pt_a = create_pt(&db, &coach_a, "strength, mobility", dec!(35.00), 10.7800, 106.6950).await?;
    let pt_b = create_pt(&db, &coach_b, "yoga, pilates", dec!(25.00), 10.7626, 106.6602).await?;

    info!("Creating offers...");
    let offers = vec![
        create_offer(&db, "Monthly membership", OfferType::GymOffer, Some(gym_a.id), None, owner_a.id, dec!(49.00)).await?,
        create_offer(&db, "Day pass", OfferType::GymOffer, Some(gym_b.id), None, owner_b.id, dec!(8.50)).await?,
        create_offer(&db, "Strength coaching x10", OfferType::PtOffer, None, Some(pt_a.id), coach_a.id, dec!(300.00)).await?,
        create_offer(&db, "Yoga private session", OfferType::PtOffer, None, Some(pt_b.id), coach_b.id, dec!(30.00)).await?,
    ];
    info!("  Created {} offers", offers.len());

    info!("Creating ratings...");
    let ratings = RatingService::new(std::sync::Arc::new(db.clone()));
    for (offer, stars) in offers.iter().zip([5, 4, 5, 3]) {
        ratings
            .create(
                client.id,
                offer.id,
                CreateRatingRequest {
                    rating: stars,
                    comment: Some("Seeded review".to_string()),
                },
            )
            .await?;
    }

    let claims = Claims::for_user(
        client.id,
        vec!["CLIENT".to_string()],
        chrono::Duration::days(7),
    );
    let token = encode_token(&cfg.jwt_secret, &claims)?;

    info!("=== Seed Data Complete ===");
    info!("Try these API calls:");
    info!("  curl 'http://localhost:8080/api/v1/search/nearby?lat=10.7769&lon=106.7009&radius=5'");
    info!("  curl 'http://localhost:8080/api/v1/search?query=yoga'");
    info!("  curl 'http://localhost:8080/api/v1/search/offers?minRating=4'");
    info!("Bearer token for {}:", client.email);
    println!("{}", token);

    Ok(())
}

async fn create_user(
    db: &DatabaseConnection,
    email: &str,
    first_name: &str,
    last_name: &str,
    role: UserRole,
) -> anyhow::Result<user::Model> {
    Ok(user::ActiveModel {
        email: Set(email.to_string()),
        first_name: Set(first_name.to_string()),
        last_name: Set(last_name.to_string()),
        role: Set(role),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

async fn create_location(
    db: &DatabaseConnection,
    latitude: f64,
    longitude: f64,
    address: &str,
) -> anyhow::Result<location::Model> {
    Ok(location::ActiveModel {
        latitude: Set(latitude),
        longitude: Set(longitude),
        address: Set(address.to_string()),
        city: Set(Some("Ho Chi Minh City".to_string())),
        country: Set(Some("Vietnam".to_string())),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

async fn create_gym(
    db: &DatabaseConnection,
    owner: &user::Model,
    name: &str,
    latitude: f64,
    longitude: f64,
    address: &str,
) -> anyhow::Result<gym::Model> {
    let location = create_location(db, latitude, longitude, address).await?;
    Ok(gym::ActiveModel {
        name: Set(name.to_string()),
        description: Set(Some(format!("{} in {}", name, address))),
        owner_id: Set(owner.id),
        location_id: Set(Some(location.id)),
        verified: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

async fn create_pt(
    db: &DatabaseConnection,
    account: &user::Model,
    specializations: &str,
    hourly_rate: Decimal,
    latitude: f64,
    longitude: f64,
) -> anyhow::Result<pt_user::Model> {
    let location = create_location(db, latitude, longitude, "Trainer studio").await?;
    Ok(pt_user::ActiveModel {
        user_id: Set(account.id),
        bio: Set(Some(format!("Coach focused on {}", specializations))),
        specializations: Set(Some(specializations.to_string())),
        years_of_experience: Set(Some(5)),
        hourly_rate: Set(Some(hourly_rate)),
        location_id: Set(Some(location.id)),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

async fn create_offer(
    db: &DatabaseConnection,
    title: &str,
    offer_type: OfferType,
    gym_id: Option<i64>,
    pt_user_id: Option<i64>,
    created_by: i64,
    price: Decimal,
) -> anyhow::Result<offer::Model> {
    Ok(offer::ActiveModel {
        title: Set(title.to_string()),
        offer_type: Set(offer_type),
        gym_id: Set(gym_id),
        pt_user_id: Set(pt_user_id),
        created_by: Set(created_by),
        price: Set(price),
        status: Set(OfferStatus::Approved),
        ..Default::default()
    }
    .insert(db)
    .await?)
}
