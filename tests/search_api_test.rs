mod common;

use axum::http::StatusCode;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;

use common::{Owner, TestApp};
use fitmarket_api::entities::{gym, offer::OfferStatus};
use fitmarket_api::metrics::SEARCH_METRICS;
use fitmarket_api::search::GeoStrategy;

const SAIGON_GYM: (f64, f64) = (10.7769, 106.7009);

fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .expect("array")
        .iter()
        .map(|item| item["id"].as_i64().expect("id"))
        .collect()
}

fn prices(list: &Value) -> Vec<f64> {
    let mut prices: Vec<f64> = list
        .as_array()
        .expect("array")
        .iter()
        .map(|item| item["price"].as_f64().expect("price"))
        .collect();
    prices.sort_by(f64::total_cmp);
    prices
}

/// Drops row timestamps so bodies from separately seeded databases compare equal.
fn without_timestamps(mut value: Value) -> Value {
    match &mut value {
        Value::Object(map) => {
            map.remove("createdAt");
            map.remove("updatedAt");
            for v in map.values_mut() {
                *v = without_timestamps(v.take());
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                *v = without_timestamps(v.take());
            }
        }
        _ => {}
    }
    value
}

async fn set_gym_rating(app: &TestApp, model: gym::Model, rating: rust_decimal::Decimal) {
    let mut active: gym::ActiveModel = model.into();
    active.average_rating = Set(rating);
    active.update(app.db()).await.expect("update gym rating");
}

#[tokio::test]
async fn nearby_reports_distance_for_saigon_gym() {
    let app = TestApp::new().await;
    let gym = app.seed_gym("Saigon Iron Gym", Some(SAIGON_GYM)).await;

    let (status, body) = app
        .get_json("/api/v1/search/nearby?lat=10.7800&lon=106.7050&radius=5")
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"].as_i64(), Some(gym.id));
    assert_eq!(results[0]["type"], "gym");
    let distance = results[0]["distance"].as_f64().unwrap();
    assert!((distance - 0.56).abs() < 0.01, "distance was {distance}");
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["totalPages"], 1);
    assert_eq!(body["searchCriteria"]["radius"].as_f64(), Some(5.0));
}

#[tokio::test]
async fn nearby_merges_kinds_sorted_by_distance_and_cuts_at_radius() {
    let app = TestApp::new().await;
    let near_gym = app.seed_gym("Near Gym", Some(SAIGON_GYM)).await;
    let pt = app
        .seed_pt("closest", "yoga", Some(dec!(20)), Some((10.7801, 106.7051)))
        .await;
    // ~25 km away and one without a location
    app.seed_gym("Far Gym", Some((10.95, 106.85))).await;
    app.seed_gym("Nowhere Gym", None).await;

    let (status, body) = app
        .get_json("/api/v1/search/nearby?lat=10.7800&lon=106.7050&radius=5")
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["type"], "pt");
    assert_eq!(results[0]["id"].as_i64(), Some(pt.id));
    assert_eq!(results[1]["type"], "gym");
    assert_eq!(results[1]["id"].as_i64(), Some(near_gym.id));
    for pair in results.windows(2) {
        assert!(pair[0]["distance"].as_f64() <= pair[1]["distance"].as_f64());
    }
    assert!(results.iter().all(|r| r["distance"].as_f64().unwrap() <= 5.0));
}

#[tokio::test]
async fn nearby_type_restricts_kind() {
    let app = TestApp::new().await;
    app.seed_gym("Near Gym", Some(SAIGON_GYM)).await;
    let pt = app.seed_pt("coach", "strength", None, Some(SAIGON_GYM)).await;

    let (status, body) = app
        .get_json("/api/v1/search/nearby?lat=10.78&lon=106.705&radius=5&type=pt")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body["results"]), vec![pt.id]);
    assert_eq!(body["searchCriteria"]["type"], "pt");
}

#[tokio::test]
async fn nearby_rejects_radius_above_limit() {
    let app = TestApp::new().await;
    app.seed_gym("Near Gym", Some(SAIGON_GYM)).await;

    let (status, body) = app
        .get_json("/api/v1/search/nearby?lat=10.78&lon=106.705&radius=150")
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("radius"));
    assert!(body.get("results").is_none());
}

#[tokio::test]
async fn nearby_validation_names_offending_field() {
    let app = TestApp::new().await;

    let cases = [
        ("/api/v1/search/nearby?lon=106.7&radius=5", "lat"),
        ("/api/v1/search/nearby?lat=abc&lon=106.7&radius=5", "lat"),
        ("/api/v1/search/nearby?lat=95&lon=106.7&radius=5", "lat"),
        ("/api/v1/search/nearby?lat=10&lon=181&radius=5", "lon"),
        ("/api/v1/search/nearby?lat=10&lon=106&radius=0", "radius"),
        ("/api/v1/search/nearby?lat=10&lon=106&radius=5&type=offer", "type"),
        ("/api/v1/search/nearby?lat=10&lon=106&radius=5&page=-1", "page"),
        ("/api/v1/search/nearby?lat=10&lon=106&radius=5&size=ten", "size"),
    ];
    for (uri, field) in cases {
        let (status, body) = app.get_json(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        let message = body["message"].as_str().unwrap();
        assert!(message.contains(field), "{uri}: {message}");
    }
}

#[tokio::test]
async fn offer_search_applies_inclusive_price_range() {
    let app = TestApp::new().await;
    let gym = app.seed_gym("Priced Gym", None).await;
    for (title, price) in [("A", dec!(50)), ("B", dec!(120)), ("C", dec!(300)), ("D", dec!(75))] {
        app.seed_offer(title, Owner::Gym(&gym), price).await;
    }

    let (status, body) = app
        .get_json("/api/v1/search/offers?minPrice=60&maxPrice=150")
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(prices(&body["content"]), vec![75.0, 120.0]);
    assert_eq!(body["totalElements"], 2);
}

#[tokio::test]
async fn offer_search_rejects_inverted_or_malformed_prices() {
    let app = TestApp::new().await;

    let (status, _) = app
        .get_json("/api/v1/search/offers?minPrice=200&maxPrice=100")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get_json("/api/v1/search/offers?minPrice=cheap").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("minPrice"));

    let (status, _) = app.get_json("/api/v1/search/offers?minRating=6").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn offer_search_hides_unapproved_and_filters_owner() {
    let app = TestApp::new().await;
    let gym_a = app.seed_gym("Gym A", None).await;
    let gym_b = app.seed_gym("Gym B", None).await;
    let visible = app.seed_offer("Visible", Owner::Gym(&gym_a), dec!(10)).await;
    app.seed_offer_with_status("Pending", Owner::Gym(&gym_a), dec!(10), OfferStatus::Pending)
        .await;
    let other = app.seed_offer("Other", Owner::Gym(&gym_b), dec!(10)).await;

    let (_, all) = app.get_json("/api/v1/search/offers").await;
    let mut all_ids = ids(&all["content"]);
    all_ids.sort();
    assert_eq!(all_ids, vec![visible.id, other.id]);

    let uri = format!("/api/v1/search/offers?gymId={}", gym_a.id);
    let (status, body) = app.get_json(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body["content"]), vec![visible.id]);

    let (_, typed) = app.get_json("/api/v1/search/offers?offerType=PT_OFFER").await;
    assert!(typed["content"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn search_all_applies_price_only_to_offers() {
    let app = TestApp::new().await;
    let gym = app.seed_gym("Budget Gym", None).await;
    let pt = app.seed_pt("pricey", "boxing", Some(dec!(500)), None).await;
    app.seed_offer("Cheap", Owner::Gym(&gym), dec!(10)).await;
    let kept = app.seed_offer("Mid", Owner::Pt(&pt), dec!(80)).await;

    let (status, body) = app.get_json("/api/v1/search?minPrice=50&maxPrice=100").await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(ids(&body["gyms"]), vec![gym.id]);
    assert_eq!(ids(&body["pts"]), vec![pt.id]);
    assert_eq!(ids(&body["offers"]), vec![kept.id]);
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn search_all_text_query_matches_each_kind() {
    let app = TestApp::new().await;
    let yoga_gym = app.seed_gym("Yoga Loft", None).await;
    app.seed_gym("Iron Temple", None).await;
    let yoga_pt = app.seed_pt("flow", "Yoga, mobility", None, None).await;
    let gym = app.seed_gym("Plain Gym", None).await;
    let yoga_offer = app.seed_offer("Morning YOGA pass", Owner::Gym(&gym), dec!(5)).await;

    let (status, body) = app.get_json("/api/v1/search?query=yoga").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body["gyms"]), vec![yoga_gym.id]);
    assert_eq!(ids(&body["pts"]), vec![yoga_pt.id]);
    assert_eq!(ids(&body["offers"]), vec![yoga_offer.id]);
}

#[tokio::test]
async fn search_all_geo_mode_locates_offers_by_owner() {
    let app = TestApp::new().await;
    let near = app.seed_gym("Near Gym", Some(SAIGON_GYM)).await;
    let far = app.seed_gym("Far Gym", Some((21.0285, 105.8542))).await;
    let near_offer = app.seed_offer("Near pass", Owner::Gym(&near), dec!(10)).await;
    app.seed_offer("Far pass", Owner::Gym(&far), dec!(10)).await;

    let (status, body) = app
        .get_json("/api/v1/search?latitude=10.78&longitude=106.705&radiusKm=10")
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(ids(&body["gyms"]), vec![near.id]);
    assert_eq!(ids(&body["offers"]), vec![near_offer.id]);
    assert!(body["offers"][0]["distance"].as_f64().is_some());
}

#[tokio::test]
async fn search_all_rejects_partial_geo_triple() {
    let app = TestApp::new().await;

    let (status, body) = app
        .get_json("/api/v1/search?latitude=10.78&longitude=106.705")
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("radiusKm"));
}

#[tokio::test]
async fn empty_gym_listing_ranks_by_rating_then_recency() {
    let app = TestApp::new().await;
    let low = app.seed_gym("Low", None).await;
    let high = app.seed_gym("High", None).await;
    let mid_old = app.seed_gym("Mid old", None).await;
    let mid_new = app.seed_gym("Mid new", None).await;
    let hidden = app.seed_gym("Hidden", None).await;

    set_gym_rating(&app, low.clone(), dec!(1.50)).await;
    set_gym_rating(&app, high.clone(), dec!(4.90)).await;
    set_gym_rating(&app, mid_old.clone(), dec!(3.00)).await;
    set_gym_rating(&app, mid_new.clone(), dec!(3.00)).await;
    app.deactivate_gym(hidden).await;

    let (status, body) = app.get_json("/api/v1/gyms").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ids(&body["content"]),
        vec![high.id, mid_new.id, mid_old.id, low.id]
    );
    assert_eq!(body["totalElements"], 4);
    assert_eq!(body["pageNumber"], 0);
    assert_eq!(body["pageSize"], 20);
}

#[tokio::test]
async fn gym_listing_pages_cover_every_gym_once() {
    let app = TestApp::new().await;
    let mut seeded = Vec::new();
    for i in 0..5 {
        seeded.push(app.seed_gym(&format!("Gym {i}"), None).await.id);
    }

    let mut seen = Vec::new();
    for page in 0..3 {
        let (status, body) = app
            .get_json(&format!("/api/v1/gyms?page={page}&size=2"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalPages"], 3);
        assert_eq!(body["first"], page == 0);
        assert_eq!(body["last"], page == 2);
        seen.extend(ids(&body["content"]));
    }

    seen.sort();
    seeded.sort();
    assert_eq!(seen, seeded);

    let (_, beyond) = app.get_json("/api/v1/gyms?page=7&size=2").await;
    assert!(beyond["content"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn oversized_page_size_is_clamped() {
    let app = TestApp::new().await;
    app.seed_gym("Only", None).await;

    let (status, body) = app.get_json("/api/v1/gyms?size=500").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pageSize"], 100);
}

#[tokio::test]
async fn page_beyond_storage_offset_range_is_rejected() {
    let app = TestApp::new().await;
    let gym = app.seed_gym("Offset Gym", Some(SAIGON_GYM)).await;
    let offer = app.seed_offer("Pass", Owner::Gym(&gym), dec!(5)).await;
    let huge = i64::MAX;

    for uri in [
        format!("/api/v1/gyms?page={huge}&size=20"),
        format!("/api/v1/pts?page={huge}"),
        format!("/api/v1/search/offers?page={huge}"),
        format!("/api/v1/search?page={huge}"),
        format!("/api/v1/search/nearby?lat=10.78&lon=106.70&radius=5&page={huge}"),
        format!("/api/v1/offers/{}/ratings?page={huge}", offer.id),
    ] {
        let (status, body) = app.get_json(&uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}: {body}");
        assert!(body["message"].as_str().unwrap().contains("page"), "{body}");
    }

    // Largest page whose offset still fits is simply empty
    let last = i64::MAX / 20;
    let (status, body) = app
        .get_json(&format!("/api/v1/gyms?page={last}&size=20"))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["content"].as_array().unwrap().is_empty());
    assert_eq!(body["totalElements"], 1);
}

#[tokio::test]
async fn naive_and_bounding_box_strategies_agree() {
    let bounded = TestApp::new().await;
    let naive = TestApp::with_config(|c| c.search_geo_strategy = GeoStrategy::Naive).await;

    for app in [&bounded, &naive] {
        app.seed_gym("Centre", Some(SAIGON_GYM)).await;
        app.seed_gym("Edge", Some((10.80, 106.73))).await;
        app.seed_gym("Far", Some((21.03, 105.85))).await;
        app.seed_gym("Unlocated", None).await;
        let pt = app.seed_pt("coach", "hiit", None, Some((10.79, 106.71))).await;
        app.seed_offer("Session", Owner::Pt(&pt), dec!(12)).await;
    }

    for uri in [
        "/api/v1/search/nearby?lat=10.78&lon=106.70&radius=10",
        "/api/v1/search/nearby?lat=10.78&lon=106.70&radius=1&type=gym",
        "/api/v1/search?latitude=10.78&longitude=106.70&radiusKm=10",
        "/api/v1/gyms?latitude=10.78&longitude=106.70&radiusKm=100",
    ] {
        let (s1, b1) = bounded.get_json(uri).await;
        let (s2, b2) = naive.get_json(uri).await;
        assert_eq!(s1, StatusCode::OK, "{uri}: {b1}");
        assert_eq!(s2, StatusCode::OK, "{uri}: {b2}");
        assert_eq!(without_timestamps(b1), without_timestamps(b2), "{uri}");
    }

    let (_, body) = naive
        .get_json("/api/v1/search/nearby?lat=10.78&lon=106.70&radius=10")
        .await;
    assert_eq!(body["results"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn geo_candidate_cap_truncates_by_id() {
    let app = TestApp::with_config(|c| c.search_geo_max_candidates = 1).await;
    let first = app.seed_gym("First", Some((10.79, 106.70))).await;
    app.seed_gym("Closer", Some((10.78, 106.70))).await;
    app.seed_gym("Closest", Some(SAIGON_GYM)).await;

    let before = SEARCH_METRICS.geo_cap_hits.get();
    let (status, body) = app
        .get_json("/api/v1/search/nearby?lat=10.7769&lon=106.7009&radius=5&type=gym")
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(ids(&body["results"]), vec![first.id]);
    assert!(SEARCH_METRICS.geo_cap_hits.get() > before);
}

#[tokio::test]
async fn text_query_is_case_insensitive_and_literal() {
    let app = TestApp::new().await;
    let iron = app.seed_gym("Saigon Iron Gym", None).await;
    app.seed_gym("Lotus Studio", None).await;

    let (_, body) = app.get_json("/api/v1/gyms?query=IRON").await;
    assert_eq!(ids(&body["content"]), vec![iron.id]);

    let (_, body) = app.get_json("/api/v1/gyms?query=%25").await;
    assert!(body["content"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn pt_listing_filters_specialization_and_rate() {
    let app = TestApp::new().await;
    let yoga_cheap = app.seed_pt("a", "Yoga", Some(dec!(20)), None).await;
    app.seed_pt("b", "Yoga", Some(dec!(90)), None).await;
    app.seed_pt("c", "Boxing", Some(dec!(25)), None).await;

    let (status, body) = app
        .get_json("/api/v1/pts?specialization=yoga&maxRate=50")
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(ids(&body["content"]), vec![yoga_cheap.id]);
    assert!(body["content"][0]["name"].as_str().is_some());
}

#[tokio::test]
async fn repeated_searches_are_identical() {
    let app = TestApp::new().await;
    for i in 0..4 {
        app.seed_gym(&format!("Gym {i}"), Some((10.77 + i as f64 * 0.001, 106.70)))
            .await;
    }

    let uri = "/api/v1/search/nearby?lat=10.77&lon=106.70&radius=3&size=3";
    let (_, first) = app.get_json(uri).await;
    let (_, second) = app.get_json(uri).await;
    assert_eq!(first, second);
}
