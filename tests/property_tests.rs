//! Property-based tests for the search engine.
//!
//! Distances, the bounding-box prefilter, geo cuts and pagination are
//! checked against generated corpora through the in-memory fetcher.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use fitmarket_api::entities::{gym, location};
use fitmarket_api::search::distance::EARTH_RADIUS_KM;
use fitmarket_api::search::fetcher::{FetchMode, Fetched};
use fitmarket_api::search::model::GymRecord;
use fitmarket_api::search::{
    distance_km, BoundingBox, CandidateFetcher, FilterSpec, GeoQuery, InMemoryCandidateFetcher,
    PageRequest, SearchRecord,
};
use fitmarket_api::search::EntityKind;

fn latitude() -> impl Strategy<Value = f64> {
    -90.0f64..=90.0
}

fn longitude() -> impl Strategy<Value = f64> {
    -180.0f64..=180.0
}

/// (id, rating in hundredths, created offset in seconds, optional position)
type GymSeed = (i64, i64, i64, Option<(f64, f64)>);

fn corpus_strategy() -> impl Strategy<Value = Vec<GymSeed>> {
    prop::collection::vec(
        (
            0i64..=500,
            0i64..86_400,
            prop::option::weighted(0.8, (10.0f64..11.5, 106.0f64..107.5)),
        ),
        0..60,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (rating, created, at))| (i as i64 + 1, rating, created, at))
            .collect()
    })
}

fn gym_record((id, rating, created, at): GymSeed) -> GymRecord {
    // Coarse timestamps so rating/recency ties actually occur
    let created_at = Utc.timestamp_opt(1_700_000_000 + (created / 3_600) * 3_600, 0).unwrap();
    GymRecord {
        gym: gym::Model {
            id,
            name: format!("Gym {id}"),
            description: None,
            phone_number: None,
            email: None,
            website: None,
            owner_id: 1,
            location_id: at.map(|_| id),
            active: true,
            verified: false,
            average_rating: Decimal::new(rating / 50 * 50, 2),
            rating_count: 0,
            created_at,
            updated_at: created_at,
        },
        location: at.map(|(latitude, longitude)| location::Model {
            id,
            latitude,
            longitude,
            address: format!("{id} Generated Road"),
            city: None,
            state: None,
            country: None,
            postal_code: None,
            formatted_address: None,
            created_at,
            updated_at: created_at,
        }),
    }
}

fn fetcher(seeds: &[GymSeed]) -> InMemoryCandidateFetcher {
    InMemoryCandidateFetcher::new(seeds.iter().copied().map(gym_record).collect(), vec![], vec![])
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
        .block_on(future)
}

fn filtered_page(fetcher: &InMemoryCandidateFetcher, page: u64, size: u64) -> Vec<i64> {
    let fetched = block_on(fetcher.fetch(
        EntityKind::Gym,
        &FilterSpec::new(),
        FetchMode::Filtered(PageRequest::new(page, size)),
    ))
    .expect("in-memory fetch");
    match fetched {
        Fetched::Page(page) => page.content.iter().map(|h| h.record.id()).collect(),
        Fetched::Within(_) => panic!("filtered mode returns a page"),
    }
}

// Property: Haversine behaves like a metric on the sphere
proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn distance_is_symmetric(a_lat in latitude(), a_lon in longitude(), b_lat in latitude(), b_lon in longitude()) {
        let ab = distance_km(a_lat, a_lon, b_lat, b_lon);
        let ba = distance_km(b_lat, b_lon, a_lat, a_lon);
        prop_assert!((ab - ba).abs() <= 1e-9 * ab.max(1.0), "{} vs {}", ab, ba);
    }

    #[test]
    fn distance_to_self_is_zero(lat in latitude(), lon in longitude()) {
        prop_assert_eq!(distance_km(lat, lon, lat, lon), 0.0);
    }

    #[test]
    fn distance_is_bounded_by_half_circumference(a_lat in latitude(), a_lon in longitude(), b_lat in latitude(), b_lon in longitude()) {
        let d = distance_km(a_lat, a_lon, b_lat, b_lon);
        prop_assert!(d >= 0.0);
        prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
    }
}

// Property: the bounding box never drops a point inside the radius
proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    #[test]
    fn bounding_box_contains_every_point_within_radius(
        lat in -89.0f64..89.0,
        lon in longitude(),
        d_lat in -1.0f64..1.0,
        d_lon in -1.5f64..1.5,
        radius in 0.1f64..=100.0,
    ) {
        let (p_lat, p_lon) = (lat + d_lat, lon + d_lon);
        prop_assume!((-90.0..=90.0).contains(&p_lat) && (-180.0..=180.0).contains(&p_lon));

        let bbox = BoundingBox::around(lat, lon, radius);
        if distance_km(lat, lon, p_lat, p_lon) <= radius {
            prop_assert!(bbox.contains(p_lat, p_lon), "{:?} misses ({}, {})", bbox, p_lat, p_lon);
        }
    }
}

// Property: geo mode returns exactly the located candidates inside the radius
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn geo_cut_is_exact(
        seeds in corpus_strategy(),
        lat in 10.0f64..11.5,
        lon in 106.0f64..107.5,
        radius in 0.5f64..=100.0,
    ) {
        let geo = GeoQuery::new(lat, lon, radius).unwrap();
        let fetched = block_on(fetcher(&seeds).fetch(EntityKind::Gym, &FilterSpec::new(), FetchMode::Geo(geo)))
            .unwrap();
        let hits = match fetched {
            Fetched::Within(hits) => hits,
            Fetched::Page(_) => panic!("geo mode returns the cut"),
        };

        for hit in &hits {
            let d = hit.distance_km.expect("geo hits carry a distance");
            prop_assert!(d <= radius);
        }

        let mut returned: Vec<i64> = hits.iter().map(|h| h.record.id()).collect();
        returned.sort();
        let expected: Vec<i64> = seeds
            .iter()
            .filter_map(|(id, _, _, at)| {
                let (p_lat, p_lon) = (*at)?;
                (distance_km(lat, lon, p_lat, p_lon) <= radius).then_some(*id)
            })
            .collect();
        prop_assert_eq!(returned, expected);
    }
}

// Property: pages concatenate to the full ranking, and reruns agree
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn pages_reassemble_full_ranking(seeds in corpus_strategy(), size in 1u64..=15) {
        let fetcher = fetcher(&seeds);
        let full = filtered_page(&fetcher, 0, 100);
        prop_assert_eq!(full.len(), seeds.len());

        let pages = (full.len() as u64).div_ceil(size);
        let mut stitched = Vec::new();
        for page in 0..pages {
            stitched.extend(filtered_page(&fetcher, page, size));
        }
        prop_assert_eq!(&stitched, &full);
        prop_assert!(filtered_page(&fetcher, pages, size).is_empty());
    }

    #[test]
    fn ranking_is_deterministic(seeds in corpus_strategy(), page in 0u64..4, size in 1u64..=20) {
        let fetcher = fetcher(&seeds);
        prop_assert_eq!(filtered_page(&fetcher, page, size), filtered_page(&fetcher, page, size));

        let mut reversed = seeds.clone();
        reversed.reverse();
        prop_assert_eq!(
            filtered_page(&fetcher, page, size),
            filtered_page(&self::fetcher(&reversed), page, size)
        );
    }

    #[test]
    fn filtered_order_is_rating_then_recency(seeds in corpus_strategy()) {
        let fetcher = fetcher(&seeds);
        let by_id: std::collections::HashMap<i64, GymRecord> = seeds
            .iter()
            .copied()
            .map(|s| (s.0, gym_record(s)))
            .collect();
        let ranked = filtered_page(&fetcher, 0, 100);
        for pair in ranked.windows(2) {
            let (a, b) = (&by_id[&pair[0]].gym, &by_id[&pair[1]].gym);
            let ordered = a.average_rating > b.average_rating
                || (a.average_rating == b.average_rating
                    && (a.created_at > b.created_at
                        || (a.created_at == b.created_at && a.id < b.id)));
            prop_assert!(ordered, "{} before {}", a.id, b.id);
        }
    }
}
