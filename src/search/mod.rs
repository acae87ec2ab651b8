//! Proximity and filtered search engine.
//!
//! A request is either answered in *filtered mode* (predicate pushed down
//! to storage, ordered by rating then recency, paged by storage) or in
//! *geo mode* (every active located candidate loaded, annotated with its
//! Haversine distance, cut at the radius, ordered by distance, then paged).

pub mod distance;
pub mod fetcher;
pub mod filter;
pub mod model;
pub mod params;
pub mod ranking;

use serde::Deserialize;
use strum::{Display, EnumString};

pub use distance::{distance_km, BoundingBox};
pub use fetcher::{
    CandidateFetcher, FetchMode, Fetched, GeoQuery, InMemoryCandidateFetcher,
    SeaOrmCandidateFetcher,
};
pub use filter::FilterSpec;
pub use model::{Candidate, Hit, SearchRecord};
pub use ranking::{Page, PageRequest, RankMode};

/// Searchable entity kinds. Variant order is the tie-break order when
/// results of different kinds share a sort key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Gym,
    Pt,
    Offer,
}

/// How geo mode loads candidates from storage. Both produce the same
/// results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GeoStrategy {
    /// Load every active, located candidate
    Naive,
    /// Restrict the load with a latitude/longitude rectangle first
    #[default]
    BoundingBox,
}
