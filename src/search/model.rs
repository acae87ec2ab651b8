//! Candidate records flowing through the engine and the JSON views
//! returned to callers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::distance::round_km;
use super::ranking::Page;
use super::EntityKind;
use crate::entities::{gym, location, offer, pt_user, user, OfferType};

/// What the ranker needs to know about any candidate.
pub trait SearchRecord {
    fn kind(&self) -> EntityKind;
    fn id(&self) -> i64;
    fn average_rating(&self) -> Decimal;
    fn created_at(&self) -> DateTime<Utc>;
    fn location(&self) -> Option<&location::Model>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct GymRecord {
    pub gym: gym::Model,
    pub location: Option<location::Model>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PtRecord {
    pub pt: pt_user::Model,
    pub user: Option<user::Model>,
    pub location: Option<location::Model>,
}

/// An offer carries its owner's (gym or PT) location.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferRecord {
    pub offer: offer::Model,
    pub location: Option<location::Model>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    Gym(GymRecord),
    Pt(PtRecord),
    Offer(OfferRecord),
}

impl SearchRecord for Candidate {
    fn kind(&self) -> EntityKind {
        match self {
            Candidate::Gym(_) => EntityKind::Gym,
            Candidate::Pt(_) => EntityKind::Pt,
            Candidate::Offer(_) => EntityKind::Offer,
        }
    }

    fn id(&self) -> i64 {
        match self {
            Candidate::Gym(r) => r.gym.id,
            Candidate::Pt(r) => r.pt.id,
            Candidate::Offer(r) => r.offer.id,
        }
    }

    fn average_rating(&self) -> Decimal {
        match self {
            Candidate::Gym(r) => r.gym.average_rating,
            Candidate::Pt(r) => r.pt.average_rating,
            Candidate::Offer(r) => r.offer.average_rating,
        }
    }

    fn created_at(&self) -> DateTime<Utc> {
        match self {
            Candidate::Gym(r) => r.gym.created_at,
            Candidate::Pt(r) => r.pt.created_at,
            Candidate::Offer(r) => r.offer.created_at,
        }
    }

    fn location(&self) -> Option<&location::Model> {
        match self {
            Candidate::Gym(r) => r.location.as_ref(),
            Candidate::Pt(r) => r.location.as_ref(),
            Candidate::Offer(r) => r.location.as_ref(),
        }
    }
}

/// A candidate plus its distance from the query point (geo mode only).
#[derive(Debug, Clone, PartialEq)]
pub struct Hit<R> {
    pub record: R,
    pub distance_km: Option<f64>,
}

impl<R> Hit<R> {
    pub fn unscored(record: R) -> Self {
        Self {
            record,
            distance_km: None,
        }
    }

    pub fn at(record: R, distance_km: f64) -> Self {
        Self {
            record,
            distance_km: Some(distance_km),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationView {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
}

impl From<&location::Model> for LocationView {
    fn from(l: &location::Model) -> Self {
        Self {
            id: l.id,
            latitude: l.latitude,
            longitude: l.longitude,
            address: l.address.clone(),
            city: l.city.clone(),
            state: l.state.clone(),
            country: l.country.clone(),
            postal_code: l.postal_code.clone(),
            formatted_address: l.formatted_address.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GymSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub verified: bool,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub average_rating: Decimal,
    pub rating_count: i32,
    pub location: Option<LocationView>,
    pub created_at: DateTime<Utc>,
    /// Kilometres from the query point, two decimals (geo mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl GymSummary {
    pub fn from_record(record: &GymRecord, distance_km: Option<f64>) -> Self {
        let gym = &record.gym;
        Self {
            id: gym.id,
            name: gym.name.clone(),
            description: gym.description.clone(),
            phone_number: gym.phone_number.clone(),
            email: gym.email.clone(),
            website: gym.website.clone(),
            verified: gym.verified,
            average_rating: gym.average_rating,
            rating_count: gym.rating_count,
            location: record.location.as_ref().map(LocationView::from),
            created_at: gym.created_at,
            distance: distance_km.map(round_km),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PtSummary {
    pub id: i64,
    pub user_id: i64,
    /// Trainer's full name
    pub name: Option<String>,
    pub bio: Option<String>,
    pub specializations: Option<String>,
    pub certifications: Option<String>,
    pub years_of_experience: Option<i32>,
    #[serde(with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub hourly_rate: Option<Decimal>,
    pub verified: bool,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub average_rating: Decimal,
    pub rating_count: i32,
    pub location: Option<LocationView>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl PtSummary {
    pub fn from_record(record: &PtRecord, distance_km: Option<f64>) -> Self {
        let pt = &record.pt;
        Self {
            id: pt.id,
            user_id: pt.user_id,
            name: record.user.as_ref().map(user::Model::full_name),
            bio: pt.bio.clone(),
            specializations: pt.specializations.clone(),
            certifications: pt.certifications.clone(),
            years_of_experience: pt.years_of_experience,
            hourly_rate: pt.hourly_rate,
            verified: pt.verified,
            average_rating: pt.average_rating,
            rating_count: pt.rating_count,
            location: record.location.as_ref().map(LocationView::from),
            created_at: pt.created_at,
            distance: distance_km.map(round_km),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfferSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub offer_type: OfferType,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub currency: String,
    pub duration_description: Option<String>,
    pub gym_id: Option<i64>,
    pub pt_user_id: Option<i64>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub average_rating: Decimal,
    pub rating_count: i32,
    /// Location of the owning gym or PT
    pub location: Option<LocationView>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl OfferSummary {
    pub fn from_record(record: &OfferRecord, distance_km: Option<f64>) -> Self {
        let offer = &record.offer;
        Self {
            id: offer.id,
            title: offer.title.clone(),
            description: offer.description.clone(),
            offer_type: offer.offer_type,
            price: offer.price,
            currency: offer.currency.clone(),
            duration_description: offer.duration_description.clone(),
            gym_id: offer.gym_id,
            pt_user_id: offer.pt_user_id,
            average_rating: offer.average_rating,
            rating_count: offer.rating_count,
            location: record.location.as_ref().map(LocationView::from),
            created_at: offer.created_at,
            distance: distance_km.map(round_km),
        }
    }
}

/// One `search nearby` result, tagged with its kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NearbyResult {
    Gym(GymSummary),
    Pt(PtSummary),
}

impl NearbyResult {
    pub fn distance(&self) -> Option<f64> {
        match self {
            NearbyResult::Gym(g) => g.distance,
            NearbyResult::Pt(p) => p.distance,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            NearbyResult::Gym(g) => g.id,
            NearbyResult::Pt(p) => p.id,
        }
    }
}

/// Pagination block of the `search nearby` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub page: u64,
    pub size: u64,
    pub total: u64,
    pub total_pages: u64,
    pub first: bool,
    pub last: bool,
}

impl<T> From<&Page<T>> for PaginationInfo {
    fn from(page: &Page<T>) -> Self {
        Self {
            page: page.page_number,
            size: page.page_size,
            total: page.total_elements,
            total_pages: page.total_pages,
            first: page.first,
            last: page.last,
        }
    }
}

/// Inputs echoed back by `search nearby`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NearbyCriteria {
    pub lat: f64,
    pub lon: f64,
    pub radius: f64,
    /// `gym`, `pt`, or absent for both
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NearbyResponse {
    pub results: Vec<NearbyResult>,
    pub pagination: PaginationInfo,
    pub search_criteria: NearbyCriteria,
}

/// Combined search across kinds. Each list is paged independently with
/// the same page and size; `total` is the sum of the list lengths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchAllResponse {
    pub gyms: Vec<GymSummary>,
    pub pts: Vec<PtSummary>,
    pub offers: Vec<OfferSummary>,
    pub total: u64,
}
