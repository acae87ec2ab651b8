//! Raw query-string parameters and their strict conversion into typed
//! search requests. Every numeric value arrives as text so that a
//! malformed number is reported against its field instead of being
//! coerced.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::IntoParams;

use super::fetcher::{GeoQuery, GeoRangeError};
use super::filter::FilterSpec;
use super::ranking::PageRequest;
use super::EntityKind;
use crate::config::AppConfig;
use crate::entities::OfferType;
use crate::errors::ServiceError;

/// Page size bounds taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: u64,
    pub max_size: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: super::ranking::DEFAULT_PAGE_SIZE,
            max_size: super::ranking::MAX_PAGE_SIZE,
        }
    }
}

impl From<&AppConfig> for PageLimits {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            default_size: cfg.api_default_page_size,
            max_size: cfg.api_max_page_size,
        }
    }
}

impl PageLimits {
    /// `page` must be a non-negative integer whose row offset fits a
    /// signed 64-bit integer; `size` must be an integer and is clamped to
    /// `[1, max_size]`.
    pub fn page_request(
        &self,
        page: Option<&str>,
        size: Option<&str>,
    ) -> Result<PageRequest, ServiceError> {
        let page = match page {
            None => 0,
            Some(raw) => {
                let value: i64 = parse_strict("page", raw, "must be an integer")?;
                u64::try_from(value)
                    .map_err(|_| ServiceError::invalid_field("page", "must not be negative"))?
            }
        };
        let size = match size {
            None => self.default_size,
            Some(raw) => {
                let value: i64 = parse_strict("size", raw, "must be an integer")?;
                value.max(1) as u64
            }
        };
        let size = size.clamp(1, self.max_size.max(1));
        // Storage binds the row offset as a signed 64-bit integer
        match page.checked_mul(size) {
            Some(offset) if offset <= i64::MAX as u64 => Ok(PageRequest::new(page, size)),
            _ => Err(ServiceError::invalid_field("page", "is too large")),
        }
    }
}

fn parse_strict<T: FromStr>(field: &str, raw: &str, reason: &str) -> Result<T, ServiceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::invalid_field(field, reason));
    }
    trimmed
        .parse()
        .map_err(|_| ServiceError::invalid_field(field, reason))
}

pub fn parse_f64(field: &str, raw: Option<&str>) -> Result<Option<f64>, ServiceError> {
    raw.map(|r| {
        let v: f64 = parse_strict(field, r, "must be a number")?;
        if v.is_finite() {
            Ok(v)
        } else {
            Err(ServiceError::invalid_field(field, "must be a finite number"))
        }
    })
    .transpose()
}

pub fn require_f64(field: &str, raw: Option<&str>) -> Result<f64, ServiceError> {
    parse_f64(field, raw)?.ok_or_else(|| ServiceError::invalid_field(field, "is required"))
}

pub fn parse_decimal(field: &str, raw: Option<&str>) -> Result<Option<Decimal>, ServiceError> {
    raw.map(|r| parse_strict(field, r, "must be a number"))
        .transpose()
}

pub fn parse_id(field: &str, raw: Option<&str>) -> Result<Option<i64>, ServiceError> {
    raw.map(|r| parse_strict(field, r, "must be an integer"))
        .transpose()
}

fn geo_error(fields: [&str; 3], err: GeoRangeError) -> ServiceError {
    let field = match err {
        GeoRangeError::Latitude => fields[0],
        GeoRangeError::Longitude => fields[1],
        GeoRangeError::Radius => fields[2],
    };
    ServiceError::invalid_field(field, err)
}

/// Optional coordinate triple: all present, or all absent.
pub fn optional_geo(
    fields: [&str; 3],
    latitude: Option<&str>,
    longitude: Option<&str>,
    radius: Option<&str>,
) -> Result<Option<GeoQuery>, ServiceError> {
    match (latitude, longitude, radius) {
        (None, None, None) => Ok(None),
        (Some(_), Some(_), Some(_)) => required_geo(fields, latitude, longitude, radius).map(Some),
        _ => Err(ServiceError::ValidationError(format!(
            "{}, {} and {} must be supplied together",
            fields[0], fields[1], fields[2]
        ))),
    }
}

fn required_geo(
    fields: [&str; 3],
    latitude: Option<&str>,
    longitude: Option<&str>,
    radius: Option<&str>,
) -> Result<GeoQuery, ServiceError> {
    let lat = require_f64(fields[0], latitude)?;
    let lon = require_f64(fields[1], longitude)?;
    let radius = require_f64(fields[2], radius)?;
    GeoQuery::new(lat, lon, radius).map_err(|e| geo_error(fields, e))
}

const NEARBY_FIELDS: [&str; 3] = ["lat", "lon", "radius"];
const GEO_FIELDS: [&str; 3] = ["latitude", "longitude", "radiusKm"];

/// Query of `GET /search/nearby`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NearbyParams {
    /// Latitude of the query point, [-90, 90]
    #[param(value_type = f64)]
    pub lat: Option<String>,
    /// Longitude of the query point, [-180, 180]
    #[param(value_type = f64)]
    pub lon: Option<String>,
    /// Radius in kilometres, (0, 100]
    #[param(value_type = f64)]
    pub radius: Option<String>,
    /// `gym` or `pt`; both when absent
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[param(value_type = Option<u64>)]
    pub page: Option<String>,
    #[param(value_type = Option<u64>)]
    pub size: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearbyRequest {
    pub geo: GeoQuery,
    pub kind: Option<EntityKind>,
    pub page: PageRequest,
}

impl NearbyParams {
    pub fn into_request(self, limits: &PageLimits) -> Result<NearbyRequest, ServiceError> {
        let geo = required_geo(
            NEARBY_FIELDS,
            self.lat.as_deref(),
            self.lon.as_deref(),
            self.radius.as_deref(),
        )?;
        let kind = self
            .kind
            .as_deref()
            .map(|raw| match EntityKind::from_str(&raw.trim().to_lowercase()) {
                Ok(k @ (EntityKind::Gym | EntityKind::Pt)) => Ok(k),
                _ => Err(ServiceError::invalid_field("type", "must be one of gym, pt")),
            })
            .transpose()?;
        let page = limits.page_request(self.page.as_deref(), self.size.as_deref())?;
        Ok(NearbyRequest { geo, kind, page })
    }
}

/// Filter, optional geo constraint and page shared by the combined
/// search and the per-kind listings.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub filter: FilterSpec,
    pub geo: Option<GeoQuery>,
    pub page: PageRequest,
}

/// Query of `GET /search`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct SearchAllParams {
    /// Case-insensitive substring matched against names, titles,
    /// descriptions, bios and specializations
    pub query: Option<String>,
    #[param(value_type = Option<f64>)]
    pub latitude: Option<String>,
    #[param(value_type = Option<f64>)]
    pub longitude: Option<String>,
    #[param(value_type = Option<f64>)]
    pub radius_km: Option<String>,
    /// Lower offer price bound, inclusive
    #[param(value_type = Option<f64>)]
    pub min_price: Option<String>,
    /// Upper offer price bound, inclusive
    #[param(value_type = Option<f64>)]
    pub max_price: Option<String>,
    #[param(value_type = Option<u64>)]
    pub page: Option<String>,
    #[param(value_type = Option<u64>)]
    pub size: Option<String>,
}

impl SearchAllParams {
    pub fn into_request(self, limits: &PageLimits) -> Result<SearchRequest, ServiceError> {
        let mut filter = FilterSpec::new().with_price_range(
            parse_decimal("minPrice", self.min_price.as_deref())?,
            parse_decimal("maxPrice", self.max_price.as_deref())?,
        );
        if let Some(q) = self.query {
            filter = filter.with_text_query(q);
        }
        filter.validate()?;
        Ok(SearchRequest {
            filter,
            geo: optional_geo(
                GEO_FIELDS,
                self.latitude.as_deref(),
                self.longitude.as_deref(),
                self.radius_km.as_deref(),
            )?,
            page: limits.page_request(self.page.as_deref(), self.size.as_deref())?,
        })
    }
}

/// Query of `GET /search/offers`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct OfferSearchParams {
    pub query: Option<String>,
    /// `GYM_OFFER` or `PT_OFFER`
    pub offer_type: Option<String>,
    #[param(value_type = Option<f64>)]
    pub min_price: Option<String>,
    #[param(value_type = Option<f64>)]
    pub max_price: Option<String>,
    /// Minimum average rating, [0, 5]
    #[param(value_type = Option<f64>)]
    pub min_rating: Option<String>,
    #[param(value_type = Option<i64>)]
    pub gym_id: Option<String>,
    #[param(value_type = Option<i64>)]
    pub pt_user_id: Option<String>,
    #[param(value_type = Option<u64>)]
    pub page: Option<String>,
    #[param(value_type = Option<u64>)]
    pub size: Option<String>,
}

impl OfferSearchParams {
    pub fn into_request(self, limits: &PageLimits) -> Result<SearchRequest, ServiceError> {
        let mut filter = FilterSpec::new().with_price_range(
            parse_decimal("minPrice", self.min_price.as_deref())?,
            parse_decimal("maxPrice", self.max_price.as_deref())?,
        );
        if let Some(q) = self.query {
            filter = filter.with_text_query(q);
        }
        if let Some(raw) = self.offer_type.as_deref() {
            let offer_type = OfferType::from_str(&raw.trim().to_uppercase()).map_err(|_| {
                ServiceError::invalid_field("offerType", "must be one of GYM_OFFER, PT_OFFER")
            })?;
            filter = filter.with_offer_type(offer_type);
        }
        if let Some(r) = parse_decimal("minRating", self.min_rating.as_deref())? {
            filter = filter.with_min_rating(r);
        }
        if let Some(id) = parse_id("gymId", self.gym_id.as_deref())? {
            filter = filter.with_gym(id);
        }
        if let Some(id) = parse_id("ptUserId", self.pt_user_id.as_deref())? {
            filter = filter.with_pt_user(id);
        }
        filter.validate()?;
        Ok(SearchRequest {
            filter,
            geo: None,
            page: limits.page_request(self.page.as_deref(), self.size.as_deref())?,
        })
    }
}

/// Query of `GET /gyms`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct GymSearchParams {
    pub query: Option<String>,
    #[param(value_type = Option<f64>)]
    pub latitude: Option<String>,
    #[param(value_type = Option<f64>)]
    pub longitude: Option<String>,
    #[param(value_type = Option<f64>)]
    pub radius_km: Option<String>,
    #[param(value_type = Option<u64>)]
    pub page: Option<String>,
    #[param(value_type = Option<u64>)]
    pub size: Option<String>,
}

impl GymSearchParams {
    pub fn into_request(self, limits: &PageLimits) -> Result<SearchRequest, ServiceError> {
        let mut filter = FilterSpec::new();
        if let Some(q) = self.query {
            filter = filter.with_text_query(q);
        }
        Ok(SearchRequest {
            filter,
            geo: optional_geo(
                GEO_FIELDS,
                self.latitude.as_deref(),
                self.longitude.as_deref(),
                self.radius_km.as_deref(),
            )?,
            page: limits.page_request(self.page.as_deref(), self.size.as_deref())?,
        })
    }
}

/// Query of `GET /pts`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct PtSearchParams {
    pub query: Option<String>,
    /// Substring of the trainer's specializations
    pub specialization: Option<String>,
    /// Lower hourly-rate bound, inclusive
    #[param(value_type = Option<f64>)]
    pub min_rate: Option<String>,
    /// Upper hourly-rate bound, inclusive
    #[param(value_type = Option<f64>)]
    pub max_rate: Option<String>,
    #[param(value_type = Option<f64>)]
    pub latitude: Option<String>,
    #[param(value_type = Option<f64>)]
    pub longitude: Option<String>,
    #[param(value_type = Option<f64>)]
    pub radius_km: Option<String>,
    #[param(value_type = Option<u64>)]
    pub page: Option<String>,
    #[param(value_type = Option<u64>)]
    pub size: Option<String>,
}

impl PtSearchParams {
    pub fn into_request(self, limits: &PageLimits) -> Result<SearchRequest, ServiceError> {
        let min_rate = parse_decimal("minRate", self.min_rate.as_deref())?;
        let max_rate = parse_decimal("maxRate", self.max_rate.as_deref())?;
        for (field, value) in [("minRate", min_rate), ("maxRate", max_rate)] {
            if matches!(value, Some(v) if v < Decimal::ZERO) {
                return Err(ServiceError::invalid_field(field, "must not be negative"));
            }
        }
        if let (Some(min), Some(max)) = (min_rate, max_rate) {
            if min > max {
                return Err(ServiceError::invalid_field("minRate", "must not exceed maxRate"));
            }
        }

        let mut filter = FilterSpec::new().with_price_range(min_rate, max_rate);
        if let Some(q) = self.query {
            filter = filter.with_text_query(q);
        }
        if let Some(s) = self.specialization {
            filter = filter.with_specialization(s);
        }
        Ok(SearchRequest {
            filter,
            geo: optional_geo(
                GEO_FIELDS,
                self.latitude.as_deref(),
                self.longitude.as_deref(),
                self.radius_km.as_deref(),
            )?,
            page: limits.page_request(self.page.as_deref(), self.size.as_deref())?,
        })
    }
}

/// Plain `page`/`size` query.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    #[param(value_type = Option<u64>)]
    pub page: Option<String>,
    #[param(value_type = Option<u64>)]
    pub size: Option<String>,
}

impl PageParams {
    pub fn into_request(self, limits: &PageLimits) -> Result<PageRequest, ServiceError> {
        limits.page_request(self.page.as_deref(), self.size.as_deref())
    }
}
