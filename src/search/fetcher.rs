//! Candidate Fetcher: loads gyms, PTs and offers either page-by-page
//! through a storage predicate or, for geo queries, every located
//! candidate followed by an exact distance cut.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::sea_query::SelectStatement;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait,
};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::distance::{distance_km, BoundingBox, LonRange};
use super::filter::FilterSpec;
use super::model::{Candidate, GymRecord, Hit, OfferRecord, PtRecord, SearchRecord};
use super::ranking::{paginate, rank, Page, PageRequest, RankMode};
use super::{EntityKind, GeoStrategy};
use crate::entities::{gym, location, offer, pt_user, user};
use crate::errors::ServiceError;
use crate::metrics::SEARCH_METRICS;

pub const MAX_RADIUS_KM: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeoRangeError {
    #[error("must be between -90 and 90")]
    Latitude,
    #[error("must be between -180 and 180")]
    Longitude,
    #[error("must be greater than 0 and at most 100 km")]
    Radius,
}

/// Validated query point and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl GeoQuery {
    pub fn new(latitude: f64, longitude: f64, radius_km: f64) -> Result<Self, GeoRangeError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoRangeError::Latitude);
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoRangeError::Longitude);
        }
        if !radius_km.is_finite() || radius_km <= 0.0 || radius_km > MAX_RADIUS_KM {
            return Err(GeoRangeError::Radius);
        }
        Ok(Self {
            latitude,
            longitude,
            radius_km,
        })
    }

    pub fn distance_to(&self, loc: &location::Model) -> f64 {
        distance_km(self.latitude, self.longitude, loc.latitude, loc.longitude)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::around(self.latitude, self.longitude, self.radius_km)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FetchMode {
    Filtered(PageRequest),
    Geo(GeoQuery),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// Filtered mode: already ranked and paged
    Page(Page<Hit<Candidate>>),
    /// Geo mode: every candidate within the radius, unranked
    Within(Vec<Hit<Candidate>>),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CandidateFetcher: Send + Sync {
    async fn fetch(
        &self,
        kind: EntityKind,
        filter: &FilterSpec,
        mode: FetchMode,
    ) -> Result<Fetched, ServiceError>;
}

/// Annotates located candidates with their distance and keeps those
/// within the radius. Unlocated candidates are dropped.
pub fn retain_within<I>(candidates: I, geo: &GeoQuery) -> Vec<Hit<Candidate>>
where
    I: IntoIterator<Item = Candidate>,
{
    candidates
        .into_iter()
        .filter_map(|c| {
            let d = geo.distance_to(c.location()?);
            (d <= geo.radius_km).then(|| Hit::at(c, d))
        })
        .collect()
}

pub struct SeaOrmCandidateFetcher {
    db: Arc<DatabaseConnection>,
    strategy: GeoStrategy,
    max_candidates: u64,
}

impl SeaOrmCandidateFetcher {
    pub fn new(db: Arc<DatabaseConnection>, strategy: GeoStrategy, max_candidates: u64) -> Self {
        Self {
            db,
            strategy,
            max_candidates: max_candidates.max(1),
        }
    }

    async fn filtered(
        &self,
        kind: EntityKind,
        filter: &FilterSpec,
        request: PageRequest,
    ) -> Result<Page<Hit<Candidate>>, ServiceError> {
        let db = self.db.as_ref();
        let cond = filter.condition(kind);

        let (candidates, total) = match kind {
            EntityKind::Gym => {
                let query = gym::Entity::find().filter(cond);
                let total = query.clone().count(db).await?;
                let rows = query
                    .order_by_desc(gym::Column::AverageRating)
                    .order_by_desc(gym::Column::CreatedAt)
                    .order_by_asc(gym::Column::Id)
                    .limit(request.size)
                    .offset(request.offset())
                    .all(db)
                    .await?;
                let records = gym_records(db, rows).await?;
                (records.into_iter().map(Candidate::Gym).collect::<Vec<_>>(), total)
            }
            EntityKind::Pt => {
                let query = pt_user::Entity::find().filter(cond);
                let total = query.clone().count(db).await?;
                let rows = query
                    .order_by_desc(pt_user::Column::AverageRating)
                    .order_by_desc(pt_user::Column::CreatedAt)
                    .order_by_asc(pt_user::Column::Id)
                    .limit(request.size)
                    .offset(request.offset())
                    .all(db)
                    .await?;
                let records = pt_records(db, rows).await?;
                (records.into_iter().map(Candidate::Pt).collect(), total)
            }
            EntityKind::Offer => {
                let query = offer::Entity::find().filter(cond);
                let total = query.clone().count(db).await?;
                let rows = query
                    .order_by_desc(offer::Column::AverageRating)
                    .order_by_desc(offer::Column::CreatedAt)
                    .order_by_asc(offer::Column::Id)
                    .limit(request.size)
                    .offset(request.offset())
                    .all(db)
                    .await?;
                let records = offer_records(db, rows).await?;
                (records.into_iter().map(Candidate::Offer).collect(), total)
            }
        };

        Ok(Page::new(
            candidates.into_iter().map(Hit::unscored).collect(),
            request,
            total,
        ))
    }

    async fn within(
        &self,
        kind: EntityKind,
        filter: &FilterSpec,
        geo: GeoQuery,
    ) -> Result<Vec<Hit<Candidate>>, ServiceError> {
        let db = self.db.as_ref();
        let located = self.located_ids(&geo);
        let cap = self.max_candidates.saturating_add(1);

        let candidates: Vec<Candidate> = match kind {
            EntityKind::Gym => {
                let rows = gym::Entity::find()
                    .filter(filter.condition(kind))
                    .filter(gym::Column::LocationId.in_subquery(located))
                    .order_by_asc(gym::Column::Id)
                    .limit(cap)
                    .all(db)
                    .await?;
                let rows = self.enforce_cap(kind, rows);
                gym_records(db, rows)
                    .await?
                    .into_iter()
                    .map(Candidate::Gym)
                    .collect()
            }
            EntityKind::Pt => {
                let rows = pt_user::Entity::find()
                    .filter(filter.condition(kind))
                    .filter(pt_user::Column::LocationId.in_subquery(located))
                    .order_by_asc(pt_user::Column::Id)
                    .limit(cap)
                    .all(db)
                    .await?;
                let rows = self.enforce_cap(kind, rows);
                pt_records(db, rows)
                    .await?
                    .into_iter()
                    .map(Candidate::Pt)
                    .collect()
            }
            EntityKind::Offer => {
                let owned_by_located = Condition::any()
                    .add(offer::Column::GymId.in_subquery(
                        gym::Entity::find()
                            .select_only()
                            .column(gym::Column::Id)
                            .filter(gym::Column::LocationId.in_subquery(located.clone()))
                            .into_query(),
                    ))
                    .add(offer::Column::PtUserId.in_subquery(
                        pt_user::Entity::find()
                            .select_only()
                            .column(pt_user::Column::Id)
                            .filter(pt_user::Column::LocationId.in_subquery(located))
                            .into_query(),
                    ));
                let rows = offer::Entity::find()
                    .filter(filter.condition(kind))
                    .filter(owned_by_located)
                    .order_by_asc(offer::Column::Id)
                    .limit(cap)
                    .all(db)
                    .await?;
                let rows = self.enforce_cap(kind, rows);
                offer_records(db, rows)
                    .await?
                    .into_iter()
                    .map(Candidate::Offer)
                    .collect()
            }
        };

        SEARCH_METRICS.geo_candidates.observe(candidates.len() as f64);
        debug!(
            kind = %kind,
            loaded = candidates.len(),
            strategy = %self.strategy,
            "Geo candidates loaded"
        );

        Ok(retain_within(candidates, &geo))
    }

    /// Ids of locations eligible for a geo query under the configured
    /// strategy.
    fn located_ids(&self, geo: &GeoQuery) -> SelectStatement {
        let mut query = location::Entity::find()
            .select_only()
            .column(location::Column::Id);
        if self.strategy == GeoStrategy::BoundingBox {
            query = query.filter(bounding_box_condition(&geo.bounding_box()));
        }
        query.into_query()
    }

    fn enforce_cap<M>(&self, kind: EntityKind, mut rows: Vec<M>) -> Vec<M> {
        let cap = usize::try_from(self.max_candidates).unwrap_or(usize::MAX);
        if rows.len() > cap {
            warn!(
                kind = %kind,
                cap = self.max_candidates,
                "Geo candidate cap reached; results beyond the cap are not considered"
            );
            SEARCH_METRICS.geo_cap_hits.inc();
            rows.truncate(cap);
        }
        rows
    }
}

#[async_trait]
impl CandidateFetcher for SeaOrmCandidateFetcher {
    #[instrument(skip(self, filter))]
    async fn fetch(
        &self,
        kind: EntityKind,
        filter: &FilterSpec,
        mode: FetchMode,
    ) -> Result<Fetched, ServiceError> {
        match mode {
            FetchMode::Filtered(request) => {
                self.filtered(kind, filter, request).await.map(Fetched::Page)
            }
            FetchMode::Geo(geo) => self.within(kind, filter, geo).await.map(Fetched::Within),
        }
    }
}

fn bounding_box_condition(bbox: &BoundingBox) -> Condition {
    let cond = Condition::all().add(location::Column::Latitude.between(bbox.min_lat, bbox.max_lat));
    match bbox.lon {
        LonRange::Any => cond,
        LonRange::Between(west, east) => cond.add(location::Column::Longitude.between(west, east)),
    }
}

async fn locations_by_id<C: ConnectionTrait>(
    db: &C,
    ids: HashSet<i64>,
) -> Result<HashMap<i64, location::Model>, DbErr> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(location::Entity::find()
        .filter(location::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|l| (l.id, l))
        .collect())
}

pub(crate) async fn gym_records<C: ConnectionTrait>(
    db: &C,
    rows: Vec<gym::Model>,
) -> Result<Vec<GymRecord>, DbErr> {
    let locations = locations_by_id(db, rows.iter().filter_map(|g| g.location_id).collect()).await?;
    Ok(rows
        .into_iter()
        .map(|gym| GymRecord {
            location: gym.location_id.and_then(|id| locations.get(&id).cloned()),
            gym,
        })
        .collect())
}

pub(crate) async fn pt_records<C: ConnectionTrait>(
    db: &C,
    rows: Vec<pt_user::Model>,
) -> Result<Vec<PtRecord>, DbErr> {
    let locations = locations_by_id(db, rows.iter().filter_map(|p| p.location_id).collect()).await?;
    let user_ids: HashSet<i64> = rows.iter().map(|p| p.user_id).collect();
    let users: HashMap<i64, user::Model> = if user_ids.is_empty() {
        HashMap::new()
    } else {
        user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect()
    };
    Ok(rows
        .into_iter()
        .map(|pt| PtRecord {
            location: pt.location_id.and_then(|id| locations.get(&id).cloned()),
            user: users.get(&pt.user_id).cloned(),
            pt,
        })
        .collect())
}

/// Resolves each offer's location through its owning gym or PT.
pub(crate) async fn offer_records<C: ConnectionTrait>(
    db: &C,
    rows: Vec<offer::Model>,
) -> Result<Vec<OfferRecord>, DbErr> {
    let gym_ids: HashSet<i64> = rows.iter().filter_map(|o| o.gym_id).collect();
    let pt_ids: HashSet<i64> = rows.iter().filter_map(|o| o.pt_user_id).collect();

    let gym_locations: HashMap<i64, Option<i64>> = if gym_ids.is_empty() {
        HashMap::new()
    } else {
        gym::Entity::find()
            .filter(gym::Column::Id.is_in(gym_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|g| (g.id, g.location_id))
            .collect()
    };
    let pt_locations: HashMap<i64, Option<i64>> = if pt_ids.is_empty() {
        HashMap::new()
    } else {
        pt_user::Entity::find()
            .filter(pt_user::Column::Id.is_in(pt_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.id, p.location_id))
            .collect()
    };

    let owner_location = |o: &offer::Model| -> Option<i64> {
        match (o.gym_id, o.pt_user_id) {
            (Some(g), _) => gym_locations.get(&g).copied().flatten(),
            (None, Some(p)) => pt_locations.get(&p).copied().flatten(),
            (None, None) => None,
        }
    };

    let locations =
        locations_by_id(db, rows.iter().filter_map(|o| owner_location(o)).collect()).await?;
    Ok(rows
        .into_iter()
        .map(|offer| OfferRecord {
            location: owner_location(&offer).and_then(|id| locations.get(&id).cloned()),
            offer,
        })
        .collect())
}

/// Fetcher over records held in memory. Same semantics as the storage
/// fetcher, without the candidate cap.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCandidateFetcher {
    gyms: Vec<GymRecord>,
    pts: Vec<PtRecord>,
    offers: Vec<OfferRecord>,
}

impl InMemoryCandidateFetcher {
    pub fn new(gyms: Vec<GymRecord>, pts: Vec<PtRecord>, offers: Vec<OfferRecord>) -> Self {
        Self { gyms, pts, offers }
    }

    fn matching(&self, kind: EntityKind, filter: &FilterSpec) -> Vec<Candidate> {
        match kind {
            EntityKind::Gym => self
                .gyms
                .iter()
                .filter(|g| filter.matches_gym(g))
                .cloned()
                .map(Candidate::Gym)
                .collect(),
            EntityKind::Pt => self
                .pts
                .iter()
                .filter(|p| filter.matches_pt(p))
                .cloned()
                .map(Candidate::Pt)
                .collect(),
            EntityKind::Offer => self
                .offers
                .iter()
                .filter(|o| filter.matches_offer(o))
                .cloned()
                .map(Candidate::Offer)
                .collect(),
        }
    }
}

#[async_trait]
impl CandidateFetcher for InMemoryCandidateFetcher {
    async fn fetch(
        &self,
        kind: EntityKind,
        filter: &FilterSpec,
        mode: FetchMode,
    ) -> Result<Fetched, ServiceError> {
        let candidates = self.matching(kind, filter);
        match mode {
            FetchMode::Filtered(request) => {
                let mut hits: Vec<_> = candidates.into_iter().map(Hit::unscored).collect();
                rank(&mut hits, RankMode::RatingRecency);
                Ok(Fetched::Page(paginate(hits, request)))
            }
            FetchMode::Geo(geo) => Ok(Fetched::Within(retain_within(candidates, &geo))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn loc(id: i64, latitude: f64, longitude: f64) -> location::Model {
        let now = Utc::now();
        location::Model {
            id,
            latitude,
            longitude,
            address: format!("{id} Test Street"),
            city: None,
            state: None,
            country: None,
            postal_code: None,
            formatted_address: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn gym_at(id: i64, location: Option<location::Model>) -> GymRecord {
        let now = Utc::now();
        GymRecord {
            gym: gym::Model {
                id,
                name: format!("Gym {id}"),
                description: None,
                phone_number: None,
                email: None,
                website: None,
                owner_id: 1,
                location_id: location.as_ref().map(|l| l.id),
                active: true,
                verified: false,
                average_rating: dec!(0),
                rating_count: 0,
                created_at: now,
                updated_at: now,
            },
            location,
        }
    }

    #[test]
    fn geo_query_rejects_out_of_range_inputs() {
        assert_matches!(GeoQuery::new(91.0, 0.0, 5.0), Err(GeoRangeError::Latitude));
        assert_matches!(GeoQuery::new(0.0, -180.5, 5.0), Err(GeoRangeError::Longitude));
        assert_matches!(GeoQuery::new(0.0, 0.0, 150.0), Err(GeoRangeError::Radius));
        assert_matches!(GeoQuery::new(0.0, 0.0, 0.0), Err(GeoRangeError::Radius));
        assert_matches!(GeoQuery::new(f64::NAN, 0.0, 1.0), Err(GeoRangeError::Latitude));
        assert!(GeoQuery::new(-90.0, 180.0, 100.0).is_ok());
    }

    #[test]
    fn retain_within_drops_far_and_unlocated_candidates() {
        let geo = GeoQuery::new(10.7800, 106.7050, 5.0).unwrap();
        let candidates = vec![
            Candidate::Gym(gym_at(1, Some(loc(1, 10.7769, 106.7009)))),
            Candidate::Gym(gym_at(2, Some(loc(2, 21.0285, 105.8542)))),
            Candidate::Gym(gym_at(3, None)),
        ];
        let hits = retain_within(candidates, &geo);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id(), 1);
        let d = hits[0].distance_km.unwrap();
        assert!(d <= geo.radius_km);
        assert!((d - 0.56).abs() < 0.01);
    }

    #[tokio::test]
    async fn in_memory_filtered_fetch_pages_active_records() {
        let mut inactive = gym_at(3, None);
        inactive.gym.active = false;
        let fetcher =
            InMemoryCandidateFetcher::new(vec![gym_at(1, None), gym_at(2, None), inactive], vec![], vec![]);

        let fetched = fetcher
            .fetch(
                EntityKind::Gym,
                &FilterSpec::new(),
                FetchMode::Filtered(PageRequest::new(0, 1)),
            )
            .await
            .unwrap();
        let page = assert_matches!(fetched, Fetched::Page(p) => p);
        assert_eq!(page.total_elements, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.content.len(), 1);
    }

    #[tokio::test]
    async fn mocked_fetcher_can_stand_in_for_storage() {
        let mut mock = MockCandidateFetcher::new();
        mock.expect_fetch()
            .returning(|_, _, _| Err(ServiceError::InternalError("down".into())));
        let err = mock
            .fetch(
                EntityKind::Pt,
                &FilterSpec::new(),
                FetchMode::Filtered(PageRequest::default()),
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::InternalError(_));
    }
}
