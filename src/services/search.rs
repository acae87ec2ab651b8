use std::sync::Arc;

use tracing::{debug, instrument};

use crate::errors::ServiceError;
use crate::metrics::SEARCH_METRICS;
use crate::search::fetcher::{CandidateFetcher, FetchMode, Fetched, GeoQuery};
use crate::search::filter::FilterSpec;
use crate::search::model::{
    Candidate, GymSummary, Hit, NearbyCriteria, NearbyResponse, NearbyResult, OfferSummary,
    PaginationInfo, PtSummary, SearchAllResponse,
};
use crate::search::params::{
    GymSearchParams, NearbyParams, OfferSearchParams, PageLimits, PtSearchParams,
    SearchAllParams, SearchRequest,
};
use crate::search::ranking::{paginate, rank, Page, PageRequest, RankMode};
use crate::search::EntityKind;
use crate::tracing::with_metrics;

/// Entry point for every search: validates raw parameters, picks geo or
/// filtered mode, ranks and pages.
#[derive(Clone)]
pub struct SearchService {
    fetcher: Arc<dyn CandidateFetcher>,
    limits: PageLimits,
}

impl SearchService {
    pub fn new(fetcher: Arc<dyn CandidateFetcher>, limits: PageLimits) -> Self {
        Self { fetcher, limits }
    }

    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    /// Gyms and/or PTs within a radius, nearest first.
    #[instrument(skip(self))]
    pub async fn nearby(&self, params: NearbyParams) -> Result<NearbyResponse, ServiceError> {
        SEARCH_METRICS.nearby_requests.inc();
        let req = validated(params.into_request(&self.limits))?;

        with_metrics("search_nearby", async {
            let filter = FilterSpec::new();
            let mut hits = match req.kind {
                Some(kind) => self.within(kind, &filter, req.geo).await?,
                None => {
                    let (mut gyms, pts) = futures::try_join!(
                        self.within(EntityKind::Gym, &filter, req.geo),
                        self.within(EntityKind::Pt, &filter, req.geo)
                    )?;
                    gyms.extend(pts);
                    gyms
                }
            };
            rank(&mut hits, RankMode::Distance);

            let page = paginate(hits, req.page);
            let pagination = PaginationInfo::from(&page);
            let results = page
                .content
                .iter()
                .filter_map(|hit| match &hit.record {
                    Candidate::Gym(g) => Some(NearbyResult::Gym(GymSummary::from_record(
                        g,
                        hit.distance_km,
                    ))),
                    Candidate::Pt(p) => Some(NearbyResult::Pt(PtSummary::from_record(
                        p,
                        hit.distance_km,
                    ))),
                    Candidate::Offer(_) => None,
                })
                .collect();

            Ok::<_, ServiceError>(NearbyResponse {
                results,
                pagination,
                search_criteria: NearbyCriteria {
                    lat: req.geo.latitude,
                    lon: req.geo.longitude,
                    radius: req.geo.radius_km,
                    kind: req.kind.map(|k| k.to_string()),
                },
            })
        })
        .await
    }

    /// Gyms, PTs and offers paged independently with the same page and
    /// size. Any failing kind fails the whole call.
    #[instrument(skip(self))]
    pub async fn search_all(
        &self,
        params: SearchAllParams,
    ) -> Result<SearchAllResponse, ServiceError> {
        SEARCH_METRICS.combined_requests.inc();
        let req = validated(params.into_request(&self.limits))?;

        with_metrics("search_all", async {
            // Price bounds target offers only
            let unpriced = req.filter.clone().without_price();
            let (gyms, pts, offers) = futures::try_join!(
                self.search_kind(EntityKind::Gym, &unpriced, req.geo, req.page),
                self.search_kind(EntityKind::Pt, &unpriced, req.geo, req.page),
                self.search_kind(EntityKind::Offer, &req.filter, req.geo, req.page)
            )?;

            let gyms = gym_summaries(gyms).content;
            let pts = pt_summaries(pts).content;
            let offers = offer_summaries(offers).content;
            let total = (gyms.len() + pts.len() + offers.len()) as u64;
            debug!(total, geo = req.geo.is_some(), "Combined search assembled");

            Ok::<_, ServiceError>(SearchAllResponse {
                gyms,
                pts,
                offers,
                total,
            })
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn search_gyms(
        &self,
        params: GymSearchParams,
    ) -> Result<Page<GymSummary>, ServiceError> {
        SEARCH_METRICS.listing_requests.inc();
        let req = validated(params.into_request(&self.limits))?;
        with_metrics("search_gyms", self.listing(EntityKind::Gym, req))
            .await
            .map(gym_summaries)
    }

    #[instrument(skip(self))]
    pub async fn search_pts(
        &self,
        params: PtSearchParams,
    ) -> Result<Page<PtSummary>, ServiceError> {
        SEARCH_METRICS.listing_requests.inc();
        let req = validated(params.into_request(&self.limits))?;
        with_metrics("search_pts", self.listing(EntityKind::Pt, req))
            .await
            .map(pt_summaries)
    }

    #[instrument(skip(self))]
    pub async fn search_offers(
        &self,
        params: OfferSearchParams,
    ) -> Result<Page<OfferSummary>, ServiceError> {
        SEARCH_METRICS.listing_requests.inc();
        let req = validated(params.into_request(&self.limits))?;
        with_metrics("search_offers", self.listing(EntityKind::Offer, req))
            .await
            .map(offer_summaries)
    }

    async fn listing(
        &self,
        kind: EntityKind,
        req: SearchRequest,
    ) -> Result<Page<Hit<Candidate>>, ServiceError> {
        self.search_kind(kind, &req.filter, req.geo, req.page).await
    }

    async fn search_kind(
        &self,
        kind: EntityKind,
        filter: &FilterSpec,
        geo: Option<GeoQuery>,
        page: PageRequest,
    ) -> Result<Page<Hit<Candidate>>, ServiceError> {
        match geo {
            Some(geo) => {
                let mut hits = self.within(kind, filter, geo).await?;
                rank(&mut hits, RankMode::Distance);
                Ok(paginate(hits, page))
            }
            None => match self
                .fetcher
                .fetch(kind, filter, FetchMode::Filtered(page))
                .await?
            {
                Fetched::Page(page) => Ok(page),
                Fetched::Within(mut hits) => {
                    rank(&mut hits, RankMode::RatingRecency);
                    Ok(paginate(hits, page))
                }
            },
        }
    }

    async fn within(
        &self,
        kind: EntityKind,
        filter: &FilterSpec,
        geo: GeoQuery,
    ) -> Result<Vec<Hit<Candidate>>, ServiceError> {
        match self.fetcher.fetch(kind, filter, FetchMode::Geo(geo)).await? {
            Fetched::Within(hits) => Ok(hits),
            Fetched::Page(page) => Ok(page.content),
        }
    }
}

fn validated<T>(result: Result<T, ServiceError>) -> Result<T, ServiceError> {
    if let Err(e) = &result {
        SEARCH_METRICS.validation_failures.inc();
        debug!(error = %e, "Rejected search parameters");
    }
    result
}

/// Converts a page of candidates into views of one kind, keeping the
/// page totals.
fn summarize<T, F>(page: Page<Hit<Candidate>>, mut view: F) -> Page<T>
where
    F: FnMut(&Hit<Candidate>) -> Option<T>,
{
    Page {
        content: page.content.iter().filter_map(&mut view).collect(),
        page_number: page.page_number,
        page_size: page.page_size,
        total_elements: page.total_elements,
        total_pages: page.total_pages,
        first: page.first,
        last: page.last,
    }
}

fn gym_summaries(page: Page<Hit<Candidate>>) -> Page<GymSummary> {
    summarize(page, |hit| match &hit.record {
        Candidate::Gym(g) => Some(GymSummary::from_record(g, hit.distance_km)),
        _ => None,
    })
}

fn pt_summaries(page: Page<Hit<Candidate>>) -> Page<PtSummary> {
    summarize(page, |hit| match &hit.record {
        Candidate::Pt(p) => Some(PtSummary::from_record(p, hit.distance_km)),
        _ => None,
    })
}

fn offer_summaries(page: Page<Hit<Candidate>>) -> Page<OfferSummary> {
    summarize(page, |hit| match &hit.record {
        Candidate::Offer(o) => Some(OfferSummary::from_record(o, hit.distance_km)),
        _ => None,
    })
}
