pub mod common;
pub mod gyms;
pub mod health;
pub mod offers;
pub mod pts;
pub mod ratings;
pub mod search;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::search::fetcher::{CandidateFetcher, SeaOrmCandidateFetcher};
use crate::search::params::PageLimits;
use crate::services::{CatalogService, RatingService, SearchService};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub search: Arc<SearchService>,
    pub catalog: Arc<CatalogService>,
    pub ratings: Arc<RatingService>,
}

impl AppServices {
    /// Wires the storage-backed fetcher and every service over one pool.
    pub fn new(db_pool: Arc<DbPool>, cfg: &AppConfig) -> Self {
        let fetcher: Arc<dyn CandidateFetcher> = Arc::new(SeaOrmCandidateFetcher::new(
            db_pool.clone(),
            cfg.search_geo_strategy,
            cfg.search_geo_max_candidates,
        ));
        Self {
            search: Arc::new(SearchService::new(fetcher, PageLimits::from(cfg))),
            catalog: Arc::new(CatalogService::new(db_pool.clone())),
            ratings: Arc::new(RatingService::new(db_pool)),
        }
    }
}
