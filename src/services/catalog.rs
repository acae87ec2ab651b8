use std::sync::Arc;

use sea_orm::EntityTrait;
use tracing::instrument;

use crate::db::DbPool;
use crate::entities::{gym, offer, pt_user};
use crate::errors::ServiceError;
use crate::search::fetcher::{gym_records, offer_records, pt_records};
use crate::search::model::{GymSummary, OfferSummary, PtSummary};

/// Single-entity lookups by id.
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn get_gym(&self, id: i64) -> Result<GymSummary, ServiceError> {
        let db = self.db_pool.as_ref();
        let gym = gym::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Gym {} not found", id)))?;
        gym_records(db, vec![gym])
            .await?
            .first()
            .map(|r| GymSummary::from_record(r, None))
            .ok_or_else(|| ServiceError::InternalError(format!("Gym {} vanished", id)))
    }

    #[instrument(skip(self))]
    pub async fn get_pt(&self, id: i64) -> Result<PtSummary, ServiceError> {
        let db = self.db_pool.as_ref();
        let pt = pt_user::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("PT {} not found", id)))?;
        pt_records(db, vec![pt])
            .await?
            .first()
            .map(|r| PtSummary::from_record(r, None))
            .ok_or_else(|| ServiceError::InternalError(format!("PT {} vanished", id)))
    }

    #[instrument(skip(self))]
    pub async fn get_offer(&self, id: i64) -> Result<OfferSummary, ServiceError> {
        let db = self.db_pool.as_ref();
        let offer = offer::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Offer {} not found", id)))?;
        offer_records(db, vec![offer])
            .await?
            .first()
            .map(|r| OfferSummary::from_record(r, None))
            .ok_or_else(|| ServiceError::InternalError(format!("Offer {} vanished", id)))
    }
}
