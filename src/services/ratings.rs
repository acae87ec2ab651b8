use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::sea_query::{Expr, SelectStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{gym, offer, pt_user, rating, user};
use crate::errors::ServiceError;
use crate::metrics::SEARCH_METRICS;
use crate::search::ranking::{Page, PageRequest};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRatingRequest {
    /// 1 to 5 stars
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateRatingRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i32>,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingView {
    pub id: i64,
    pub user_id: i64,
    pub offer_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<rating::Model> for RatingView {
    fn from(r: rating::Model) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            offer_id: r.offer_id,
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Mean rounded to two decimals (half away from zero) and count; zero
/// for no ratings.
pub fn aggregate(ratings: &[i32]) -> (Decimal, i32) {
    if ratings.is_empty() {
        return (Decimal::ZERO, 0);
    }
    let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    let count = ratings.len();
    let mean = Decimal::from(sum) / Decimal::from(count as u64);
    (
        mean.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        i32::try_from(count).unwrap_or(i32::MAX),
    )
}

/// Rating writes. Every write recomputes the offer aggregate, then the
/// aggregate of the gym or PT owning the offer, inside one transaction.
#[derive(Clone)]
pub struct RatingService {
    db_pool: Arc<DbPool>,
}

impl RatingService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        user_id: i64,
        offer_id: i64,
        input: CreateRatingRequest,
    ) -> Result<RatingView, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await?;

        let offer = find_offer(&txn, offer_id).await?;
        if user::Entity::find_by_id(user_id).one(&txn).await?.is_none() {
            return Err(ServiceError::Unauthorized(format!(
                "User {} is not registered",
                user_id
            )));
        }
        let duplicate = rating::Entity::find()
            .filter(rating::Column::UserId.eq(user_id))
            .filter(rating::Column::OfferId.eq(offer_id))
            .one(&txn)
            .await?;
        if duplicate.is_some() {
            return Err(already_rated(offer_id));
        }

        let created = rating::ActiveModel {
            user_id: Set(user_id),
            offer_id: Set(offer_id),
            rating: Set(input.rating),
            comment: Set(input.comment),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => already_rated(offer_id),
            _ => ServiceError::DatabaseError(e),
        })?;

        recompute_aggregates(&txn, &offer).await?;
        txn.commit().await?;

        SEARCH_METRICS.ratings_written.inc();
        info!(rating_id = created.id, offer_id, user_id, "Rating created");
        Ok(created.into())
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        user_id: i64,
        rating_id: i64,
        input: UpdateRatingRequest,
    ) -> Result<RatingView, ServiceError> {
        input.validate()?;
        let txn = self.db_pool.begin().await?;

        let existing = find_owned_rating(&txn, user_id, rating_id).await?;
        let offer = find_offer(&txn, existing.offer_id).await?;

        let mut active: rating::ActiveModel = existing.into();
        if let Some(value) = input.rating {
            active.rating = Set(value);
        }
        if let Some(comment) = input.comment {
            active.comment = Set(Some(comment));
        }
        let updated = active.update(&txn).await?;

        recompute_aggregates(&txn, &offer).await?;
        txn.commit().await?;

        SEARCH_METRICS.ratings_written.inc();
        info!(rating_id, user_id, "Rating updated");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: i64, rating_id: i64) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;

        let existing = find_owned_rating(&txn, user_id, rating_id).await?;
        let offer = find_offer(&txn, existing.offer_id).await?;
        rating::Entity::delete_by_id(rating_id).exec(&txn).await?;

        recompute_aggregates(&txn, &offer).await?;
        txn.commit().await?;

        SEARCH_METRICS.ratings_written.inc();
        info!(rating_id, user_id, "Rating deleted");
        Ok(())
    }

    /// Ratings of one offer, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_offer(
        &self,
        offer_id: i64,
        page: PageRequest,
    ) -> Result<Page<RatingView>, ServiceError> {
        let db = self.db_pool.as_ref();
        find_offer(db, offer_id).await?;

        let query = rating::Entity::find().filter(rating::Column::OfferId.eq(offer_id));
        let total = query.clone().count(db).await?;
        let rows = query
            .order_by_desc(rating::Column::CreatedAt)
            .order_by_desc(rating::Column::Id)
            .limit(page.size)
            .offset(page.offset())
            .all(db)
            .await?;

        Ok(Page::new(
            rows.into_iter().map(RatingView::from).collect(),
            page,
            total,
        ))
    }
}

fn already_rated(offer_id: i64) -> ServiceError {
    ServiceError::Conflict(format!("Offer {} already rated by this user", offer_id))
}

async fn find_offer<C: ConnectionTrait>(db: &C, offer_id: i64) -> Result<offer::Model, ServiceError> {
    offer::Entity::find_by_id(offer_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Offer {} not found", offer_id)))
}

async fn find_owned_rating<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    rating_id: i64,
) -> Result<rating::Model, ServiceError> {
    let existing = rating::Entity::find_by_id(rating_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Rating {} not found", rating_id)))?;
    if existing.user_id != user_id {
        return Err(ServiceError::Forbidden(format!(
            "Rating {} belongs to another user",
            rating_id
        )));
    }
    Ok(existing)
}

async fn ratings_of_offers<C: ConnectionTrait>(
    db: &C,
    offers: SelectStatement,
) -> Result<Vec<i32>, DbErr> {
    rating::Entity::find()
        .select_only()
        .column(rating::Column::Rating)
        .filter(rating::Column::OfferId.in_subquery(offers))
        .into_tuple::<i32>()
        .all(db)
        .await
}

fn offers_where<C: ColumnTrait>(column: C, id: i64) -> SelectStatement {
    offer::Entity::find()
        .select_only()
        .column(offer::Column::Id)
        .filter(column.eq(id))
        .into_query()
}

async fn recompute_aggregates<C: ConnectionTrait>(
    db: &C,
    offer: &offer::Model,
) -> Result<(), DbErr> {
    let now = Utc::now();

    let (avg, count) = aggregate(&ratings_of_offers(db, offers_where(offer::Column::Id, offer.id)).await?);
    offer::Entity::update_many()
        .col_expr(offer::Column::AverageRating, Expr::value(avg))
        .col_expr(offer::Column::RatingCount, Expr::value(count))
        .col_expr(offer::Column::UpdatedAt, Expr::value(now))
        .filter(offer::Column::Id.eq(offer.id))
        .exec(db)
        .await?;

    if let Some(gym_id) = offer.gym_id {
        let (avg, count) =
            aggregate(&ratings_of_offers(db, offers_where(offer::Column::GymId, gym_id)).await?);
        gym::Entity::update_many()
            .col_expr(gym::Column::AverageRating, Expr::value(avg))
            .col_expr(gym::Column::RatingCount, Expr::value(count))
            .col_expr(gym::Column::UpdatedAt, Expr::value(now))
            .filter(gym::Column::Id.eq(gym_id))
            .exec(db)
            .await?;
    }
    if let Some(pt_id) = offer.pt_user_id {
        let (avg, count) =
            aggregate(&ratings_of_offers(db, offers_where(offer::Column::PtUserId, pt_id)).await?);
        pt_user::Entity::update_many()
            .col_expr(pt_user::Column::AverageRating, Expr::value(avg))
            .col_expr(pt_user::Column::RatingCount, Expr::value(count))
            .col_expr(pt_user::Column::UpdatedAt, Expr::value(now))
            .filter(pt_user::Column::Id.eq(pt_id))
            .exec(db)
            .await?;
    }
    Ok(())
}
