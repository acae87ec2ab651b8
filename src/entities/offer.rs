use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Priced offer published by a gym or a PT. Searchable once it is
/// both `active` and `APPROVED`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "offers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub offer_type: OfferType,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    pub currency: String,
    pub duration_description: Option<String>,
    /// Set iff `offer_type` is `GymOffer`
    pub gym_id: Option<i64>,
    /// Set iff `offer_type` is `PtOffer`
    pub pt_user_id: Option<i64>,
    pub created_by: i64,
    pub status: OfferStatus,
    pub active: bool,
    #[sea_orm(column_type = "Decimal(Some((3, 2)))")]
    pub average_rating: Decimal,
    pub rating_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_searchable(&self) -> bool {
        self.active && self.status == OfferStatus::Approved
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::gym::Entity",
        from = "Column::GymId",
        to = "super::gym::Column::Id"
    )]
    Gym,
    #[sea_orm(
        belongs_to = "super::pt_user::Entity",
        from = "Column::PtUserId",
        to = "super::pt_user::Column::Id"
    )]
    PtUser,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Creator,
    #[sea_orm(has_many = "super::rating::Entity")]
    Ratings,
}

impl Related<super::gym::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gym.def()
    }
}

impl Related<super::pt_user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PtUser.def()
    }
}

impl Related<super::rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ratings.def()
    }
}

/// Checks the owner invariant: exactly one of gym/PT is set and it
/// matches the offer type.
pub fn check_owner(
    offer_type: OfferType,
    gym_id: Option<i64>,
    pt_user_id: Option<i64>,
) -> Result<(), String> {
    match (offer_type, gym_id, pt_user_id) {
        (OfferType::GymOffer, Some(_), None) | (OfferType::PtOffer, None, Some(_)) => Ok(()),
        (OfferType::GymOffer, _, _) => {
            Err("a GYM_OFFER must reference a gym and no PT".to_string())
        }
        (OfferType::PtOffer, _, _) => Err("a PT_OFFER must reference a PT and no gym".to_string()),
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.active {
                active_model.active = Set(true);
            }
            if let ActiveValue::NotSet = active_model.status {
                active_model.status = Set(OfferStatus::Pending);
            }
            if let ActiveValue::NotSet = active_model.currency {
                active_model.currency = Set("USD".to_string());
            }
            if let ActiveValue::NotSet = active_model.average_rating {
                active_model.average_rating = Set(Decimal::ZERO);
            }
            if let ActiveValue::NotSet = active_model.rating_count {
                active_model.rating_count = Set(0);
            }
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        active_model.updated_at = Set(now);

        if let Some(price) = active_model.price.try_as_ref() {
            if *price < Decimal::ZERO {
                return Err(DbErr::Custom(
                    "Validation error: price cannot be negative".to_string(),
                ));
            }
        }

        if let (Some(offer_type), Some(gym_id), Some(pt_user_id)) = (
            active_model.offer_type.try_as_ref(),
            active_model.gym_id.try_as_ref(),
            active_model.pt_user_id.try_as_ref(),
        ) {
            check_owner(*offer_type, *gym_id, *pt_user_id)
                .map_err(|e| DbErr::Custom(format!("Validation error: {}", e)))?;
        } else if insert {
            return Err(DbErr::Custom(
                "Validation error: offer type and owner must be set".to_string(),
            ));
        }

        Ok(active_model)
    }
}

/// Which kind of provider publishes the offer
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferType {
    #[sea_orm(string_value = "GYM_OFFER")]
    GymOffer,
    #[sea_orm(string_value = "PT_OFFER")]
    PtOffer,
}

/// Moderation state
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}
