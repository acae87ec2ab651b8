use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};

/// Personal-trainer profile, 1:1 with a user.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pt_users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub user_id: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,
    /// Free-text tag string, e.g. "yoga, strength"
    pub specializations: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub certifications: Option<String>,
    pub years_of_experience: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    pub hourly_rate: Option<Decimal>,
    pub location_id: Option<i64>,
    pub active: bool,
    pub verified: bool,
    #[sea_orm(column_type = "Decimal(Some((3, 2)))")]
    pub average_rating: Decimal,
    pub rating_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id"
    )]
    Location,
    #[sea_orm(has_many = "super::offer::Entity")]
    Offers,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl Related<super::offer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Offers.def()
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
            if let ActiveValue::NotSet = active_model.verified {
                active_model.verified = Set(false);
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

        if let Some(Some(rate)) = active_model.hourly_rate.try_as_ref() {
            if *rate < Decimal::ZERO {
                return Err(DbErr::Custom(
                    "Validation error: hourly rate cannot be negative".to_string(),
                ));
            }
        }

        Ok(active_model)
    }
}
