use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};

/// Postal address plus WGS84 coordinates. Owned by one gym or one PT profile.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "locations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Degrees north, [-90, 90]
    pub latitude: f64,

    /// Degrees east, [-180, 180]
    pub longitude: f64,

    pub address: String,

    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub formatted_address: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::gym::Entity")]
    Gyms,
    #[sea_orm(has_many = "super::pt_user::Entity")]
    PtUsers,
}

impl Related<super::gym::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gyms.def()
    }
}

impl Related<super::pt_user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PtUsers.def()
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
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        active_model.updated_at = Set(now);

        if let Some(lat) = active_model.latitude.try_as_ref() {
            if !lat.is_finite() || !(-90.0..=90.0).contains(lat) {
                return Err(DbErr::Custom(
                    "Validation error: latitude must be between -90 and 90".to_string(),
                ));
            }
        }
        if let Some(lon) = active_model.longitude.try_as_ref() {
            if !lon.is_finite() || !(-180.0..=180.0).contains(lon) {
                return Err(DbErr::Custom(
                    "Validation error: longitude must be between -180 and 180".to_string(),
                ));
            }
        }

        Ok(active_model)
    }
}
