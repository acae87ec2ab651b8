//! Immutable filter specification.
//!
//! A [`FilterSpec`] is built once from request parameters and then
//! translated, per entity kind, either into a storage [`Condition`] or
//! evaluated in memory. Both paths must agree.

use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{ColumnTrait, Condition, EntityTrait};

use super::model::{GymRecord, OfferRecord, PtRecord};
use super::EntityKind;
use crate::entities::{gym, offer, pt_user, OfferStatus, OfferType};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    text_query: Option<String>,
    offer_type: Option<OfferType>,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
    specialization: Option<String>,
    min_rating: Option<Decimal>,
    gym_id: Option<i64>,
    pt_user_id: Option<i64>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blank queries are treated as absent.
    pub fn with_text_query(mut self, query: impl Into<String>) -> Self {
        self.text_query = non_blank(query.into());
        self
    }

    pub fn with_offer_type(mut self, offer_type: OfferType) -> Self {
        self.offer_type = Some(offer_type);
        self
    }

    pub fn with_price_range(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn with_specialization(mut self, specialization: impl Into<String>) -> Self {
        self.specialization = non_blank(specialization.into());
        self
    }

    pub fn with_min_rating(mut self, min_rating: Decimal) -> Self {
        self.min_rating = Some(min_rating);
        self
    }

    pub fn with_gym(mut self, gym_id: i64) -> Self {
        self.gym_id = Some(gym_id);
        self
    }

    pub fn with_pt_user(mut self, pt_user_id: i64) -> Self {
        self.pt_user_id = Some(pt_user_id);
        self
    }

    /// Same filter minus price bounds.
    pub fn without_price(mut self) -> Self {
        self.min_price = None;
        self.max_price = None;
        self
    }

    /// Rejects bounds that can never match.
    pub fn validate(&self) -> Result<(), ServiceError> {
        for (field, value) in [("minPrice", self.min_price), ("maxPrice", self.max_price)] {
            if matches!(value, Some(v) if v < Decimal::ZERO) {
                return Err(ServiceError::invalid_field(field, "must not be negative"));
            }
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(ServiceError::invalid_field(
                    "minPrice",
                    "must not exceed maxPrice",
                ));
            }
        }
        if let Some(r) = self.min_rating {
            if r < Decimal::ZERO || r > Decimal::from(5) {
                return Err(ServiceError::invalid_field(
                    "minRating",
                    "must be between 0 and 5",
                ));
            }
        }
        Ok(())
    }

    /// Storage predicate for one kind, including the visibility flags.
    pub fn condition(&self, kind: EntityKind) -> Condition {
        match kind {
            EntityKind::Gym => self.gym_condition(),
            EntityKind::Pt => self.pt_condition(),
            EntityKind::Offer => self.offer_condition(),
        }
    }

    fn gym_condition(&self) -> Condition {
        let mut cond = Condition::all().add(gym::Column::Active.eq(true));
        if let Some(q) = &self.text_query {
            cond = cond.add(text_match::<gym::Entity>(
                q,
                gym::Column::Name,
                gym::Column::Description,
            ));
        }
        if let Some(r) = self.min_rating {
            cond = cond.add(gym::Column::AverageRating.gte(r));
        }
        cond
    }

    fn pt_condition(&self) -> Condition {
        let mut cond = Condition::all().add(pt_user::Column::Active.eq(true));
        if let Some(q) = &self.text_query {
            cond = cond.add(text_match::<pt_user::Entity>(
                q,
                pt_user::Column::Bio,
                pt_user::Column::Specializations,
            ));
        }
        if let Some(s) = &self.specialization {
            cond = cond.add(lower_like::<pt_user::Entity>(
                pt_user::Column::Specializations,
                s,
            ));
        }
        if let Some(min) = self.min_price {
            cond = cond.add(pt_user::Column::HourlyRate.gte(min));
        }
        if let Some(max) = self.max_price {
            cond = cond.add(pt_user::Column::HourlyRate.lte(max));
        }
        if let Some(r) = self.min_rating {
            cond = cond.add(pt_user::Column::AverageRating.gte(r));
        }
        cond
    }

    fn offer_condition(&self) -> Condition {
        let mut cond = Condition::all()
            .add(offer::Column::Active.eq(true))
            .add(offer::Column::Status.eq(OfferStatus::Approved));
        if let Some(q) = &self.text_query {
            cond = cond.add(text_match::<offer::Entity>(
                q,
                offer::Column::Title,
                offer::Column::Description,
            ));
        }
        if let Some(t) = self.offer_type {
            cond = cond.add(offer::Column::OfferType.eq(t));
        }
        if let Some(min) = self.min_price {
            cond = cond.add(offer::Column::Price.gte(min));
        }
        if let Some(max) = self.max_price {
            cond = cond.add(offer::Column::Price.lte(max));
        }
        if let Some(r) = self.min_rating {
            cond = cond.add(offer::Column::AverageRating.gte(r));
        }
        if let Some(id) = self.gym_id {
            cond = cond.add(offer::Column::GymId.eq(id));
        }
        if let Some(id) = self.pt_user_id {
            cond = cond.add(offer::Column::PtUserId.eq(id));
        }
        cond
    }

    pub fn matches_gym(&self, record: &GymRecord) -> bool {
        let g = &record.gym;
        g.active
            && self.text_query.as_deref().map_or(true, |q| {
                contains_ci(Some(&g.name), q) || contains_ci(g.description.as_deref(), q)
            })
            && self.min_rating.map_or(true, |r| g.average_rating >= r)
    }

    pub fn matches_pt(&self, record: &PtRecord) -> bool {
        let p = &record.pt;
        p.active
            && self.text_query.as_deref().map_or(true, |q| {
                contains_ci(p.bio.as_deref(), q) || contains_ci(p.specializations.as_deref(), q)
            })
            && self
                .specialization
                .as_deref()
                .map_or(true, |s| contains_ci(p.specializations.as_deref(), s))
            && in_range(p.hourly_rate, self.min_price, self.max_price)
            && self.min_rating.map_or(true, |r| p.average_rating >= r)
    }

    pub fn matches_offer(&self, record: &OfferRecord) -> bool {
        let o = &record.offer;
        o.is_searchable()
            && self.text_query.as_deref().map_or(true, |q| {
                contains_ci(Some(&o.title), q) || contains_ci(o.description.as_deref(), q)
            })
            && self.offer_type.map_or(true, |t| o.offer_type == t)
            && in_range(Some(o.price), self.min_price, self.max_price)
            && self.min_rating.map_or(true, |r| o.average_rating >= r)
            && self.gym_id.map_or(true, |id| o.gym_id == Some(id))
            && self.pt_user_id.map_or(true, |id| o.pt_user_id == Some(id))
    }
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn contains_ci(field: Option<&str>, needle: &str) -> bool {
    field.map_or(false, |f| f.to_lowercase().contains(&needle.to_lowercase()))
}

/// A missing value never satisfies a present bound.
fn in_range(value: Option<Decimal>, min: Option<Decimal>, max: Option<Decimal>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    match value {
        Some(v) => min.map_or(true, |m| v >= m) && max.map_or(true, |m| v <= m),
        None => false,
    }
}

/// `%needle%` with LIKE metacharacters escaped by `\`.
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for ch in needle.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

fn lower_like<E: EntityTrait>(column: E::Column, needle: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col((E::default(), column))))
        .like(LikeExpr::new(like_pattern(needle)).escape('\\'))
}

fn text_match<E: EntityTrait>(needle: &str, first: E::Column, second: E::Column) -> Condition {
    Condition::any()
        .add(lower_like::<E>(first, needle))
        .add(lower_like::<E>(second, needle))
}
