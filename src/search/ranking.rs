use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::model::{Hit, SearchRecord};

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Zero-based page request. `size` is always within `[1, MAX_PAGE_SIZE]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

impl PageRequest {
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page,
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// One page of ranked results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page_number: u64,
    pub page_size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
    pub first: bool,
    pub last: bool,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let total_pages = total_elements.div_ceil(request.size.max(1));
        Self {
            content,
            page_number: request.page,
            page_size: request.size,
            total_elements,
            total_pages,
            first: request.page == 0,
            last: request.page + 1 >= total_pages,
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), request, 0)
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            first: self.first,
            last: self.last,
        }
    }
}

/// Slices an already ranked sequence.
pub fn paginate<T>(ranked: Vec<T>, request: PageRequest) -> Page<T> {
    let total = ranked.len() as u64;
    let content = ranked
        .into_iter()
        .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
        .take(usize::try_from(request.size).unwrap_or(usize::MAX))
        .collect();
    Page::new(content, request, total)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMode {
    /// Ascending distance, then id, then kind
    Distance,
    /// Descending average rating, then newest first, then id
    RatingRecency,
}

/// Sorts in place. Both orderings are total, so repeated calls over the
/// same data page identically.
pub fn rank<R: SearchRecord>(hits: &mut [Hit<R>], mode: RankMode) {
    match mode {
        RankMode::Distance => hits.sort_by(by_distance),
        RankMode::RatingRecency => hits.sort_by(by_rating_recency),
    }
}

fn by_distance<R: SearchRecord>(a: &Hit<R>, b: &Hit<R>) -> Ordering {
    let da = a.distance_km.unwrap_or(f64::INFINITY);
    let db = b.distance_km.unwrap_or(f64::INFINITY);
    da.total_cmp(&db)
        .then_with(|| a.record.id().cmp(&b.record.id()))
        .then_with(|| a.record.kind().cmp(&b.record.kind()))
}

fn by_rating_recency<R: SearchRecord>(a: &Hit<R>, b: &Hit<R>) -> Ordering {
    b.record
        .average_rating()
        .cmp(&a.record.average_rating())
        .then_with(|| b.record.created_at().cmp(&a.record.created_at()))
        .then_with(|| a.record.id().cmp(&b.record.id()))
        .then_with(|| a.record.kind().cmp(&b.record.kind()))
}
