// Search over gyms, trainers and offers
pub mod search;

// Entity lookups by id
pub mod catalog;

// Rating writes and derived aggregates
pub mod ratings;

pub use catalog::CatalogService;
pub use ratings::RatingService;
pub use search::SearchService;
