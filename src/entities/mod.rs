//! sea-orm entities backing the marketplace search.

pub mod gym;
pub mod location;
pub mod offer;
pub mod pt_user;
pub mod rating;
pub mod user;

pub use offer::{OfferStatus, OfferType};
pub use user::UserRole;
