pub mod endpoints;
pub mod queries;
pub mod types;

pub use types::*;

crate::make_object_id!(FavoriteId, fav);
