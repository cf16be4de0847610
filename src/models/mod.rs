pub mod campsite;
pub mod favorite;
