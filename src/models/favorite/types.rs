use serde::{Deserialize, Serialize};

use super::FavoriteId;
use crate::{
    auth::UserId,
    models::campsite::{Campsite, CampsiteId},
};

/// A user's list of favorite campsites. Each user has at most one of these;
/// the campsite IDs are ordered by insertion and contain no duplicates.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Favorite {
    pub id: FavoriteId,
    pub user_id: UserId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub campsite_ids: Vec<CampsiteId>,
}

impl Favorite {
    /// An empty, unsaved favorites list for a user that does not have one yet.
    pub fn new_for_user(user_id: UserId) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: FavoriteId::new(),
            user_id,
            created_at: now,
            updated_at: now,
            campsite_ids: Vec::new(),
        }
    }
}

/// A [Favorite] with the campsite references populated into full objects.
#[derive(Debug, Clone, Serialize)]
pub struct FavoritePopulated {
    pub id: FavoriteId,
    pub user_id: UserId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub campsites: Vec<Campsite>,
}

/// A reference to a campsite, as submitted to the bulk add endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CampsiteRef {
    pub id: CampsiteId,
}
