use serde::{Deserialize, Serialize};

use super::CampsiteId;

/// A campsite that users can mark as a favorite. Campsite management belongs
/// to a separate service; this is only the read side needed to populate
/// favorite lists, plus a raw create for bootstrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Campsite {
    pub id: CampsiteId,
    pub name: String,
    pub description: String,
    pub elevation: i32,
    pub featured: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct CampsiteCreatePayload {
    pub name: String,
    pub description: String,
    pub elevation: i32,
    pub featured: bool,
}
