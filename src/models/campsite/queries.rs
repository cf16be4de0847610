use error_stack::{Report, ResultExt};
use sqlx::PgExecutor;
use tracing::instrument;

use super::{types::*, CampsiteId};
use crate::Error;

/// Fetch the campsites for a list of IDs, preserving the order of the input
/// list. IDs with no matching campsite are skipped.
#[instrument(skip(db))]
pub async fn get_many_ordered(
    db: impl PgExecutor<'_>,
    ids: &[CampsiteId],
) -> Result<Vec<Campsite>, Report<Error>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let campsites = sqlx::query_as::<_, Campsite>(
        "SELECT id, name, description, elevation, featured, created_at, updated_at
        FROM campsites
        WHERE id = ANY($1)
        ORDER BY array_position($1, id)",
    )
    .bind(ids)
    .fetch_all(db)
    .await
    .change_context(Error::Db)?;

    Ok(campsites)
}

/// Create a new campsite, with the ID specified by the caller.
#[instrument(skip(db))]
pub async fn create_raw(
    db: impl PgExecutor<'_>,
    id: CampsiteId,
    payload: CampsiteCreatePayload,
) -> Result<Campsite, Report<Error>> {
    let campsite = sqlx::query_as::<_, Campsite>(
        "INSERT INTO campsites (id, name, description, elevation, featured)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, description, elevation, featured, created_at, updated_at",
    )
    .bind(id)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.elevation)
    .bind(payload.featured)
    .fetch_one(db)
    .await
    .change_context(Error::Db)?;

    Ok(campsite)
}
