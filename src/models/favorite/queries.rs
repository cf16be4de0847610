use error_stack::{Report, ResultExt};
use sqlx::{PgConnection, PgExecutor, PgPool};
use tracing::{event, instrument, Level};

use super::types::*;
use crate::{
    auth::UserId,
    models::campsite::{self, CampsiteId},
    Error,
};

const SELECT_FIELDS: &str = "id, user_id, created_at, updated_at, campsite_ids";

/// Get a user's favorites list, if one exists.
#[instrument(skip(db))]
pub async fn get_maybe(
    db: impl PgExecutor<'_>,
    user_id: UserId,
) -> Result<Option<Favorite>, Report<Error>> {
    sqlx::query_as::<_, Favorite>(&format!(
        "SELECT {SELECT_FIELDS} FROM favorites WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await
    .change_context(Error::Db)
}

/// Fetch the user's favorites list with a row lock, for read-modify-write
/// inside a transaction.
async fn get_for_update(
    db: &mut PgConnection,
    user_id: UserId,
) -> Result<Option<Favorite>, Report<Error>> {
    sqlx::query_as::<_, Favorite>(&format!(
        "SELECT {SELECT_FIELDS} FROM favorites WHERE user_id = $1 FOR UPDATE"
    ))
    .bind(user_id)
    .fetch_optional(&mut *db)
    .await
    .change_context(Error::Db)
}

/// Write the favorites list back, inserting the row if it does not exist yet.
async fn save(db: &mut PgConnection, favorite: &Favorite) -> Result<Favorite, Report<Error>> {
    sqlx::query_as::<_, Favorite>(&format!(
        "INSERT INTO favorites (id, user_id, campsite_ids) VALUES ($1, $2, $3)
        ON CONFLICT (user_id)
        DO UPDATE SET campsite_ids = EXCLUDED.campsite_ids, updated_at = now()
        RETURNING {SELECT_FIELDS}"
    ))
    .bind(favorite.id)
    .bind(favorite.user_id)
    .bind(&favorite.campsite_ids)
    .fetch_one(&mut *db)
    .await
    .change_context(Error::Db)
}

/// Return the user's favorites lists with the campsites populated. The result
/// holds at most one element but keeps the list shape that clients expect.
#[instrument(skip(db))]
pub async fn list_populated(
    db: &PgPool,
    user_id: UserId,
) -> Result<Vec<FavoritePopulated>, Report<Error>> {
    let Some(favorite) = get_maybe(db, user_id).await? else {
        return Ok(Vec::new());
    };

    let campsites = campsite::queries::get_many_ordered(db, &favorite.campsite_ids).await?;

    Ok(vec![FavoritePopulated {
        id: favorite.id,
        user_id: favorite.user_id,
        created_at: favorite.created_at,
        updated_at: favorite.updated_at,
        campsites,
    }])
}

fn get_or_new(existing: Option<Favorite>, user_id: UserId) -> Favorite {
    existing.unwrap_or_else(|| {
        event!(Level::INFO, %user_id, "Creating new favorites list");
        Favorite::new_for_user(user_id)
    })
}

/// Add a batch of campsites to the user's favorites, creating the list if the
/// user does not have one. References that are already favorites are skipped.
#[instrument(skip(db))]
pub async fn add_campsites(
    db: &mut PgConnection,
    user_id: UserId,
    refs: &[CampsiteRef],
) -> Result<Favorite, Report<Error>> {
    let mut favorite = get_or_new(get_for_update(&mut *db, user_id).await?, user_id);

    for r in refs {
        if favorite.campsite_ids.contains(&r.id) {
            event!(
                Level::INFO,
                campsite_id = %r.id,
                "Campsite is already a favorite and has not been added"
            );
        } else {
            favorite.campsite_ids.push(r.id);
        }
    }

    save(&mut *db, &favorite).await
}

/// Add a single campsite to the user's favorites, creating the list if the
/// user does not have one. Fails if the campsite is already a favorite.
#[instrument(skip(db))]
pub async fn add_campsite(
    db: &mut PgConnection,
    user_id: UserId,
    campsite_id: CampsiteId,
) -> Result<Favorite, Report<Error>> {
    let mut favorite = get_or_new(get_for_update(&mut *db, user_id).await?, user_id);

    if favorite.campsite_ids.contains(&campsite_id) {
        return Err(Report::new(Error::AlreadyFavorite(campsite_id)));
    }

    favorite.campsite_ids.push(campsite_id);

    save(&mut *db, &favorite).await
}

/// Remove a single campsite from the user's favorites. Fails if the user has
/// no favorites list or the campsite is not in it.
#[instrument(skip(db))]
pub async fn remove_campsite(
    db: &mut PgConnection,
    user_id: UserId,
    campsite_id: CampsiteId,
) -> Result<Favorite, Report<Error>> {
    let mut favorite = get_for_update(&mut *db, user_id)
        .await?
        .ok_or(Error::NotFound("Favorite"))?;

    let Some(position) = favorite
        .campsite_ids
        .iter()
        .position(|id| *id == campsite_id)
    else {
        return Err(Report::new(Error::NotAFavorite(campsite_id)));
    };

    favorite.campsite_ids.remove(position);

    save(&mut *db, &favorite).await
}

/// Delete the user's favorites list, returning the deleted row if one existed.
#[instrument(skip(db))]
pub async fn delete(
    db: impl PgExecutor<'_>,
    user_id: UserId,
) -> Result<Option<Favorite>, Report<Error>> {
    sqlx::query_as::<_, Favorite>(&format!(
        "DELETE FROM favorites WHERE user_id = $1 RETURNING {SELECT_FIELDS}"
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await
    .change_context(Error::Db)
}
