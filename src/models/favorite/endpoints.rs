use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing, Json,
};
use error_stack::ResultExt;

use super::{queries, types::*};
use crate::{
    auth::Authed, errors::WrapReport, models::campsite::CampsiteId, server::ServerState, Error,
};

async fn list(
    State(state): State<ServerState>,
    auth: Authed,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let results = queries::list_populated(&state.db, auth.user_id).await?;

    Ok(Json(results))
}

async fn add_many(
    State(state): State<ServerState>,
    auth: Authed,
    Json(payload): Json<Vec<CampsiteRef>>,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let mut tx = state.db.begin().await.change_context(Error::Db)?;
    let result = queries::add_campsites(&mut *tx, auth.user_id, &payload).await?;
    tx.commit().await.change_context(Error::Db)?;

    Ok(Json(result))
}

async fn delete_all(
    State(state): State<ServerState>,
    auth: Authed,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let deleted = queries::delete(&state.db, auth.user_id)
        .await?
        .ok_or(Error::NoFavorites)?;

    Ok(Json(deleted))
}

async fn add_one(
    State(state): State<ServerState>,
    auth: Authed,
    Path(campsite_id): Path<CampsiteId>,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let mut tx = state.db.begin().await.change_context(Error::Db)?;
    let result = queries::add_campsite(&mut *tx, auth.user_id, campsite_id).await?;
    tx.commit().await.change_context(Error::Db)?;

    Ok(Json(result))
}

async fn remove_one(
    State(state): State<ServerState>,
    auth: Authed,
    Path(campsite_id): Path<CampsiteId>,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let mut tx = state.db.begin().await.change_context(Error::Db)?;
    let result = queries::remove_campsite(&mut *tx, auth.user_id, campsite_id).await?;
    tx.commit().await.change_context(Error::Db)?;

    Ok(Json(result))
}

async fn put_collection(_auth: Authed) -> Result<(), WrapReport<Error>> {
    Err(Error::OperationNotSupported("PUT /favorites").into())
}

async fn get_single(
    _auth: Authed,
    Path(_campsite_id): Path<CampsiteId>,
) -> Result<(), WrapReport<Error>> {
    Err(Error::OperationNotSupported("GET /favorites/:campsite_id").into())
}

async fn put_single(
    _auth: Authed,
    Path(_campsite_id): Path<CampsiteId>,
) -> Result<(), WrapReport<Error>> {
    Err(Error::OperationNotSupported("PUT /favorites/:campsite_id").into())
}

pub fn create_routes() -> axum::Router<ServerState> {
    axum::Router::new()
        .route("/favorites", routing::get(list))
        .route("/favorites", routing::post(add_many))
        .route("/favorites", routing::put(put_collection))
        .route("/favorites", routing::delete(delete_all))
        .route("/favorites/:campsite_id", routing::get(get_single))
        .route("/favorites/:campsite_id", routing::post(add_one))
        .route("/favorites/:campsite_id", routing::put(put_single))
        .route("/favorites/:campsite_id", routing::delete(remove_one))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use crate::{
        testing::ResponseExt,
        tests::{start_app, BootstrappedData},
    };

    #[sqlx::test]
    async fn list_favorites_empty(pool: sqlx::PgPool) {
        let (_app, BootstrappedData { user, .. }) = start_app(pool).await;

        let results = user
            .client
            .get("favorites")
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();

        assert_eq!(results, json!([]));
    }

    #[sqlx::test]
    async fn add_single_and_list(pool: sqlx::PgPool) {
        let (
            _app,
            BootstrappedData {
                user,
                other_user,
                campsites,
                ..
            },
        ) = start_app(pool).await;

        let added = user
            .client
            .post(&format!("favorites/{}", campsites[0].id))
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();

        assert_eq!(
            added["user_id"],
            serde_json::to_value(user.user_id).unwrap(),
            "favorites list belongs to the user"
        );
        assert_eq!(added["campsite_ids"], json!([campsites[0].id]));

        let results = user
            .client
            .get("favorites")
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();

        let list = results.as_array().expect("response is an array");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["id"], added["id"]);
        assert_eq!(list[0]["user_id"], added["user_id"]);

        let populated = list[0]["campsites"].as_array().unwrap();
        assert_eq!(populated.len(), 1);
        assert_eq!(populated[0]["id"], json!(campsites[0].id));
        assert_eq!(populated[0]["name"], json!(campsites[0].name));

        // The other user's list is unaffected
        let results = other_user
            .client
            .get("favorites")
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();

        assert_eq!(results, json!([]));
    }

    #[sqlx::test]
    async fn add_single_duplicate(pool: sqlx::PgPool) {
        let (
            _app,
            BootstrappedData {
                user, campsites, ..
            },
        ) = start_app(pool).await;

        user.client
            .post(&format!("favorites/{}", campsites[0].id))
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap();

        let response = user
            .client
            .post(&format!("favorites/{}", campsites[0].id))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        let body = response.json::<serde_json::Value>().await.unwrap();
        assert_eq!(body["error"]["kind"], "already_favorite");
    }

    #[sqlx::test]
    async fn add_many_skips_duplicates(pool: sqlx::PgPool) {
        let (
            _app,
            BootstrappedData {
                user, campsites, ..
            },
        ) = start_app(pool).await;

        let first = user
            .client
            .post("favorites")
            .json(&json!([{ "id": campsites[0].id }, { "id": campsites[1].id }]))
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();

        assert_eq!(
            first["campsite_ids"],
            json!([campsites[0].id, campsites[1].id])
        );

        // Posting overlapping references only adds the new ones, in order.
        let second = user
            .client
            .post("favorites")
            .json(&json!([
                { "id": campsites[1].id },
                { "id": campsites[2].id },
                { "id": campsites[2].id },
            ]))
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();

        assert_eq!(
            second["campsite_ids"],
            json!([campsites[0].id, campsites[1].id, campsites[2].id])
        );
        assert_eq!(second["id"], first["id"], "the same list is reused");

        let results = user
            .client
            .get("favorites")
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();

        let populated = results[0]["campsites"].as_array().unwrap();
        let names = populated
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            campsites.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "population preserves insertion order"
        );
    }

    #[sqlx::test]
    async fn remove_campsite(pool: sqlx::PgPool) {
        let (
            _app,
            BootstrappedData {
                user, campsites, ..
            },
        ) = start_app(pool).await;

        user.client
            .post("favorites")
            .json(&json!([{ "id": campsites[0].id }, { "id": campsites[1].id }]))
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap();

        let removed = user
            .client
            .delete(&format!("favorites/{}", campsites[0].id))
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();

        assert_eq!(removed["campsite_ids"], json!([campsites[1].id]));

        // Removing it again fails
        let response = user
            .client
            .delete(&format!("favorites/{}", campsites[0].id))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        let body = response.json::<serde_json::Value>().await.unwrap();
        assert_eq!(body["error"]["kind"], "not_a_favorite");

        // Removing something that was never added fails
        let response = user
            .client
            .delete(&format!("favorites/{}", campsites[2].id))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    async fn remove_without_list(pool: sqlx::PgPool) {
        let (
            _app,
            BootstrappedData {
                user, campsites, ..
            },
        ) = start_app(pool).await;

        let response = user
            .client
            .delete(&format!("favorites/{}", campsites[0].id))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        let body = response.json::<serde_json::Value>().await.unwrap();
        assert_eq!(body["error"]["kind"], "not_found");
    }

    #[sqlx::test]
    async fn delete_list(pool: sqlx::PgPool) {
        let (
            _app,
            BootstrappedData {
                user, campsites, ..
            },
        ) = start_app(pool).await;

        user.client
            .post("favorites")
            .json(&json!([{ "id": campsites[0].id }]))
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap();

        let deleted = user
            .client
            .delete("favorites")
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();

        assert_eq!(deleted["campsite_ids"], json!([campsites[0].id]));

        let results = user
            .client
            .get("favorites")
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();
        assert_eq!(results, json!([]));

        // Deleting again fails since the list is gone
        let response = user.client.delete("favorites").send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        let body = response.json::<serde_json::Value>().await.unwrap();
        assert_eq!(
            body["error"]["message"],
            "You have no favorites to delete!"
        );
    }

    #[sqlx::test]
    async fn unsupported_operations(pool: sqlx::PgPool) {
        let (
            _app,
            BootstrappedData {
                user, campsites, ..
            },
        ) = start_app(pool).await;

        let response = user
            .client
            .put("favorites")
            .json(&json!([]))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);

        let response = user
            .client
            .get(&format!("favorites/{}", campsites[0].id))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);

        let response = user
            .client
            .put(&format!("favorites/{}", campsites[0].id))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    async fn unknown_campsites_are_not_populated(pool: sqlx::PgPool) {
        let (_app, BootstrappedData { user, .. }) = start_app(pool).await;

        // Membership is not validated against the campsites table, so adding a
        // reference to a nonexistent campsite succeeds...
        let ghost_id = crate::models::campsite::CampsiteId::new();
        let added = user
            .client
            .post(&format!("favorites/{}", ghost_id))
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();
        assert_eq!(added["campsite_ids"], json!([ghost_id]));

        // ...but population simply omits it.
        let results = user
            .client
            .get("favorites")
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();
        assert_eq!(results[0]["campsites"], json!([]));
    }

    #[sqlx::test]
    async fn requires_auth(pool: sqlx::PgPool) {
        let (
            app,
            BootstrappedData {
                unverified_user,
                campsites,
                ..
            },
        ) = start_app(pool).await;

        let response = app.client.get("favorites").send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

        let response = app
            .client
            .post(&format!("favorites/{}", campsites[0].id))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

        let response = unverified_user.client.get("favorites").send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    async fn scoped_to_user(pool: sqlx::PgPool) {
        let (
            _app,
            BootstrappedData {
                user,
                other_user,
                campsites,
                ..
            },
        ) = start_app(pool).await;

        user.client
            .post(&format!("favorites/{}", campsites[0].id))
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap();

        let results = other_user
            .client
            .get("favorites")
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();
        assert_eq!(results, json!([]), "other user sees no favorites");

        let response = other_user.client.delete("favorites").send().await.unwrap();
        assert_eq!(
            response.status(),
            reqwest::StatusCode::NOT_FOUND,
            "other user has no list to delete"
        );

        let results = user
            .client
            .get("favorites")
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();
        assert_eq!(results.as_array().unwrap().len(), 1, "user's list survives");
    }
}
