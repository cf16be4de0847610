use std::time::Duration;

use futures::FutureExt;
use sqlx::PgPool;
use tower_cookies::cookie::SameSite;

use crate::{
    auth::{
        sessions::{ExpiryStyle, SessionCookieBuilder, SessionId, SessionKey},
        UserId,
    },
    error::Error,
    models::campsite::{self, Campsite, CampsiteCreatePayload, CampsiteId},
    server,
    testing::{TestClient, TEST_PASSWORD},
    users::users::{create_new_user, UserCreatePayload},
};

pub struct TestApp {
    /// Hold on to the shutdown signal so the server stays alive
    _shutdown_tx: tokio::sync::oneshot::Sender<()>,
    /// A client with no authentication configured
    pub client: TestClient,
    pub base_url: String,
    pub server_task: tokio::task::JoinHandle<Result<(), error_stack::Report<Error>>>,
}

pub struct TestUser {
    pub user_id: UserId,
    pub email: String,
    pub password: &'static str,
    pub session_key: String,
    /// A client authenticated as this user
    pub client: TestClient,
}

pub struct BootstrappedData {
    pub user: TestUser,
    pub other_user: TestUser,
    pub unverified_user: TestUser,
    pub campsites: Vec<Campsite>,
}

async fn make_test_user(
    db: &PgPool,
    base_client: &TestClient,
    name: &str,
    email: &str,
    verified: bool,
) -> TestUser {
    let user_id = UserId::new();
    create_new_user(
        db,
        user_id,
        UserCreatePayload {
            name: name.to_string(),
            email: email.to_string(),
            verified,
        },
        TEST_PASSWORD.to_string(),
    )
    .await
    .expect("Creating test user");

    let session_id = SessionId::new();
    sqlx::query(
        "INSERT INTO user_sessions (id, user_id, expires_at) VALUES ($1, $2, now() + interval '1 day')",
    )
    .bind(session_id)
    .bind(user_id)
    .execute(db)
    .await
    .expect("Creating test session");

    let session_key = SessionKey::new_from_id(session_id, user_id).to_string();

    TestUser {
        user_id,
        email: email.to_string(),
        password: TEST_PASSWORD,
        client: base_client.with_bearer_key(&session_key),
        session_key,
    }
}

async fn bootstrap_campsites(db: &PgPool) -> Vec<Campsite> {
    let defs = [
        ("React Lake Campground", 1250, true),
        ("Chrome River Campground", 877, false),
        ("Breadcrumb Trail Campground", 2901, false),
    ];

    let mut campsites = Vec::with_capacity(defs.len());
    for (name, elevation, featured) in defs {
        let campsite = campsite::queries::create_raw(
            db,
            CampsiteId::new(),
            CampsiteCreatePayload {
                name: name.to_string(),
                description: format!("{name} is a great spot"),
                elevation,
                featured,
            },
        )
        .await
        .expect("Creating test campsite");
        campsites.push(campsite);
    }

    campsites
}

pub async fn start_app(pg_pool: PgPool) -> (TestApp, BootstrappedData) {
    crate::tracing_config::test::init();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    // Make the shutdown future resolve to () so the type matches what Axum expects.
    let shutdown_rx = shutdown_rx.map(|_| ());

    let config = server::Config {
        env: "test".into(),
        host: "127.0.0.1".into(),
        port: 0, // Bind to random port
        request_timeout: Duration::from_secs(30),
        pg_pool: pg_pool.clone(),
        cookie_configuration: SessionCookieBuilder::new(false, SameSite::Strict),
        session_expiry: ExpiryStyle::AfterIdle(Duration::from_secs(24 * 60 * 60)),
        allowed_origins: Vec::new(),
    };

    let server = server::create_server(config)
        .await
        .expect("creating server");

    let base_url = format!("http://{}:{}", server.host, server.port);
    let client = TestClient::new(base_url.clone());

    let user = make_test_user(&pg_pool, &client, "User", "user@example.com", true).await;
    let other_user =
        make_test_user(&pg_pool, &client, "Other User", "other@example.com", true).await;
    let unverified_user = make_test_user(
        &pg_pool,
        &client,
        "Unverified User",
        "unverified@example.com",
        false,
    )
    .await;
    let campsites = bootstrap_campsites(&pg_pool).await;

    let server_task = tokio::task::spawn(server.run_with_shutdown_signal(shutdown_rx));

    (
        TestApp {
            _shutdown_tx: shutdown_tx,
            client,
            base_url,
            server_task,
        },
        BootstrappedData {
            user,
            other_user,
            unverified_user,
            campsites,
        },
    )
}
