use std::{future::Future, sync::Arc, time::Duration};

use axum::{extract::FromRef, Router};
use error_stack::{Report, ResultExt};
use http::{header, HeaderValue, Method};
use sqlx::PgPool;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{event, Level};

use crate::{
    auth::sessions::{ExpiryStyle, SessionCookieBuilder, SessionManager},
    Error,
};

/// Shared state used by the server
#[derive(Clone)]
pub struct ServerState {
    /// The database connection pool
    pub db: PgPool,
    /// User session backend
    pub sessions: Arc<SessionManager>,
}

impl FromRef<ServerState> for PgPool {
    fn from_ref(state: &ServerState) -> Self {
        state.db.clone()
    }
}

impl FromRef<ServerState> for Arc<SessionManager> {
    fn from_ref(state: &ServerState) -> Self {
        state.sessions.clone()
    }
}

/// Configuration for the server
pub struct Config {
    /// The environment in which this server is running
    pub env: String,
    /// The IP host to bind to
    pub host: String,
    /// The TCP port to listen on. Use 0 to bind a random port.
    pub port: u16,
    /// How long to wait before timing out a request
    pub request_timeout: Duration,
    /// The database connection pool
    pub pg_pool: PgPool,
    /// How to build session cookies
    pub cookie_configuration: SessionCookieBuilder,
    /// When user sessions expire
    pub session_expiry: ExpiryStyle,
    /// Origins allowed to make cross-site requests with credentials
    pub allowed_origins: Vec<String>,
}

/// The server and related information
pub struct Server {
    /// The host the server is bound to
    pub host: String,
    /// The port the server is bound to
    pub port: u16,
    state: ServerState,
    listener: TcpListener,
    app: Router,
}

impl Server {
    /// Run the server until receiving SIGINT or SIGTERM
    pub async fn run(self) -> Result<(), Report<Error>> {
        self.run_with_shutdown_signal(shutdown_signal()).await
    }

    /// Run the server, shutting down when the given future resolves
    pub async fn run_with_shutdown_signal(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), Report<Error>> {
        let sweeper = tokio::task::spawn(sweep_expired_sessions(self.state.sessions.clone()));

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .change_context(Error::Server)?;

        sweeper.abort();
        event!(Level::INFO, "Server shut down");

        Ok(())
    }
}

/// Create the server and bind its listener, without starting it.
pub async fn create_server(config: Config) -> Result<Server, Report<Error>> {
    let sessions = Arc::new(SessionManager::new(
        config.pg_pool.clone(),
        config.cookie_configuration,
        config.session_expiry,
    ));

    let state = ServerState {
        db: config.pg_pool,
        sessions,
    };

    let allowed_origins = config
        .allowed_origins
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .change_context(Error::ServerStart)?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    let app = Router::new()
        .merge(crate::models::favorite::endpoints::create_routes())
        .merge(crate::auth::endpoints::create_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(config.request_timeout))
                .layer(cors)
                .layer(CookieManagerLayer::new()),
        )
        .with_state(state.clone());

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .change_context(Error::ServerStart)?;
    let addr = listener.local_addr().change_context(Error::ServerStart)?;

    event!(Level::INFO, host=%addr.ip(), port=%addr.port(), env=%config.env, "Listening");

    Ok(Server {
        host: addr.ip().to_string(),
        port: addr.port(),
        state,
        listener,
        app,
    })
}

async fn sweep_expired_sessions(sessions: Arc<SessionManager>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60 * 60));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if let Err(err) = sessions.delete_expired_sessions().await {
            event!(Level::ERROR, ?err, "Failed to delete expired sessions");
        }
    }
}

/// Create a future which will resolve when receiving SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
