use campground_api::{
    auth::sessions::{ExpiryStyle, SessionCookieBuilder},
    db, server, tracing_config, util_cmd, Error,
};
use clap::{Args, Parser, Subcommand};
use error_stack::{Report, ResultExt};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the server
    Serve(ServeCommand),
    /// Database management
    Db(db::DbCommand),
    /// Utility commands
    Util(util_cmd::UtilCommand),
}

#[derive(Args, Debug)]
struct ServeCommand {
    /// The PostgreSQL database to connect to
    #[clap(long = "db", env = "DATABASE_URL")]
    database_url: String,

    /// The IP host to bind to
    #[clap(long, env = "HOST", default_value_t = String::from("127.0.0.1"))]
    host: String,

    /// The TCP port to listen on
    #[clap(long, env = "PORT", default_value_t = 8395)]
    port: u16,

    /// The environment in which this server is running
    #[clap(long = "env", env = "ENV", default_value_t = String::from("development"))]
    env: String,

    /// Request timeout, in seconds
    #[clap(long, env = "REQUEST_TIMEOUT", default_value_t = 60)]
    request_timeout: u64,

    /// Session idle expiry, in days
    #[clap(long, env = "SESSION_EXPIRY_DAYS", default_value_t = 14)]
    session_expiry_days: u64,

    /// Origins allowed to make cross-site requests with credentials
    #[clap(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_values_t = [
            String::from("http://localhost:3000"),
            String::from("https://localhost:3443"),
        ]
    )]
    allowed_origins: Vec<String>,
}

async fn serve(cmd: ServeCommand) -> Result<(), Report<Error>> {
    tracing_config::configure_tracing().change_context(Error::ServerStart)?;

    let pg_pool = sqlx::PgPool::connect(&cmd.database_url)
        .await
        .change_context(Error::Db)?;

    let secure_cookies = cmd.env != "development" && cmd.env != "test";

    let server = server::create_server(server::Config {
        env: cmd.env,
        host: cmd.host,
        port: cmd.port,
        request_timeout: std::time::Duration::from_secs(cmd.request_timeout),
        pg_pool,
        cookie_configuration: SessionCookieBuilder::new(
            secure_cookies,
            tower_cookies::cookie::SameSite::Strict,
        ),
        session_expiry: ExpiryStyle::AfterIdle(std::time::Duration::from_secs(
            cmd.session_expiry_days * 24 * 60 * 60,
        )),
        allowed_origins: cmd.allowed_origins,
    })
    .await?;

    server.run().await?;

    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
pub async fn main() -> Result<(), Report<Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(cmd) => serve(cmd).await,
        Command::Db(cmd) => cmd.handle().await,
        Command::Util(cmd) => cmd.handle().await,
    }
}
