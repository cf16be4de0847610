use error_stack::Report;
use thiserror::Error;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// The error returned when tracing setup fails
#[derive(Error, Debug)]
#[error("Failed to configure tracing")]
pub struct TraceConfigureError;

/// Set up console tracing output, filtered by the `LOG` environment variable.
pub fn configure_tracing() -> Result<(), Report<TraceConfigureError>> {
    let env_filter = EnvFilter::try_from_env("LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let formatter = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::NEW)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatter)
        .try_init()
        .map_err(|_| Report::new(TraceConfigureError))?;

    Ok(())
}

pub mod test {
    /// Initialize tracing inside tests. Multiple tests race to install the
    /// global subscriber, so failures here are ignored.
    pub fn init() {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let env_filter =
            EnvFilter::try_from_env("LOG").unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    }
}
