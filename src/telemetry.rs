use tracing_subscriber::{fmt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
}

/// Install a `fmt` subscriber filtered by `filter`
///
/// If a global subscriber is already installed it is kept and this does nothing.
pub fn init(filter: &str) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(filter)?;
    if fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish()
        .try_init()
        .is_err()
    {
        tracing::debug!("subscriber already installed");
    }

    Ok(())
}
