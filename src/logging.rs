use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid log level/filter '{value}': {source}")]
    Filter {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error("logging already initialized: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` from the display config.
pub fn init(level: &str, verbose: bool) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let value = if verbose { "debug" } else { level };
            EnvFilter::try_new(value).map_err(|source| LoggingError::Filter {
                value: value.to_string(),
                source,
            })?
        }
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(LoggingError::Subscriber)
}

/// Verbose subscriber routed through the test harness.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_filter_is_reported() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let err = init("cali_water_report=notalevel", false).unwrap_err();
        assert!(matches!(err, LoggingError::Filter { .. }));
    }
}
