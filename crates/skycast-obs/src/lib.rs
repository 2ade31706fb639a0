use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

/// Default filter when RUST_LOG is unset
pub const DEFAULT_FILTER: &str =
    "info,skycast_server=debug,skycast_ingest=debug,skycast_cache=debug";

/// Output format, picked from `SKYCAST_LOG_FORMAT` (`json` unless set to `text`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("SKYCAST_LOG_FORMAT").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("text") || v.eq_ignore_ascii_case("pretty") => {
                LogFormat::Text
            }
            _ => LogFormat::Json,
        }
    }
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber; fails if one is already set
pub fn try_init(service_name: &str) -> Result<(), TryInitError> {
    let format = LogFormat::from_env();
    let json = (format == LogFormat::Json).then(|| tracing_subscriber::fmt::layer().json());
    let text = (format == LogFormat::Text).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(filter())
        .with(json)
        .with(text)
        .try_init()?;

    tracing::info!(service = %service_name, ?format, "Observability initialized");
    Ok(())
}

/// Initialize logging/tracing.
/// - JSON logs, one object per line (text with `SKYCAST_LOG_FORMAT=text`)
/// - RUST_LOG respected; defaults to [`DEFAULT_FILTER`]
pub fn init(service_name: &str) {
    if let Err(e) = try_init(service_name) {
        eprintln!("logging already initialized: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_defaults_to_json() {
        assert_eq!(LogFormat::parse(None), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("bogus")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some(" Text ")), LogFormat::Text);
        assert_eq!(LogFormat::parse(Some("pretty")), LogFormat::Text);
    }

    #[test]
    fn second_init_is_an_error() {
        let _ = try_init("first");
        assert!(try_init("second").is_err());
    }
}
