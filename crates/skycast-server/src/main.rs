use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use skycast_cache::ForecastCache;
use skycast_config::AppConfig;
use skycast_core::ForecastPipeline;
use skycast_ingest::{
    FileSource, ForecastSource, Geocoder, NominatimGeocoder, NominatimSettings, OpenMeteoSettings,
    OpenMeteoSource,
};
use skycast_server::{CachedForecast, Maintenance};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    // Observability
    skycast_obs::init("skycastd");

    // Config
    let cfg = AppConfig::load().context("Failed to load configuration")?;
    let pipeline = ForecastPipeline::new(cfg.pipeline()).context("Invalid pipeline settings")?;

    let source: Arc<dyn ForecastSource> = match cfg.forecast_fixture() {
        Some(path) => {
            tracing::info!(%path, "serving forecasts from a saved response");
            Arc::new(FileSource::new(path))
        }
        None => {
            let settings = OpenMeteoSettings {
                base_url: cfg.forecast_base_url(),
                model: cfg.forecast_model(),
                timezone: cfg.forecast_timezone(),
                forecast_days: cfg.forecast_days(),
                timeout: Duration::from_secs(cfg.forecast_timeout_secs()),
            };
            Arc::new(OpenMeteoSource::new(settings).context("Failed to build HTTP client")?)
        }
    };

    let geocoder: Option<Arc<dyn Geocoder>> = if cfg.geocoder_enabled() {
        let settings = NominatimSettings {
            base_url: cfg.geocoder_base_url(),
            user_agent: cfg.geocoder_user_agent(),
            timeout: Duration::from_secs(cfg.geocoder_timeout_secs()),
        };
        Some(Arc::new(
            NominatimGeocoder::new(settings).context("Failed to build geocoder client")?,
        ))
    } else {
        tracing::info!("geocoder disabled, locations will be unnamed");
        None
    };

    let snapshot = cfg.snapshot_path().map(PathBuf::from);
    let cache: ForecastCache<CachedForecast> = match &snapshot {
        Some(path) => ForecastCache::load(path, cfg.cache_ttl_secs(), cfg.clear_hours())
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring unreadable cache snapshot");
                ForecastCache::new(cfg.cache_ttl_secs(), cfg.clear_hours())
            }),
        None => ForecastCache::new(cfg.cache_ttl_secs(), cfg.clear_hours()),
    };

    // Build app and state
    let (app, state) = skycast_server::build_app(source, geocoder, pipeline, cache)?;

    Maintenance::new(
        state.clone(),
        Duration::from_secs(cfg.maintenance_interval_secs()),
        snapshot,
    )
    .spawn();

    // Start HTTP server
    let addr: SocketAddr = cfg
        .http_bind()
        .parse()
        .context("Invalid HTTP bind address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    // Mark ready just before serving
    skycast_server::set_ready(&state, true);

    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
