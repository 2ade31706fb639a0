use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use opentelemetry::metrics::{Counter, MeterProvider};
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use skycast_cache::{CoordKey, ForecastCache};
use skycast_core::{ForecastPipeline, ForecastReport};
use skycast_ingest::{Coord, Forecast, ForecastSource, Geocoder};
use tokio::sync::Mutex;

pub mod error;
pub mod maintenance;

pub use error::{ApiError, AppError};
pub use maintenance::Maintenance;

/// What the cache keeps per location: the series and its display name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedForecast {
    pub forecast: Forecast,
    #[serde(default)]
    pub location_name: Option<String>,
}

pub struct AppState {
    ready: AtomicBool,
    registry: Registry,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
    requests_total: Counter<u64>,
    cache_hits_total: Counter<u64>,
    upstream_fetches_total: Counter<u64>,
    geocode_lookups_total: Counter<u64>,
    pipeline: ForecastPipeline,
    source: Arc<dyn ForecastSource>,
    geocoder: Option<Arc<dyn Geocoder>>,
    cache: Mutex<ForecastCache<CachedForecast>>,
}

impl AppState {
    pub fn pipeline(&self) -> &ForecastPipeline {
        &self.pipeline
    }

    pub fn cache(&self) -> &Mutex<ForecastCache<CachedForecast>> {
        &self.cache
    }
}

/// Wire the router. Without a geocoder, `q` searches are refused and
/// locations go unnamed.
pub fn build_app(
    source: Arc<dyn ForecastSource>,
    geocoder: Option<Arc<dyn Geocoder>>,
    pipeline: ForecastPipeline,
    cache: ForecastCache<CachedForecast>,
) -> Result<(Router, Arc<AppState>)> {
    // Prometheus exporter via OpenTelemetry
    let registry = Registry::new();
    let reader = exporter().with_registry(registry.clone()).build()?;
    let provider = SdkMeterProvider::builder().with_reader(reader).build();
    let meter = provider.meter("skycast-server");

    let requests_total = meter
        .u64_counter("skycast_requests_total")
        .with_description("Total HTTP requests served")
        .init();
    let cache_hits_total = meter
        .u64_counter("skycast_cache_hits_total")
        .with_description("Forecast requests answered from the cache")
        .init();
    let upstream_fetches_total = meter
        .u64_counter("skycast_upstream_fetches_total")
        .with_description("Forecasts fetched from the configured source")
        .init();
    let geocode_lookups_total = meter
        .u64_counter("skycast_geocode_lookups_total")
        .with_description("Place searches and reverse lookups sent to the geocoder")
        .init();

    let state = Arc::new(AppState {
        ready: AtomicBool::new(false),
        registry,
        provider,
        requests_total,
        cache_hits_total,
        upstream_fetches_total,
        geocode_lookups_total,
        pipeline,
        source,
        geocoder,
        cache: Mutex::new(cache),
    });

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/forecast", get(forecast))
        .with_state(Arc::clone(&state));

    Ok((router, state))
}

pub fn set_ready(state: &Arc<AppState>, is_ready: bool) {
    state.ready.store(is_ready, Ordering::Relaxed);
}

async fn healthz(State(state): State<Arc<AppState>>) -> StatusCode {
    state.requests_total.add(1, &[]);
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::warn!(error=?e, "failed to encode metrics");
    }
    let body = String::from_utf8(buf).unwrap_or_default();
    let content_type = (
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    ([content_type], body)
}

/// Raw query; parsed by hand so bad numbers get the JSON error body.
/// A non-empty `q` takes precedence over `lat`/`lon`.
#[derive(Debug, Deserialize)]
struct ForecastQuery {
    q: Option<String>,
    lat: Option<String>,
    lon: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Location {
    pub key: String,
    /// Display name, `None` when no geocoder is configured or the lookup failed
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Option<String>,
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub location: Location,
    pub cached: bool,
    pub report: ForecastReport,
}

fn parse_degrees(name: &str, raw: Option<&str>) -> Result<f64, AppError> {
    let raw = raw.ok_or_else(|| AppError::BadRequest(format!("missing query parameter `{name}`")))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| AppError::BadRequest(format!("`{name}` is not a number: {raw}")))
}

/// Resolve the query to a coordinate, plus the place name when it came
/// from a search.
async fn resolve(state: &AppState, q: &ForecastQuery) -> Result<(Coord, Option<String>), AppError> {
    if let Some(query) = q.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let geocoder = state
            .geocoder
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("place search is disabled, use `lat` and `lon`".into()))?;
        state.geocode_lookups_total.add(1, &[]);
        let place = geocoder.search(query).await?;
        tracing::debug!(query, name = %place.name, "place resolved");
        return Ok((place.coord, Some(place.name)));
    }

    let lat = parse_degrees("lat", q.lat.as_deref())?;
    let lon = parse_degrees("lon", q.lon.as_deref())?;
    Ok((Coord::new(lat, lon)?, None))
}

/// Reverse lookup for a freshly fetched location. Failures only cost the name.
async fn location_name(state: &AppState, coord: Coord) -> Option<String> {
    let geocoder = state.geocoder.as_ref()?;
    state.geocode_lookups_total.add(1, &[]);
    match geocoder.reverse(coord).await {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!(error = %e, geocoder = geocoder.name(), "reverse lookup failed");
            None
        }
    }
}

async fn forecast(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ForecastQuery>,
) -> Result<Json<ForecastResponse>, AppError> {
    state.requests_total.add(1, &[]);

    let (coord, searched_name) = resolve(&state, &q).await?;
    let key = CoordKey::new(coord.latitude, coord.longitude);

    let now = Utc::now();
    let hit = state.cache.lock().await.get(&key, now).cloned();
    let (entry, cached) = match hit {
        Some(entry) => {
            state.cache_hits_total.add(1, &[]);
            tracing::debug!(%key, "forecast cache hit");
            (entry, true)
        }
        None => {
            state.upstream_fetches_total.add(1, &[]);
            tracing::debug!(%key, source = state.source.name(), "forecast cache miss");
            let forecast = state.source.fetch(coord).await?;
            let location_name = match searched_name.clone() {
                Some(name) => Some(name),
                None => location_name(&state, coord).await,
            };
            let entry = CachedForecast {
                forecast,
                location_name,
            };
            state
                .cache
                .lock()
                .await
                .insert(key.clone(), entry.clone(), now);
            (entry, false)
        }
    };

    let report = state.pipeline.run(&entry.forecast.samples);
    Ok(Json(ForecastResponse {
        location: Location {
            key: key.to_string(),
            name: entry.location_name.or(searched_name),
            latitude: coord.latitude,
            longitude: coord.longitude,
            timezone: entry.forecast.timezone,
            source: state.source.name().to_string(),
        },
        cached,
        report,
    }))
}
