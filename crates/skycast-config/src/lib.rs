use serde::{Deserialize, Serialize};
use skycast_core::{CoreError, PipelineConfig};
use std::fs;
use std::path::Path;

pub const DEFAULT_HTTP_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_MODEL: &str = "ecmwf_ifs";
pub const DEFAULT_TIMEZONE: &str = "auto";
pub const DEFAULT_FORECAST_DAYS: u8 = 15;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 6 * 60 * 60;
pub const DEFAULT_CLEAR_HOURS: [u32; 3] = [0, 12, 18];
pub const DEFAULT_MAINTENANCE_SECS: u64 = 60;
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = concat!("skycast/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timezone: Option<String>,
    pub forecast_days: Option<u8>,
    pub timeout_secs: Option<u64>,
    /// Serve a saved Open-Meteo response instead of calling the API
    pub fixture: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: Option<u64>,
    pub clear_hours: Option<Vec<u32>>,
    pub maintenance_interval_secs: Option<u64>,
    pub snapshot_path: Option<String>,
}

/// Place search and naming. Nominatim needs an identifying user agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub http: Option<HttpConfig>,
    pub forecast: Option<ForecastConfig>,
    pub cache: Option<CacheConfig>,
    pub geocoder: Option<GeocoderConfig>,
    pub pipeline: Option<PipelineConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid pipeline settings: {0}")]
    Pipeline(#[from] CoreError),
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Load configuration from SKYCAST_CONFIG path (TOML) if present, with reasonable defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("SKYCAST_CONFIG").unwrap_or_else(|_| "skycast.toml".to_string());
        Self::load_from(path)
    }

    /// Load from an explicit path; a missing file yields the defaults
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let cfg = if path.exists() {
            let s = fs::read_to_string(path)?;
            Self::from_toml(&s)?
        } else {
            AppConfig::default()
        };
        Ok(cfg)
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let cfg = toml::from_str::<AppConfig>(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline().validate()?;
        if let Some(hour) = self.clear_hours().into_iter().find(|h| *h > 23) {
            return Err(ConfigError::Invalid(format!(
                "cache clear hour {hour} is not a valid hour of day"
            )));
        }
        if self.forecast_days() == 0 {
            return Err(ConfigError::Invalid("forecast_days must be at least 1".into()));
        }
        if self.maintenance_interval_secs() == 0 {
            return Err(ConfigError::Invalid(
                "maintenance_interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Get HTTP bind address (default 0.0.0.0:8080)
    pub fn http_bind(&self) -> String {
        self.http
            .as_ref()
            .and_then(|h| h.bind.clone())
            .unwrap_or_else(|| DEFAULT_HTTP_BIND.to_string())
    }

    pub fn forecast_base_url(&self) -> String {
        self.forecast_opt(|f| f.base_url.clone())
            .unwrap_or_else(|| DEFAULT_FORECAST_URL.to_string())
    }

    pub fn forecast_model(&self) -> String {
        self.forecast_opt(|f| f.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn forecast_timezone(&self) -> String {
        self.forecast_opt(|f| f.timezone.clone())
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string())
    }

    pub fn forecast_days(&self) -> u8 {
        self.forecast_opt(|f| f.forecast_days)
            .unwrap_or(DEFAULT_FORECAST_DAYS)
    }

    pub fn forecast_timeout_secs(&self) -> u64 {
        self.forecast_opt(|f| f.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn forecast_fixture(&self) -> Option<String> {
        self.forecast_opt(|f| f.fixture.clone())
    }

    pub fn cache_ttl_secs(&self) -> u64 {
        self.cache_opt(|c| c.ttl_secs)
            .unwrap_or(DEFAULT_CACHE_TTL_SECS)
    }

    pub fn clear_hours(&self) -> Vec<u32> {
        self.cache_opt(|c| c.clear_hours.clone())
            .unwrap_or_else(|| DEFAULT_CLEAR_HOURS.to_vec())
    }

    pub fn maintenance_interval_secs(&self) -> u64 {
        self.cache_opt(|c| c.maintenance_interval_secs)
            .unwrap_or(DEFAULT_MAINTENANCE_SECS)
    }

    pub fn snapshot_path(&self) -> Option<String> {
        self.cache_opt(|c| c.snapshot_path.clone())
    }

    pub fn geocoder_enabled(&self) -> bool {
        self.geocoder_opt(|g| g.enabled).unwrap_or(true)
    }

    pub fn geocoder_base_url(&self) -> String {
        self.geocoder_opt(|g| g.base_url.clone())
            .unwrap_or_else(|| DEFAULT_GEOCODER_URL.to_string())
    }

    pub fn geocoder_user_agent(&self) -> String {
        self.geocoder_opt(|g| g.user_agent.clone())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    pub fn geocoder_timeout_secs(&self) -> u64 {
        self.geocoder_opt(|g| g.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn pipeline(&self) -> PipelineConfig {
        self.pipeline.unwrap_or_default()
    }

    fn forecast_opt<T>(&self, f: impl FnOnce(&ForecastConfig) -> Option<T>) -> Option<T> {
        self.forecast.as_ref().and_then(f)
    }

    fn cache_opt<T>(&self, f: impl FnOnce(&CacheConfig) -> Option<T>) -> Option<T> {
        self.cache.as_ref().and_then(f)
    }

    fn geocoder_opt<T>(&self, f: impl FnOnce(&GeocoderConfig) -> Option<T>) -> Option<T> {
        self.geocoder.as_ref().and_then(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_bind_is_8080() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.http_bind(), "0.0.0.0:8080");
    }

    #[test]
    fn defaults_match_dashboard_behaviour() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.forecast_model(), "ecmwf_ifs");
        assert_eq!(cfg.forecast_days(), 15);
        assert_eq!(cfg.cache_ttl_secs(), 21_600);
        assert_eq!(cfg.clear_hours(), vec![0, 12, 18]);
        assert!(cfg.snapshot_path().is_none());
        assert!(!cfg.pipeline().night_wraparound);
        assert!(cfg.geocoder_enabled());
        assert_eq!(cfg.geocoder_base_url(), "https://nominatim.openstreetmap.org");
        assert!(cfg.geocoder_user_agent().starts_with("skycast/"));
    }

    #[test]
    fn geocoder_section() {
        let cfg = AppConfig::from_toml(
            r#"
            [geocoder]
            enabled = false
            user_agent = "skycast-test (ops@example.org)"
            timeout_secs = 3
            "#,
        )
        .unwrap();
        assert!(!cfg.geocoder_enabled());
        assert_eq!(cfg.geocoder_user_agent(), "skycast-test (ops@example.org)");
        assert_eq!(cfg.geocoder_timeout_secs(), 3);
        assert_eq!(cfg.geocoder_base_url(), DEFAULT_GEOCODER_URL);
    }

    #[test]
    fn parses_sections() {
        let cfg = AppConfig::from_toml(
            r#"
            [http]
            bind = "127.0.0.1:9000"

            [forecast]
            model = "best_match"
            forecast_days = 7

            [cache]
            ttl_secs = 600
            clear_hours = [6]

            [pipeline]
            night_wraparound = true
            tie_break = "mean"

            [pipeline.clouds]
            few = 30.0
            mostly = 90.0
            "#,
        )
        .unwrap();

        assert_eq!(cfg.http_bind(), "127.0.0.1:9000");
        assert_eq!(cfg.forecast_model(), "best_match");
        assert_eq!(cfg.forecast_days(), 7);
        assert_eq!(cfg.forecast_timezone(), "auto");
        assert_eq!(cfg.cache_ttl_secs(), 600);
        assert_eq!(cfg.clear_hours(), vec![6]);

        let pipeline = cfg.pipeline();
        assert!(pipeline.night_wraparound);
        assert_eq!(pipeline.tie_break, skycast_core::TieBreak::Mean);
        assert_eq!(pipeline.clouds.few, 30.0);
        assert_eq!(pipeline.clouds.clear, 10.0);
    }

    #[test]
    fn rejects_bad_pipeline() {
        let err = AppConfig::from_toml(
            r#"
            [pipeline.parts]
            morning_start = 14
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Pipeline(_)));
    }

    #[test]
    fn rejects_bad_clear_hour() {
        let err = AppConfig::from_toml("[cache]\nclear_hours = [24]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.http_bind(), DEFAULT_HTTP_BIND);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skycast.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[forecast]\nfixture = \"fixtures/sample.json\"").unwrap();

        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.forecast_fixture().as_deref(), Some("fixtures/sample.json"));
    }
}
