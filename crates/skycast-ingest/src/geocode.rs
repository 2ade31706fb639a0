//! Place search and reverse lookup against Nominatim

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::{Coord, IngestError, IngestResult};

/// A resolved place
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub coord: Coord,
    pub name: String,
}

/// Address block of a Nominatim hit (only the parts we read)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Address {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub municipality: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl Address {
    /// Display name as `City, State - Country`. Absent parts and their
    /// separators are left out; `None` when nothing is known.
    pub fn label(&self) -> Option<String> {
        let city = [&self.city, &self.town, &self.village, &self.municipality]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("");
        let state = self.state.as_deref().filter(|s| !s.is_empty());
        let country = self.country.as_deref().filter(|s| !s.is_empty());

        let mut label = city.to_string();
        if let Some(state) = state {
            if label.is_empty() {
                label.push_str(state);
            } else {
                label.push_str(", ");
                label.push_str(state);
            }
        }
        if let Some(country) = country {
            if !label.is_empty() {
                label.push_str(" - ");
            }
            label.push_str(country);
        }
        (!label.is_empty()).then_some(label)
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseHit {
    #[serde(default)]
    address: Option<Address>,
}

/// Trait for place name lookups
#[async_trait]
pub trait Geocoder: Send + Sync {
    fn name(&self) -> &str;

    /// Best match for a free-text query
    async fn search(&self, query: &str) -> IngestResult<Place>;

    /// Display name for a coordinate, `None` when the service knows no address
    async fn reverse(&self, coord: Coord) -> IngestResult<Option<String>>;
}

#[derive(Debug, Clone)]
pub struct NominatimSettings {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for NominatimSettings {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("skycast/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Geocoder backed by the public Nominatim API
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    settings: NominatimSettings,
}

impl NominatimGeocoder {
    pub fn new(settings: NominatimSettings) -> IngestResult<Self> {
        // Nominatim rejects requests without an identifying agent
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.settings.base_url.trim_end_matches('/'))
    }

    pub fn search_url(&self, query: &str) -> IngestResult<Url> {
        let url = Url::parse_with_params(
            &self.endpoint("search"),
            &[
                ("format", "json"),
                ("addressdetails", "1"),
                ("q", query),
                ("limit", "1"),
            ],
        )?;
        Ok(url)
    }

    pub fn reverse_url(&self, coord: Coord) -> IngestResult<Url> {
        let url = Url::parse_with_params(
            &self.endpoint("reverse"),
            &[
                ("format", "json".to_string()),
                ("lat", coord.latitude.to_string()),
                ("lon", coord.longitude.to_string()),
                ("addressdetails", "1".to_string()),
            ],
        )?;
        Ok(url)
    }

    async fn get(&self, url: Url) -> IngestResult<reqwest::Response> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "geocoder request rejected");
            return Err(IngestError::Upstream(status.as_u16()));
        }
        Ok(response)
    }
}

fn parse_degrees(value: &str) -> IngestResult<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| IngestError::InvalidCoord(format!("{value:?} is not a number")))
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    fn name(&self) -> &str {
        "nominatim"
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> IngestResult<Place> {
        let url = self.search_url(query)?;
        debug!(%url, "searching place");

        let hits: Vec<SearchHit> = self.get(url).await?.json().await?;
        let hit = hits
            .into_iter()
            .next()
            .ok_or_else(|| IngestError::NotFound(query.to_string()))?;

        let coord = Coord::new(parse_degrees(&hit.lat)?, parse_degrees(&hit.lon)?)?;
        let name = hit
            .address
            .and_then(|a| a.label())
            .or(hit.display_name)
            .unwrap_or_else(|| query.to_string());
        debug!(%name, "place found");
        Ok(Place { coord, name })
    }

    #[instrument(skip(self), fields(lat = coord.latitude, lon = coord.longitude))]
    async fn reverse(&self, coord: Coord) -> IngestResult<Option<String>> {
        let url = self.reverse_url(coord)?;
        let hit: ReverseHit = self.get(url).await?.json().await?;
        Ok(hit.address.and_then(|a| a.label()))
    }
}
