//! HTTP clients for the daylight, geocoding and IP-location services.

use crate::error::FetchError;
use crate::types::{Coordinates, DayResult, FetchRequest};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_DAYLIGHT_URL: &str = "https://api.sunrisesunset.io/json";
pub const DEFAULT_GEOCODE_URL: &str = "https://geocode.maps.co/search";
pub const DEFAULT_LOCATE_URL: &str = "https://ipapi.co/json/";

const SUCCESS_STATUS: &str = "OK";

#[async_trait]
pub trait DaylightApi: Send + Sync {
    async fn fetch_day(&self, request: &FetchRequest) -> Result<DayResult, FetchError>;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Candidates in provider ranking order; empty when nothing matched.
    async fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, FetchError>;
}

#[async_trait]
pub trait PositionProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, FetchError>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeocodeCandidate {
    #[serde(deserialize_with = "loose_f64")]
    pub lat: f64,
    #[serde(deserialize_with = "loose_f64")]
    pub lon: f64,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl GeocodeCandidate {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }
}

/// Geocoders disagree on whether coordinates are JSON numbers or strings.
fn loose_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Number(f64),
        Text(String),
    }

    match Loose::deserialize(deserializer)? {
        Loose::Number(value) => Ok(value),
        Loose::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
struct DaylightEnvelope {
    #[serde(default)]
    results: serde_json::Value,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct LocateResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    reason: Option<String>,
}

pub fn build_http_client(timeout: Duration) -> Result<Client, String> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("sunfetch/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| format!("Cannot create HTTP client: {}", e))
}

/// Query URL for one day; the date parameter is left out for provider-default requests.
pub fn daylight_url(base: &str, request: &FetchRequest) -> Result<Url, FetchError> {
    let mut params = vec![
        ("lat", request.coordinates.latitude.to_string()),
        ("lng", request.coordinates.longitude.to_string()),
    ];
    if let Some(date) = request.iso_date() {
        params.push(("date", date));
    }
    Url::parse_with_params(base, &params).map_err(|e| FetchError::NetworkError(e.to_string()))
}

pub fn geocode_url(base: &str, query: &str, api_key: Option<&str>) -> Result<Url, FetchError> {
    let mut params = vec![("q", query)];
    if let Some(key) = api_key {
        params.push(("api_key", key));
    }
    Url::parse_with_params(base, &params).map_err(|e| FetchError::GeocodeError(e.to_string()))
}

pub struct SunriseSunsetClient {
    client: Client,
    base_url: String,
}

impl SunriseSunsetClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl DaylightApi for SunriseSunsetClient {
    async fn fetch_day(&self, request: &FetchRequest) -> Result<DayResult, FetchError> {
        let url = daylight_url(&self.base_url, request)?;
        debug!(%url, index = request.index, "requesting daylight data");

        // Error statuses still carry the JSON envelope, so the body decides.
        let envelope = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))?
            .json::<DaylightEnvelope>()
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;

        if envelope.status != SUCCESS_STATUS {
            return Err(FetchError::ApiError(envelope.status));
        }

        serde_json::from_value(envelope.results)
            .map_err(|e| FetchError::NetworkError(format!("malformed results: {}", e)))
    }
}

pub struct GeocodeClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeocodeClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl Geocoder for GeocodeClient {
    async fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, FetchError> {
        let url = geocode_url(&self.base_url, query, self.api_key.as_deref())?;
        debug!(query, "geocoding");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::GeocodeError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::GeocodeError(format!("HTTP {}", status)));
        }

        response
            .json::<Vec<GeocodeCandidate>>()
            .await
            .map_err(|e| FetchError::GeocodeError(e.to_string()))
    }
}

/// Approximates the device position from the public IP address.
pub struct IpLocator {
    client: Client,
    url: String,
}

impl IpLocator {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl PositionProvider for IpLocator {
    async fn current_position(&self) -> Result<Coordinates, FetchError> {
        debug!(url = %self.url, "locating device");

        let located = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::LocationUnavailable(e.to_string()))?
            .json::<LocateResponse>()
            .await
            .map_err(|e| FetchError::LocationUnavailable(e.to_string()))?;

        match (located.latitude, located.longitude) {
            (Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)),
            _ => Err(FetchError::LocationUnavailable(
                located
                    .reason
                    .unwrap_or_else(|| "no coordinates in response".to_string()),
            )),
        }
    }
}
