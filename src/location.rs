//! Turning a device lookup, a preset selection or a place name into coordinates.

use crate::api::{Geocoder, PositionProvider};
use crate::config::Preset;
use crate::error::FetchError;
use crate::types::Coordinates;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Device,
    /// A "lat,lon" value or the name of a preset.
    Selection(String),
    Search(String),
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationQuery::Device => write!(f, "device position"),
            LocationQuery::Selection(value) => write!(f, "selection {:?}", value),
            LocationQuery::Search(query) => write!(f, "search {:?}", query),
        }
    }
}

pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
    locator: Option<Arc<dyn PositionProvider>>,
    presets: Vec<Preset>,
}

impl LocationResolver {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        locator: Option<Arc<dyn PositionProvider>>,
        presets: Vec<Preset>,
    ) -> Self {
        Self {
            geocoder,
            locator,
            presets,
        }
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub async fn resolve(&self, query: &LocationQuery) -> Result<Coordinates, FetchError> {
        let resolved = match query {
            LocationQuery::Device => self.from_device().await,
            LocationQuery::Selection(value) => self.from_selection(value),
            LocationQuery::Search(text) => self.from_search(text).await,
        };
        match &resolved {
            Ok(coords) => info!(%query, %coords, "location resolved"),
            Err(err) => debug!(%query, %err, "location not resolved"),
        }
        resolved
    }

    pub async fn from_device(&self) -> Result<Coordinates, FetchError> {
        match &self.locator {
            Some(locator) => locator.current_position().await,
            None => Err(FetchError::LocationUnavailable(
                "device location is disabled".into(),
            )),
        }
    }

    pub fn from_selection(&self, value: &str) -> Result<Coordinates, FetchError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(FetchError::NoSelection);
        }

        let combined = self
            .presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(value))
            .map(|p| p.value.as_str())
            .unwrap_or(value);

        parse_selection(combined)
    }

    pub async fn from_search(&self, query: &str) -> Result<Coordinates, FetchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FetchError::LocationNotFound(String::new()));
        }

        let candidates = self.geocoder.search(query).await?;
        candidates
            .first()
            .map(|c| c.coordinates())
            .ok_or_else(|| FetchError::LocationNotFound(query.to_string()))
    }
}

/// Splits a combined "lat,lon" value. Ranges are not checked.
pub fn parse_selection(value: &str) -> Result<Coordinates, FetchError> {
    let invalid = || FetchError::InvalidSelection(value.to_string());

    let (lat, lon) = value.split_once(',').ok_or_else(invalid)?;
    let latitude = lat.trim().parse::<f64>().map_err(|_| invalid())?;
    let longitude = lon.trim().parse::<f64>().map_err(|_| invalid())?;

    Ok(Coordinates::new(latitude, longitude))
}
