use std::fmt;
use thiserror::Error;

/// Failures of a location lookup or a daylight fetch.
///
/// Every variant is terminal for the operation that raised it; nothing retries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("device position unavailable: {0}")]
    LocationUnavailable(String),
    #[error("no location selected")]
    NoSelection,
    #[error("invalid location selection: {0}")]
    InvalidSelection(String),
    #[error("no geocoding candidates for {0:?}")]
    LocationNotFound(String),
    #[error("geocoding failed: {0}")]
    GeocodeError(String),
    #[error("daylight service returned status {0}")]
    ApiError(String),
    #[error("daylight request failed: {0}")]
    NetworkError(String),
}

impl FetchError {
    /// Text shown in place of the display content, `None` for silent failures.
    pub fn user_message(&self) -> Option<String> {
        match self {
            FetchError::LocationUnavailable(_) => Some("Geolocation is not available.".into()),
            FetchError::NoSelection => None,
            FetchError::InvalidSelection(value) => {
                Some(format!("Invalid location selection: {}", value))
            }
            FetchError::LocationNotFound(_) => Some("Location not found.".into()),
            FetchError::GeocodeError(_) => Some("Error fetching location data.".into()),
            FetchError::ApiError(_) | FetchError::NetworkError(_) => {
                Some("Error fetching data.".into())
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid config value: {0}")]
    Value(String),
}

#[derive(Debug)]
pub enum CliError {
    /// Print message to stdout and exit with code 0 (help/version/usage).
    Exit(String),
    /// Print message to stderr and exit with code 1.
    Message(String),
}

impl From<String> for CliError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<&str> for CliError {
    fn from(value: &str) -> Self {
        Self::Message(value.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Message(value.to_string())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Exit(msg) | CliError::Message(msg) => write!(f, "{}", msg),
        }
    }
}
