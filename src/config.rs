//! Runtime parameters, their defaults and the optional TOML config file.

use crate::api::{DEFAULT_DAYLIGHT_URL, DEFAULT_GEOCODE_URL, DEFAULT_LOCATE_URL};
use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const CONFIG_ENV: &str = "SUNFETCH_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Seven dated requests, today through today+6.
    Week,
    /// Today and tomorrow, fetched concurrently into fixed fields.
    Pair,
    /// One undated request; the provider picks today.
    Today,
}

impl FetchMode {
    pub fn all() -> &'static [&'static str] {
        &["week", "pair", "today"]
    }
}

impl FromStr for FetchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "week" => Ok(FetchMode::Week),
            "pair" => Ok(FetchMode::Pair),
            "today" => Ok(FetchMode::Today),
            _ => Err(format!(
                "Invalid mode: {}. Supported: {}",
                s,
                Self::all().join(", ")
            )),
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchMode::Week => "week",
            FetchMode::Pair => "pair",
            FetchMode::Today => "today",
        };
        write!(f, "{}", name)
    }
}

/// How dispatches within a week cycle are spaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Request i fires at cycle start + i * delay.
    Offset,
    /// Request i fires one delay after request i-1 was dispatched.
    Interval,
    /// Request i fires one delay after request i-1 completed.
    Sequential,
}

impl Pacing {
    pub fn all() -> &'static [&'static str] {
        &["offset", "interval", "sequential"]
    }
}

impl FromStr for Pacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "offset" => Ok(Pacing::Offset),
            "interval" => Ok(Pacing::Interval),
            "sequential" => Ok(Pacing::Sequential),
            _ => Err(format!(
                "Invalid pacing: {}. Supported: {}",
                s,
                Self::all().join(", ")
            )),
        }
    }
}

impl fmt::Display for Pacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pacing::Offset => "offset",
            Pacing::Interval => "interval",
            Pacing::Sequential => "sequential",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn all() -> &'static [&'static str] {
        &["text", "json", "csv"]
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!(
                "Invalid format: {}. Supported: {}",
                s,
                Self::all().join(", ")
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub daylight: String,
    pub geocode: String,
    pub geocode_key: Option<String>,
    /// Empty disables device location.
    pub locate: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            daylight: DEFAULT_DAYLIGHT_URL.to_string(),
            geocode: DEFAULT_GEOCODE_URL.to_string(),
            geocode_key: None,
            locate: DEFAULT_LOCATE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: String,
    /// Combined "lat,lon" value, the same shape a selection carries.
    pub value: String,
}

impl Preset {
    fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

pub fn builtin_presets() -> Vec<Preset> {
    vec![
        Preset::new("New York", "40.7128,-74.0060"),
        Preset::new("London", "51.5074,-0.1278"),
        Preset::new("Paris", "48.8566,2.3522"),
        Preset::new("Berlin", "52.5200,13.4050"),
        Preset::new("Tokyo", "35.6762,139.6503"),
        Preset::new("Sydney", "-33.8688,151.2093"),
        Preset::new("Reykjavik", "64.1466,-21.9426"),
        Preset::new("Cape Town", "-33.9249,18.4241"),
    ]
}

#[derive(Debug, Clone)]
pub struct Parameters {
    pub mode: FetchMode,
    pub pacing: Pacing,
    pub delay: Duration,
    pub chart: bool,
    pub format: OutputFormat,
    pub headers: bool,
    pub icons: bool,
    pub timeout: Duration,
    pub endpoints: Endpoints,
    pub presets: Vec<Preset>,
    pub log_filter: Option<String>,
    /// IANA name or fixed offset deciding "today"; system timezone when unset.
    pub timezone: Option<String>,
    /// Clock ticks before exiting; 0 runs until interrupted.
    pub clock_count: u64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            mode: FetchMode::Week,
            pacing: Pacing::Interval,
            delay: Duration::from_millis(500),
            chart: false,
            format: OutputFormat::Text,
            headers: true,
            icons: true,
            timeout: Duration::from_secs(10),
            endpoints: Endpoints::default(),
            presets: builtin_presets(),
            log_filter: None,
            timezone: None,
            clock_count: 0,
        }
    }
}

impl Parameters {
    /// Preset by case-insensitive name.
    #[cfg(test)]
    pub fn preset(&self, name: &str) -> Option<&Preset> {
        self.presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn apply_file(&mut self, file: ConfigFile) -> Result<(), ConfigError> {
        if let Some(mode) = file.mode {
            self.mode = mode.parse().map_err(ConfigError::Value)?;
        }
        if let Some(pacing) = file.pacing {
            self.pacing = pacing.parse().map_err(ConfigError::Value)?;
        }
        if let Some(delay_ms) = file.delay_ms {
            self.delay = Duration::from_millis(delay_ms);
        }
        if let Some(chart) = file.chart {
            self.chart = chart;
        }
        if let Some(format) = file.format {
            self.format = format.parse().map_err(ConfigError::Value)?;
        }
        if let Some(headers) = file.headers {
            self.headers = headers;
        }
        if let Some(icons) = file.icons {
            self.icons = icons;
        }
        if let Some(timeout) = file.timeout_secs {
            if timeout == 0 {
                return Err(ConfigError::Value("timeout_secs must be positive".into()));
            }
            self.timeout = Duration::from_secs(timeout);
        }
        if let Some(log) = file.log {
            self.log_filter = Some(log);
        }
        if let Some(timezone) = file.timezone {
            self.timezone = Some(timezone);
        }

        let endpoints = file.endpoints;
        if let Some(url) = endpoints.daylight {
            self.endpoints.daylight = url;
        }
        if let Some(url) = endpoints.geocode {
            self.endpoints.geocode = url;
        }
        if let Some(key) = endpoints.geocode_key {
            self.endpoints.geocode_key = Some(key);
        }
        if let Some(url) = endpoints.locate {
            self.endpoints.locate = url;
        }

        for location in file.locations {
            if location.name.trim().is_empty() {
                return Err(ConfigError::Value("location name must not be empty".into()));
            }
            match self
                .presets
                .iter_mut()
                .find(|p| p.name.eq_ignore_ascii_case(&location.name))
            {
                Some(existing) => existing.value = location.coordinates,
                None => self
                    .presets
                    .push(Preset::new(&location.name, &location.coordinates)),
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub mode: Option<String>,
    pub pacing: Option<String>,
    pub delay_ms: Option<u64>,
    pub chart: Option<bool>,
    pub format: Option<String>,
    pub headers: Option<bool>,
    pub icons: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub log: Option<String>,
    pub timezone: Option<String>,
    #[serde(default)]
    pub endpoints: EndpointsFile,
    #[serde(default)]
    pub locations: Vec<LocationEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointsFile {
    pub daylight: Option<String>,
    pub geocode: Option<String>,
    pub geocode_key: Option<String>,
    pub locate: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationEntry {
    pub name: String,
    pub coordinates: String,
}

pub fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })
}
