use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}°, {:.5}°", self.latitude, self.longitude)
    }
}

/// One day of daylight data as returned by the daylight service.
///
/// Times are kept exactly as the provider formats them ("6:30:00 AM").
/// Polar days and nights come back as `null`, which is stored as an empty string.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DayResult {
    #[serde(default, deserialize_with = "nullable_string")]
    pub date: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub sunrise: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub sunset: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub dawn: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub dusk: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub day_length: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub solar_noon: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub timezone: String,
}

impl DayResult {
    pub fn field(&self, field: DayField) -> &str {
        match field {
            DayField::Sunrise => &self.sunrise,
            DayField::Sunset => &self.sunset,
            DayField::Dawn => &self.dawn,
            DayField::Dusk => &self.dusk,
            DayField::DayLength => &self.day_length,
            DayField::SolarNoon => &self.solar_noon,
        }
    }
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// The six displayed quantities of a day, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DayField {
    Sunrise,
    Sunset,
    Dawn,
    Dusk,
    DayLength,
    SolarNoon,
}

impl DayField {
    pub const ALL: [DayField; 6] = [
        DayField::Sunrise,
        DayField::Sunset,
        DayField::Dawn,
        DayField::Dusk,
        DayField::DayLength,
        DayField::SolarNoon,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DayField::Sunrise => "Sunrise",
            DayField::Sunset => "Sunset",
            DayField::Dawn => "Dawn",
            DayField::Dusk => "Dusk",
            DayField::DayLength => "Day Length",
            DayField::SolarNoon => "Solar Noon",
        }
    }

    /// Machine name used for fixed-field slots, JSON keys and CSV headers.
    pub fn key(self) -> &'static str {
        match self {
            DayField::Sunrise => "sunrise",
            DayField::Sunset => "sunset",
            DayField::Dawn => "dawn",
            DayField::Dusk => "dusk",
            DayField::DayLength => "day_length",
            DayField::SolarNoon => "solar_noon",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            DayField::Sunrise => "🌅",
            DayField::Sunset => "🌇",
            DayField::Dawn => "🌄",
            DayField::Dusk => "🌆",
            DayField::DayLength => "⏳",
            DayField::SolarNoon => "🌞",
        }
    }
}

/// A single dated request within a fetch cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub coordinates: Coordinates,
    /// `None` lets the provider pick its default day ("today").
    pub date: Option<NaiveDate>,
    pub index: usize,
    pub label: String,
}

impl FetchRequest {
    pub fn iso_date(&self) -> Option<String> {
        self.date.map(|d| d.format("%Y-%m-%d").to_string())
    }
}
