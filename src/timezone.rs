//! Which timezone "today" and the clock are computed in.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use chrono_tz::{Tz, UTC};
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimezoneSpec {
    Fixed(FixedOffset),
    Named(Tz),
}

impl TimezoneSpec {
    pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            TimezoneSpec::Fixed(offset) => instant.with_timezone(offset),
            TimezoneSpec::Named(tz) => instant.with_timezone(tz).fixed_offset(),
        }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.localize(Utc::now())
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Cached system timezone - computed once at first access
static SYSTEM_TIMEZONE: OnceLock<Tz> = OnceLock::new();

/// System timezone: `TZ` first (tests and overrides), then the OS setting, then UTC.
pub fn get_system_timezone() -> Tz {
    *SYSTEM_TIMEZONE.get_or_init(|| {
        if let Ok(tz_str) = std::env::var("TZ")
            && let Ok(tz) = tz_str.parse::<Tz>()
        {
            return tz;
        }

        iana_time_zone::get_timezone()
            .ok()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(UTC)
    })
}

/// Override if given, system timezone otherwise.
pub fn resolve_timezone(override_str: Option<&str>) -> Result<TimezoneSpec, String> {
    match override_str {
        None => Ok(TimezoneSpec::Named(get_system_timezone())),
        Some(tz_str) => tz_str.parse(),
    }
}

impl FromStr for TimezoneSpec {
    type Err = String;

    /// `±HH:MM` gives a fixed offset; anything else must be an IANA name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(digits) = s.strip_prefix(['+', '-']) else {
            return s.parse::<Tz>().map(TimezoneSpec::Named).map_err(|_| {
                format!(
                    "Unsupported timezone: {}. Use format like +01:00, UTC, or Europe/Berlin",
                    s
                )
            });
        };

        let sign = if s.starts_with('-') { -1 } else { 1 };
        digits
            .split_once(':')
            .filter(|(hours, minutes)| hours.len() == 2 && minutes.len() == 2)
            .and_then(|(hours, minutes)| {
                let hours: i32 = hours.parse().ok()?;
                let minutes: i32 = minutes.parse().ok()?;
                (minutes < 60).then_some(hours * 3600 + minutes * 60)
            })
            .and_then(|seconds| FixedOffset::east_opt(sign * seconds))
            .map(TimezoneSpec::Fixed)
            .ok_or_else(|| format!("Invalid offset: {}", s))
    }
}
