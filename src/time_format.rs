//! 12-hour clock strings to decimal hours of day.

/// Converts `"H:MM[:SS] AM|PM"` to hours since midnight (`"7:45:00 PM"` -> 19.75).
///
/// Seconds are accepted but do not contribute. Returns `None` when the string
/// does not have that shape; provider output is expected to always parse.
pub fn clock_to_decimal_hours(input: &str) -> Option<f64> {
    let (clock, period) = input.trim().split_once(' ')?;
    let mut parts = clock.split(':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;

    if hours > 12 || minutes > 59 {
        return None;
    }

    let hours = match period.trim().to_ascii_uppercase().as_str() {
        "AM" if hours == 12 => 0,
        "AM" => hours,
        "PM" if hours == 12 => 12,
        "PM" => hours + 12,
        _ => return None,
    };

    Some(f64::from(hours) + f64::from(minutes) / 60.0)
}
