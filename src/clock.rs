//! Self-refreshing date/time label, independent of any fetch cycle.

use crate::timezone::TimezoneSpec;
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::io::Write;
use std::time::Duration;

const REFRESH: Duration = Duration::from_secs(1);

/// `"Friday, June 21, 2024 | 02:05:09 PM"`
pub fn format_clock<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!("{} | {}", now.format("%A, %B %-d, %Y"), now.format("%I:%M:%S %p"))
}

/// Redraws the label in place every second; `count` of 0 never stops.
pub async fn run_clock<W: Write>(
    tz: TimezoneSpec,
    count: u64,
    writer: &mut W,
) -> std::io::Result<()> {
    let mut ticker = tokio::time::interval(REFRESH);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut ticks = 0u64;

    loop {
        ticker.tick().await;
        write!(writer, "\r{}", format_clock(&tz.now()))?;
        writer.flush()?;
        ticks += 1;
        if count != 0 && ticks >= count {
            break;
        }
    }

    writeln!(writer)
}
