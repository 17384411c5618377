//! Sunrise/sunset time series and its terminal rendering.

use crate::time_format::clock_to_decimal_hours;
use crate::types::DayResult;
use serde::Serialize;
use std::collections::BTreeMap;

/// Columns for 24 hours, half an hour each.
const BAR_WIDTH: usize = 48;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub sunrise: Option<f64>,
    pub sunset: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartData {
    points: BTreeMap<usize, ChartPoint>,
    rendered: Vec<String>,
    redraws: u64,
}

impl ChartData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, index: usize, label: &str, day: &DayResult) {
        self.points.insert(
            index,
            ChartPoint {
                label: label.to_string(),
                sunrise: clock_to_decimal_hours(&day.sunrise),
                sunset: clock_to_decimal_hours(&day.sunset),
            },
        );
        self.redraw();
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.redraw();
    }

    pub fn points(&self) -> impl Iterator<Item = &ChartPoint> {
        self.points.values()
    }

    pub fn sunrise_series(&self) -> Vec<Option<f64>> {
        self.points.values().map(|p| p.sunrise).collect()
    }

    pub fn sunset_series(&self) -> Vec<Option<f64>> {
        self.points.values().map(|p| p.sunset).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn rendered(&self) -> &[String] {
        &self.rendered
    }

    #[cfg(test)]
    pub fn redraws(&self) -> u64 {
        self.redraws
    }

    fn redraw(&mut self) {
        self.redraws += 1;
        self.rendered.clear();
        if self.points.is_empty() {
            return;
        }

        let label_width = self
            .points
            .values()
            .map(|p| p.label.chars().count())
            .max()
            .unwrap_or(0);

        let mut axis = String::new();
        for hour in (0..=24).step_by(6) {
            let column = hour * BAR_WIDTH / 24;
            while axis.chars().count() < column {
                axis.push(' ');
            }
            axis.push_str(&hour.to_string());
        }
        self.rendered
            .push(format!("{:width$}  {}", "", axis, width = label_width));

        for point in self.points.values() {
            let summary = match (point.sunrise, point.sunset) {
                (Some(rise), Some(set)) => format!("{:5.2} - {:5.2}", rise, set),
                _ => "n/a".to_string(),
            };
            self.rendered.push(format!(
                "{:width$}  {}  {}",
                point.label,
                daylight_bar(point.sunrise, point.sunset),
                summary,
                width = label_width
            ));
        }
    }
}

fn daylight_bar(sunrise: Option<f64>, sunset: Option<f64>) -> String {
    let (Some(rise), Some(set)) = (sunrise, sunset) else {
        return "?".repeat(BAR_WIDTH);
    };

    (0..BAR_WIDTH)
        .map(|column| {
            let hour = (column as f64 + 0.5) * 24.0 / BAR_WIDTH as f64;
            // Sunset before sunrise happens when the provider reports local
            // times of a location whose daylight spans midnight.
            let lit = if rise <= set {
                hour >= rise && hour < set
            } else {
                hour >= rise || hour < set
            };
            if lit { '█' } else { '·' }
        })
        .collect()
}
