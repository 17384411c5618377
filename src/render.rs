//! Applies fetch outcomes to the display.

use crate::config::FetchMode;
use crate::display::{DataDisplay, DayBlock};
use crate::error::FetchError;
use crate::scheduler::{Cycle, FetchEvent};
use crate::types::{DayField, DayResult, FetchRequest};
use tracing::{debug, info};

const FIELD_PREFIXES: [&str; 2] = ["today", "tomorrow"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// One labelled block per day, addressed by day index.
    Blocks,
    /// Named `<prefix>-<field>` slots plus a timezone slot.
    Fields,
}

impl From<FetchMode> for RenderMode {
    fn from(mode: FetchMode) -> Self {
        match mode {
            FetchMode::Week | FetchMode::Today => RenderMode::Blocks,
            FetchMode::Pair => RenderMode::Fields,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Rendered,
    Failed,
    /// Event from an abandoned cycle, or arriving after the cycle failed.
    Dropped,
}

#[derive(Debug, Clone, Copy)]
struct CycleProgress {
    id: u64,
    expected: usize,
    received: usize,
    failed: bool,
}

pub fn field_slot(prefix: &str, field: DayField) -> String {
    format!("{}-{}", prefix, field.key())
}

/// Shows the user-facing text of `error` in place of the display content.
///
/// Returns false for failures that are silent by contract (an empty selection).
pub fn present_error(display: &mut DataDisplay, error: &FetchError) -> bool {
    match error.user_message() {
        Some(message) => {
            info!(%error, "presenting error");
            display.replace_with_message(&message);
            true
        }
        None => false,
    }
}

pub fn render_day(
    display: &mut DataDisplay,
    mode: RenderMode,
    request: &FetchRequest,
    day: &DayResult,
) {
    match mode {
        RenderMode::Blocks => {
            let date = request
                .iso_date()
                .or_else(|| (!day.date.is_empty()).then(|| day.date.clone()));
            display.place_block(DayBlock {
                index: request.index,
                label: request.label.clone(),
                date,
                result: day.clone(),
            });
        }
        RenderMode::Fields => {
            let Some(prefix) = FIELD_PREFIXES.get(request.index) else {
                debug!(index = request.index, "no field slots for day");
                return;
            };
            for field in DayField::ALL {
                display.set_field(&field_slot(prefix, field), day.field(field));
            }
            if request.index == 0 {
                display.set_timezone(&day.timezone);
            }
        }
    }

    if let Some(chart) = display.chart_mut() {
        chart.update(request.index, &request.label, day);
    }
}

pub struct ResultRenderer {
    mode: RenderMode,
    display: DataDisplay,
    cycle: Option<CycleProgress>,
}

impl ResultRenderer {
    pub fn new(mode: RenderMode, chart: bool) -> Self {
        Self {
            mode,
            display: DataDisplay::new(chart),
            cycle: None,
        }
    }

    pub fn display(&self) -> &DataDisplay {
        &self.display
    }

    /// Makes `cycle` the only one whose events are rendered and clears old results.
    pub fn begin_cycle(&mut self, cycle: Cycle) {
        self.display.clear();
        self.cycle = Some(CycleProgress {
            id: cycle.id,
            expected: cycle.expected,
            received: 0,
            failed: false,
        });
    }

    /// Presents a failure that happened outside of a fetch cycle (location lookup).
    pub fn present_error(&mut self, error: &FetchError) -> bool {
        let shown = present_error(&mut self.display, error);
        if shown {
            self.cycle = None;
        }
        shown
    }

    pub fn apply(&mut self, event: FetchEvent) -> Applied {
        let Some(progress) = self.cycle.as_mut() else {
            debug!(cycle = event.cycle, "no active cycle, dropping event");
            return Applied::Dropped;
        };
        if event.cycle != progress.id || progress.failed {
            debug!(
                cycle = event.cycle,
                current = progress.id,
                index = event.request.index,
                "dropping stale event"
            );
            return Applied::Dropped;
        }

        progress.received += 1;
        match event.outcome {
            Ok(day) => {
                render_day(&mut self.display, self.mode, &event.request, &day);
                Applied::Rendered
            }
            Err(error) => {
                progress.failed = true;
                present_error(&mut self.display, &error);
                Applied::Failed
            }
        }
    }

    /// True when the current cycle has nothing more to render.
    pub fn is_settled(&self) -> bool {
        self.cycle.is_none_or(|p| p.failed || p.received >= p.expected)
    }
}
