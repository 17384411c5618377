//! The display area: day blocks, fixed fields, chart and error message.
//!
//! Day blocks are addressed by their day index, so the final layout does not
//! depend on the order in which responses arrive.

use crate::chart::ChartData;
use crate::types::DayResult;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct DayBlock {
    pub index: usize,
    pub label: String,
    pub date: Option<String>,
    pub result: DayResult,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataDisplay {
    blocks: BTreeMap<usize, DayBlock>,
    fields: BTreeMap<String, String>,
    timezone: Option<String>,
    chart: Option<ChartData>,
    message: Option<String>,
}

impl DataDisplay {
    pub fn new(with_chart: bool) -> Self {
        Self {
            chart: with_chart.then(ChartData::new),
            ..Default::default()
        }
    }

    /// Empties every area; an enabled chart stays enabled.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.fields.clear();
        self.timezone = None;
        self.message = None;
        if let Some(chart) = self.chart.as_mut() {
            chart.clear();
        }
    }

    /// Adds a day block in its index slot without touching other slots.
    pub fn place_block(&mut self, block: DayBlock) {
        self.message = None;
        self.blocks.insert(block.index, block);
    }

    pub fn set_field(&mut self, slot: &str, value: &str) {
        self.message = None;
        self.fields.insert(slot.to_string(), value.to_string());
    }

    pub fn set_timezone(&mut self, timezone: &str) {
        self.timezone = Some(timezone.to_string());
    }

    /// Replaces all content with plain text.
    pub fn replace_with_message(&mut self, message: &str) {
        self.clear();
        self.message = Some(message.to_string());
    }

    pub fn blocks(&self) -> impl Iterator<Item = &DayBlock> {
        self.blocks.values()
    }

    pub fn block(&self, index: usize) -> Option<&DayBlock> {
        self.blocks.get(&index)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn field(&self, slot: &str) -> Option<&str> {
        self.fields.get(slot).map(String::as_str)
    }

    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    pub fn chart(&self) -> Option<&ChartData> {
        self.chart.as_ref()
    }

    pub fn chart_mut(&mut self) -> Option<&mut ChartData> {
        self.chart.as_mut()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
            && self.fields.is_empty()
            && self.timezone.is_none()
            && self.message.is_none()
            && self.chart.as_ref().is_none_or(|c| c.is_empty())
    }
}
