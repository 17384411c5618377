//! Output formatting for text, JSON, and CSV.

use crate::config::{OutputFormat, Parameters};
use crate::display::{DataDisplay, DayBlock};
use crate::render::field_slot;
use crate::types::DayField;
use serde_json::{Map, Value, json};
use std::io::{self, Write};
use unicode_width::UnicodeWidthStr;

const FIELD_PREFIXES: [(&str, &str); 2] = [("today", "Today"), ("tomorrow", "Tomorrow")];

pub fn write_display<W: Write>(
    display: &DataDisplay,
    params: &Parameters,
    writer: &mut W,
) -> io::Result<()> {
    match params.format {
        OutputFormat::Text => write_text(display, params.icons, writer),
        OutputFormat::Json => write_json(display, writer),
        OutputFormat::Csv => write_csv(display, params.headers, writer),
    }
}

fn field_caption(field: DayField, icons: bool) -> String {
    if icons {
        format!("{} {}:", field.icon(), field.label())
    } else {
        format!("{}:", field.label())
    }
}

fn write_field_lines<W: Write>(
    writer: &mut W,
    icons: bool,
    value_of: impl Fn(DayField) -> String,
) -> io::Result<()> {
    let captions: Vec<(DayField, String)> = DayField::ALL
        .iter()
        .map(|f| (*f, field_caption(*f, icons)))
        .collect();
    let width = captions
        .iter()
        .map(|(_, c)| UnicodeWidthStr::width(c.as_str()))
        .max()
        .unwrap_or(0);

    for (field, caption) in &captions {
        let padding = width - UnicodeWidthStr::width(caption.as_str());
        let value = value_of(*field);
        let value = if value.is_empty() { "-".to_string() } else { value };
        writeln!(writer, "  {}{}  {}", caption, " ".repeat(padding), value)?;
    }
    Ok(())
}

fn block_heading(block: &DayBlock) -> String {
    match &block.date {
        Some(date) if !block.label.contains(date.as_str()) => {
            format!("{} ({}):", block.label, date)
        }
        _ => format!("{}:", block.label),
    }
}

fn write_text<W: Write>(display: &DataDisplay, icons: bool, writer: &mut W) -> io::Result<()> {
    if let Some(message) = display.message() {
        return writeln!(writer, "{}", message);
    }

    let mut first = true;
    let mut separate = |writer: &mut W| -> io::Result<()> {
        if !first {
            writeln!(writer)?;
        }
        first = false;
        Ok(())
    };

    for block in display.blocks() {
        separate(writer)?;
        writeln!(writer, "{}", block_heading(block))?;
        write_field_lines(writer, icons, |f| block.result.field(f).to_string())?;
    }

    if let Some(timezone) = display.timezone() {
        separate(writer)?;
        writeln!(writer, "Timezone: {}", timezone)?;
    }

    for (prefix, heading) in FIELD_PREFIXES {
        let present = DayField::ALL
            .iter()
            .any(|f| display.field(&field_slot(prefix, *f)).is_some());
        if !present {
            continue;
        }
        separate(writer)?;
        writeln!(writer, "{}:", heading)?;
        write_field_lines(writer, icons, |f| {
            display
                .field(&field_slot(prefix, f))
                .unwrap_or_default()
                .to_string()
        })?;
    }

    if let Some(chart) = display.chart()
        && !chart.is_empty()
    {
        separate(writer)?;
        writeln!(writer, "Daylight (hour of day):")?;
        for line in chart.rendered() {
            writeln!(writer, "{}", line)?;
        }
    }

    Ok(())
}

pub fn display_to_json(display: &DataDisplay) -> Value {
    let mut root = Map::new();

    if let Some(message) = display.message() {
        root.insert("error".into(), json!(message));
        return Value::Object(root);
    }

    let blocks: Vec<Value> = display
        .blocks()
        .map(|block| {
            let mut entry = Map::new();
            entry.insert("day".into(), json!(block.index + 1));
            entry.insert("label".into(), json!(block.label));
            entry.insert("date".into(), json!(block.date));
            for field in DayField::ALL {
                entry.insert(field.key().into(), json!(block.result.field(field)));
            }
            entry.insert("timezone".into(), json!(block.result.timezone));
            Value::Object(entry)
        })
        .collect();
    if !blocks.is_empty() {
        root.insert("days".into(), Value::Array(blocks));
    }

    if !display.fields().is_empty() {
        root.insert("fields".into(), json!(display.fields()));
    }
    if let Some(timezone) = display.timezone() {
        root.insert("timezone".into(), json!(timezone));
    }

    if let Some(chart) = display.chart()
        && !chart.is_empty()
    {
        let points: Vec<Value> = chart.points().map(|p| json!(p)).collect();
        root.insert(
            "chart".into(),
            json!({
                "points": points,
                "sunrise": chart.sunrise_series(),
                "sunset": chart.sunset_series(),
            }),
        );
    }

    Value::Object(root)
}

fn write_json<W: Write>(display: &DataDisplay, writer: &mut W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &display_to_json(display))?;
    writeln!(writer)
}

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn write_csv<W: Write>(display: &DataDisplay, headers: bool, writer: &mut W) -> io::Result<()> {
    if let Some(message) = display.message() {
        return writeln!(writer, "{}", message);
    }

    if display.blocks().next().is_some() {
        if headers {
            let columns: Vec<&str> = DayField::ALL.iter().map(|f| f.key()).collect();
            writeln!(writer, "day,date,label,{},timezone", columns.join(","))?;
        }
        for block in display.blocks() {
            let values: Vec<String> = DayField::ALL
                .iter()
                .map(|f| csv_escape(block.result.field(*f)))
                .collect();
            writeln!(
                writer,
                "{},{},{},{},{}",
                block.index + 1,
                csv_escape(block.date.as_deref().unwrap_or_default()),
                csv_escape(&block.label),
                values.join(","),
                csv_escape(&block.result.timezone)
            )?;
        }
    }

    if !display.fields().is_empty() || display.timezone().is_some() {
        if headers {
            writeln!(writer, "slot,value")?;
        }
        if let Some(timezone) = display.timezone() {
            writeln!(writer, "timezone,{}", csv_escape(timezone))?;
        }
        for (prefix, _) in FIELD_PREFIXES {
            for field in DayField::ALL {
                let slot = field_slot(prefix, field);
                if let Some(value) = display.field(&slot) {
                    writeln!(writer, "{},{}", slot, csv_escape(value))?;
                }
            }
        }
    }

    Ok(())
}
