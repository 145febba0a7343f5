//! InfluxDB line protocol encoding
//!
//! ```text
//! measurement,tag=value field=1i,other="text" 1714557600000000000
//! ```

use std::fmt::Write;

use crate::points::{FieldValue, MetricPoint};

fn escape_measurement(raw: &str) -> String {
    escape(raw, &[',', ' '])
}

fn escape_key(raw: &str) -> String {
    escape(raw, &[',', '=', ' '])
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            c if special.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

fn render_field(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Integer(v) => Some(format!("{v}i")),
        FieldValue::Float(v) if v.is_finite() => Some(format!("{v:?}")),
        // Influx has no representation for NaN or infinities
        FieldValue::Float(_) => None,
        FieldValue::Boolean(v) => Some(v.to_string()),
        FieldValue::Text(v) => {
            let escaped = v.replace('\\', "\\\\").replace('"', "\\\"");
            Some(format!("\"{escaped}\""))
        }
        FieldValue::Absent => None,
    }
}

/// Encode one point as a single line, or `None` when it has nothing to write
pub fn encode_point(point: &MetricPoint) -> Option<String> {
    if point.measurement().is_empty() {
        return None;
    }

    let fields: Vec<String> = point
        .fields()
        .iter()
        .filter_map(|(key, value)| render_field(value).map(|v| format!("{}={v}", escape_key(key))))
        .collect();
    if fields.is_empty() {
        return None;
    }

    let mut line = escape_measurement(point.measurement());
    for (key, value) in point.tags() {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        let _ = write!(line, ",{}={}", escape_key(key), escape_key(value));
    }
    line.push(' ');
    line.push_str(&fields.join(","));

    if let Some(nanos) = point.time().timestamp_nanos_opt() {
        let _ = write!(line, " {nanos}");
    }
    Some(line)
}

/// Encode a batch, one point per line, skipping points with nothing to write
pub fn encode_batch(points: &[MetricPoint]) -> String {
    points
        .iter()
        .filter_map(encode_point)
        .collect::<Vec<_>>()
        .join("\n")
}
