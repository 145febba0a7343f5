//! Metric points, the unit handed from collectors to sinks

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Serialize, Serializer};

/// One observation value inside a [`MetricPoint`]
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    /// Known field with no value this cycle; sinks skip it
    Absent,
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Numeric view of the value.
    ///
    /// Booleans map to 1/0 and text is parsed as a float. `None` means the
    /// value is either absent or present but not numeric; use
    /// [`is_absent`](Self::is_absent) to tell the two apart.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            Self::Text(s) => parse_float(s),
            Self::Absent => None,
        }
    }
}

/// Float parsing that accepts the spellings Python's `float()` does:
/// surrounding whitespace, `inf`/`infinity`/`nan` in any case, underscores
/// between digits.
fn parse_float(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let unsigned = trimmed.trim_start_matches(['+', '-']);
    let lowered = unsigned.to_ascii_lowercase();
    if matches!(lowered.as_str(), "inf" | "infinity" | "nan") {
        let negative = trimmed.starts_with('-');
        let value = if lowered == "nan" { f64::NAN } else { f64::INFINITY };
        return Some(if negative { -value } else { value });
    }
    if trimmed.starts_with('_') || trimmed.ends_with('_') || trimmed.contains("__") {
        return None;
    }
    trimmed.replace('_', "").parse::<f64>().ok()
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Absent => f.write_str("null"),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Integer(v) => serializer.serialize_i64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Boolean(v) => serializer.serialize_bool(*v),
            Self::Text(v) => serializer.serialize_str(v),
            Self::Absent => serializer.serialize_none(),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Absent)
    }
}

/// Capture instant shared by every point of one collection cycle
pub fn cycle_timestamp() -> DateTime<FixedOffset> {
    Utc::now().fixed_offset()
}

/// A measurement with tags, fields and a timestamp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    #[serde(serialize_with = "serialize_time")]
    time: DateTime<FixedOffset>,
}

fn serialize_time<S: Serializer>(
    time: &DateTime<FixedOffset>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339())
}

impl MetricPoint {
    pub fn new(measurement: impl Into<String>, time: DateTime<FixedOffset>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            time,
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.tags.insert(key.into(), value.to_string());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn time(&self) -> DateTime<FixedOffset> {
        self.time
    }

    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn field_value(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(FieldValue::Integer(3), Some(3.0))]
    #[case(FieldValue::Float(2.5), Some(2.5))]
    #[case(FieldValue::Boolean(true), Some(1.0))]
    #[case(FieldValue::Boolean(false), Some(0.0))]
    #[case(FieldValue::Text(" 42 ".into()), Some(42.0))]
    #[case(FieldValue::Text("1_000".into()), Some(1000.0))]
    #[case(FieldValue::Text("-Infinity".into()), Some(f64::NEG_INFINITY))]
    #[case(FieldValue::Text("unknown".into()), None)]
    #[case(FieldValue::Text("".into()), None)]
    #[case(FieldValue::Text("1__0".into()), None)]
    #[case(FieldValue::Absent, None)]
    fn test_as_f64(#[case] value: FieldValue, #[case] expected: Option<f64>) {
        assert_eq!(value.as_f64(), expected);
    }

    #[test]
    fn test_nan_text_is_numeric() {
        assert!(FieldValue::Text("nan".into()).as_f64().is_some_and(f64::is_nan));
    }

    #[test]
    fn test_option_none_becomes_absent() {
        let value: FieldValue = Option::<i64>::None.into();
        assert!(value.is_absent());
        let value: FieldValue = Some(4_i64).into();
        assert_eq!(value, FieldValue::Integer(4));
    }

    #[test]
    fn test_serializes_to_point_dict() {
        let time = DateTime::parse_from_rfc3339("2024-05-01T12:00:00+02:00").unwrap();
        let point = MetricPoint::new("Sonarr", time)
            .tag("type", "Queue")
            .tag("server", 1)
            .field("count", 3_i64)
            .field("eta", FieldValue::Absent);

        assert_eq!(
            serde_json::to_value(&point).unwrap(),
            json!({
                "measurement": "Sonarr",
                "tags": {"server": "1", "type": "Queue"},
                "fields": {"count": 3, "eta": null},
                "time": "2024-05-01T12:00:00+02:00"
            })
        );
    }
}
