// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

/// A dynamically typed datum.
///
/// Records are ordinary [`Value::Record`]s; a field accessor looks a name up with [`Value::get`].
/// Numbers and timestamps are both "quantitative": [`Value::as_number`] reports a timestamp as
/// milliseconds since the Unix epoch so time scales can treat it like any other number.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    /// Missing or undefined.
    #[default]
    Null,
    /// A boolean flag.
    Bool(bool),
    /// A number. May be non-finite; see [`Value::is_valid_number`].
    Number(f64),
    /// Text, typically a category or a colour.
    Text(String),
    /// A UTC timestamp.
    Time(DateTime<Utc>),
    /// An ordered list.
    List(Vec<Self>),
    /// A record of named fields.
    Record(BTreeMap<String, Self>),
}

impl Value {
    /// Look up `field` on a record. Non-records have no fields.
    pub fn get(&self, field: &str) -> Option<&Self> {
        match self {
            Self::Record(map) => map.get(field),
            _ => None,
        }
    }

    /// The quantitative reading of this value: numbers as-is, timestamps as epoch milliseconds.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            #[allow(
                clippy::cast_precision_loss,
                reason = "millisecond timestamps stay well inside f64's exact integer range"
            )]
            Self::Time(t) => Some(t.timestamp_millis() as f64),
            _ => None,
        }
    }

    /// The text payload, if this is [`Value::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The timestamp payload, if this is [`Value::Time`].
    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Whether this is a quantitative value with a finite reading.
    pub fn is_valid_number(&self) -> bool {
        self.as_number().is_some_and(f64::is_finite)
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Time(t) => write!(f, "{}", t.to_rfc3339()),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Record(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Time(t)
    }
}

impl From<Vec<Self>> for Value {
    fn from(items: Vec<Self>) -> Self {
        Self::List(items)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Build a [`Value::Record`] from `key => value` pairs.
///
/// ```
/// use trellis_data::{Value, record};
///
/// let r = record! { "x" => 1.0, "name" => "a" };
/// assert_eq!(r.get("x"), Some(&Value::Number(1.0)));
/// assert_eq!(r.get("name").and_then(Value::as_text), Some("a"));
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Value::Record(::std::collections::BTreeMap::new())
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = ::std::collections::BTreeMap::new();
        $(
            map.insert(::std::string::String::from($key), $crate::Value::from($value));
        )+
        $crate::Value::Record(map)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn field_lookup_only_on_records() {
        let r = record! { "a" => 2.0 };
        assert_eq!(r.get("a"), Some(&Value::Number(2.0)));
        assert_eq!(r.get("b"), None);
        assert_eq!(Value::Number(1.0).get("a"), None);
    }

    #[test]
    fn time_reads_as_epoch_millis() {
        let t = Utc.timestamp_millis_opt(1_500).single().unwrap();
        assert_eq!(Value::Time(t).as_number(), Some(1_500.0));
        assert!(Value::Time(t).is_valid_number());
    }

    #[test]
    fn non_finite_numbers_are_not_valid() {
        assert!(!Value::Number(f64::NAN).is_valid_number());
        assert!(!Value::Number(f64::INFINITY).is_valid_number());
        assert!(!Value::Text("1".into()).is_valid_number());
        assert!(Value::Number(-3.5).is_valid_number());
    }

    #[test]
    fn option_converts_to_null() {
        assert_eq!(Value::from(None::<f64>), Value::Null);
        assert_eq!(Value::from(Some(2)), Value::Number(2.0));
    }

    #[test]
    fn display_is_compact() {
        let v = Value::List(vec![1.0.into(), "b".into()]);
        assert_eq!(v.to_string(), "[1, b]");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn records_load_from_json() {
        let v: Value = serde_json::from_str(r#"{"x": 1, "label": "a", "on": true}"#).unwrap();
        assert_eq!(v.get("x").and_then(Value::as_number), Some(1.0));
        assert_eq!(v.get("label").and_then(Value::as_text), Some("a"));
        assert_eq!(v.get("on"), Some(&Value::Bool(true)));
    }
}
