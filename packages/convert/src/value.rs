//! Typed attribute values.

use std::fmt;

use arcgis_export_arcgis_models::Symbol;
use serde::Serialize;

/// A feature attribute.
///
/// Arrays and objects have no place in an attribute table, so they are
/// carried as their compact JSON text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Explicit `null`.
    Null,
    /// Boolean.
    Bool(bool),
    /// Any JSON number, preserved exactly.
    Number(serde_json::Number),
    /// Text.
    Text(String),
    /// The symbol attached under the reserved key.
    Symbol(Box<Symbol>),
}

impl AttributeValue {
    /// Converts a raw JSON attribute.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::Text(s),
            other @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Self::Text(other.to_string())
            }
        }
    }

    /// Converts back into JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Symbol(symbol) => {
                serde_json::to_value(symbol.as_ref()).unwrap_or(serde_json::Value::Null)
            }
        }
    }

    /// Returns `true` for [`AttributeValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// String used for table cells: empty for `null`, otherwise the
    /// [`Display`](fmt::Display) form.
    #[must_use]
    pub fn to_cell(&self) -> String {
        if self.is_null() {
            String::new()
        } else {
            self.to_string()
        }
    }

    /// Key used to match unique-value renderer classes, or `None` for
    /// `null`.
    ///
    /// Integral floats render without a fraction so `1.0` matches a class
    /// declared as `"1"`.
    #[must_use]
    pub fn match_key(&self) -> Option<String> {
        match self {
            Self::Null | Self::Symbol(_) => None,
            Self::Number(n) => Some(number_key(n)),
            other => Some(other.to_string()),
        }
    }
}

/// Canonical text for a number used as a lookup key.
#[must_use]
pub fn number_key(n: &serde_json::Number) -> String {
    if n.is_f64()
        && let Some(f) = n.as_f64()
        && f.fract().abs() < f64::EPSILON
        && f.abs() < 9.007_199_254_740_992e15
    {
        #[allow(clippy::cast_possible_truncation)]
        return (f as i64).to_string();
    }
    n.to_string()
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Symbol(_) => f.write_str(&self.to_json().to_string()),
        }
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        Self::from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_values_become_text() {
        assert_eq!(
            AttributeValue::from_json(json!([1, 2])),
            AttributeValue::Text("[1,2]".to_string())
        );
        assert_eq!(
            AttributeValue::from_json(json!({"a": 1})),
            AttributeValue::Text(r#"{"a":1}"#.to_string())
        );
    }

    #[test]
    fn cells_and_display() {
        assert_eq!(AttributeValue::Null.to_cell(), "");
        assert_eq!(AttributeValue::Null.to_string(), "null");
        assert_eq!(AttributeValue::from_json(json!(12)).to_cell(), "12");
        assert_eq!(AttributeValue::from_json(json!(true)).to_cell(), "true");
        assert_eq!(AttributeValue::from_json(json!("Main St")).to_cell(), "Main St");
    }

    #[test]
    fn match_keys_normalize_integral_floats() {
        assert_eq!(
            AttributeValue::from_json(json!(1.0)).match_key().as_deref(),
            Some("1")
        );
        assert_eq!(
            AttributeValue::from_json(json!(1.5)).match_key().as_deref(),
            Some("1.5")
        );
        assert_eq!(
            AttributeValue::from_json(json!("Residential")).match_key().as_deref(),
            Some("Residential")
        );
        assert_eq!(AttributeValue::Null.match_key(), None);
    }

    #[test]
    fn serializes_as_plain_json() {
        let value = AttributeValue::from_json(json!(3));
        assert_eq!(serde_json::to_value(&value).unwrap(), json!(3));
        assert_eq!(
            serde_json::to_value(AttributeValue::Null).unwrap(),
            serde_json::Value::Null
        );
    }
}
