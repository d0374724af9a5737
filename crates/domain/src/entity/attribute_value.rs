//! Typed attribute values attached to entities.

use serde::{Deserialize, Serialize};

/// A single typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<String>),
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_float_variant_as_number() {
        let json = serde_json::to_string(&AttributeValue::Float(21.5)).unwrap();
        assert_eq!(json, "21.5");
    }

    #[test]
    fn should_serialize_list_variant_as_array() {
        let value = AttributeValue::from(vec!["cool".to_string(), "off".to_string()]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"["cool","off"]"#);
    }

    #[test]
    fn should_deserialize_integers_before_floats() {
        let value: AttributeValue = serde_json::from_str("101").unwrap();
        assert_eq!(value, AttributeValue::Int(101));
        let value: AttributeValue = serde_json::from_str("26.5").unwrap();
        assert_eq!(value, AttributeValue::Float(26.5));
    }
}
