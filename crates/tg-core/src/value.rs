//! Scalar parameter values exchanged between graph configuration and transforms.

use core::fmt;

use crate::error::{TgError, TgResult};

/// A scalar value: an external parameter, a configuration entry or a transform's
/// target property.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> TgResult<f64> {
        match self {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            ParamValue::Text(s) => s.trim().parse().map_err(|_| conversion(s, "a number")),
            ParamValue::Bool(b) => Err(conversion(&b.to_string(), "a number")),
        }
    }

    pub fn as_i64(&self) -> TgResult<i64> {
        match self {
            ParamValue::Int(v) => Ok(*v),
            ParamValue::Float(v) if v.fract() == 0.0 => Ok(*v as i64),
            ParamValue::Text(s) => s.trim().parse().map_err(|_| conversion(s, "an integer")),
            other => Err(conversion(&other.to_string(), "an integer")),
        }
    }

    pub fn as_bool(&self) -> TgResult<bool> {
        match self {
            ParamValue::Bool(b) => Ok(*b),
            ParamValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(conversion(s, "a boolean")),
            },
            other => Err(conversion(&other.to_string(), "a boolean")),
        }
    }

    /// Textual form, as it would appear in a graph document.
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

fn conversion(value: &str, expected: &'static str) -> TgError {
    TgError::Conversion {
        value: value.to_string(),
        expected,
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_parses_to_numbers() {
        assert_eq!(ParamValue::from("0.86").as_f64().unwrap(), 0.86);
        assert_eq!(ParamValue::from(" 12 ").as_i64().unwrap(), 12);
        assert!(ParamValue::from("TRUE").as_bool().unwrap());
    }

    #[test]
    fn bad_conversion_reports_value() {
        let err = ParamValue::from("A+B").as_f64().unwrap_err();
        assert!(err.to_string().contains("A+B"));
        assert!(ParamValue::Float(1.5).as_i64().is_err());
    }
}
