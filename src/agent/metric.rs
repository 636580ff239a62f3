//! Custom metric values and their report encoding.

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Longest accepted metric or label name, in characters.
pub const METRIC_NAME_LIMIT: usize = 128;

/// Names with this prefix are reserved for the agent and its plugins.
pub const RESERVED_PREFIX: &str = "@iopipe";

/// Value of a `log(key, value)` call.
///
/// `Undefined` stands for a value the caller never set (`None`), `Null` for
/// an explicit JSON null.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Number(Number),
    Text(String),
    Null,
    Undefined,
}

/// One custom metric as it appears in `custom_metrics`: numbers go to `n`,
/// everything else is stringified into `s`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMetric {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
}

impl CustomMetric {
    pub fn new(name: impl Into<String>, value: MetricValue) -> Self {
        let name = name.into();
        match value {
            MetricValue::Number(n) => Self {
                name,
                n: Some(n),
                s: None,
            },
            MetricValue::Text(s) => Self {
                name,
                n: None,
                s: Some(s),
            },
            MetricValue::Null => Self {
                name,
                n: None,
                s: Some("null".into()),
            },
            MetricValue::Undefined => Self {
                name,
                n: None,
                s: Some("undefined".into()),
            },
        }
    }
}

macro_rules! metric_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for MetricValue {
                fn from(v: $t) -> Self {
                    Self::Number(Number::from(v))
                }
            }
        )*
    };
}

metric_from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        // NaN and infinities have no JSON number form
        Number::from_f64(v).map_or_else(|| Self::Text(v.to_string()), Self::Number)
    }
}

impl From<f32> for MetricValue {
    fn from(v: f32) -> Self {
        Self::from(f64::from(v))
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&String> for MetricValue {
    fn from(v: &String) -> Self {
        Self::Text(v.clone())
    }
}

impl<T: Into<MetricValue>> From<Option<T>> for MetricValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Undefined, Into::into)
    }
}

impl From<serde_json::Value> for MetricValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<&serde_json::Value> for MetricValue {
    fn from(v: &serde_json::Value) -> Self {
        Self::from(v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_numeric() {
        let m = CustomMetric::new("simple-key", MetricValue::from(42));
        assert_eq!(m.n, Some(Number::from(42)));
        assert!(m.s.is_none());

        let m = CustomMetric::new("ratio", MetricValue::from(0.25));
        assert_eq!(m.n.and_then(|n| n.as_f64()), Some(0.25));
    }

    #[test]
    fn null_and_undefined_are_stringified() {
        let null = CustomMetric::new("null value", MetricValue::Null);
        assert_eq!(null.s.as_deref(), Some("null"));

        let undefined = CustomMetric::new("undefined value", MetricValue::from(None::<String>));
        assert_eq!(undefined.s.as_deref(), Some("undefined"));
    }

    #[test]
    fn nan_falls_back_to_text() {
        assert_eq!(MetricValue::from(f64::NAN), MetricValue::Text("NaN".into()));
    }

    #[test]
    fn json_values_convert() {
        assert_eq!(
            MetricValue::from(serde_json::json!("x")),
            MetricValue::Text("x".into())
        );
        assert_eq!(
            MetricValue::from(serde_json::json!([1, 2])),
            MetricValue::Text("[1,2]".into())
        );
        assert_eq!(MetricValue::from(serde_json::Value::Null), MetricValue::Null);
    }

    #[test]
    fn serialization_omits_missing_side() {
        let json = serde_json::to_value(CustomMetric::new("k", MetricValue::from("v"))).unwrap();
        assert_eq!(json, serde_json::json!({"name": "k", "s": "v"}));
    }
}
