use std::cmp::Ordering;

use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};

use crate::{ast::Identifier, output::to_json};

/// A JSON value as seen by the evaluator.
///
/// Integers and floats are kept apart so whole-number results print without
/// a fractional part. Objects keep their keys in document order.
///
/// # Examples
///
/// ```
/// use ndjson_select::Value;
///
/// let record = Value::Object(vec![
///     ("name".to_string(), Value::String("Alice".to_string())),
///     ("age".to_string(), Value::Integer(30)),
/// ]);
/// assert_eq!(record.to_string(), r#"{"name":"Alice","age":30}"#);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON null
    Null,

    /// JSON boolean (true/false)
    Boolean(bool),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// Floating-point number
    Float(f64),

    /// UTF-8 string
    String(String),

    /// Array of values
    Array(Vec<Value>),

    /// Object entries in document order, keys unique
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Human-readable JSON kind, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Whether both values have the same JSON kind.
    pub fn same_kind(&self, other: &Value) -> bool {
        self.type_name() == other.type_name()
    }

    /// Exact decimal form of a number, if representable.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(n) => Some(Decimal::from(*n)),
            Value::Float(n) => Decimal::from_f64(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Converts a decimal back to a value, preferring an integer when the
    /// decimal is whole and fits.
    pub fn from_decimal(d: Decimal) -> Value {
        if d.is_integer()
            && let Some(n) = d.to_i64()
        {
            return Value::Integer(n);
        }
        d.to_f64().map(Value::Float).unwrap_or(Value::Null)
    }

    /// Looks up an object member.
    ///
    /// An exact key match wins; otherwise, unless the identifier was quoted,
    /// the first key equal ignoring case is used.
    pub fn get(&self, key: &Identifier) -> Option<&Value> {
        let Value::Object(entries) = self else {
            return None;
        };

        if let Some((_, value)) = entries.iter().find(|(k, _)| *k == key.name) {
            return Some(value);
        }
        if key.case_sensitive {
            return None;
        }
        entries
            .iter()
            .find(|(k, _)| key.matches(k))
            .map(|(_, value)| value)
    }

    /// Textual form used by concatenation.
    pub fn as_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => to_json(other),
        }
    }

    /// Numeric equality across integer/float, structural otherwise.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (a, b) if a.is_number() && b.is_number() => compare_numbers(a, b) == Some(Ordering::Equal),
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter()
                            .find(|(k2, _)| k2 == k)
                            .is_some_and(|(_, v2)| v.loosely_equals(v2))
                    })
            }
            (a, b) => a == b,
        }
    }

    fn sort_rank(value: Option<&Value>) -> u8 {
        match value {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Boolean(_)) => 2,
            Some(Value::Integer(_) | Value::Float(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(Value::Array(_)) => 5,
            Some(Value::Object(_)) => 6,
        }
    }

    /// Total order used by ORDER BY: missing, null, booleans, numbers,
    /// strings, arrays, then objects.
    pub fn sort_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        let (ra, rb) = (Self::sort_rank(a), Self::sort_rank(b));
        if ra != rb {
            return ra.cmp(&rb);
        }

        match (a, b) {
            (Some(Value::Boolean(x)), Some(Value::Boolean(y))) => x.cmp(y),
            (Some(x), Some(y)) if x.is_number() => compare_numbers(x, y).unwrap_or(Ordering::Equal),
            (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
            (Some(Value::Array(x)), Some(Value::Array(y))) => {
                for (xi, yi) in x.iter().zip(y) {
                    let ord = Self::sort_cmp(Some(xi), Some(yi));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                x.len().cmp(&y.len())
            }
            (Some(x @ Value::Object(_)), Some(y @ Value::Object(_))) => to_json(x).cmp(&to_json(y)),
            _ => Ordering::Equal,
        }
    }
}

/// Compares two numeric values exactly where possible.
pub fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        _ => match (a.as_decimal(), b.as_decimal()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => a.as_float()?.partial_cmp(&b.as_float()?),
        },
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            // Numbers outside the f64 range read as null.
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n
                    .as_f64()
                    .filter(|f| f.is_finite())
                    .map(Value::Float)
                    .unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl Value {
    /// Parses one JSON document, keeping object keys in document order.
    pub fn parse_json(text: &str) -> Result<Value, serde_json::Error> {
        serde_json::from_str::<serde_json::Value>(text).map(Value::from)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&to_json(self))
    }
}
