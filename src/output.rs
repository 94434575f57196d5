//! JSON output serialization for result rows.
//!
//! Rows are printed compactly with object members in insertion order, so a
//! projection lists its columns in select order and `SELECT *` reproduces
//! the record's key order.
//!
//! # Examples
//!
//! ```
//! use ndjson_select::Value;
//! use ndjson_select::output::to_json;
//!
//! let row = Value::Object(vec![("_1".to_string(), Value::Integer(10))]);
//! assert_eq!(to_json(&row), r#"{"_1":10}"#);
//! ```

use crate::value::Value;

/// Compact JSON writer.
#[derive(Default)]
pub struct JsonPrinter {
    buffer: String,
}

impl JsonPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print(mut self, value: &Value) -> String {
        self.print_value(value);
        self.buffer
    }

    fn print_value(&mut self, value: &Value) {
        match value {
            Value::Null => self.buffer.push_str("null"),
            Value::Boolean(b) => self.buffer.push_str(if *b { "true" } else { "false" }),
            Value::Integer(n) => self.buffer.push_str(&n.to_string()),
            Value::Float(n) if n.is_finite() => self.buffer.push_str(&n.to_string()),
            Value::Float(_) => self.buffer.push_str("null"),
            Value::String(s) => self.print_string(s),
            Value::Array(arr) => self.print_array(arr),
            Value::Object(obj) => self.print_object(obj),
        }
    }

    fn print_array(&mut self, arr: &[Value]) {
        self.buffer.push('[');
        for (i, item) in arr.iter().enumerate() {
            if i > 0 {
                self.buffer.push(',');
            }
            self.print_value(item);
        }
        self.buffer.push(']');
    }

    fn print_object(&mut self, obj: &[(String, Value)]) {
        self.buffer.push('{');
        for (i, (key, value)) in obj.iter().enumerate() {
            if i > 0 {
                self.buffer.push(',');
            }
            self.print_string(key);
            self.buffer.push(':');
            self.print_value(value);
        }
        self.buffer.push('}');
    }

    fn print_string(&mut self, s: &str) {
        self.buffer.push('"');
        for c in s.chars() {
            match c {
                '"' => self.buffer.push_str("\\\""),
                '\\' => self.buffer.push_str("\\\\"),
                '\n' => self.buffer.push_str("\\n"),
                '\r' => self.buffer.push_str("\\r"),
                '\t' => self.buffer.push_str("\\t"),
                c if c.is_control() => self.buffer.push_str(&format!("\\u{:04x}", c as u32)),
                c => self.buffer.push(c),
            }
        }
        self.buffer.push('"');
    }
}

/// Converts a Value to its compact JSON text.
///
/// # Examples
///
/// ```
/// use ndjson_select::Value;
/// use ndjson_select::output::to_json;
///
/// let value = Value::Array(vec![Value::Float(1.5), Value::String("a\"b".to_string())]);
/// assert_eq!(to_json(&value), r#"[1.5,"a\"b"]"#);
/// ```
pub fn to_json(value: &Value) -> String {
    JsonPrinter::new().print(value)
}
