use crate::agent::messages;
use crate::agent::runtime::{ObjectKind, Value};

/// Render a scalar for the wire. Strings longer than `max_string_length`
/// characters are cut and marked with the trailing ellipsis. Compounds are
/// interned rather than rendered; the fallback label only appears if a
/// caller bypasses the table.
pub fn render_scalar(value: &Value, max_string_length: usize) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(x) => x.to_string(),
        Value::Str(s) => truncate(s, max_string_length),
        Value::Object(obj) => match obj.kind() {
            ObjectKind::Array => "[object Array]".to_string(),
            ObjectKind::Function => "[object Function]".to_string(),
            ObjectKind::Plain => "[object Object]".to_string(),
        },
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str(messages::TRUNCATION_MARKER);
    out
}
