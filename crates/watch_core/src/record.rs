use serde_json::Value;

/// Read access to an opaque listing record.
///
/// Paths are dotted; numeric segments index into arrays, so
/// `versions.0.hash` reads the `hash` of the first version.
pub trait RawRecord {
    /// String form of a scalar field. Numbers and booleans are stringified.
    fn text(&self, path: &str) -> Option<String>;
    /// Numeric field; numeric strings are parsed.
    fn number(&self, path: &str) -> Option<f64>;
    /// List of strings; a single string counts as a one-element list.
    fn text_list(&self, path: &str) -> Vec<String>;
}

impl RawRecord for Value {
    fn text(&self, path: &str) -> Option<String> {
        match lookup(self, path)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn number(&self, path: &str) -> Option<f64> {
        let value = match lookup(self, path)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|n| n.is_finite())
    }

    fn text_list(&self, path: &str) -> Vec<String> {
        match lookup(self, path) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match current {
        Value::Null => None,
        other => Some(other),
    }
}
