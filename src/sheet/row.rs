use geojson::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One spreadsheet record: an ordered mapping from field name to a primitive value.
///
/// Field order follows the source (column order for CSV, key order for JSON) and is kept
/// through every transformation, since inferred option lists depend on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(JsonObject);

impl Row {
    pub fn new() -> Self {
        Self(JsonObject::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Set a field, appending it to the field order if it is new.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Remove a field, keeping the order of the remaining fields.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.shift_remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Whether the field is present with a truthy value, see [`is_truthy`].
    pub fn is_set(&self, field: &str) -> bool {
        self.0.get(field).map_or(false, is_truthy)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<JsonObject> for Row {
    fn from(value: JsonObject) -> Self {
        Self(value)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Presence test used by all geometry checks. Empty strings, zero, `false` and `null` count as
/// absent; any other string (including `"0"`) counts as present.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map_or(true, |n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
