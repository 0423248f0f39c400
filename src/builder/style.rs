use geojson::JsonObject;
use serde::Deserialize;
use serde_json::Value;

use crate::sheet::row::Row;

/// Row field holding a feature colour.
pub const HEXCOLOR: &str = "hexcolor";

pub const DEFAULT_COLOR: &str = "#2196f3";

/// Maps the colour attributes of a row to the property names a renderer expects.
pub trait StyleProfile {
    fn point_properties(&self, row: &Row) -> JsonObject;

    fn shape_properties(&self, row: &Row) -> JsonObject;

    /// The colour a renderer should draw a feature in, read back from its properties.
    fn display_color(&self, properties: &JsonObject) -> Option<String>;
}

/// Property names understood by Leaflet path options: `color` for points, `color` and
/// `fillColor` for shapes.
pub struct LeafletStyle {
    pub default_color: String,
}

/// Mapbox simplestyle-spec names: `marker-color` for points, `stroke` and `fill` for shapes.
pub struct SimpleStyle {
    pub default_color: String,
}

fn row_color(row: &Row) -> Option<Value> {
    if !row.is_set(HEXCOLOR) {
        return None;
    }
    row.get(HEXCOLOR).cloned()
}

fn string_property(properties: &JsonObject, key: &str) -> Option<String> {
    properties
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

impl StyleProfile for LeafletStyle {
    fn point_properties(&self, row: &Row) -> JsonObject {
        let mut properties = JsonObject::new();
        properties.insert(
            "color".to_string(),
            row_color(row).unwrap_or_else(|| Value::from(self.default_color.as_str())),
        );
        properties
    }

    fn shape_properties(&self, row: &Row) -> JsonObject {
        let mut properties = JsonObject::new();
        if let Some(color) = row_color(row) {
            properties.insert("fillColor".to_string(), color.clone());
            properties.insert("color".to_string(), color);
        }
        properties
    }

    fn display_color(&self, properties: &JsonObject) -> Option<String> {
        string_property(properties, "color")
    }
}

impl StyleProfile for SimpleStyle {
    fn point_properties(&self, row: &Row) -> JsonObject {
        let mut properties = JsonObject::new();
        properties.insert(
            "marker-color".to_string(),
            row_color(row).unwrap_or_else(|| Value::from(self.default_color.as_str())),
        );
        properties
    }

    fn shape_properties(&self, row: &Row) -> JsonObject {
        let mut properties = JsonObject::new();
        if let Some(color) = row_color(row) {
            properties.insert("fill".to_string(), color.clone());
            properties.insert("stroke".to_string(), color);
        }
        properties
    }

    fn display_color(&self, properties: &JsonObject) -> Option<String> {
        string_property(properties, "marker-color")
            .or_else(|| string_property(properties, "stroke"))
    }
}

/// Style profile names accepted in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleProfileKind {
    #[default]
    Leaflet,
    Simplestyle,
}

impl StyleProfileKind {
    pub fn build(&self, default_color: &str) -> Box<dyn StyleProfile> {
        let default_color = default_color.to_string();
        match self {
            StyleProfileKind::Leaflet => Box::new(LeafletStyle { default_color }),
            StyleProfileKind::Simplestyle => Box::new(SimpleStyle { default_color }),
        }
    }
}
