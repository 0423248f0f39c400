use geojson::JsonObject;
use serde_json::Value;

use crate::{
    geometry::{
        classify::GeometryType,
        coords::{parse_point, parse_shape_literal, raw_text},
        error::ParseError,
    },
    sheet::row::Row,
};

use super::style::StyleProfile;

/// Name of the foreign member carrying the selected row fields.
pub const OPTS: &str = "opts";

/// Build the feature for a normalized row of known geometry type.
///
/// `opts` receives `selected_fields` in the given order; fields the row lacks are set to null.
pub fn build_feature(
    row: &Row,
    row_index: usize,
    geometry_type: GeometryType,
    selected_fields: &[String],
    style: &dyn StyleProfile,
) -> Result<geojson::Feature, ParseError> {
    let (value, properties) = match geometry_type {
        GeometryType::Point => (
            geojson::Value::Point(parse_point(row, row_index)?),
            style.point_properties(row),
        ),
        GeometryType::Polygon | GeometryType::MultiPolygon | GeometryType::LineString => {
            let field = geometry_type
                .shape_field()
                .ok_or(ParseError::Unclassified { row: row_index })?;
            let raw = row.get(field).map(raw_text).unwrap_or_default();
            let value = parse_shape_literal(&raw, geometry_type).map_err(|source| {
                ParseError::InvalidCoordinates {
                    row: row_index,
                    field: field.to_string(),
                    raw: raw.clone(),
                    source,
                }
            })?;
            (value, style.shape_properties(row))
        }
        GeometryType::None => return Err(ParseError::Unclassified { row: row_index }),
    };

    let mut foreign_members = JsonObject::new();
    foreign_members.insert(
        OPTS.to_string(),
        Value::Object(select_fields(row, selected_fields)),
    );
    Ok(geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: Some(foreign_members),
    })
}

pub fn select_fields(row: &Row, selected_fields: &[String]) -> JsonObject {
    selected_fields
        .iter()
        .map(|field| (field.clone(), row.get(field).cloned().unwrap_or(Value::Null)))
        .collect()
}

/// The `opts` member of a feature built by [`build_feature`].
pub fn feature_opts(feature: &geojson::Feature) -> Option<&JsonObject> {
    feature
        .foreign_members
        .as_ref()
        .and_then(|members| members.get(OPTS))
        .and_then(Value::as_object)
}
