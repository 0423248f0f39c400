use std::fmt;

use crate::sheet::row::Row;

use super::aliases::{LAT, LINESTRING, LONG, MULTIPOLYGON, POLYGON};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryType {
    Point,
    Polygon,
    MultiPolygon,
    LineString,
    None,
}

impl GeometryType {
    /// GeoJSON type name.
    pub fn name(&self) -> &'static str {
        match self {
            GeometryType::Point => "Point",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPolygon => "MultiPolygon",
            GeometryType::LineString => "LineString",
            GeometryType::None => "None",
        }
    }

    /// Row field holding the coordinate literal for shape types.
    pub fn shape_field(&self) -> Option<&'static str> {
        match self {
            GeometryType::Polygon => Some(POLYGON),
            GeometryType::MultiPolygon => Some(MULTIPOLYGON),
            GeometryType::LineString => Some(LINESTRING),
            GeometryType::Point | GeometryType::None => None,
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type Predicate = fn(&Row) -> bool;

fn has_point(row: &Row) -> bool {
    row.is_set(LAT) && row.is_set(LONG)
}

fn has_polygon(row: &Row) -> bool {
    row.is_set(POLYGON)
}

fn has_multipolygon(row: &Row) -> bool {
    row.is_set(MULTIPOLYGON)
}

fn has_linestring(row: &Row) -> bool {
    row.is_set(LINESTRING)
}

/// Geometry type rules in ascending precedence. Every rule is checked and the last match wins,
/// so a row with both `polygon` and `linestring` becomes a LineString.
const PRECEDENCE: [(Predicate, GeometryType); 4] = [
    (has_point, GeometryType::Point),
    (has_polygon, GeometryType::Polygon),
    (has_multipolygon, GeometryType::MultiPolygon),
    (has_linestring, GeometryType::LineString),
];

/// Decide the geometry type of a normalized row from field presence alone. Coordinate payloads
/// are not looked at.
pub fn classify_geometry_type(row: &Row) -> GeometryType {
    let matches: Vec<GeometryType> = PRECEDENCE
        .iter()
        .filter(|(predicate, _)| predicate(row))
        .map(|(_, geometry_type)| *geometry_type)
        .collect();
    if matches.len() > 1 {
        log::debug!(
            "Row matches several geometry types {:?}, using {}",
            matches,
            matches[matches.len() - 1]
        );
    }
    matches.last().copied().unwrap_or(GeometryType::None)
}
