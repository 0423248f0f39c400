use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::sheet::row::Row;

use super::{
    aliases::{LAT, LONG},
    classify::GeometryType,
    error::{CoordinateError, ParseError},
};

type Position = Vec<f64>;

/// Read the `[long, lat]` position of a point row.
pub fn parse_point(row: &Row, row_index: usize) -> Result<Position, ParseError> {
    let long = parse_number_field(row, LONG, row_index)?;
    let lat = parse_number_field(row, LAT, row_index)?;
    Ok(vec![long, lat])
}

fn parse_number_field(row: &Row, field: &str, row_index: usize) -> Result<f64, ParseError> {
    let value = row.get(field).unwrap_or(&Value::Null);
    parse_number(value).ok_or_else(|| ParseError::InvalidNumber {
        row: row_index,
        field: field.to_string(),
        raw: raw_text(value),
    })
}

fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Text of a cell as it appeared in the row, for error messages.
pub fn raw_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Parse the coordinate literal of a shape row into a GeoJSON geometry value.
///
/// Spreadsheet cells carry coordinates with their outer brackets stripped, e.g. `1,2],[3,4` or
/// `[1,2],[3,4]` for a two-position line. Brackets stripped from both ends are restored, then the
/// literal is wrapped until it reaches the nesting depth of the geometry type: two levels for a
/// LineString, three for a Polygon, four for a MultiPolygon. The literal is checked for stray
/// characters and bracket balance before JSON parsing.
pub fn parse_shape_literal(
    raw: &str,
    geometry_type: GeometryType,
) -> Result<geojson::Value, CoordinateError> {
    let target_depth = match geometry_type {
        GeometryType::LineString => 2,
        GeometryType::Polygon => 3,
        GeometryType::MultiPolygon => 4,
        GeometryType::Point | GeometryType::None => {
            return Err(CoordinateError::Malformed(format!(
                "{} has no coordinate literal",
                geometry_type
            )))
        }
    };
    if raw.trim().is_empty() {
        return Err(CoordinateError::Empty);
    }
    let nesting = check_literal(raw)?;
    let depth = nesting.stripped + nesting.max_depth;
    if depth >= target_depth {
        return Err(CoordinateError::Malformed(format!(
            "coordinates nested too deeply for a {}",
            geometry_type
        )));
    }
    let levels = target_depth - depth + nesting.stripped;
    let wrapped = format!("{}{}{}", "[".repeat(levels), raw, "]".repeat(levels));

    match geometry_type {
        GeometryType::Polygon => {
            let rings: Vec<Vec<Position>> = from_json(&wrapped)?;
            check_positions(rings.iter().flatten())?;
            Ok(geojson::Value::Polygon(rings))
        }
        GeometryType::MultiPolygon => {
            let polygons: Vec<Vec<Vec<Position>>> = from_json(&wrapped)?;
            check_positions(polygons.iter().flatten().flatten())?;
            Ok(geojson::Value::MultiPolygon(polygons))
        }
        _ => {
            let positions: Vec<Position> = from_json(&wrapped)?;
            check_positions(positions.iter())?;
            Ok(geojson::Value::LineString(positions))
        }
    }
}

struct Nesting {
    /// Bracket levels stripped from each end of the literal.
    stripped: usize,
    /// Deepest bracket level reached, relative to the start of the literal.
    max_depth: usize,
}

/// Reject characters that cannot appear in a coordinate array and literals whose brackets do
/// not balance once the stripped outer levels are put back.
fn check_literal(raw: &str) -> Result<Nesting, CoordinateError> {
    let mut depth: i64 = 0;
    let mut min_depth: i64 = 0;
    let mut max_depth: i64 = 0;
    for (offset, character) in raw.char_indices() {
        match character {
            '[' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            ']' => {
                depth -= 1;
                min_depth = min_depth.min(depth);
            }
            '0'..='9' | '.' | '-' | '+' | 'e' | 'E' | ',' => {}
            c if c.is_whitespace() => {}
            character => return Err(CoordinateError::UnexpectedCharacter { character, offset }),
        }
    }
    if depth != 0 {
        return Err(CoordinateError::UnbalancedBrackets { offset: raw.len() });
    }
    Ok(Nesting {
        stripped: (-min_depth) as usize,
        max_depth: max_depth as usize,
    })
}

fn from_json<T: DeserializeOwned>(text: &str) -> Result<T, CoordinateError> {
    serde_json::from_str(text).map_err(|err| CoordinateError::Malformed(err.to_string()))
}

fn check_positions<'a>(
    mut positions: impl Iterator<Item = &'a Position>,
) -> Result<(), CoordinateError> {
    match positions.find(|position| position.len() < 2) {
        Some(position) => Err(CoordinateError::ShortPosition(position.len())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rstest::rstest;
    use serde_json::json;

    use crate::{
        geometry::{
            classify::GeometryType,
            error::{CoordinateError, ParseError},
        },
        sheet::row::Row,
    };

    use super::{parse_point, parse_shape_literal};

    fn row(value: serde_json::Value) -> Row {
        serde_json::from_value(value).unwrap()
    }

    #[rstest]
    #[case(json!({"lat": "37.7", "long": "-122.4"}), -122.4, 37.7)]
    #[case(json!({"lat": 10, "long": 20.5}), 20.5, 10.0)]
    #[case(json!({"lat": " 1e1 ", "long": "-0.5"}), -0.5, 10.0)]
    fn test_parse_point(#[case] value: serde_json::Value, #[case] long: f64, #[case] lat: f64) {
        let position = parse_point(&row(value), 0).unwrap();
        assert_eq!(2, position.len());
        assert_abs_diff_eq!(long, position[0]);
        assert_abs_diff_eq!(lat, position[1]);
    }

    #[rstest]
    #[case(json!({"lat": "north", "long": "2"}), "lat", "north")]
    #[case(json!({"lat": "1", "long": "NaN"}), "long", "NaN")]
    #[case(json!({"lat": "1", "long": "inf"}), "long", "inf")]
    #[case(json!({"lat": true, "long": "2"}), "lat", "true")]
    fn test_parse_point_invalid_number(
        #[case] value: serde_json::Value,
        #[case] field: &str,
        #[case] raw: &str,
    ) {
        let err = parse_point(&row(value), 7).unwrap_err();
        assert_eq!(
            ParseError::InvalidNumber {
                row: 7,
                field: field.to_string(),
                raw: raw.to_string()
            },
            err
        );
    }

    #[test]
    fn test_parse_linestring() {
        let value = parse_shape_literal("1,2],[3,4", GeometryType::LineString).unwrap();
        assert_eq!(
            geojson::Value::LineString(vec![vec![1.0, 2.0], vec![3.0, 4.0]]),
            value
        );
    }

    #[test]
    fn test_parse_linestring_with_position_brackets() {
        let value = parse_shape_literal(
            "[-122.41722106933594, 37.7663045891584], [-122.40477561950684, 37.77695634643178]",
            GeometryType::LineString,
        )
        .unwrap();
        assert_eq!(
            geojson::Value::LineString(vec![
                vec![-122.41722106933594, 37.7663045891584],
                vec![-122.40477561950684, 37.77695634643178]
            ]),
            value
        );
    }

    #[rstest]
    #[case("1,2],[3,4")]
    #[case("[1,2],[3,4]")]
    #[case("[[1,2],[3,4]]")]
    fn test_parse_polygon_single_ring(#[case] raw: &str) {
        let value = parse_shape_literal(raw, GeometryType::Polygon).unwrap();
        assert_eq!(
            geojson::Value::Polygon(vec![vec![vec![1.0, 2.0], vec![3.0, 4.0]]]),
            value
        );
    }

    #[test]
    fn test_parse_polygon() {
        let value =
            parse_shape_literal("0, 0], [0, 1], [1, 1], [0, 0", GeometryType::Polygon).unwrap();
        assert_eq!(
            geojson::Value::Polygon(vec![vec![
                vec![0.0, 0.0],
                vec![0.0, 1.0],
                vec![1.0, 1.0],
                vec![0.0, 0.0]
            ]]),
            value
        );
    }

    #[test]
    fn test_parse_multipolygon() {
        let value = parse_shape_literal(
            "[[0,0],[0,1],[1,1],[0,0]]],[[[5,5],[5,6],[6,6],[5,5]]",
            GeometryType::MultiPolygon,
        )
        .unwrap();
        match value {
            geojson::Value::MultiPolygon(polygons) => {
                assert_eq!(2, polygons.len());
                assert_eq!(vec![5.0, 6.0], polygons[1][0][1]);
            }
            other => panic!("Expected a MultiPolygon, got {:?}", other),
        }
    }

    #[rstest]
    #[case("", GeometryType::LineString, CoordinateError::Empty)]
    #[case("  ", GeometryType::Polygon, CoordinateError::Empty)]
    #[case("1,2]],[[3,4", GeometryType::LineString, CoordinateError::Malformed(String::new()))]
    #[case("[1,2],[3,4", GeometryType::LineString, CoordinateError::UnbalancedBrackets { offset: 10 })]
    #[case("1,2],[3,4]]", GeometryType::Polygon, CoordinateError::UnbalancedBrackets { offset: 11 })]
    #[case("1,2],[x,4", GeometryType::LineString, CoordinateError::UnexpectedCharacter { character: 'x', offset: 6 })]
    #[case("1,2],[3", GeometryType::LineString, CoordinateError::ShortPosition(1))]
    #[case("1,,2],[3,4", GeometryType::LineString, CoordinateError::Malformed(String::new()))]
    #[case("[1,2],[3,4]],[[5,6]", GeometryType::LineString, CoordinateError::Malformed(String::new()))]
    fn test_parse_shape_literal_errors(
        #[case] raw: &str,
        #[case] geometry_type: GeometryType,
        #[case] expected: CoordinateError,
    ) {
        let err = parse_shape_literal(raw, geometry_type).unwrap_err();
        match (&expected, &err) {
            (CoordinateError::Malformed(_), CoordinateError::Malformed(_)) => {}
            _ => assert_eq!(expected, err),
        }
    }
}
