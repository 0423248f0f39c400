use serde::Deserialize;

use crate::sheet::row::Row;

use super::error::ParseError;

pub const LAT: &str = "lat";
pub const LONG: &str = "long";
pub const POLYGON: &str = "polygon";
pub const MULTIPOLYGON: &str = "multipolygon";
pub const LINESTRING: &str = "linestring";

/// A pair of field names holding latitude and longitude under one naming scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AliasPair {
    pub lat: &'static str,
    pub long: &'static str,
}

impl AliasPair {
    fn is_set(&self, row: &Row) -> bool {
        row.is_set(self.lat) && row.is_set(self.long)
    }
}

pub const CANONICAL_PAIR: AliasPair = AliasPair {
    lat: LAT,
    long: LONG,
};

/// Pairs rewritten to `lat`/`long`, in precedence order.
pub static ALIAS_PAIRS: [AliasPair; 2] = [
    AliasPair {
        lat: "latitude",
        long: "longitude",
    },
    AliasPair {
        lat: "geolatitude",
        long: "geolongitude",
    },
];

static SHAPE_FIELDS: [&str; 3] = [POLYGON, MULTIPOLYGON, LINESTRING];

/// What to do with a row carrying more than one alias pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasConflict {
    /// Use the first pair in `ALIAS_PAIRS` order and leave the others in the row.
    #[default]
    Precedence,
    /// Fail the row with `ParseError::AmbiguousAliases`.
    Reject,
}

/// Whether the row carries any recognized geometry: a complete coordinate pair under any alias,
/// or a shape field. Looks at alias names, so it must run before normalization.
pub fn has_geometry(row: &Row) -> bool {
    CANONICAL_PAIR.is_set(row)
        || ALIAS_PAIRS.iter().any(|pair| pair.is_set(row))
        || SHAPE_FIELDS.iter().any(|field| row.is_set(field))
}

/// Return a copy of the row with an alias coordinate pair moved to `lat`/`long`.
///
/// Rows that already have `lat` and `long`, and rows with no alias pair, come back unchanged.
/// The new fields are appended after the existing ones and the used alias fields are removed.
pub fn normalize_coordinate_aliases(
    row: &Row,
    row_index: usize,
    conflict: AliasConflict,
) -> Result<Row, ParseError> {
    if CANONICAL_PAIR.is_set(row) {
        return Ok(row.clone());
    }
    let present: Vec<&AliasPair> = ALIAS_PAIRS.iter().filter(|pair| pair.is_set(row)).collect();
    let pair = match present.as_slice() {
        [] => return Ok(row.clone()),
        [pair] => *pair,
        [first, ..] => {
            let pairs = present
                .iter()
                .map(|pair| format!("{}/{}", pair.lat, pair.long))
                .collect::<Vec<String>>()
                .join(", ");
            match conflict {
                AliasConflict::Reject => {
                    return Err(ParseError::AmbiguousAliases {
                        row: row_index,
                        pairs,
                    })
                }
                AliasConflict::Precedence => {
                    log::warn!(
                        "Row {} has several coordinate alias pairs ({}), using {}/{}",
                        row_index,
                        pairs,
                        first.lat,
                        first.long
                    );
                    *first
                }
            }
        }
    };

    let mut normalized = row.clone();
    let lat = normalized.remove(pair.lat).unwrap_or_default();
    let long = normalized.remove(pair.long).unwrap_or_default();
    normalized.insert(LAT, lat);
    normalized.insert(LONG, long);
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use crate::{geometry::error::ParseError, sheet::row::Row};

    use super::{has_geometry, normalize_coordinate_aliases, AliasConflict};

    fn row(value: serde_json::Value) -> Row {
        serde_json::from_value(value).unwrap()
    }

    #[rstest]
    #[case(json!({"lat": "37.7", "long": "-122.4"}), true)]
    #[case(json!({"latitude": "10", "longitude": "20"}), true)]
    #[case(json!({"geolatitude": 1, "geolongitude": 2}), true)]
    #[case(json!({"polygon": "1,2],[3,4"}), true)]
    #[case(json!({"multipolygon": "[[1,2]]"}), true)]
    #[case(json!({"linestring": "1,2],[3,4", "lat": "", "long": 0}), true)]
    #[case(json!({"lat": "37.7"}), false)]
    #[case(json!({"lat": "", "long": ""}), false)]
    #[case(json!({"latitude": 0, "longitude": 20}), false)]
    #[case(json!({"latitude": "10", "long": "20"}), false)]
    #[case(json!({"name": "Nowhere"}), false)]
    fn test_has_geometry(#[case] value: serde_json::Value, #[case] expected: bool) {
        assert_eq!(expected, has_geometry(&row(value)));
    }

    #[test]
    fn test_normalize_latitude_longitude() {
        let input = row(json!({"name": "A", "latitude": "10", "longitude": "20"}));
        let normalized = normalize_coordinate_aliases(&input, 0, AliasConflict::Precedence).unwrap();
        assert_eq!(row(json!({"name": "A", "lat": "10", "long": "20"})), normalized);
        let names: Vec<&String> = normalized.field_names().collect();
        assert_eq!(vec!["name", "lat", "long"], names);
        // The input row is left alone.
        assert!(input.contains("latitude"));
    }

    #[test]
    fn test_normalize_geolatitude_geolongitude() {
        let input = row(json!({"geolatitude": 1.5, "geolongitude": -3}));
        let normalized = normalize_coordinate_aliases(&input, 0, AliasConflict::Precedence).unwrap();
        assert_eq!(row(json!({"lat": 1.5, "long": -3})), normalized);
    }

    #[rstest]
    #[case(json!({"lat": "10", "long": "20", "name": "A"}))]
    #[case(json!({"polygon": "1,2],[3,4"}))]
    #[case(json!({"name": "Nowhere"}))]
    fn test_normalize_is_noop(#[case] value: serde_json::Value) {
        let input = row(value);
        let once = normalize_coordinate_aliases(&input, 0, AliasConflict::Precedence).unwrap();
        assert_eq!(input, once);
        let twice = normalize_coordinate_aliases(&once, 0, AliasConflict::Precedence).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_conflicting_pairs() {
        let input = row(json!({
            "geolatitude": "1", "geolongitude": "2", "latitude": "3", "longitude": "4"
        }));
        let normalized = normalize_coordinate_aliases(&input, 4, AliasConflict::Precedence).unwrap();
        assert_eq!(
            row(json!({"geolatitude": "1", "geolongitude": "2", "lat": "3", "long": "4"})),
            normalized
        );

        let err = normalize_coordinate_aliases(&input, 4, AliasConflict::Reject).unwrap_err();
        assert_eq!(
            ParseError::AmbiguousAliases {
                row: 4,
                pairs: "latitude/longitude, geolatitude/geolongitude".to_string()
            },
            err
        );
    }
}
