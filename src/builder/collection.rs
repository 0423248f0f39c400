use std::{collections::HashSet, fs, path::Path};

use anyhow::Context;
use geo::BoundingRect;
use indicatif::ProgressBar;
use serde::Deserialize;

use crate::{
    geometry::{
        aliases::{has_geometry, normalize_coordinate_aliases, AliasConflict},
        classify::classify_geometry_type,
        error::ParseError,
    },
    sheet::row::Row,
};

use super::{
    feature::build_feature,
    style::{LeafletStyle, StyleProfile, DEFAULT_COLOR},
};

/// How the `opts` field list is chosen when none is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldInference {
    /// All fields of the first geo-bearing row, after alias normalization.
    #[default]
    FirstRow,
    /// Every field seen on any geo-bearing row, in first-seen order.
    Union,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Stop at the first row that cannot be converted.
    #[default]
    Fail,
    /// Log and drop rows that cannot be converted.
    Skip,
}

pub struct BuildOptions {
    pub selected_fields: Option<Vec<String>>,
    pub field_inference: FieldInference,
    pub alias_conflict: AliasConflict,
    pub error_policy: ErrorPolicy,
    pub style: Box<dyn StyleProfile>,
    pub show_progress: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            selected_fields: None,
            field_inference: FieldInference::default(),
            alias_conflict: AliasConflict::default(),
            error_policy: ErrorPolicy::default(),
            style: Box::new(LeafletStyle {
                default_color: DEFAULT_COLOR.to_string(),
            }),
            show_progress: false,
        }
    }
}

/// Convert rows into features, one per geo-bearing row, in input order.
///
/// Rows without geometry are dropped. Without `selected_fields` the `opts` field list is decided
/// once according to `field_inference` and then applied to every feature. Rows are normalized,
/// classified and built one at a time, so `ErrorPolicy::Fail` returns the error of the earliest
/// failing row.
pub fn build_geojson(
    rows: &[Row],
    options: &BuildOptions,
) -> Result<Vec<geojson::Feature>, ParseError> {
    let mut selected_fields = match (&options.selected_fields, options.field_inference) {
        (Some(fields), _) => Some(fields.clone()),
        (None, FieldInference::Union) => Some(union_of_fields(rows, options.alias_conflict)),
        (None, FieldInference::FirstRow) => None,
    };

    let bar = if options.show_progress {
        ProgressBar::new(rows.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    let mut features = Vec::new();
    let built = build_rows(rows, options, &mut selected_fields, &bar, &mut features);
    bar.finish_and_clear();
    let geo_row_count = built?;

    log::info!(
        "Built {} features from {} rows ({} with geometry)",
        features.len(),
        rows.len(),
        geo_row_count
    );
    Ok(features)
}

/// Row loop of `build_geojson`. Fixes `selected_fields` from the first geo-bearing row that
/// normalizes when it is still unset. Returns the number of geo-bearing rows seen.
fn build_rows(
    rows: &[Row],
    options: &BuildOptions,
    selected_fields: &mut Option<Vec<String>>,
    bar: &ProgressBar,
    features: &mut Vec<geojson::Feature>,
) -> Result<usize, ParseError> {
    let mut geo_row_count = 0;
    for (row_index, row) in rows.iter().enumerate() {
        bar.inc(1);
        if !has_geometry(row) {
            log::debug!("Row {} has no geometry, skipping", row_index);
            continue;
        }
        geo_row_count += 1;
        let normalized = match normalize_coordinate_aliases(row, row_index, options.alias_conflict)
        {
            Ok(normalized) => normalized,
            Err(err) => {
                handle_row_error(err, options.error_policy)?;
                continue;
            }
        };
        let fields =
            selected_fields.get_or_insert_with(|| normalized.field_names().cloned().collect());
        let geometry_type = classify_geometry_type(&normalized);
        match build_feature(
            &normalized,
            row_index,
            geometry_type,
            fields,
            options.style.as_ref(),
        ) {
            Ok(feature) => features.push(feature),
            Err(err) => handle_row_error(err, options.error_policy)?,
        }
    }
    Ok(geo_row_count)
}

fn handle_row_error(err: ParseError, policy: ErrorPolicy) -> Result<(), ParseError> {
    match policy {
        ErrorPolicy::Fail => Err(err),
        ErrorPolicy::Skip => {
            log::warn!("Skipping row: {}", err);
            Ok(())
        }
    }
}

/// Every field name of the geo-bearing rows after normalization, in first-seen order. Rows whose
/// aliases cannot be normalized contribute nothing; their error surfaces when they are built.
fn union_of_fields(rows: &[Row], conflict: AliasConflict) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut fields: Vec<String> = Vec::new();
    for (row_index, row) in rows.iter().enumerate() {
        if !has_geometry(row) {
            continue;
        }
        let normalized = match normalize_coordinate_aliases(row, row_index, conflict) {
            Ok(normalized) => normalized,
            Err(_) => continue,
        };
        for name in normalized.field_names() {
            if seen.insert(name.clone()) {
                fields.push(name.clone());
            }
        }
    }
    fields
}

/// Wrap features into a collection whose `bbox` spans all feature geometries.
pub fn build_feature_collection(features: Vec<geojson::Feature>) -> geojson::FeatureCollection {
    let bbox = features_bbox(&features);
    geojson::FeatureCollection {
        bbox,
        features,
        foreign_members: None,
    }
}

/// `[min_x, min_y, max_x, max_y]` over all feature geometries, `None` when there are none.
pub fn features_bbox(features: &[geojson::Feature]) -> Option<geojson::Bbox> {
    let rects: Vec<geo::Rect> = features
        .iter()
        .filter_map(|feature| feature.geometry.as_ref())
        .filter_map(|geometry| {
            match geo::Geometry::<f64>::try_from(geometry.value.clone()) {
                Ok(geometry) => geometry.bounding_rect(),
                Err(err) => {
                    log::debug!("Leaving geometry out of the bounding box: {}", err);
                    None
                }
            }
        })
        .collect();
    let first = rects.first()?;
    let (mut min_x, mut min_y) = (first.min().x, first.min().y);
    let (mut max_x, mut max_y) = (first.max().x, first.max().y);
    for rect in &rects[1..] {
        min_x = min_x.min(rect.min().x);
        min_y = min_y.min(rect.min().y);
        max_x = max_x.max(rect.max().x);
        max_y = max_y.max(rect.max().y);
    }
    Some(vec![min_x, min_y, max_x, max_y])
}

pub fn write_feature_collection(
    collection: &geojson::FeatureCollection,
    output_filepath: &Path,
) -> anyhow::Result<()> {
    let geojson_contents = geojson::GeoJson::from(collection.clone());
    fs::write(output_filepath, geojson_contents.to_string())
        .with_context(|| format!("Writing GeoJSON to {:?}", output_filepath))
}
