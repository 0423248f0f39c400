use std::{fs, path::Path};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::builder::{feature::feature_opts, style::StyleProfile};

use super::popup::{escape_html, make_popup_template, render_popup};

pub const DEFAULT_TILES: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const ATTRIBUTION: &str =
    "&copy; <a href=\"https://osm.org/copyright\">OpenStreetMap</a> contributors";

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MapSettings {
    /// Tile URL template.
    pub tiles: String,
    /// Popup template; derived from the first feature's `opts` when absent.
    pub template: Option<String>,
    /// Colour for every point marker, overriding feature colours.
    pub hexcolor: Option<String>,
    pub cluster: bool,
    pub title: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            tiles: DEFAULT_TILES.to_string(),
            template: None,
            hexcolor: None,
            cluster: false,
            title: "Map".to_string(),
        }
    }
}

/// Turns a feature collection into a displayable map document.
pub trait MapAdapter {
    fn render(
        &self,
        collection: &geojson::FeatureCollection,
        settings: &MapSettings,
    ) -> anyhow::Result<String>;
}

/// Standalone HTML page drawing the collection with Leaflet.
pub struct LeafletPage<'a> {
    pub style: &'a dyn StyleProfile,
}

/// Per-feature values the page script needs, in feature order.
#[derive(Serialize)]
struct FeatureDisplay {
    popup: String,
    color: Option<String>,
}

impl<'a> LeafletPage<'a> {
    fn feature_displays(
        &self,
        collection: &geojson::FeatureCollection,
        template: &str,
    ) -> anyhow::Result<Vec<FeatureDisplay>> {
        let empty = geojson::JsonObject::new();
        collection
            .features
            .iter()
            .map(|feature| {
                let opts = feature_opts(feature).unwrap_or(&empty);
                let color = feature
                    .properties
                    .as_ref()
                    .and_then(|properties| self.style.display_color(properties));
                Ok(FeatureDisplay {
                    popup: render_popup(template, opts)?,
                    color,
                })
            })
            .collect()
    }
}

impl<'a> MapAdapter for LeafletPage<'a> {
    fn render(
        &self,
        collection: &geojson::FeatureCollection,
        settings: &MapSettings,
    ) -> anyhow::Result<String> {
        if collection.features.is_empty() {
            return Err(anyhow!("No features to draw a map from"));
        }
        let template = match &settings.template {
            Some(template) => template.clone(),
            None => make_popup_template(&collection.features),
        };
        let displays = self.feature_displays(collection, &template)?;
        let data = geojson::GeoJson::from(collection.clone()).to_string();

        let cluster_head = if settings.cluster {
            concat!(
                "<link rel=\"stylesheet\" href=\"https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.css\">\n",
                "<link rel=\"stylesheet\" href=\"https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.Default.css\">\n",
                "<script src=\"https://unpkg.com/leaflet.markercluster@1.5.3/dist/leaflet.markercluster.js\"></script>\n",
            )
        } else {
            ""
        };

        Ok(PAGE_TEMPLATE
            .replace("__TITLE__", &escape_html(&settings.title))
            .replace("__CLUSTER_HEAD__", cluster_head)
            .replace("__TILES__", &script_json(&settings.tiles)?)
            .replace("__ATTRIBUTION__", &script_json(ATTRIBUTION)?)
            .replace("__ICON_COLOR__", &script_json(&settings.hexcolor)?)
            .replace("__CLUSTER__", if settings.cluster { "true" } else { "false" })
            .replace("__DISPLAYS__", &script_json(&displays)?)
            .replace("__DATA__", &data.replace("</", "<\\/")))
    }
}

/// JSON text safe to embed inside a script element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

pub fn write_map_page(contents: &str, output_filepath: &Path) -> anyhow::Result<()> {
    fs::write(output_filepath, contents)
        .with_context(|| format!("Writing map page to {:?}", output_filepath))
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>__TITLE__</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
__CLUSTER_HEAD__<style>
html, body, #map { height: 100%; margin: 0; }
</style>
</head>
<body>
<div id="map"></div>
<script>
var data = __DATA__;
var displays = __DISPLAYS__;
var iconColor = __ICON_COLOR__;
var cluster = __CLUSTER__;

function divIcon(color) {
  var markerHtmlStyles = 'background-color: #' + String(color).replace('#', '') + ';' +
    'width: 2rem; height: 2rem; display: block; left: -1rem; top: -1rem;' +
    'position: relative; border-radius: 3rem 3rem 0; transform: rotate(45deg);' +
    'border: 1px solid #FFFFFF';
  return L.divIcon({
    className: 'div-icon',
    iconAnchor: [0, 24],
    popupAnchor: [0, -36],
    html: '<span style="' + markerHtmlStyles + '"></span>'
  });
}

var map = L.map('map');
L.tileLayer(__TILES__, {attribution: __ATTRIBUTION__}).addTo(map);
map.touchZoom.disable();
map.doubleClickZoom.disable();
map.scrollWheelZoom.disable();

var index = 0;
var layer = L.geoJson(data, {
  pointToLayer: function (feature, latlng) {
    var display = displays[index];
    return L.marker(latlng, {icon: divIcon(iconColor || display.color || '#2196f3')});
  },
  style: function (feature) {
    var display = displays[index];
    return display.color ? {color: display.color, fillColor: display.color} : {};
  },
  onEachFeature: function (feature, featureLayer) {
    featureLayer.bindPopup(displays[index].popup, {closeButton: false});
    index++;
  }
});

var container = cluster ? L.markerClusterGroup().addLayer(layer) : layer;
container.addTo(map);
if (data.bbox) {
  map.fitBounds([[data.bbox[1], data.bbox[0]], [data.bbox[3], data.bbox[2]]]);
} else {
  map.fitBounds(layer.getBounds());
}
</script>
</body>
</html>
"#;
