use geojson::JsonObject;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::builder::feature::feature_opts;

/// HTML list template with one `{{field}}` placeholder per `opts` key of the first feature.
pub fn make_popup_template(features: &[geojson::Feature]) -> String {
    let keys: Vec<&String> = features
        .first()
        .and_then(feature_opts)
        .map(|opts| opts.keys().collect())
        .unwrap_or_default();
    let items: String = keys
        .iter()
        .map(|key| format!("<li><b>{key}:</b> {{{{{key}}}}}</li>"))
        .collect();
    format!("<ul>{items}</ul>")
}

/// Fill `{{field}}` placeholders with HTML-escaped `opts` values. Missing and null values
/// render as empty text. Field names may contain spaces; padding inside the braces is ignored
/// unless it is part of the field name.
pub fn render_popup(template: &str, opts: &JsonObject) -> anyhow::Result<String> {
    let placeholder = Regex::new(r"\{\{([^{}]*)\}\}")?;
    let rendered = placeholder.replace_all(template, |captures: &Captures| {
        let key = &captures[1];
        match opts.get(key).or_else(|| opts.get(key.trim())) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => escape_html(text),
            Some(other) => escape_html(&other.to_string()),
        }
    });
    Ok(rendered.into_owned())
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '/' => escaped.push_str("&#x2F;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use crate::{
        builder::{
            collection::{build_geojson, BuildOptions},
            feature::feature_opts,
        },
        sheet::row::Row,
    };

    use super::{make_popup_template, render_popup};

    #[test]
    fn test_make_popup_template() {
        let rows: Vec<Row> = serde_json::from_value(json!([
            {"name": "Ferry Building", "lat": "37.79", "long": "-122.39"},
            {"name": "Other", "lat": "37.7", "long": "-122.4", "extra": "x"}
        ]))
        .unwrap();
        let options = BuildOptions {
            selected_fields: Some(vec!["name".to_string(), "color".to_string()]),
            ..BuildOptions::default()
        };
        let features = build_geojson(&rows, &options).unwrap();
        assert_eq!(
            "<ul><li><b>name:</b> {{name}}</li><li><b>color:</b> {{color}}</li></ul>",
            make_popup_template(&features)
        );
    }

    #[test]
    fn test_popup_for_field_names_with_spaces() {
        let rows: Vec<Row> = serde_json::from_value(json!([
            {"Place Name": "Ferry", "lat": "1", "long": "2"}
        ]))
        .unwrap();
        let features = build_geojson(&rows, &BuildOptions::default()).unwrap();
        let template = make_popup_template(&features);
        assert_eq!(
            "<ul><li><b>Place Name:</b> {{Place Name}}</li><li><b>lat:</b> {{lat}}</li>\
             <li><b>long:</b> {{long}}</li></ul>",
            template
        );
        let popup = render_popup(&template, feature_opts(&features[0]).unwrap()).unwrap();
        assert_eq!(
            "<ul><li><b>Place Name:</b> Ferry</li><li><b>lat:</b> 1</li>\
             <li><b>long:</b> 2</li></ul>",
            popup
        );
    }

    #[test]
    fn test_make_popup_template_without_features() {
        assert_eq!("<ul></ul>", make_popup_template(&[]));
    }

    #[rstest]
    #[case("{{name}}", json!({"name": "Pier 39"}), "Pier 39")]
    #[case("<b>{{ name }}</b>", json!({"name": "A & B"}), "<b>A &amp; B</b>")]
    #[case("{{count}} / {{missing}}", json!({"count": 3}), "3 / ")]
    #[case("{{note}}", json!({"note": null}), "")]
    #[case("{{html}}", json!({"html": "<script>"}), "&lt;script&gt;")]
    #[case("{{Place Name}}", json!({"Place Name": "Ferry"}), "Ferry")]
    #[case("{{ Place Name }}", json!({"Place Name": "Ferry"}), "Ferry")]
    #[case("{{ padded}}", json!({" padded": 1, "padded": 2}), "1")]
    fn test_render_popup(
        #[case] template: &str,
        #[case] opts: serde_json::Value,
        #[case] expected: &str,
    ) {
        let opts = opts.as_object().unwrap();
        assert_eq!(expected, render_popup(template, opts).unwrap());
    }
}
