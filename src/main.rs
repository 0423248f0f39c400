extern crate log;
pub mod builder;
pub mod geometry;
pub mod render;
pub mod sheet;
use crate::builder::collection::{
    build_feature_collection, build_geojson, write_feature_collection, BuildOptions, ErrorPolicy,
    FieldInference,
};
use crate::builder::style::{StyleProfileKind, DEFAULT_COLOR};
use crate::geometry::aliases::AliasConflict;
use crate::render::leaflet::{write_map_page, LeafletPage, MapAdapter, MapSettings};
use crate::sheet::reader::{read_rows_from_csv, read_rows_from_json};
use crate::sheet::row::Row;
use anyhow::anyhow;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::{fs::read_to_string, path::Path};

/// Convert spreadsheet rows into GeoJSON features and an optional Leaflet map page.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input config file.
    #[arg(short, long)]
    config_filepath: String,
}

#[derive(Deserialize, Debug)]
enum InputConfig {
    Csv { filepath: PathBuf },
    Json { filepath: PathBuf },
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

#[derive(Deserialize, Debug)]
struct Config {
    input: InputConfig,
    geojson_output_filepath: PathBuf,
    map_output_filepath: Option<PathBuf>,
    selected_fields: Option<Vec<String>>,
    #[serde(default)]
    field_inference: FieldInference,
    #[serde(default)]
    style_profile: StyleProfileKind,
    #[serde(default = "default_color")]
    default_color: String,
    #[serde(default)]
    alias_conflict: AliasConflict,
    #[serde(default)]
    error_policy: ErrorPolicy,
    #[serde(default)]
    show_progress: bool,
    #[serde(default)]
    map: MapSettings,
}

fn read_rows(input: &InputConfig) -> anyhow::Result<Vec<Row>> {
    match input {
        InputConfig::Csv { filepath } => {
            log::info!("Reading CSV rows from {:?}", filepath);
            read_rows_from_csv(filepath)
        }
        InputConfig::Json { filepath } => {
            log::info!("Reading JSON rows from {:?}", filepath);
            read_rows_from_json(filepath)
        }
    }
}

fn run(config: Config) -> anyhow::Result<()> {
    let rows = read_rows(&config.input)?;
    log::info!("Read {} rows", rows.len());

    let options = BuildOptions {
        selected_fields: config.selected_fields,
        field_inference: config.field_inference,
        alias_conflict: config.alias_conflict,
        error_policy: config.error_policy,
        style: config.style_profile.build(&config.default_color),
        show_progress: config.show_progress,
    };
    let features = build_geojson(&rows, &options)?;
    let collection = build_feature_collection(features);

    log::info!(
        "Writing {} features to {:?}",
        collection.features.len(),
        &config.geojson_output_filepath
    );
    write_feature_collection(&collection, &config.geojson_output_filepath)?;

    if let Some(map_output_filepath) = &config.map_output_filepath {
        log::info!("Writing map page to {:?}", map_output_filepath);
        let page = LeafletPage {
            style: options.style.as_ref(),
        };
        let contents = page.render(&collection, &config.map)?;
        write_map_page(&contents, map_output_filepath)?;
    }
    Ok(())
}

fn try_main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    env_logger::init();

    let args = Args::try_parse()?;
    if !Path::new(&args.config_filepath).exists() {
        return Err(anyhow!("Config file {} not found", &args.config_filepath));
    }
    let config_contents = read_to_string(args.config_filepath)?;
    let config: Config = serde_yaml::from_str(&config_contents)?;
    run(config)
}

fn main() {
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}
