use std::{fs::File, io::Read, path::Path};

use anyhow::{anyhow, Context};

use super::row::Row;

/// Read rows from a CSV file with a header line. Every cell is kept as text, the way spreadsheet
/// exports deliver them.
pub fn read_rows_from_csv(filepath: &Path) -> anyhow::Result<Vec<Row>> {
    let file = File::open(filepath).with_context(|| format!("Opening CSV file {:?}", filepath))?;
    read_rows_from_csv_reader(file)
}

pub fn read_rows_from_csv_reader<R: Read>(reader: R) -> anyhow::Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers().context("Reading CSV headers")?.clone();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading CSV row {}", index))?;
        // Short records leave the trailing columns out instead of setting them empty.
        let row: Row = headers.iter().zip(record.iter()).collect();
        rows.push(row);
    }
    log::debug!("Read {} rows with {} columns", rows.len(), headers.len());
    Ok(rows)
}

/// Read rows from a JSON file holding an array of flat objects.
pub fn read_rows_from_json(filepath: &Path) -> anyhow::Result<Vec<Row>> {
    let file = File::open(filepath).with_context(|| format!("Opening JSON file {:?}", filepath))?;
    read_rows_from_json_reader(file)
}

pub fn read_rows_from_json_reader<R: Read>(reader: R) -> anyhow::Result<Vec<Row>> {
    let value: serde_json::Value = serde_json::from_reader(reader).context("Parsing JSON rows")?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        other => {
            return Err(anyhow!(
                "Expected a JSON array of rows, found {}",
                json_kind(&other)
            ))
        }
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            serde_json::Value::Object(object) => Ok(Row::from(object)),
            other => Err(anyhow!(
                "Row {} is {}, expected an object",
                index,
                json_kind(&other)
            )),
        })
        .collect()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
