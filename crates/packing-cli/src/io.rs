//! Reading inputs and writing results in CSV, JSON or YAML.

use anyhow::{Context, Result};
use packing_core::{BoxRecord, ContainerSpec, PackingResult, PlacementRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
    Yaml,
}

impl Format {
    /// Guesses the format from the file extension, defaulting to JSON.
    pub fn of(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .as_deref()
        {
            Some("csv") => Format::Csv,
            Some("yaml") | Some("yml") => Format::Yaml,
            _ => Format::Json,
        }
    }
}

/// Reads a single JSON or YAML document.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = if Format::of(path) == Format::Yaml {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(value)
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for (line, row) in reader.deserialize().enumerate() {
        // Header is line 1
        let row = row.with_context(|| format!("{}: bad row {}", path.display(), line + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

fn write_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_boxes(path: &Path) -> Result<Vec<BoxRecord>> {
    match Format::of(path) {
        Format::Csv => read_rows(path),
        _ => read_document(path),
    }
}

pub fn load_container(path: &Path) -> Result<ContainerSpec> {
    read_document(path)
}

pub fn load_placements(path: &Path) -> Result<Vec<PlacementRecord>> {
    match Format::of(path) {
        Format::Csv => read_rows(path),
        _ => {
            // Accept either a bare list or a full packing result
            let value: serde_json::Value = read_document(path)?;
            let rows = match value.get("placements") {
                Some(placements) => placements.clone(),
                None => value,
            };
            Ok(serde_json::from_value(rows)?)
        }
    }
}

/// CSV layout of one placed box. Fragility is written as 0/1.
#[derive(Debug, Serialize)]
struct PlacementRow<'a> {
    box_id: &'a str,
    unique_id: Option<u64>,
    x: f64,
    y: f64,
    z: f64,
    width: f64,
    height: f64,
    depth: f64,
    is_fragile: u8,
    placement_order: Option<usize>,
}

impl<'a> From<&'a PlacementRecord> for PlacementRow<'a> {
    fn from(record: &'a PlacementRecord) -> Self {
        Self {
            box_id: &record.box_id,
            unique_id: record.unique_id,
            x: record.x,
            y: record.y,
            z: record.z,
            width: record.width,
            height: record.height,
            depth: record.depth,
            is_fragile: u8::from(record.is_fragile),
            placement_order: record.placement_order,
        }
    }
}

/// Writes the placements as CSV, or the whole result as JSON/YAML.
pub fn write_result(path: &Path, result: &PackingResult) -> Result<()> {
    match Format::of(path) {
        Format::Csv => write_rows(path, result.placements.iter().map(PlacementRow::from)),
        Format::Yaml => Ok(std::fs::write(path, serde_yaml::to_string(result)?)?),
        Format::Json => Ok(std::fs::write(path, serde_json::to_string_pretty(result)?)?),
    }
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    write_rows(path, rows)
}
