//! Delimited text and record-shaped outputs for tables.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use super::Table;
use crate::error::Result;

pub fn delimiter_for(extension: &str) -> u8 {
    if extension.eq_ignore_ascii_case("tsv") { b'\t' } else { b',' }
}

pub fn read_delimited(path: &Path, delimiter: u8) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(Table::new(rows).normalized())
}

pub fn write_delimited(table: &Table, path: &Path, delimiter: u8) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Rows after the header as objects keyed by header name, in column order.
pub fn to_records(table: &Table) -> Vec<Value> {
    let header = table.header();
    table
        .rows
        .iter()
        .skip(1)
        .map(|row| {
            let mut record = Map::new();
            for (idx, name) in header.iter().enumerate() {
                let cell = row.get(idx).cloned().unwrap_or_default();
                record.insert(name.clone(), Value::String(cell));
            }
            Value::Object(record)
        })
        .collect()
}

pub fn write_json(table: &Table, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&to_records(table))?;
    fs::write(path, json)?;
    Ok(())
}

pub fn write_yaml(table: &Table, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(&to_records(table))?;
    fs::write(path, yaml)?;
    Ok(())
}
