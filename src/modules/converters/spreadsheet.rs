use std::path::Path;

use super::{ConvertOptions, ConvertOutcome, Converter, TABLE_WRITERS, handles, prepare_output, read_table, write_table};
use crate::error::Result;

/// Table-to-table conversions between xlsx, ods, csv, tsv, json and yaml.
pub struct SpreadsheetConverter {
    source: String,
    options: ConvertOptions,
}

impl SpreadsheetConverter {
    pub fn new(source: &str, options: ConvertOptions) -> Self {
        Self { source: source.to_lowercase(), options }
    }
}

impl Converter for SpreadsheetConverter {
    fn name(&self) -> &'static str {
        "spreadsheet"
    }

    fn convert(&self, input: &Path, target: &str) -> Result<ConvertOutcome> {
        if !handles(TABLE_WRITERS, target) {
            return Ok(ConvertOutcome::Declined);
        }
        let table = read_table(input, &self.source)?;
        let output = prepare_output(input, target, &self.options)?;
        write_table(&table, target, &output)?;
        Ok(ConvertOutcome::Converted(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn csv_to_json_records() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("people.csv");
        fs::write(&input, "name,age\nAnn,31\nBo,27\n").unwrap();

        let converter = SpreadsheetConverter::new("csv", ConvertOptions::default());
        let ConvertOutcome::Converted(path) = converter.convert(&input, "json").unwrap() else {
            panic!("expected output");
        };
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value[1]["name"], "Bo");
        assert_eq!(value[0]["age"], "31");
    }

    #[test]
    fn document_targets_are_declined() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("people.csv");
        fs::write(&input, "a,b\n").unwrap();

        let converter = SpreadsheetConverter::new("csv", ConvertOptions::default());
        for target in ["pdf", "docx", "html", "png"] {
            assert_eq!(converter.convert(&input, target).unwrap(), ConvertOutcome::Declined);
        }
    }
}
