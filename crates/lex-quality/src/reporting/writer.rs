use crate::error::Result;
use polars::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes reports and tables under one output directory.
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./outputs"),
        }
    }
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Serialize `value` as pretty JSON to `<stem><suffix>.json`.
    pub fn write_json<T: Serialize>(&self, value: &T, stem: &str, suffix: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{stem}{suffix}.json"));
        let mut file = File::create(&path)?;
        file.write_all(serde_json::to_string_pretty(value)?.as_bytes())?;
        info!("Saved: {}", path.display());
        Ok(path)
    }

    /// Write a table as `<stem>_cleaned.csv`.
    pub fn write_table(&self, df: &mut DataFrame, stem: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{stem}_cleaned.csv"));
        let mut file = File::create(&path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(df)?;
        info!("Dataset saved: {}", path.display());
        Ok(path)
    }
}

/// Read a CSV file with a header row.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(1000))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// File name without extension, used to name outputs after their input.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lex-quality-{}-{}", name, uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_table_round_trips_through_csv() {
        let dir = temp_dir("csv");
        let writer = ReportWriter::new(&dir);
        let mut df = df!(
            "city" => ["Paris", "Rome, Italy"],
            "n" => [1i64, 2]
        )
        .unwrap();
        let path = writer.write_table(&mut df, "cities").unwrap();
        assert!(path.ends_with("cities_cleaned.csv"));

        let read = read_csv(&path).unwrap();
        assert_eq!(read.shape(), (2, 2));
        assert_eq!(read.column("city").unwrap().str().unwrap().get(1), Some("Rome, Italy"));
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_write_json() {
        let dir = temp_dir("json");
        let writer = ReportWriter::new(&dir);
        let path = writer
            .write_json(&serde_json::json!({"score": 91}), "data", "_report")
            .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"score\": 91"));
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Path::new("data/train.csv")), "train");
        assert_eq!(file_stem(Path::new("")), "output");
    }
}
