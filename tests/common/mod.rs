//! Common test utilities module
//!
//! Provides shared helpers for the integration tests:
//! - Temporary directories holding CSV feeds (cleaned up on drop)
//! - Builders for in-memory tables and stores

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use seriesguard::{RawTable, SeriesStore};
use tempfile::TempDir;

/// Temporary directory for feed files and artifacts
pub struct TempTestDir {
    dir: TempDir,
}

impl TempTestDir {
    pub fn new(test_name: &str) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("seriesguard_{}_", test_name))
            .tempdir()?;
        Ok(TempTestDir { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `contents` to `name` inside the directory and returns its path
    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("Failed to write test file");
        path
    }
}

/// Consecutive ISO days starting at 2016-01-01
pub fn days(count: usize) -> Vec<String> {
    let start = chrono::NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
    (0..count)
        .map(|i| (start + chrono::Duration::days(i as i64)).format("%Y-%m-%d").to_string())
        .collect()
}

/// Builds a raw table with a `Day` index and one column per `(name, values)`
pub fn raw_table(columns: &[(&str, Vec<f64>)]) -> RawTable {
    let len = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
    let mut headers = vec!["Day".to_string()];
    headers.extend(columns.iter().map(|(name, _)| name.to_string()));

    let rows = days(len)
        .into_iter()
        .enumerate()
        .map(|(i, day)| {
            let mut row = vec![day];
            row.extend(columns.iter().map(|(_, values)| values[i].to_string()));
            row
        })
        .collect();
    RawTable::new(headers, rows)
}

/// Builds a store from numeric columns
pub fn store(columns: &[(&str, Vec<f64>)]) -> SeriesStore {
    SeriesStore::from_raw(&raw_table(columns), "Day").expect("Failed to build test store")
}

/// Renders a raw table as CSV text
pub fn to_csv(table: &RawTable) -> String {
    let mut out = table.headers.join(",");
    out.push('\n');
    for row in &table.rows {
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// `base + amplitude * sin(2πi / period)` for `len` points
pub fn sinusoid(len: usize, base: f64, amplitude: f64, period: usize) -> Vec<f64> {
    (0..len)
        .map(|i| base + amplitude * (2.0 * std::f64::consts::PI * i as f64 / period as f64).sin())
        .collect()
}
