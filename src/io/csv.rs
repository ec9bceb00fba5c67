use csv::{ReaderBuilder, Writer};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::SeriesGroup;
use crate::engine::{AnomalyVerdict, ArtifactTable};
use crate::error::{Error, Result};
use crate::io::http::is_remote;
use crate::io::{ArtifactSink, DataSource};
use crate::store::RawTable;

/// Name of the verdict summary written next to the tables
pub const VERDICTS_FILE: &str = "verdicts.json";

/// CSVからヘッダーと行を読み込む
///
/// The first record is the header row. Records may be shorter or longer than
/// the header; shape checks happen when the store is built.
pub fn read_table<R: Read>(reader: R) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    // ヘッダー行を取得
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }

    Ok(RawTable { headers, rows })
}

/// テーブルをCSVとして書き込む
pub fn write_table<P: AsRef<Path>>(table: &ArtifactTable, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut wtr = Writer::from_writer(file);

    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Reads series groups from local CSV files
#[derive(Debug, Clone, Default)]
pub struct CsvFileSource {
    /// Relative locators are resolved against this directory
    base_dir: Option<PathBuf>,
}

impl CsvFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir<P: Into<PathBuf>>(base_dir: P) -> Self {
        CsvFileSource {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve(&self, locator: &str) -> PathBuf {
        let path = Path::new(locator.strip_prefix("file://").unwrap_or(locator));
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl DataSource for CsvFileSource {
    fn fetch(&self, group: &SeriesGroup) -> Result<RawTable> {
        let fetch_error = |reason: String| Error::Fetch {
            group: group.id.clone(),
            reason,
        };

        if is_remote(&group.locator) {
            return Err(fetch_error(format!(
                "remote locator {} needs an HTTP source",
                group.locator
            )));
        }

        let path = self.resolve(&group.locator);
        let file =
            File::open(&path).map_err(|e| fetch_error(format!("{}: {}", path.display(), e)))?;
        let table =
            read_table(file).map_err(|e| fetch_error(format!("{}: {}", path.display(), e)))?;

        log::debug!(
            "read {} row(s) with {} column(s) from {}",
            table.rows.len(),
            table.headers.len(),
            path.display()
        );
        Ok(table)
    }
}

/// Writes `<group>-forecast.csv`, `<group>-error.csv` and a JSON verdict summary
/// into one output directory
#[derive(Debug, Clone)]
pub struct CsvArtifactSink {
    output_dir: PathBuf,
}

impl CsvArtifactSink {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        CsvArtifactSink {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of an artifact, creating the output directory on first use.
    fn artifact_path(&self, key: &str, extension: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(self.output_dir.join(format!("{}.{}", key, extension)))
    }
}

impl ArtifactSink for CsvArtifactSink {
    fn write_tables(
        &self,
        group: &str,
        forecast: &ArtifactTable,
        deviation: &ArtifactTable,
    ) -> Result<()> {
        write_table(forecast, self.artifact_path(&format!("{}-forecast", group), "csv")?)?;
        write_table(deviation, self.artifact_path(&format!("{}-error", group), "csv")?)?;
        Ok(())
    }

    fn write_verdicts(&self, verdicts: &[AnomalyVerdict]) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        let file = File::create(self.output_dir.join(VERDICTS_FILE))?;
        serde_json::to_writer_pretty(file, verdicts)?;
        Ok(())
    }
}
