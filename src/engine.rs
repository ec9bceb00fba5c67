//! Anomaly engine
//!
//! Runs the configured [`Smoother`] and [`DeviationScorer`] over every numeric
//! column of a [`SeriesStore`] and assembles the verdict and the two artifact
//! tables of a run. The engine does no I/O and keeps no state between runs.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::DetectorConfig;
use crate::error::{Error, Result};
use crate::na::NA;
use crate::scoring::{DeviationScorer, Score, ScoringMode};
use crate::smoothing::{Baseline, Smoother};
use crate::store::SeriesStore;

/// Decision of one run over one series group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyVerdict {
    /// Reference day: the last index value of the store
    pub day: String,
    /// Series group identifier
    pub group: String,
    /// Flagged columns, in header order
    pub columns: Vec<String>,
}

impl AnomalyVerdict {
    pub fn has_anomalies(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// A table aligned to the store index, ready for an artifact sink
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ArtifactTable {
    /// Values of one column, or `None` if the header is unknown.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let pos = self.headers.iter().position(|h| h == name)?;
        Some(self.rows.iter().map(|r| r[pos].as_str()).collect())
    }
}

/// What happened to one column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnOutcome {
    Scored {
        baseline: Baseline,
        score: Score,
    },
    /// Not scored; the baseline is kept when it could be computed
    Skipped {
        baseline: Option<Baseline>,
        reason: String,
    },
}

/// Per-column model record. Each column owns its own baseline and score.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnModel {
    pub name: String,
    pub outcome: ColumnOutcome,
}

impl ColumnModel {
    pub fn is_flagged(&self) -> bool {
        match &self.outcome {
            ColumnOutcome::Scored { score, .. } => score.flagged(),
            ColumnOutcome::Skipped { .. } => false,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, ColumnOutcome::Skipped { .. })
    }

    fn baseline(&self) -> Option<&Baseline> {
        match &self.outcome {
            ColumnOutcome::Scored { baseline, .. } => Some(baseline),
            ColumnOutcome::Skipped { baseline, .. } => baseline.as_ref(),
        }
    }

    fn forecast_cells(&self) -> Vec<String> {
        self.baseline()
            .map(|b| b.expected().iter().map(NA::to_cell).collect())
            .unwrap_or_default()
    }

    fn deviation_cells(&self) -> Vec<String> {
        match &self.outcome {
            ColumnOutcome::Scored { score, .. } => {
                score.deviations().values().iter().map(NA::to_cell).collect()
            }
            ColumnOutcome::Skipped { .. } => Vec::new(),
        }
    }
}

/// Everything one run produces for a series group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupReport {
    pub verdict: AnomalyVerdict,
    /// Forecast (or moving mean) per column
    pub forecast: ArtifactTable,
    /// Deviation score per column
    pub deviation: ArtifactTable,
    /// Per-column models in header order
    pub models: Vec<ColumnModel>,
}

impl GroupReport {
    /// Names of columns that were not scored
    pub fn skipped(&self) -> Vec<&str> {
        self.models
            .iter()
            .filter(|m| m.is_skipped())
            .map(|m| m.name.as_str())
            .collect()
    }

    pub fn model(&self, column: &str) -> Option<&ColumnModel> {
        self.models.iter().find(|m| m.name == column)
    }
}

/// Stateless anomaly engine
#[derive(Debug, Clone)]
pub struct AnomalyEngine {
    smoother: Smoother,
    scorer: DeviationScorer,
}

impl AnomalyEngine {
    /// Builds an engine from a validated configuration.
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(AnomalyEngine {
            smoother: Smoother::from_config(config.mode, &config.smoothing)?,
            scorer: DeviationScorer::new(config.mode, config.effective_threshold()),
        })
    }

    pub fn mode(&self) -> ScoringMode {
        self.scorer.mode()
    }

    /// Scores every numeric column of `store`.
    ///
    /// Columns without enough usable data are skipped and reported in
    /// [`GroupReport::models`]; they never count as "no anomaly".
    pub fn run(&self, group: &str, store: &SeriesStore) -> Result<GroupReport> {
        let day = store
            .last_day()
            .ok_or_else(|| {
                Error::MalformedInput(format!("series group {} has no data rows", group))
            })?
            .to_string();

        for column in store.columns().iter().filter(|c| c.numeric().is_none()) {
            log::debug!("group {}: column {} is text, not scored", group, column.name());
        }

        let models: Vec<ColumnModel> = store
            .numeric_columns()
            .map(|(name, values)| self.model_column(group, name, store.index(), values))
            .collect();

        let columns: Vec<String> = models
            .iter()
            .filter(|m| m.is_flagged())
            .map(|m| m.name.clone())
            .collect();

        if columns.is_empty() {
            log::info!("group {}: no anomalies on {}", group, day);
        } else {
            log::info!(
                "group {}: {} anomalous column(s) on {}: {}",
                group,
                columns.len(),
                day,
                columns.join(", ")
            );
        }

        let forecast = build_table(store, &models, ColumnModel::forecast_cells);
        let deviation = build_table(store, &models, ColumnModel::deviation_cells);

        Ok(GroupReport {
            verdict: AnomalyVerdict {
                day,
                group: group.to_string(),
                columns,
            },
            forecast,
            deviation,
            models,
        })
    }

    /// Runs independent stores in parallel. Results keep the input order.
    pub fn run_all(&self, inputs: &[(String, SeriesStore)]) -> Vec<Result<GroupReport>> {
        inputs
            .par_iter()
            .map(|(group, store)| self.run(group, store))
            .collect()
    }

    fn model_column(
        &self,
        group: &str,
        name: &str,
        index: &[String],
        values: &[NA<f64>],
    ) -> ColumnModel {
        let usable = values.iter().filter(|v| v.is_value()).count();
        let required = self.smoother.min_points();
        if usable < required {
            return skipped(
                group,
                name,
                None,
                Error::InsufficientData {
                    column: name.to_string(),
                    required,
                    found: usable,
                },
            );
        }

        let baseline = match self.smoother.smooth(name, index, values) {
            Ok(baseline) => baseline,
            Err(e) => return skipped(group, name, None, e),
        };

        match self.scorer.score(name, values, &baseline) {
            Ok(score) => ColumnModel {
                name: name.to_string(),
                outcome: ColumnOutcome::Scored { baseline, score },
            },
            Err(e) => skipped(group, name, Some(baseline), e),
        }
    }
}

fn skipped(group: &str, name: &str, baseline: Option<Baseline>, error: Error) -> ColumnModel {
    log::warn!("group {}: skipping column {}: {}", group, name, error);
    ColumnModel {
        name: name.to_string(),
        outcome: ColumnOutcome::Skipped {
            baseline,
            reason: error.to_string(),
        },
    }
}

/// Lays out one artifact table: the index column passes through, text columns
/// are copied, numeric columns take their cells from the model.
fn build_table<F>(store: &SeriesStore, models: &[ColumnModel], cells: F) -> ArtifactTable
where
    F: Fn(&ColumnModel) -> Vec<String>,
{
    let model_cells: HashMap<&str, Vec<String>> = models
        .iter()
        .map(|m| (m.name.as_str(), cells(m)))
        .collect();

    let headers = store.headers().to_vec();
    let rows = (0..store.len())
        .map(|row| {
            headers
                .iter()
                .map(|header| {
                    if header == store.timestamp_column() {
                        return store.index()[row].clone();
                    }
                    match model_cells.get(header.as_str()) {
                        Some(column) => column.get(row).cloned().unwrap_or_default(),
                        None => store.column(header).map(|c| c.cell(row)).unwrap_or_default(),
                    }
                })
                .collect()
        })
        .collect();

    ArtifactTable { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(rows: &[(&str, &str)]) -> SeriesStore {
        let headers = vec!["Day".to_string(), "Home".to_string()];
        let rows: Vec<Vec<String>> = rows
            .iter()
            .map(|(d, v)| vec![d.to_string(), v.to_string()])
            .collect();
        SeriesStore::build(&headers, &rows, "Day").unwrap()
    }

    fn forecast_config(threshold: f64) -> DetectorConfig {
        DetectorConfig {
            threshold: Some(threshold),
            ..DetectorConfig::default()
        }
    }

    #[test]
    fn test_single_row_is_not_flagged() {
        let engine = AnomalyEngine::new(&forecast_config(0.0001)).unwrap();
        let report = engine.run("energy", &store(&[("2016-01-01", "7")])).unwrap();
        assert_eq!(report.verdict.day, "2016-01-01");
        assert!(!report.verdict.has_anomalies());
        assert_eq!(report.forecast.column("Home").unwrap(), vec!["7"]);
        assert_eq!(report.deviation.column("Home").unwrap(), vec!["0"]);
    }

    #[test]
    fn test_empty_store_has_no_verdict() {
        let engine = AnomalyEngine::new(&forecast_config(0.5)).unwrap();
        let empty = SeriesStore::build(&["Day".to_string()], &[], "Day").unwrap();
        assert!(engine.run("energy", &empty).is_err());
    }

    #[test]
    fn test_missing_latest_value_skips_column() {
        let engine = AnomalyEngine::new(&forecast_config(0.5)).unwrap();
        let headers = vec!["Day".to_string(), "Home".to_string(), "Lab".to_string()];
        let rows = vec![
            vec!["2016-01-01".to_string(), "5".to_string(), "1".to_string()],
            vec!["2016-01-02".to_string(), "5".to_string(), "".to_string()],
        ];
        let store = SeriesStore::build(&headers, &rows, "Day").unwrap();
        let report = engine.run("energy", &store).unwrap();
        assert_eq!(report.skipped(), vec!["Lab"]);
        assert!(!report.verdict.contains("Lab"));
        // 予測値は出力されるが誤差は空欄
        assert_eq!(report.deviation.column("Lab").unwrap(), vec!["", ""]);
        assert_eq!(report.forecast.column("Lab").unwrap().len(), 2);
    }
}
