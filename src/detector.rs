//! Batch detection over every configured series group
//!
//! Each group is fetched, built into a [`SeriesStore`], scored and persisted
//! independently. Groups run in parallel; a group that fails is logged and
//! left out of the verdict list while the others carry on.

use rayon::prelude::*;

use crate::config::{DetectorConfig, SeriesGroup};
use crate::engine::{AnomalyEngine, AnomalyVerdict, GroupReport};
use crate::error::{Error, Result};
use crate::io::{ArtifactSink, DataSource, Notifier};
use crate::store::SeriesStore;

/// A group that produced no verdict
#[derive(Debug)]
pub struct GroupFailure {
    pub group: String,
    pub error: Error,
}

/// Outcome of one batch
#[derive(Debug, Default)]
pub struct DetectionRun {
    /// One verdict per successful group, in configuration order
    pub verdicts: Vec<AnomalyVerdict>,
    /// Groups that were skipped, in configuration order
    pub failures: Vec<GroupFailure>,
}

impl DetectionRun {
    /// Verdicts that name at least one column
    pub fn anomalies(&self) -> impl Iterator<Item = &AnomalyVerdict> {
        self.verdicts.iter().filter(|v| v.has_anomalies())
    }
}

/// Drives the engine over the configured inputs
#[derive(Debug, Clone)]
pub struct Detector {
    config: DetectorConfig,
    engine: AnomalyEngine,
}

impl Detector {
    /// Validates the configuration up front; any problem here is fatal.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        if config.input.data.is_empty() {
            return Err(Error::Config(
                "input.data must list at least one series group".to_string(),
            ));
        }
        let engine = AnomalyEngine::new(&config)?;
        Ok(Detector { config, engine })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn engine(&self) -> &AnomalyEngine {
        &self.engine
    }

    /// Processes a single group: fetch, build, score.
    pub fn process_group(
        &self,
        source: &dyn DataSource,
        group: &SeriesGroup,
    ) -> Result<GroupReport> {
        let table = source.fetch(group)?;
        let store = SeriesStore::from_raw(&table, &self.config.timestamp_column)?;
        log::debug!(
            "group {}: {} row(s) after blank-row removal",
            group.id,
            store.len()
        );
        self.engine.run(&group.id, &store)
    }

    /// Runs every group, writes artifacts and hands the verdicts to `notifier`.
    ///
    /// Sink and notifier failures are logged and do not change the verdicts.
    pub fn run(
        &self,
        source: &dyn DataSource,
        sink: &dyn ArtifactSink,
        notifier: &dyn Notifier,
    ) -> DetectionRun {
        let groups = self.config.input.groups();
        log::info!(
            "processing {} series group(s) in {} mode",
            groups.len(),
            self.engine.mode()
        );

        let outcomes: Vec<(SeriesGroup, Result<GroupReport>)> = groups
            .into_par_iter()
            .map(|group| {
                let outcome = self.process_group(source, &group);
                (group, outcome)
            })
            .collect();

        let mut run = DetectionRun::default();
        for (group, outcome) in outcomes {
            match outcome {
                Ok(report) => {
                    let written =
                        sink.write_tables(&group.id, &report.forecast, &report.deviation);
                    if let Err(e) = written {
                        log::error!("group {}: could not write artifacts: {}", group.id, e);
                    }
                    run.verdicts.push(report.verdict);
                }
                Err(error) => {
                    log::warn!("group {}: skipped: {}", group.id, error);
                    run.failures.push(GroupFailure {
                        group: group.id,
                        error,
                    });
                }
            }
        }

        if let Err(e) = sink.write_verdicts(&run.verdicts) {
            log::error!("could not write verdict summary: {}", e);
        }
        if let Err(e) = notifier.notify(&run.verdicts) {
            log::error!("notification failed: {}", e);
        }

        log::info!(
            "finished: {} verdict(s), {} with anomalies, {} group(s) skipped",
            run.verdicts.len(),
            run.anomalies().count(),
            run.failures.len()
        );
        run
    }
}
