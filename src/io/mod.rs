//! Collaborators at the edge of the engine
//!
//! The engine consumes a [`RawTable`] per series group and produces verdicts
//! and artifact tables. Fetching, persisting and notifying live behind the
//! traits below so each can be swapped without touching the scoring code.

pub mod csv;
pub mod http;
pub mod notify;

use std::collections::HashMap;

use crate::config::SeriesGroup;
use crate::engine::{AnomalyVerdict, ArtifactTable};
use crate::error::{Error, Result};
use crate::store::RawTable;

// Re-export commonly used types
pub use self::csv::{read_table, write_table, CsvArtifactSink, CsvFileSource};
pub use self::http::{HttpSource, LocatorSource};
pub use self::notify::{render_message, LoggingNotifier, MemoryNotifier};

/// Supplies the raw table of a series group
pub trait DataSource: Send + Sync {
    /// Returns headers and rows, or [`Error::Fetch`] when the source is unavailable.
    fn fetch(&self, group: &SeriesGroup) -> Result<RawTable>;
}

/// Accepts the forecast and deviation tables of each processed group
pub trait ArtifactSink: Send + Sync {
    fn write_tables(
        &self,
        group: &str,
        forecast: &ArtifactTable,
        deviation: &ArtifactTable,
    ) -> Result<()>;

    /// Optional summary of all verdicts of a run
    fn write_verdicts(&self, _verdicts: &[AnomalyVerdict]) -> Result<()> {
        Ok(())
    }
}

/// Receives the ordered verdict list of a run
pub trait Notifier: Send + Sync {
    fn notify(&self, verdicts: &[AnomalyVerdict]) -> Result<()>;
}

/// In-memory source keyed by locator
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<String, RawTable>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, locator: impl Into<String>, table: RawTable) -> Self {
        self.tables.insert(locator.into(), table);
        self
    }
}

impl DataSource for MemorySource {
    fn fetch(&self, group: &SeriesGroup) -> Result<RawTable> {
        self.tables
            .get(&group.locator)
            .cloned()
            .ok_or_else(|| Error::Fetch {
                group: group.id.clone(),
                reason: format!("no table registered for {}", group.locator),
            })
    }
}

/// Sink that drops everything; used when artifacts are not wanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ArtifactSink for NullSink {
    fn write_tables(&self, _: &str, _: &ArtifactTable, _: &ArtifactTable) -> Result<()> {
        Ok(())
    }
}
