//! Latest-point anomaly detection for daily multi-column time series.
//!
//! A [`SeriesStore`] holds one feed (a `Day` index plus one column per metric).
//! The [`AnomalyEngine`] smooths every column, scores the deviation of each
//! observation and flags the columns whose most recent value breaches the
//! threshold, returning one [`AnomalyVerdict`] per feed.

pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod io;
pub mod na;
pub mod scoring;
pub mod smoothing;
pub mod store;

// Re-export commonly used types
pub use config::{DetectorConfig, SeriesGroup, SmoothingConfig};
pub use detector::{DetectionRun, Detector};
pub use engine::{AnomalyEngine, AnomalyVerdict, ArtifactTable, GroupReport};
pub use error::{Error, Result};
pub use na::NA;
pub use scoring::{DeviationScorer, DeviationSeries, Score, ScoringMode};
pub use smoothing::{Baseline, EwmBaseline, ForecastSeries, HoltWinters, Smoother};
pub use store::{safe_denominator, RawTable, SeriesStore};

// Export version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
