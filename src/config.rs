//! Detector configuration
//!
//! The configuration is an explicit value: it is loaded once (YAML or TOML),
//! validated, and then handed to [`AnomalyEngine`](crate::engine::AnomalyEngine)
//! and [`Detector`](crate::detector::Detector) constructors. Nothing reads it
//! through a global.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::scoring::ScoringMode;

/// Default multiplier `k` of the moving band when no threshold is configured.
pub const DEFAULT_BAND_MULTIPLIER: f64 = 3.0;

/// Main detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorConfig {
    /// Series groups to process
    #[serde(default)]
    pub input: InputConfig,

    /// Scoring mode
    #[serde(default)]
    pub mode: ScoringMode,

    /// Smoothing parameters
    #[serde(default)]
    pub smoothing: SmoothingConfig,

    /// Decision threshold. Percentage error as a fraction (0.3 = 30 %) in
    /// forecast-error mode, band multiplier `k` in moving-band mode.
    #[serde(default)]
    pub threshold: Option<f64>,

    /// Forecast-error threshold in percent (30 = 30 %), as older config files
    /// write it. Only read when `threshold` is unset.
    #[serde(default, rename = "error_threshold", skip_serializing_if = "Option::is_none")]
    pub error_threshold_percent: Option<f64>,

    /// Name of the index column
    #[serde(default = "default_timestamp_column", alias = "timestamp_column")]
    pub timestamp_column: String,

    /// Artifact output
    #[serde(default)]
    pub output: OutputConfig,

    /// Notification settings, passed through to notifiers untouched
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            mode: ScoringMode::default(),
            smoothing: SmoothingConfig::default(),
            threshold: None,
            error_threshold_percent: None,
            timestamp_column: default_timestamp_column(),
            output: OutputConfig::default(),
            email: None,
        }
    }
}

/// Input configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// One entry per series group: either a bare locator or `{ id, path }`
    #[serde(default)]
    pub data: Vec<SeriesGroupSpec>,
}

impl InputConfig {
    /// Resolves every entry into a [`SeriesGroup`].
    pub fn groups(&self) -> Vec<SeriesGroup> {
        self.data.iter().map(SeriesGroupSpec::resolve).collect()
    }
}

/// A series group entry as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesGroupSpec {
    /// Locator only; the identifier is derived from its file stem
    Locator(String),
    /// Explicit identifier
    Named { id: String, path: String },
}

impl SeriesGroupSpec {
    fn resolve(&self) -> SeriesGroup {
        match self {
            SeriesGroupSpec::Locator(locator) => SeriesGroup {
                id: group_id_from_locator(locator),
                locator: locator.clone(),
            },
            SeriesGroupSpec::Named { id, path } => SeriesGroup {
                id: id.clone(),
                locator: path.clone(),
            },
        }
    }
}

/// A named tabular source: one CSV feed with a shared `Day` index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesGroup {
    /// Identifier used in verdicts and artifact file names
    pub id: String,
    /// Where the [`DataSource`](crate::io::DataSource) finds the table
    pub locator: String,
}

impl SeriesGroup {
    pub fn new(id: impl Into<String>, locator: impl Into<String>) -> Self {
        SeriesGroup {
            id: id.into(),
            locator: locator.into(),
        }
    }
}

/// Derives a group identifier from the last path segment of a locator,
/// without its extension: `http://host/feeds/energy.csv` -> `energy`.
pub fn group_id_from_locator(locator: &str) -> String {
    let last = locator
        .trim_end_matches('/')
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(locator);
    match last.split('.').next() {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => last.to_string(),
    }
}

/// Smoothing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmoothingConfig {
    /// Level weight α
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Trend weight β
    #[serde(default = "default_beta")]
    pub beta: f64,

    /// Seasonal weight γ
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    /// Season length L in observations
    #[serde(default = "default_season_length", alias = "season_length")]
    pub season_length: usize,

    /// Span of the EWMA/EWMSTD baseline (moving-band mode)
    #[serde(default = "default_span")]
    pub span: usize,

    /// Fail instead of returning an empty forecast when a column has no data
    #[serde(default, alias = "require_seasonal")]
    pub require_seasonal: bool,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            beta: default_beta(),
            gamma: default_gamma(),
            season_length: default_season_length(),
            span: default_span(),
            require_seasonal: false,
        }
    }
}

/// Artifact output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory that receives forecast/error tables
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

/// Mail settings. The detector never sends mail itself; a notifier may use these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default = "default_subject")]
    pub subject: String,
}

impl DetectorConfig {
    /// Parses a YAML document.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        serde_yaml::from_str(source).map_err(|e| Error::Config(format!("invalid YAML: {}", e)))
    }

    /// Parses a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| Error::Config(format!("invalid TOML: {}", e)))
    }

    /// Loads and validates a config file. `.toml` files are read as TOML,
    /// anything else as YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config {}: {}", path.display(), e))
        })?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&source)?,
            _ => Self::from_yaml_str(&source)?,
        };
        config.validate()?;

        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Checks every model key. Returns [`Error::Config`] on the first problem.
    pub fn validate(&self) -> Result<()> {
        let s = &self.smoothing;
        for (name, value) in [("alpha", s.alpha), ("beta", s.beta), ("gamma", s.gamma)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(Error::Config(format!(
                    "smoothing.{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        if s.season_length == 0 {
            return Err(Error::Config(
                "smoothing.seasonLength must be a positive integer".to_string(),
            ));
        }
        if s.span == 0 {
            return Err(Error::Config(
                "smoothing.span must be a positive integer".to_string(),
            ));
        }
        if self.timestamp_column.trim().is_empty() {
            return Err(Error::Config("timestampColumn must not be empty".to_string()));
        }

        if self.threshold.is_some() && self.error_threshold_percent.is_some() {
            log::warn!("both threshold and error_threshold are set; using threshold");
        }
        match self.resolved_threshold() {
            Some(t) if !t.is_finite() || t < 0.0 => Err(Error::Config(format!(
                "threshold must be a nonnegative number, got {}",
                t
            ))),
            None if self.mode == ScoringMode::ForecastError => Err(Error::Config(
                "threshold is required in forecast-error mode".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Configured threshold in scorer units. A percent `error_threshold` is
    /// converted to a fraction and only applies in forecast-error mode.
    pub fn resolved_threshold(&self) -> Option<f64> {
        self.threshold.or_else(|| match self.mode {
            ScoringMode::ForecastError => self.error_threshold_percent.map(|p| p / 100.0),
            ScoringMode::MovingBand => None,
        })
    }

    /// Threshold in effect for the configured mode.
    pub fn effective_threshold(&self) -> f64 {
        match (self.resolved_threshold(), self.mode) {
            (Some(t), _) => t,
            (None, ScoringMode::MovingBand) => DEFAULT_BAND_MULTIPLIER,
            (None, ScoringMode::ForecastError) => 0.0,
        }
    }
}

// Default value helpers
fn default_timestamp_column() -> String {
    "Day".to_string()
}

fn default_alpha() -> f64 {
    0.9
}

fn default_beta() -> f64 {
    0.5
}

fn default_gamma() -> f64 {
    0.1
}

fn default_season_length() -> usize {
    7
}

fn default_span() -> usize {
    7
}

fn default_output_path() -> PathBuf {
    PathBuf::from("output")
}

fn default_smtp_port() -> u16 {
    587
}

fn default_subject() -> String {
    "Anomalies detected".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_id_from_locator() {
        assert_eq!(group_id_from_locator("http://example.com/feeds/energy.csv"), "energy");
        assert_eq!(group_id_from_locator("data/rooms.daily.csv"), "rooms");
        assert_eq!(group_id_from_locator("plain"), "plain");
    }

    #[test]
    fn test_defaults_follow_weekly_season() {
        let config = DetectorConfig::default();
        assert_eq!(config.smoothing.season_length, 7);
        assert_eq!(config.timestamp_column, "Day");
        assert_eq!(config.mode, ScoringMode::ForecastError);
    }

    #[test]
    fn test_forecast_error_requires_threshold() {
        let config = DetectorConfig::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = DetectorConfig {
            threshold: Some(0.3),
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_percent_error_threshold() {
        let config = DetectorConfig {
            error_threshold_percent: Some(30.0),
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!((config.effective_threshold() - 0.3).abs() < 1e-12);

        let both = DetectorConfig {
            threshold: Some(0.1),
            ..config.clone()
        };
        assert_eq!(both.effective_threshold(), 0.1);

        let band = DetectorConfig {
            mode: ScoringMode::MovingBand,
            ..config
        };
        assert_eq!(band.effective_threshold(), DEFAULT_BAND_MULTIPLIER);
    }

    #[test]
    fn test_band_threshold_defaults_to_three() {
        let config = DetectorConfig {
            mode: ScoringMode::MovingBand,
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.effective_threshold(), DEFAULT_BAND_MULTIPLIER);
    }

    #[test]
    fn test_rejects_out_of_range_weights() {
        let mut config = DetectorConfig {
            threshold: Some(0.5),
            ..DetectorConfig::default()
        };
        config.smoothing.gamma = 0.0;
        assert!(config.validate().is_err());
        config.smoothing.gamma = 1.0;
        assert!(config.validate().is_ok());
        config.smoothing.alpha = 1.2;
        assert!(config.validate().is_err());
    }
}
