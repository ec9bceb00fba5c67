//! Deviation scoring
//!
//! One scorer, two strategies selected by [`ScoringMode`]. Per-point
//! deviations are kept for the artifact tables; only the latest point decides
//! whether a column is flagged. Boundaries are inclusive: a deviation equal to
//! the threshold is an anomaly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::na::NA;
use crate::smoothing::Baseline;
use crate::store::safe_denominator;

/// Scoring strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringMode {
    /// Absolute percentage error against the Holt-Winters forecast
    #[default]
    ForecastError,
    /// Latest point against an EWMA ± k·EWMSTD band
    MovingBand,
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScoringMode::ForecastError => write!(f, "forecast-error"),
            ScoringMode::MovingBand => write!(f, "moving-band"),
        }
    }
}

impl FromStr for ScoringMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "forecast-error" | "forecast_error" => Ok(ScoringMode::ForecastError),
            "moving-band" | "moving_band" => Ok(ScoringMode::MovingBand),
            other => Err(Error::Config(format!("unknown scoring mode '{}'", other))),
        }
    }
}

/// Per-point deviation scores aligned to the input column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviationSeries {
    values: Vec<NA<f64>>,
}

impl DeviationSeries {
    pub fn new(values: Vec<NA<f64>>) -> Self {
        DeviationSeries { values }
    }

    pub fn values(&self) -> &[NA<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.last().and_then(|v| v.value().copied())
    }
}

/// Result of scoring one column
#[derive(Debug, Clone, PartialEq)]
pub enum Score {
    /// forecast-error: percentage errors, latest compared with the threshold
    Deviations {
        series: DeviationSeries,
        flagged: bool,
    },
    /// moving-band: latest point inside/outside the band; `distances` are
    /// |x - mean| / std per point for the artifact table
    Band {
        distances: DeviationSeries,
        flagged: bool,
    },
}

impl Score {
    pub fn flagged(&self) -> bool {
        match self {
            Score::Deviations { flagged, .. } | Score::Band { flagged, .. } => *flagged,
        }
    }

    pub fn deviations(&self) -> &DeviationSeries {
        match self {
            Score::Deviations { series, .. } => series,
            Score::Band { distances, .. } => distances,
        }
    }
}

/// Absolute percentage error of one observation, as a fraction.
///
/// The denominator goes through [`safe_denominator`]; a `0/0` result is 0.
pub fn percentage_error(actual: f64, forecast: f64) -> f64 {
    let error = (actual - forecast).abs() / safe_denominator(actual).abs();
    if error.is_nan() {
        0.0
    } else {
        error
    }
}

/// Normalised distance from the band centre. A zero-width band gives 0 for an
/// exact match and infinity otherwise.
pub fn band_distance(actual: f64, mean: f64, std: f64) -> f64 {
    let distance = (actual - mean).abs();
    if distance == 0.0 {
        0.0
    } else if std == 0.0 {
        f64::INFINITY
    } else {
        distance / std
    }
}

/// `true` when `actual` lies on or outside `[mean - k·std, mean + k·std]`.
/// An observation equal to the centre of a zero-width band is not a deviation.
pub fn outside_band(actual: f64, mean: f64, std: f64, k: f64) -> bool {
    let distance = (actual - mean).abs();
    distance > 0.0 && distance >= k * std
}

/// Applies the active strategy to one column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviationScorer {
    mode: ScoringMode,
    threshold: f64,
}

impl DeviationScorer {
    pub fn new(mode: ScoringMode, threshold: f64) -> Self {
        DeviationScorer { mode, threshold }
    }

    pub fn mode(&self) -> ScoringMode {
        self.mode
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Scores `actual` against `baseline`.
    ///
    /// Fails with [`Error::InsufficientData`] when the latest observation or
    /// its baseline is missing; the caller skips the column in that case.
    pub fn score(&self, column: &str, actual: &[NA<f64>], baseline: &Baseline) -> Result<Score> {
        if actual.len() != baseline.len() {
            return Err(Error::MalformedInput(format!(
                "column {}: {} observations but {} baseline points",
                column,
                actual.len(),
                baseline.len()
            )));
        }
        let latest = match actual.last() {
            Some(NA::Value(v)) => *v,
            _ => {
                return Err(Error::InsufficientData {
                    column: column.to_string(),
                    required: 1,
                    found: 0,
                })
            }
        };

        match (self.mode, baseline) {
            (ScoringMode::ForecastError, Baseline::Forecast { series, .. }) => {
                let values = actual
                    .iter()
                    .zip(series.points())
                    .map(|(a, f)| a.map(|a| percentage_error(*a, f.value)))
                    .collect();
                let series = DeviationSeries::new(values);
                let flagged = series.latest().map_or(false, |d| d >= self.threshold);
                Ok(Score::Deviations { series, flagged })
            }
            (ScoringMode::MovingBand, Baseline::Band(band)) => {
                let distances = actual
                    .iter()
                    .zip(band.mean.iter().zip(&band.std))
                    .map(|(a, (m, s))| match (a, m, s) {
                        (NA::Value(a), NA::Value(m), NA::Value(s)) => {
                            NA::Value(band_distance(*a, *m, *s))
                        }
                        _ => NA::NA,
                    })
                    .collect();

                let last = actual.len() - 1;
                let (mean, std) = match (band.mean[last], band.std[last]) {
                    (NA::Value(m), NA::Value(s)) => (m, s),
                    _ => {
                        return Err(Error::InsufficientData {
                            column: column.to_string(),
                            required: 2,
                            found: actual.iter().filter(|v| v.is_value()).count(),
                        })
                    }
                };

                Ok(Score::Band {
                    distances: DeviationSeries::new(distances),
                    flagged: outside_band(latest, mean, std, self.threshold),
                })
            }
            (mode, _) => Err(Error::MalformedInput(format!(
                "column {}: baseline does not match scoring mode {}",
                column, mode
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smoothing::{EwmBaseline, ForecastSeries, HoltWinters};

    fn observed(values: &[f64]) -> Vec<NA<f64>> {
        values.iter().map(|&v| NA::Value(v)).collect()
    }

    fn index(n: usize) -> Vec<String> {
        (1..=n).map(|d| format!("2016-01-{:02}", d)).collect()
    }

    #[test]
    fn test_percentage_error() {
        assert!((percentage_error(100.0, 90.0) - 0.1).abs() < 1e-12);
        assert!((percentage_error(-50.0, -25.0) - 0.5).abs() < 1e-12);
        // ゼロは1として扱う
        assert_eq!(percentage_error(0.0, 3.0), 3.0);
        assert_eq!(percentage_error(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_outside_band_is_inclusive() {
        assert!(outside_band(13.0, 10.0, 1.0, 3.0));
        assert!(outside_band(7.0, 10.0, 1.0, 3.0));
        assert!(!outside_band(12.9, 10.0, 1.0, 3.0));
        assert!(!outside_band(10.0, 10.0, 0.0, 3.0));
        assert!(outside_band(10.5, 10.0, 0.0, 3.0));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("moving-band".parse::<ScoringMode>().unwrap(), ScoringMode::MovingBand);
        assert_eq!("Forecast-Error".parse::<ScoringMode>().unwrap(), ScoringMode::ForecastError);
        assert!("zscore".parse::<ScoringMode>().is_err());
        assert_eq!(ScoringMode::MovingBand.to_string(), "moving-band");
    }

    #[test]
    fn test_threshold_tie_is_flagged() {
        let series = ForecastSeries::new(&index(1), vec![90.0]).unwrap();
        let baseline = Baseline::Forecast {
            series,
            state: HoltWinters::default().fit("Home", &observed(&[1.0])).unwrap().1,
        };
        let scorer = DeviationScorer::new(ScoringMode::ForecastError, 0.1);
        let score = scorer.score("Home", &observed(&[100.0]), &baseline).unwrap();
        assert!(score.flagged());
        assert!((score.deviations().latest().unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_missing_latest_is_insufficient() {
        let ewm = EwmBaseline::with_span(2).unwrap();
        let actual = vec![NA::Value(1.0), NA::Value(2.0), NA::NA];
        let baseline = Baseline::Band(ewm.compute(&actual));
        let scorer = DeviationScorer::new(ScoringMode::MovingBand, 3.0);
        assert!(matches!(
            scorer.score("Home", &actual, &baseline),
            Err(Error::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_mode_mismatch() {
        let ewm = EwmBaseline::with_span(2).unwrap();
        let actual = observed(&[1.0, 2.0, 3.0]);
        let baseline = Baseline::Band(ewm.compute(&actual));
        let scorer = DeviationScorer::new(ScoringMode::ForecastError, 0.5);
        assert!(scorer.score("Home", &actual, &baseline).is_err());
    }
}
