//! Baseline models
//!
//! Two ways of turning a raw column into an expected-value signal:
//!
//! - Holt-Winters triple exponential smoothing, giving a one-step-ahead
//!   in-sample forecast ([`HoltWinters`])
//! - an exponentially weighted moving mean/std band ([`EwmBaseline`])
//!
//! [`Smoother`] picks one of them from the scoring mode.

pub mod ewm;
pub mod holt_winters;

pub use ewm::{EwmBaseline, MovingBaseline};
pub use holt_winters::{HoltWinters, HoltWintersParams, SmoothingState};

use crate::config::SmoothingConfig;
use crate::error::{Error, Result};
use crate::na::NA;
use crate::scoring::ScoringMode;

/// One forecast point
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPoint {
    pub day: String,
    pub value: f64,
}

/// In-sample forecast aligned to the store index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastSeries {
    points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    /// Pairs `values` with the index; both must have the same length.
    pub fn new(index: &[String], values: Vec<f64>) -> Result<Self> {
        if index.len() != values.len() {
            return Err(Error::MalformedInput(format!(
                "forecast has {} values for an index of {}",
                values.len(),
                index.len()
            )));
        }
        let points = index
            .iter()
            .zip(values)
            .map(|(day, value)| ForecastPoint {
                day: day.clone(),
                value,
            })
            .collect();
        Ok(ForecastSeries { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn last(&self) -> Option<&ForecastPoint> {
        self.points.last()
    }
}

/// Output of a [`Smoother`] for one column
#[derive(Debug, Clone, PartialEq)]
pub enum Baseline {
    /// Holt-Winters fit plus the final state
    Forecast {
        series: ForecastSeries,
        state: SmoothingState,
    },
    /// Moving mean/std band
    Band(MovingBaseline),
}

impl Baseline {
    /// Expected value per index, as written to the forecast artifact.
    pub fn expected(&self) -> Vec<NA<f64>> {
        match self {
            Baseline::Forecast { series, .. } => {
                series.points().iter().map(|p| NA::finite(p.value)).collect()
            }
            Baseline::Band(band) => band.mean.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Baseline::Forecast { series, .. } => series.len(),
            Baseline::Band(band) => band.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Baseline model selected by the scoring mode
#[derive(Debug, Clone)]
pub enum Smoother {
    HoltWinters(HoltWinters),
    Moving(EwmBaseline),
}

impl Smoother {
    pub fn from_config(mode: ScoringMode, config: &SmoothingConfig) -> Result<Self> {
        Ok(match mode {
            ScoringMode::ForecastError => {
                Smoother::HoltWinters(HoltWinters::new(HoltWintersParams::from(config)))
            }
            ScoringMode::MovingBand => Smoother::Moving(EwmBaseline::with_span(config.span)?),
        })
    }

    /// Fewest usable observations this model needs for a meaningful baseline.
    pub fn min_points(&self) -> usize {
        match self {
            Smoother::HoltWinters(_) => 1,
            Smoother::Moving(ewm) => ewm.span().max(2),
        }
    }

    /// Computes the baseline of one column.
    pub fn smooth(&self, column: &str, index: &[String], values: &[NA<f64>]) -> Result<Baseline> {
        match self {
            Smoother::HoltWinters(hw) => {
                let (forecast, state) = hw.fit(column, values)?;
                Ok(Baseline::Forecast {
                    series: ForecastSeries::new(index, forecast)?,
                    state,
                })
            }
            Smoother::Moving(ewm) => Ok(Baseline::Band(ewm.compute(values))),
        }
    }
}
