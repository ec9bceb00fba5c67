//! Holt-Winters triple exponential smoothing
//!
//! Additive level, linear trend and additive seasonal components:
//!
//! ```text
//! Forecast: F_i = L + T + S[i mod m]
//! Level:    L'  = α (x_i - S[i mod m]) + (1 - α)(L + T)
//! Trend:    T'  = β (L' - L) + (1 - β) T
//! Season:   S'  = γ (x_i - L') + (1 - γ) S[i mod m]
//! ```
//!
//! The forecast for index `i` is taken before `x_i` is seen, so the output is a
//! one-step-ahead in-sample fit of the same length as the input.

use crate::config::SmoothingConfig;
use crate::error::{Error, Result};
use crate::na::NA;

/// Holt-Winters parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoltWintersParams {
    /// Level weight α
    pub alpha: f64,
    /// Trend weight β
    pub beta: f64,
    /// Seasonal weight γ
    pub gamma: f64,
    /// Season length m
    pub season_length: usize,
    /// Empty input is an error instead of an empty forecast
    pub require_seasonal: bool,
}

impl Default for HoltWintersParams {
    fn default() -> Self {
        HoltWintersParams::from(&SmoothingConfig::default())
    }
}

impl From<&SmoothingConfig> for HoltWintersParams {
    fn from(config: &SmoothingConfig) -> Self {
        HoltWintersParams {
            alpha: config.alpha,
            beta: config.beta,
            gamma: config.gamma,
            season_length: config.season_length,
            require_seasonal: config.require_seasonal,
        }
    }
}

/// Recursive state of one column. Created per column, dropped after the run.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingState {
    /// Current level
    pub level: f64,
    /// Current trend
    pub trend: f64,
    /// Seasonal components, `None` when running non-seasonal
    pub seasonal: Option<Vec<f64>>,
    /// Number of observations consumed
    pub observed: usize,
}

impl SmoothingState {
    /// Initial state for `values`.
    ///
    /// Level starts at the first observation and trend at the first difference.
    /// With at least two full seasons of complete data the seasonal components
    /// are estimated from the first season, detrended with the slope between
    /// the first two season means, and level/trend are re-based on that fit.
    fn initialize(values: &[NA<f64>], season_length: usize) -> Self {
        let first = values.iter().position(NA::is_value);
        let mut level = first.map(|i| values[i].or_fill(0.0)).unwrap_or(0.0);
        let mut trend = match (values.first(), values.get(1)) {
            (Some(NA::Value(v0)), Some(NA::Value(v1))) => v1 - v0,
            _ => 0.0,
        };

        let mut seasonal = None;
        if season_length > 1 && values.len() >= 2 * season_length {
            let head: Option<Vec<f64>> = values[..2 * season_length]
                .iter()
                .map(|v| v.value().copied())
                .collect();
            if let Some(head) = head {
                let m = season_length as f64;
                let first_mean = head[..season_length].iter().sum::<f64>() / m;
                let second_mean = head[season_length..].iter().sum::<f64>() / m;
                let slope = (second_mean - first_mean) / m;
                let centre = (m - 1.0) / 2.0;

                let components: Vec<f64> = head[..season_length]
                    .iter()
                    .enumerate()
                    .map(|(j, v)| v - (first_mean + (j as f64 - centre) * slope))
                    .collect();
                level = head[0] - components[0];
                trend = slope;
                seasonal = Some(components);
            }
        }

        SmoothingState {
            level,
            trend,
            seasonal,
            observed: 0,
        }
    }

    pub fn is_seasonal(&self) -> bool {
        self.seasonal.is_some()
    }

    fn seasonal_at(&self, position: usize) -> f64 {
        match &self.seasonal {
            Some(s) => s[position % s.len()],
            None => 0.0,
        }
    }

    /// One-step-ahead forecast for the next observation.
    pub fn next_forecast(&self) -> f64 {
        self.level + self.trend + self.seasonal_at(self.observed)
    }

    /// Out-of-sample forecasts `horizon` steps past the last observation.
    pub fn predict(&self, horizon: usize) -> Vec<f64> {
        (1..=horizon)
            .map(|h| {
                self.level + h as f64 * self.trend + self.seasonal_at(self.observed + h - 1)
            })
            .collect()
    }

    /// Consumes one observation. A missing value is replaced by the current level.
    fn update(&mut self, observation: NA<f64>, params: &HoltWintersParams) {
        let x = observation.or_fill(self.level);
        let position = self.observed;
        let season = self.seasonal_at(position);

        let prev_level = self.level;
        self.level = params.alpha * (x - season) + (1.0 - params.alpha) * (self.level + self.trend);
        self.trend = params.beta * (self.level - prev_level) + (1.0 - params.beta) * self.trend;

        let level = self.level;
        if let Some(s) = self.seasonal.as_mut() {
            let slot = position % s.len();
            s[slot] = params.gamma * (x - level) + (1.0 - params.gamma) * s[slot];
        }
        self.observed += 1;
    }
}

/// Holt-Winters smoother
#[derive(Debug, Clone, Default)]
pub struct HoltWinters {
    params: HoltWintersParams,
}

impl HoltWinters {
    pub fn new(params: HoltWintersParams) -> Self {
        HoltWinters { params }
    }

    pub fn params(&self) -> &HoltWintersParams {
        &self.params
    }

    /// Runs the recursion over `values` and returns the in-sample forecasts
    /// together with the final state.
    ///
    /// Never fails except for empty input with `require_seasonal` set; short
    /// series fall back to the non-seasonal recursion.
    pub fn fit(&self, column: &str, values: &[NA<f64>]) -> Result<(Vec<f64>, SmoothingState)> {
        if values.is_empty() && self.params.require_seasonal {
            return Err(Error::InsufficientData {
                column: column.to_string(),
                required: 2 * self.params.season_length,
                found: 0,
            });
        }

        let mut state = SmoothingState::initialize(values, self.params.season_length);
        if !state.is_seasonal() && self.params.season_length > 1 {
            log::debug!(
                "column {}: {} observations, smoothing without seasonality",
                column,
                values.len()
            );
        }

        let mut forecasts = Vec::with_capacity(values.len());
        for &value in values {
            forecasts.push(state.next_forecast());
            state.update(value, &self.params);
        }
        Ok((forecasts, state))
    }
}
