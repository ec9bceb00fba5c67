//! 指数加重移動平均・標準偏差によるベースライン
//!
//! Exponentially weighted moving mean and standard deviation, both updated in
//! a single pass. The baseline at index `i` describes the observations strictly
//! before `i`, so each point is judged against its own history.

use crate::error::{Error, Result};
use crate::na::NA;

/// EWMA/EWMSTD baseline settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EwmBaseline {
    span: usize,
    alpha: f64,
}

impl EwmBaseline {
    /// Creates a baseline from a span; alpha = 2 / (span + 1).
    pub fn with_span(span: usize) -> Result<Self> {
        if span < 1 {
            return Err(Error::Config("smoothing.span must be at least 1".to_string()));
        }
        Ok(EwmBaseline {
            span,
            alpha: 2.0 / (span as f64 + 1.0),
        })
    }

    pub fn span(&self) -> usize {
        self.span
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Computes the one-step-ahead moving mean and standard deviation.
    ///
    /// Entries up to and including the first observation are `NA` (no history).
    /// Missing observations leave the running state untouched.
    pub fn compute(&self, values: &[NA<f64>]) -> MovingBaseline {
        let mut mean = Vec::with_capacity(values.len());
        let mut std = Vec::with_capacity(values.len());

        // 最初の非NAのインデックスを見つける
        let first_valid_idx = values.iter().position(NA::is_value);
        let idx = match first_valid_idx {
            Some(idx) => idx,
            None => {
                return MovingBaseline {
                    mean: vec![NA::NA; values.len()],
                    std: vec![NA::NA; values.len()],
                }
            }
        };

        for _ in 0..=idx {
            mean.push(NA::NA);
            std.push(NA::NA);
        }

        let mut weighted_avg = values[idx].or_fill(0.0);
        let mut weighted_var = 0.0_f64;

        for value in &values[idx + 1..] {
            mean.push(NA::Value(weighted_avg));
            std.push(NA::Value(weighted_var.max(0.0).sqrt()));

            if let NA::Value(x) = value {
                // 逐次更新: 定数系列では平均が厳密に保たれる
                let diff = x - weighted_avg;
                let incr = self.alpha * diff;
                weighted_avg += incr;
                weighted_var = (1.0 - self.alpha) * (weighted_var + diff * incr);
            }
        }

        MovingBaseline { mean, std }
    }
}

/// Moving mean and standard deviation aligned to the input column
#[derive(Debug, Clone, PartialEq)]
pub struct MovingBaseline {
    /// EWMA of the history before each index
    pub mean: Vec<NA<f64>>,
    /// EWMSTD of the history before each index
    pub std: Vec<NA<f64>>,
}

impl MovingBaseline {
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Band `[mean - k·std, mean + k·std]` at `index`, if defined.
    pub fn band(&self, index: usize, k: f64) -> Option<(f64, f64)> {
        let mean = *self.mean.get(index)?.value()?;
        let std = *self.std.get(index)?.value()?;
        Some((mean - k * std, mean + k * std))
    }
}
