//! Simulation batches and the observed statistic.

use serde::{Deserialize, Serialize};

/// Null statistics from one batch of simulation trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationBatch {
    /// Trials attempted.
    pub n_trials: usize,
    /// Statistics of the trials that were kept, in trial order.
    pub statistics: Vec<f64>,
    /// Trials discarded because too many site fits failed.
    pub discarded: usize,
}

impl SimulationBatch {
    /// Trials that produced a statistic.
    pub fn n_valid(&self) -> usize {
        self.statistics.len()
    }

    /// Trials at least as extreme as `observed` in absolute value.
    pub fn exceedances(&self, observed: f64) -> usize {
        let threshold = observed.abs();
        self.statistics
            .iter()
            .filter(|s| s.abs() >= threshold)
            .count()
    }
}

/// Full-design fit of the real data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observed {
    /// Smoothed summary statistic.
    pub statistic: f64,
    /// Coefficient of interest at each site that could be fit, in site order.
    pub coefficients: Vec<f64>,
    /// Sites in the cluster, fit or not.
    pub n_sites: usize,
}

impl Observed {
    /// Mean coefficient over the fitted sites.
    pub fn mean_coefficient(&self) -> f64 {
        self.coefficients.iter().sum::<f64>() / self.coefficients.len() as f64
    }
}
