//! Adaptive permutation test of a bump.
//!
//! Most clusters are clear nulls, so the test starts with a handful of
//! trials and only re-runs at higher resolution while the observed statistic
//! looks extreme:
//!
//! | level | trials | escalate when exceed < |
//! |-------|--------|------------------------|
//! | 1     | 20     | 2                      |
//! | 2     | 100    | 4                      |
//! | 3     | 2000   | 10                     |
//! | 4     | 5000   | 10                     |
//! | 5     | 15000  | terminal               |
//!
//! The schedule lives in [`Config::schedule`] and can be replaced.

mod controller;

pub use controller::{AdaptiveController, AdaptiveOutcome, LevelSummary};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::model::SiteFitter;
use crate::permutation::{PermutationSimulator, SimulationBatch};
use crate::types::{Cluster, CombinedResult, CovariateTable, Design};

/// Everything the adaptive test learned about one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BumpReport {
    /// Covariate, permutation p-value and mean observed coefficient.
    pub result: CombinedResult,
    /// Smoothed statistic of the real data.
    pub observed_statistic: f64,
    /// Observed coefficient at each site that could be fit.
    pub coefficients: Vec<f64>,
    /// Trials requested at the terminal level.
    pub n_trials: usize,
    /// Valid trials at the terminal level.
    pub n_valid: usize,
    /// Exceedances at the terminal level.
    pub exceed: usize,
    /// Every level visited, in order.
    pub levels: Vec<LevelSummary>,
    /// Null statistics of the terminal level.
    pub batch: SimulationBatch,
}

/// Permutation p-value of the coefficient of interest for a cluster.
///
/// The full design must add exactly one term to the reduced design. The
/// reported coefficient is the mean observed per-site coefficient.
///
/// # Errors
///
/// - [`Error::MalformedNesting`](crate::Error::MalformedNesting) for designs that do not nest.
/// - [`Error::ObservedFitFailed`](crate::Error::ObservedFitFailed) if no site can be fit.
/// - [`Error::NoValidTrials`](crate::Error::NoValidTrials) if a level keeps no trials.
pub fn bump_test(
    cluster: &Cluster,
    covariates: &CovariateTable,
    full: &Design,
    reduced: &Design,
    weights: Option<&[f64]>,
    config: &Config,
) -> Result<CombinedResult> {
    bump_test_detailed(cluster, covariates, full, reduced, weights, config).map(|r| r.result)
}

/// [`bump_test`] with per-level diagnostics and the terminal batch.
pub fn bump_test_detailed(
    cluster: &Cluster,
    covariates: &CovariateTable,
    full: &Design,
    reduced: &Design,
    weights: Option<&[f64]>,
    config: &Config,
) -> Result<BumpReport> {
    let simulator = PermutationSimulator::new(cluster, covariates, full, reduced, weights, config)?;
    run_simulator(&simulator, config)
}

/// Drive a prepared simulator through the escalation schedule.
///
/// Use this with [`PermutationSimulator::with_fitter`] to test a bump under a
/// custom [`SiteFitter`].
pub fn run_simulator<F: SiteFitter>(
    simulator: &PermutationSimulator<F>,
    config: &Config,
) -> Result<BumpReport> {
    let controller = AdaptiveController::from_config(config)?;
    let observed = simulator.observed();
    let outcome = controller.run(observed.statistic, |n_trials, seed| {
        simulator.simulate(n_trials, seed)
    })?;

    tracing::debug!(
        covariate = simulator.covariate(),
        p = outcome.p,
        n_trials = outcome.n_trials,
        levels = outcome.levels.len(),
        "bump test finished"
    );

    Ok(BumpReport {
        result: CombinedResult {
            covariate: simulator.covariate().to_string(),
            p: outcome.p,
            coefficient: observed.mean_coefficient(),
        },
        observed_statistic: observed.statistic,
        coefficients: observed.coefficients.clone(),
        n_trials: outcome.n_trials,
        n_valid: outcome.n_valid,
        exceed: outcome.exceed,
        levels: outcome.levels,
        batch: outcome.batch,
    })
}
