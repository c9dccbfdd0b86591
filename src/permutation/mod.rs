//! Residual permutation simulation of a bump's null distribution.
//!
//! The reduced (null) design is fit to every site once. Each trial then
//! builds synthetic data `fitted + residuals[:, π]` with one permutation `π`
//! of the samples shared by all sites, so the cross-site correlation survives
//! into the null data. The full design is fit to the synthetic sites and the
//! per-site coefficients of interest are reduced to one smoothed statistic.
//!
//! Trials share nothing mutable. Trial `i` draws from its own
//! `Xoshiro256PlusPlus` seeded with [`counter_rng_seed`], so a batch is
//! bit-identical for a given seed whatever the thread count.

mod batch;
mod seed;

use nalgebra::DMatrix;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{CoefficientFit, LinearModel, SiteFitter};
use crate::statistics::{summarize_at, LocalRegression};
use crate::types::{Cluster, CovariateTable, Design};

pub use batch::{Observed, SimulationBatch};
pub use seed::counter_rng_seed;

/// Simulate `n_trials` null statistics for a cluster.
///
/// Convenience wrapper around [`PermutationSimulator`] that seeds the batch
/// from `config.seed`.
///
/// # Errors
///
/// Structural errors from [`PermutationSimulator::new`].
pub fn simulate(
    cluster: &Cluster,
    covariates: &CovariateTable,
    full: &Design,
    reduced: &Design,
    weights: Option<&[f64]>,
    n_trials: usize,
    config: &Config,
) -> Result<SimulationBatch> {
    PermutationSimulator::new(cluster, covariates, full, reduced, weights, config)?
        .simulate(n_trials, config.seed)
}

/// Prepared residual-permutation engine for one cluster.
pub struct PermutationSimulator<F = CoefficientFit> {
    covariate: String,
    /// Reduced-model fitted values, `sites × samples`.
    fitted: DMatrix<f64>,
    /// Reduced-model residuals, `sites × samples`; NaN where missing.
    residuals: DMatrix<f64>,
    /// Sites with a usable reduced fit, in site order.
    active_sites: Vec<usize>,
    fitter: F,
    smoother: LocalRegression,
    max_failed_site_fraction: f64,
    observed: Observed,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl PermutationSimulator<CoefficientFit> {
    /// Prepare the linear-model engine.
    ///
    /// # Errors
    ///
    /// - [`Error::LengthMismatch`] if the covariate table and cluster disagree on samples.
    /// - [`Error::MalformedNesting`] / [`Error::UnknownCovariate`] for bad designs.
    /// - [`Error::SingularDesign`] if either design is rank deficient.
    /// - [`Error::ObservedFitFailed`] if no site can be fit.
    pub fn new(
        cluster: &Cluster,
        covariates: &CovariateTable,
        full: &Design,
        reduced: &Design,
        weights: Option<&[f64]>,
        config: &Config,
    ) -> Result<Self> {
        if covariates.n_samples() != cluster.n_samples() {
            return Err(Error::LengthMismatch {
                what: "covariate samples",
                expected: cluster.n_samples(),
                actual: covariates.n_samples(),
            });
        }
        let covariate = full.coefficient_of_interest(reduced)?;
        let column = full
            .column_of(&covariate)
            .ok_or_else(|| Error::UnknownCovariate(covariate.clone()))?;
        let reduced_model = LinearModel::new(reduced.model_matrix(covariates)?, weights)?;
        let full_model = LinearModel::new(full.model_matrix(covariates)?, weights)?;
        Self::with_fitter(
            cluster,
            &reduced_model,
            full_model.coefficient(column),
            covariate,
            config,
        )
    }
}

impl<F: SiteFitter> PermutationSimulator<F> {
    /// Prepare an engine that fits the full design with a custom `fitter`.
    ///
    /// `reduced` supplies the null fitted values and residuals; `fitter`
    /// reports the coefficient named `covariate` for real and synthetic sites.
    pub fn with_fitter(
        cluster: &Cluster,
        reduced: &LinearModel,
        fitter: F,
        covariate: String,
        config: &Config,
    ) -> Result<Self> {
        let n_sites = cluster.n_sites();
        let n_samples = cluster.n_samples();
        if reduced.n_samples() != n_samples {
            return Err(Error::LengthMismatch {
                what: "reduced design samples",
                expected: n_samples,
                actual: reduced.n_samples(),
            });
        }

        let mut fitted = DMatrix::from_element(n_sites, n_samples, f64::NAN);
        let mut residuals = DMatrix::from_element(n_sites, n_samples, f64::NAN);
        let mut active_sites = Vec::with_capacity(n_sites);
        for site in 0..n_sites {
            match reduced.fit(&cluster.site(site)) {
                Ok(fit) => {
                    for k in 0..n_samples {
                        fitted[(site, k)] = fit.fitted[k];
                        residuals[(site, k)] = fit.residuals[k];
                    }
                    active_sites.push(site);
                }
                Err(failure) => {
                    tracing::debug!(site, %failure, "reduced fit failed; site excluded");
                }
            }
        }

        let smoother = LocalRegression::new(config.smoothing_span, config.smoothing_degree);
        if active_sites.is_empty() {
            return Err(Error::ObservedFitFailed);
        }
        let observed = observe(cluster, &active_sites, &fitter, &smoother)?;

        Ok(Self {
            covariate,
            fitted,
            residuals,
            active_sites,
            fitter,
            smoother,
            max_failed_site_fraction: config.max_failed_site_fraction,
            observed,
            #[cfg(feature = "parallel")]
            pool: build_pool(config.parallelism)?,
        })
    }

    /// Name of the coefficient of interest.
    pub fn covariate(&self) -> &str {
        &self.covariate
    }

    /// Statistic and coefficients of the real data under the full design.
    pub fn observed(&self) -> &Observed {
        &self.observed
    }

    /// Run `n_trials` independent trials seeded from `seed`.
    ///
    /// Discarded trials are counted in the batch but carry no statistic.
    pub fn simulate(&self, n_trials: usize, seed: u64) -> Result<SimulationBatch> {
        let outcomes = self.run_trials(n_trials, seed);
        let statistics: Vec<f64> = outcomes.iter().filter_map(|s| *s).collect();
        let discarded = n_trials - statistics.len();
        if discarded > 0 {
            tracing::trace!(n_trials, discarded, "simulation trials discarded");
        }
        Ok(SimulationBatch {
            n_trials,
            statistics,
            discarded,
        })
    }

    #[cfg(feature = "parallel")]
    fn run_trials(&self, n_trials: usize, seed: u64) -> Vec<Option<f64>> {
        let work = || {
            (0..n_trials)
                .into_par_iter()
                .map_init(
                    || TrialBuffers::new(self.fitted.ncols(), self.active_sites.len()),
                    |buffers, i| {
                        let mut rng =
                            Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(seed, i as u64));
                        self.run_trial(&mut rng, buffers)
                    },
                )
                .collect()
        };
        match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn run_trials(&self, n_trials: usize, seed: u64) -> Vec<Option<f64>> {
        let mut buffers = TrialBuffers::new(self.fitted.ncols(), self.active_sites.len());
        (0..n_trials)
            .map(|i| {
                let mut rng = Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(seed, i as u64));
                self.run_trial(&mut rng, &mut buffers)
            })
            .collect()
    }

    /// One trial: permute, refit, summarize. `None` if too many sites fail.
    fn run_trial(&self, rng: &mut Xoshiro256PlusPlus, buffers: &mut TrialBuffers) -> Option<f64> {
        let n_samples = self.fitted.ncols();
        buffers.permutation.clear();
        buffers.permutation.extend(0..n_samples);
        buffers.permutation.shuffle(rng);

        buffers.positions.clear();
        buffers.coefficients.clear();
        buffers.precisions.clear();
        let mut failed = 0usize;
        for &site in &self.active_sites {
            for k in 0..n_samples {
                let source = buffers.permutation[k];
                buffers.synthetic[k] = self.fitted[(site, k)] + self.residuals[(site, source)];
            }
            match self.fitter.fit_site(&buffers.synthetic) {
                Ok(fit) => {
                    buffers.positions.push((site + 1) as f64);
                    buffers.coefficients.push(fit.coefficient);
                    buffers.precisions.push(fit.precision);
                }
                Err(_) => failed += 1,
            }
        }

        let n_active = self.active_sites.len();
        if buffers.coefficients.is_empty()
            || failed as f64 > self.max_failed_site_fraction * n_active as f64
        {
            return None;
        }
        Some(summarize_at(
            &buffers.positions,
            &buffers.coefficients,
            &buffers.precisions,
            &self.smoother,
        ))
    }
}

/// Per-worker scratch space, reused across trials.
struct TrialBuffers {
    permutation: Vec<usize>,
    synthetic: Vec<f64>,
    positions: Vec<f64>,
    coefficients: Vec<f64>,
    precisions: Vec<f64>,
}

impl TrialBuffers {
    fn new(n_samples: usize, n_sites: usize) -> Self {
        Self {
            permutation: Vec::with_capacity(n_samples),
            synthetic: vec![0.0; n_samples],
            positions: Vec::with_capacity(n_sites),
            coefficients: Vec::with_capacity(n_sites),
            precisions: Vec::with_capacity(n_sites),
        }
    }
}

/// Fit the full design to the real data at the sites the null is simulated on.
fn observe<F: SiteFitter>(
    cluster: &Cluster,
    active_sites: &[usize],
    fitter: &F,
    smoother: &LocalRegression,
) -> Result<Observed> {
    let mut positions = Vec::with_capacity(active_sites.len());
    let mut coefficients = Vec::with_capacity(active_sites.len());
    let mut precisions = Vec::with_capacity(active_sites.len());
    for &site in active_sites {
        match fitter.fit_site(&cluster.site(site)) {
            Ok(fit) => {
                positions.push((site + 1) as f64);
                coefficients.push(fit.coefficient);
                precisions.push(fit.precision);
            }
            Err(failure) => {
                tracing::debug!(site, %failure, "observed fit failed; site excluded");
            }
        }
    }
    if coefficients.is_empty() {
        return Err(Error::ObservedFitFailed);
    }
    let statistic = summarize_at(&positions, &coefficients, &precisions, smoother);
    Ok(Observed {
        statistic,
        coefficients,
        n_sites: cluster.n_sites(),
    })
}

#[cfg(feature = "parallel")]
fn build_pool(parallelism: Option<usize>) -> Result<Option<rayon::ThreadPool>> {
    parallelism
        .map(|threads| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| Error::ThreadPool(e.to_string()))
        })
        .transpose()
}
