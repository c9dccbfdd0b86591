//! Correlation-adjusted combination of per-site p-values.
//!
//! Each p-value is mapped to an upper-tail z-score `z = Φ⁻¹(1 − p)`. The
//! z-scores are treated as jointly normal with covariance Sigma (the site
//! correlation matrix stands in for the z-score correlation), combined into a
//! single standard normal statistic, and mapped back with the survival
//! function.
//!
//! Two algorithms are available:
//!
//! - [`CombineAlgorithm::StoufferLiptak`]: `z = aᵀz / sqrt(aᵀΣa)` with
//!   `a = W Σ⁻¹ 1`; exact under the normal model.
//! - [`CombineAlgorithm::ZScore`]: weighted mean z-score divided by its
//!   standard deviation `sqrt(wᵀΣw) / Σw`; no matrix inversion.
//!
//! [`cluster_test`] fits a design at every site and combines the resulting
//! p-values in one call.

mod cluster;
mod stouffer;
mod zscore;

use nalgebra::DVector;

use crate::config::{CombineAlgorithm, Config, SingularPolicy};
use crate::constants::{P_CEIL, P_FLOOR};
use crate::error::{Error, Result};
use crate::statistics::{normal_sf, z_from_p};
use crate::types::Sigma;

pub use cluster::{cluster_test, cluster_test_with};
pub use stouffer::stouffer_liptak;
pub use zscore::z_score_combine;

/// Combine correlated p-values with default floor and singular-Sigma policy.
///
/// # Errors
///
/// See [`Combiner::combine`].
pub fn combine(
    pvalues: &[f64],
    sigma: &Sigma,
    weights: Option<&[f64]>,
    algorithm: CombineAlgorithm,
) -> Result<f64> {
    Combiner {
        algorithm,
        ..Combiner::default()
    }
    .combine(pvalues, sigma, weights)
}

/// A configured p-value combiner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combiner {
    /// Combination algorithm.
    pub algorithm: CombineAlgorithm,
    /// Handling of a singular Sigma under Stouffer-Liptak.
    pub singular_policy: SingularPolicy,
    /// Floor applied to p-values before the inverse CDF.
    pub p_floor: f64,
}

impl Default for Combiner {
    fn default() -> Self {
        Self {
            algorithm: CombineAlgorithm::default(),
            singular_policy: SingularPolicy::default(),
            p_floor: P_FLOOR,
        }
    }
}

impl Combiner {
    /// Combiner using the algorithm, policy and floor from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            algorithm: config.algorithm,
            singular_policy: config.singular_policy,
            p_floor: config.p_floor,
        }
    }

    /// Combine per-site p-values into one p-value in `(0, 1]`.
    ///
    /// A single site returns its own p-value (floored). `weights`, when given,
    /// scale each site's contribution.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyCluster`] for no p-values.
    /// - [`Error::LengthMismatch`] if Sigma or the weights disagree with the p-values.
    /// - [`Error::InvalidPValue`] / [`Error::InvalidWeight`] for out-of-range inputs.
    /// - [`Error::SingularCorrelation`] if Sigma is singular under [`SingularPolicy::Error`].
    /// - [`Error::DegenerateVariance`] if the combined variance is not positive.
    pub fn combine(&self, pvalues: &[f64], sigma: &Sigma, weights: Option<&[f64]>) -> Result<f64> {
        let n = pvalues.len();
        if n == 0 {
            return Err(Error::EmptyCluster);
        }
        if sigma.nrows() != n || sigma.ncols() != n {
            return Err(Error::LengthMismatch {
                what: "correlation matrix",
                expected: n,
                actual: sigma.nrows().max(sigma.ncols()),
            });
        }
        for (index, &value) in pvalues.iter().enumerate() {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidPValue { index, value });
            }
        }
        let weights = validated_weights(weights, n)?;

        if n == 1 {
            return Ok(pvalues[0].max(self.p_floor));
        }

        let z = DVector::from_iterator(
            n,
            pvalues
                .iter()
                .map(|&p| z_from_p(p.clamp(self.p_floor, P_CEIL))),
        );
        let z_comb = match self.algorithm {
            CombineAlgorithm::StoufferLiptak => {
                stouffer_liptak(&z, sigma, &weights, self.singular_policy)?
            }
            CombineAlgorithm::ZScore => z_score_combine(&z, sigma, &weights)?,
        };
        Ok(normal_sf(z_comb).max(f64::MIN_POSITIVE))
    }
}

fn validated_weights(weights: Option<&[f64]>, n: usize) -> Result<DVector<f64>> {
    match weights {
        None => Ok(DVector::from_element(n, 1.0)),
        Some(w) => {
            if w.len() != n {
                return Err(Error::LengthMismatch {
                    what: "weights",
                    expected: n,
                    actual: w.len(),
                });
            }
            if let Some((index, &value)) = w
                .iter()
                .enumerate()
                .find(|(_, v)| !(v.is_finite() && **v > 0.0))
            {
                return Err(Error::InvalidWeight { index, value });
            }
            Ok(DVector::from_column_slice(w))
        }
    }
}

/// Variance of `aᵀz` when `z ~ N(0, Σ)`, checked to be positive.
fn linear_variance(a: &DVector<f64>, sigma: &Sigma) -> Result<f64> {
    let variance = (a.transpose() * sigma * a)[(0, 0)];
    if variance.is_finite() && variance > 0.0 {
        Ok(variance)
    } else {
        Err(Error::DegenerateVariance { variance })
    }
}
