//! Weighted mean z-score scaled for inter-site correlation.

use nalgebra::DVector;

use crate::error::Result;
use crate::types::Sigma;

use super::linear_variance;

/// Combined z-score `z̄ / sd(z̄)`.
///
/// `z̄ = Σwᵢzᵢ / Σwᵢ` and `sd(z̄) = sqrt(wᵀΣw) / Σwᵢ`. With unit weights the
/// variance is `(n + 2·Σ_{i<j} ρᵢⱼ) / n²`, so the effective number of sites
/// shrinks as the average pairwise correlation grows.
pub fn z_score_combine(z: &DVector<f64>, sigma: &Sigma, weights: &DVector<f64>) -> Result<f64> {
    let total = weights.sum();
    let mean = weights.dot(z) / total;
    let sd = linear_variance(weights, sigma)?.sqrt() / total;
    Ok(mean / sd)
}
