//! Stouffer-Liptak combination with a generalized-least-squares weighting.

use nalgebra::DVector;

use crate::config::SingularPolicy;
use crate::constants::PINV_RCOND;
use crate::error::{Error, Result};
use crate::types::Sigma;

use super::{linear_variance, z_score_combine};

/// Smallest Cholesky pivot (relative to the largest diagonal entry) accepted
/// before Sigma is treated as singular.
const MIN_RELATIVE_PIVOT: f64 = 1e-10;

/// Combined z-score `aᵀz / sqrt(aᵀΣa)` with `a = W Σ⁻¹ 1`.
///
/// With unit weights this is `1ᵀΣ⁻¹z / sqrt(1ᵀΣ⁻¹1)`.
pub fn stouffer_liptak(
    z: &DVector<f64>,
    sigma: &Sigma,
    weights: &DVector<f64>,
    policy: SingularPolicy,
) -> Result<f64> {
    let n = z.len();
    let ones = DVector::from_element(n, 1.0);

    let sigma_inv_ones = match positive_definite_solve(sigma, &ones) {
        Some(solution) => solution,
        None => match policy {
            SingularPolicy::PseudoInverse => {
                tracing::warn!(n_sites = n, "correlation matrix is singular; using pseudo-inverse");
                let pinv = sigma
                    .clone()
                    .pseudo_inverse(PINV_RCOND * n as f64)
                    .map_err(|_| Error::SingularCorrelation)?;
                pinv * &ones
            }
            SingularPolicy::ZScoreFallback => {
                tracing::warn!(
                    n_sites = n,
                    "correlation matrix is singular; falling back to z-score combination"
                );
                return z_score_combine(z, sigma, weights);
            }
            SingularPolicy::Error => return Err(Error::SingularCorrelation),
        },
    };

    let a = weights.component_mul(&sigma_inv_ones);
    let variance = linear_variance(&a, sigma)?;
    Ok(a.dot(z) / variance.sqrt())
}

/// Solve `Σx = b` by Cholesky, or `None` if Σ is not safely positive definite.
fn positive_definite_solve(sigma: &Sigma, b: &DVector<f64>) -> Option<DVector<f64>> {
    let chol = sigma.clone().cholesky()?;
    let scale = sigma.diagonal().max();
    let min_pivot = chol
        .l_dirty()
        .diagonal()
        .iter()
        .map(|d| d * d)
        .fold(f64::INFINITY, f64::min);
    if !(min_pivot > MIN_RELATIVE_PIVOT * scale) {
        return None;
    }
    let x = chol.solve(b);
    x.iter().all(|v| v.is_finite()).then_some(x)
}
