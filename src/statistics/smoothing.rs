//! Local-regression smoothing of per-site coefficients.
//!
//! The summary statistic of a bump is the sum of its coefficients after a
//! precision-weighted local polynomial fit across site order. Smoothing only
//! reduces simulation noise, so any numerical failure falls back to the plain
//! sum and never reaches the caller.

use nalgebra::{DMatrix, DVector};

use crate::constants::MIN_SMOOTHING_SITES;

/// Radius factor when the window edge has no gap to the next point.
const WINDOW_MARGIN: f64 = 1.1;

/// Why a local-regression fit could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmoothingFailure {
    /// The span covers fewer sites than the local polynomial needs.
    WindowTooSmall,
    /// A local weighted least-squares system was singular.
    IllConditioned,
    /// Inputs or fitted values were NaN or infinite.
    NonFinite,
}

/// Tricube-kernel local polynomial regression evaluated at the data points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalRegression {
    /// Fraction of points in each local window.
    pub span: f64,
    /// Degree of the local polynomial (0, 1 or 2).
    pub degree: usize,
}

impl LocalRegression {
    /// Smoother with the given span and degree.
    pub fn new(span: f64, degree: usize) -> Self {
        Self { span, degree }
    }

    /// Fitted values of `y ~ x` with prior weights `w`.
    ///
    /// Each window holds the `q = floor(span · n)` nearest points, but never
    /// fewer than `degree + 1`. Its radius is the midpoint between the q-th
    /// and (q+1)-th nearest distances. When those two distances tie, or the
    /// window covers every point, the radius is 10% past the q-th distance
    /// so the edge points keep a positive kernel weight.
    pub fn fit(&self, x: &[f64], y: &[f64], w: &[f64]) -> Result<Vec<f64>, SmoothingFailure> {
        let n = x.len();
        let finite = |v: &f64| v.is_finite();
        if y.len() != n || w.len() != n || !x.iter().all(finite) || !y.iter().all(finite) {
            return Err(SmoothingFailure::NonFinite);
        }
        if !w.iter().all(|v| v.is_finite() && *v > 0.0) {
            return Err(SmoothingFailure::NonFinite);
        }

        let min_window = self.degree + 1;
        if n < min_window {
            return Err(SmoothingFailure::WindowTooSmall);
        }
        let q = ((self.span * n as f64).floor() as usize).max(min_window).min(n);

        x.iter()
            .map(|&x0| self.fit_at(x0, x, y, w, q))
            .collect()
    }

    fn fit_at(
        &self,
        x0: f64,
        x: &[f64],
        y: &[f64],
        w: &[f64],
        q: usize,
    ) -> Result<f64, SmoothingFailure> {
        let n = x.len();
        let mut dists: Vec<f64> = x.iter().map(|xi| (xi - x0).abs()).collect();
        dists.sort_by(f64::total_cmp);
        let radius = if q < n && dists[q] > dists[q - 1] {
            0.5 * (dists[q - 1] + dists[q])
        } else {
            dists[q - 1] * WINDOW_MARGIN
        };
        if radius <= 0.0 {
            return Err(SmoothingFailure::IllConditioned);
        }

        let p = self.degree + 1;
        let mut xtwx = DMatrix::<f64>::zeros(p, p);
        let mut xtwy = DVector::<f64>::zeros(p);
        let mut support = 0usize;
        for i in 0..n {
            let u = (x[i] - x0) / radius;
            let kernel = tricube(u.abs());
            if kernel <= 0.0 {
                continue;
            }
            support += 1;
            let weight = kernel * w[i];
            let basis: Vec<f64> = (0..p).map(|k| u.powi(k as i32)).collect();
            for r in 0..p {
                xtwy[r] += weight * basis[r] * y[i];
                for c in 0..p {
                    xtwx[(r, c)] += weight * basis[r] * basis[c];
                }
            }
        }
        if support < p {
            return Err(SmoothingFailure::IllConditioned);
        }

        let chol = xtwx.cholesky().ok_or(SmoothingFailure::IllConditioned)?;
        let beta = chol.solve(&xtwy);
        let fitted = beta[0];
        if fitted.is_finite() {
            Ok(fitted)
        } else {
            Err(SmoothingFailure::NonFinite)
        }
    }
}

#[inline]
fn tricube(u: f64) -> f64 {
    if u >= 1.0 {
        0.0
    } else {
        let t = 1.0 - u * u * u;
        t * t * t
    }
}

/// Reduce per-site coefficients to one scalar.
///
/// Fewer than three coefficients are summed directly. Otherwise the
/// coefficients are smoothed over site positions `1..=n` weighted by
/// `weights`, and the fitted values are summed. A failed fit returns the
/// unweighted sum.
pub fn summarize(coefficients: &[f64], weights: &[f64], smoother: &LocalRegression) -> f64 {
    let positions: Vec<f64> = (1..=coefficients.len()).map(|i| i as f64).collect();
    summarize_at(&positions, coefficients, weights, smoother)
}

/// [`summarize`] with explicit site positions.
///
/// Used when some sites failed to fit, so the survivors keep their place in
/// the site order.
pub fn summarize_at(
    positions: &[f64],
    coefficients: &[f64],
    weights: &[f64],
    smoother: &LocalRegression,
) -> f64 {
    let plain: f64 = coefficients.iter().sum();
    if coefficients.len() < MIN_SMOOTHING_SITES {
        return plain;
    }
    match smoother.fit(positions, coefficients, weights) {
        Ok(fitted) => fitted.iter().sum(),
        Err(failure) => {
            tracing::trace!(?failure, n = coefficients.len(), "smoothing fell back to plain sum");
            plain
        }
    }
}
