//! Weighted least squares shared across the sites of a cluster.
//!
//! Every site is regressed on the same model matrix, so `(XᵀWX)⁻¹XᵀW` is
//! computed once and complete sites are fit with a single matrix-vector
//! product. Sites with missing samples are refit on their observed rows.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result, SiteFitFailure};
use crate::statistics::students_t_two_sided;
use crate::types::SiteFit;

use super::SiteFitter;

/// Residual sum of squares below this fraction of `Σwy²` counts as an exact fit.
const PERFECT_FIT_RTOL: f64 = 1e-24;

/// A linear model with a fixed design and optional per-sample weights.
#[derive(Debug, Clone)]
pub struct LinearModel {
    x: DMatrix<f64>,
    weights: DVector<f64>,
    /// `(XᵀWX)⁻¹` over all samples.
    xtwx_inv: DMatrix<f64>,
    /// `(XᵀWX)⁻¹XᵀW`, the coefficient projection for complete sites.
    projection: DMatrix<f64>,
}

/// Result of fitting one site.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    /// Estimated coefficients, one per model-matrix column.
    pub coefficients: DVector<f64>,
    /// Standard errors of the coefficients.
    pub std_errors: DVector<f64>,
    /// `Xβ` for every sample, including missing ones.
    pub fitted: Vec<f64>,
    /// `y − Xβ`; NaN where `y` is missing.
    pub residuals: Vec<f64>,
    /// Residual standard error.
    pub sigma: f64,
    /// Residual degrees of freedom.
    pub df: usize,
}

impl LinearFit {
    /// Coefficient, two-sided t-test p-value and precision `1/σ̂` for `column`.
    pub fn site_fit(&self, column: usize) -> SiteFit {
        let coefficient = self.coefficients[column];
        let t = coefficient / self.std_errors[column];
        SiteFit {
            coefficient,
            p_value: students_t_two_sided(t, self.df as f64),
            precision: 1.0 / self.sigma,
        }
    }
}

impl LinearModel {
    /// Prepare a model for the `samples × columns` matrix `x`.
    ///
    /// # Errors
    ///
    /// - [`Error::LengthMismatch`] / [`Error::InvalidWeight`] for bad weights.
    /// - [`Error::SingularDesign`] if `XᵀWX` is not positive definite.
    pub fn new(x: DMatrix<f64>, weights: Option<&[f64]>) -> Result<Self> {
        let n = x.nrows();
        let weights = match weights {
            None => DVector::from_element(n, 1.0),
            Some(w) => {
                if w.len() != n {
                    return Err(Error::LengthMismatch {
                        what: "sample weights",
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
                DVector::from_column_slice(w)
            }
        };
        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::SingularDesign);
        }

        let xtw = weighted_transpose(&x, &weights, None);
        let xtwx_inv = invert_spd(&xtw * &x).ok_or(Error::SingularDesign)?;
        let projection = &xtwx_inv * &xtw;
        Ok(Self {
            x,
            weights,
            xtwx_inv,
            projection,
        })
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    /// Number of model-matrix columns.
    pub fn n_columns(&self) -> usize {
        self.x.ncols()
    }

    /// Fit one site. NaN entries of `y` are excluded.
    pub fn fit(&self, y: &[f64]) -> std::result::Result<LinearFit, SiteFitFailure> {
        let n = self.n_samples();
        let p = self.n_columns();
        if y.len() != n {
            return Err(SiteFitFailure::InsufficientData);
        }
        let observed: Vec<bool> = y.iter().map(|v| v.is_finite()).collect();
        let n_obs = observed.iter().filter(|o| **o).count();
        if n_obs <= p {
            return Err(SiteFitFailure::InsufficientData);
        }

        let (coefficients, inv) = if n_obs == n {
            let yv = DVector::from_column_slice(y);
            (&self.projection * yv, None)
        } else {
            let xtw = weighted_transpose(&self.x, &self.weights, Some(&observed));
            let inv = invert_spd(&xtw * &self.x).ok_or(SiteFitFailure::Singular)?;
            let yv = DVector::from_iterator(
                n,
                y.iter().map(|v| if v.is_finite() { *v } else { 0.0 }),
            );
            let beta = &inv * (xtw * yv);
            (beta, Some(inv))
        };
        let inv = inv.as_ref().unwrap_or(&self.xtwx_inv);

        let fitted_v = &self.x * &coefficients;
        let fitted: Vec<f64> = fitted_v.iter().copied().collect();
        let residuals: Vec<f64> = y
            .iter()
            .zip(&fitted)
            .map(|(yi, fi)| if yi.is_finite() { yi - fi } else { f64::NAN })
            .collect();

        let rss: f64 = residuals
            .iter()
            .zip(self.weights.iter())
            .filter(|(r, _)| r.is_finite())
            .map(|(r, w)| w * r * r)
            .sum();
        let df = n_obs - p;
        let sigma = (rss / df as f64).sqrt();
        if !sigma.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(SiteFitFailure::NonFinite);
        }
        let scale: f64 = y
            .iter()
            .zip(self.weights.iter())
            .filter(|(v, _)| v.is_finite())
            .map(|(v, w)| w * v * v)
            .sum();
        if rss <= PERFECT_FIT_RTOL * scale {
            return Err(SiteFitFailure::PerfectFit);
        }

        let std_errors = inv.diagonal().map(|d| (d.max(0.0)).sqrt() * sigma);
        Ok(LinearFit {
            coefficients,
            std_errors,
            fitted,
            residuals,
            sigma,
            df,
        })
    }

    /// Fitter reporting the coefficient in model-matrix `column`.
    pub fn coefficient(self, column: usize) -> CoefficientFit {
        CoefficientFit {
            model: self,
            column,
        }
    }
}

/// A [`LinearModel`] bound to one coefficient.
#[derive(Debug, Clone)]
pub struct CoefficientFit {
    model: LinearModel,
    column: usize,
}

impl CoefficientFit {
    /// The underlying model.
    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    /// Model-matrix column of the coefficient.
    pub fn column(&self) -> usize {
        self.column
    }
}

impl SiteFitter for CoefficientFit {
    fn fit_site(&self, y: &[f64]) -> std::result::Result<SiteFit, SiteFitFailure> {
        self.model.fit(y).map(|fit| fit.site_fit(self.column))
    }
}

/// `XᵀW`, with unobserved rows zeroed when `observed` is given.
fn weighted_transpose(
    x: &DMatrix<f64>,
    weights: &DVector<f64>,
    observed: Option<&[bool]>,
) -> DMatrix<f64> {
    let mut xtw = x.transpose();
    for (j, mut col) in xtw.column_iter_mut().enumerate() {
        let w = match observed {
            Some(mask) if !mask[j] => 0.0,
            _ => weights[j],
        };
        col *= w;
    }
    xtw
}

fn invert_spd(m: DMatrix<f64>) -> Option<DMatrix<f64>> {
    let inv = m.cholesky()?.inverse();
    inv.iter().all(|v| v.is_finite()).then_some(inv)
}
