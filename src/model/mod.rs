//! Per-site model fitting.
//!
//! A [`SiteFitter`] is bound to one design and one coefficient of interest
//! and fits a single site's data vector. Fitters for richer models (mixed
//! effects, GEE, beta regression) plug in here; the crate ships the weighted
//! least-squares [`LinearModel`], which the permutation engine also needs for
//! reduced-model fitted values and residuals.

mod linear;

pub use linear::{CoefficientFit, LinearFit, LinearModel};

use crate::error::SiteFitFailure;
use crate::types::SiteFit;

/// Fits one site's measurements and reports the coefficient of interest.
///
/// `y` holds one value per sample; NaN marks a missing sample. A failure is
/// recoverable: callers exclude the site rather than abort.
pub trait SiteFitter: Sync {
    /// Fit one site.
    fn fit_site(&self, y: &[f64]) -> Result<SiteFit, SiteFitFailure>;
}

impl<F: SiteFitter + ?Sized> SiteFitter for &F {
    fn fit_site(&self, y: &[f64]) -> Result<SiteFit, SiteFitFailure> {
        (**self).fit_site(y)
    }
}
