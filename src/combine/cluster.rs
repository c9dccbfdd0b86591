//! Per-site fits combined into one result for a cluster.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{LinearModel, SiteFitter};
use crate::statistics::build_sigma;
use crate::types::{Cluster, CombinedResult, CovariateTable, Design, Sigma};

use super::Combiner;

/// Fit `design` at every site and combine the p-values of `covariate`.
///
/// Sigma is built from the raw site measurements with `config.correlation`.
/// Sites whose fit fails are dropped from both the p-values and Sigma.
///
/// # Errors
///
/// - [`Error::UnknownCovariate`] if `covariate` is not a term of `design`.
/// - [`Error::DegenerateSite`] / [`Error::InsufficientOverlap`] from the correlation builder.
/// - [`Error::ObservedFitFailed`] if no site can be fit.
/// - Any error of [`Combiner::combine`].
pub fn cluster_test(
    cluster: &Cluster,
    covariates: &CovariateTable,
    design: &Design,
    covariate: &str,
    weights: Option<&[f64]>,
    config: &Config,
) -> Result<CombinedResult> {
    if covariates.n_samples() != cluster.n_samples() {
        return Err(Error::LengthMismatch {
            what: "covariate samples",
            expected: cluster.n_samples(),
            actual: covariates.n_samples(),
        });
    }
    let column = design
        .column_of(covariate)
        .ok_or_else(|| Error::UnknownCovariate(covariate.to_string()))?;
    let fitter = LinearModel::new(design.model_matrix(covariates)?, weights)?.coefficient(column);
    cluster_test_with(cluster, &fitter, covariate, config)
}

/// [`cluster_test`] with a caller-supplied fitter.
pub fn cluster_test_with<F: SiteFitter>(
    cluster: &Cluster,
    fitter: &F,
    covariate: &str,
    config: &Config,
) -> Result<CombinedResult> {
    let sigma = build_sigma(cluster, config.correlation)?;

    let mut kept = Vec::with_capacity(cluster.n_sites());
    let mut pvalues = Vec::with_capacity(cluster.n_sites());
    let mut coefficients = Vec::with_capacity(cluster.n_sites());
    for site in 0..cluster.n_sites() {
        match fitter.fit_site(&cluster.site(site)) {
            Ok(fit) => {
                kept.push(site);
                pvalues.push(fit.p_value);
                coefficients.push(fit.coefficient);
            }
            Err(failure) => {
                tracing::debug!(site, %failure, "site fit failed; excluded from combination");
            }
        }
    }
    if kept.is_empty() {
        return Err(Error::ObservedFitFailed);
    }

    let sigma = if kept.len() == cluster.n_sites() {
        sigma
    } else {
        Sigma::from_fn(kept.len(), kept.len(), |i, j| sigma[(kept[i], kept[j])])
    };
    let p = Combiner::from_config(config).combine(&pvalues, &sigma, None)?;
    Ok(CombinedResult {
        covariate: covariate.to_string(),
        p,
        coefficient: coefficients.iter().sum::<f64>() / coefficients.len() as f64,
    })
}
