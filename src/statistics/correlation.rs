//! Site-by-site correlation matrix with pairwise-complete observations.
//!
//! Each pair of sites is correlated over the samples observed at both sites.
//! A sample missing at one site is excluded only from the pairs involving
//! that site.

use crate::config::CorrelationMethod;
use crate::error::{Error, Result};
use crate::types::{Cluster, Sigma};

use super::rank::average_ranks;

/// Build the correlation matrix Sigma for a cluster.
///
/// The result is symmetric with an exact unit diagonal and entries clamped to
/// `[-1, 1]`. A single-site cluster yields the 1×1 identity.
///
/// # Errors
///
/// - [`Error::DegenerateSite`] if a site is constant (overall or over the
///   samples it shares with another site).
/// - [`Error::InsufficientOverlap`] if two sites share fewer than two samples.
pub fn build_sigma(cluster: &Cluster, method: CorrelationMethod) -> Result<Sigma> {
    let n_sites = cluster.n_sites();
    if n_sites == 1 {
        return Ok(Sigma::identity(1, 1));
    }

    let rows: Vec<Vec<f64>> = (0..n_sites).map(|i| cluster.site(i)).collect();
    for (site, row) in rows.iter().enumerate() {
        let observed: Vec<f64> = row.iter().copied().filter(|v| v.is_finite()).collect();
        if observed.len() < 2 || variance_is_zero(&observed) {
            return Err(Error::DegenerateSite { site });
        }
    }

    let mut sigma = Sigma::identity(n_sites, n_sites);
    for a in 0..n_sites {
        for b in (a + 1)..n_sites {
            let r = pairwise_correlation(&rows[a], &rows[b], method)
                .map_err(|e| locate(e, a, b))?;
            sigma[(a, b)] = r;
            sigma[(b, a)] = r;
        }
    }
    Ok(sigma)
}

/// Failure of one pairwise correlation before the site indices are known.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PairFailure {
    Overlap(usize),
    ConstantFirst,
    ConstantSecond,
}

fn locate(failure: PairFailure, a: usize, b: usize) -> Error {
    match failure {
        PairFailure::Overlap(shared) => Error::InsufficientOverlap { a, b, shared },
        PairFailure::ConstantFirst => Error::DegenerateSite { site: a },
        PairFailure::ConstantSecond => Error::DegenerateSite { site: b },
    }
}

fn pairwise_correlation(
    x: &[f64],
    y: &[f64],
    method: CorrelationMethod,
) -> std::result::Result<f64, PairFailure> {
    let (mut xs, mut ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .unzip();
    if xs.len() < 2 {
        return Err(PairFailure::Overlap(xs.len()));
    }
    if method == CorrelationMethod::Spearman {
        xs = average_ranks(&xs);
        ys = average_ranks(&ys);
    }
    pearson(&xs, &ys)
}

fn pearson(x: &[f64], y: &[f64]) -> std::result::Result<f64, PairFailure> {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= 0.0 || variance_is_zero(x) {
        return Err(PairFailure::ConstantFirst);
    }
    if syy <= 0.0 || variance_is_zero(y) {
        return Err(PairFailure::ConstantSecond);
    }
    Ok((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

fn variance_is_zero(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}
