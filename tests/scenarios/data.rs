//! Deterministic synthetic clusters.

use std::f64::consts::{PI, TAU};

use clustersig::{Cluster, CovariateTable};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Samples per group in the fixed-pattern fixtures.
const PER_GROUP: usize = 20;

/// Common-component scale giving a raw site correlation of 0.23 at shift 0.025, sd 0.035.
pub const COMMON_SD: f64 = 0.012_705_805_759_573;
/// Site-specific scale matching [`COMMON_SD`].
pub const OWN_SD: f64 = 0.032_612_305_959_561;

/// Unit-variance, zero-mean pattern over one group: `cos(2πk₁j/n) + sin(2πk₂j/n)`.
fn pattern(cos_freq: usize, sin_freq: usize, j: usize) -> f64 {
    let x = TAU * j as f64 / PER_GROUP as f64;
    (cos_freq as f64 * x).cos() + (sin_freq as f64 * x).sin()
}

/// Two groups of 20 samples; the second group is shifted by `shift`.
///
/// Each site is `common_sd · c + own_sd · eᵢ` on top of the group means,
/// where `c` and every `eᵢ` are distinct Fourier patterns. The patterns are
/// exactly orthogonal and centered within each group, so every site has the
/// same group difference and residual variance, and every pair of sites has
/// the same correlation. At most 4 sites.
pub fn shifted_groups(
    n_sites: usize,
    shift: f64,
    common_sd: f64,
    own_sd: f64,
) -> (Cluster, CovariateTable) {
    assert!(n_sites <= 4, "only four orthogonal site patterns");
    let group: Vec<f64> = (0..2 * PER_GROUP)
        .map(|i| if i < PER_GROUP { 0.0 } else { 1.0 })
        .collect();
    let rows: Vec<Vec<f64>> = (0..n_sites)
        .map(|site| {
            (0..2 * PER_GROUP)
                .map(|i| {
                    let j = i % PER_GROUP;
                    0.5 + shift * group[i]
                        + common_sd * pattern(1, 2, j)
                        + own_sd * pattern(site + 3, site + 5, j)
                })
                .collect()
        })
        .collect();

    let cluster = Cluster::from_complete_sites(&rows).unwrap();
    let covariates = CovariateTable::new(2 * PER_GROUP)
        .with_column("group", group)
        .unwrap();
    (cluster, covariates)
}

/// 4 sites, 40 samples, shift 0.025, sd 0.035, pairwise correlation ≈ 0.23.
pub fn four_site_shift() -> (Cluster, CovariateTable) {
    shifted_groups(4, 0.025, COMMON_SD, OWN_SD)
}

/// `n_sites` sites with a shared normal component and an effect that rises
/// and falls along the site order.
pub fn bump_shaped(n_sites: usize, seed: u64) -> (Cluster, CovariateTable) {
    let n_samples = 2 * PER_GROUP;
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.035).unwrap();
    let shared: Vec<f64> = (0..n_samples).map(|_| noise.sample(&mut rng)).collect();
    let group: Vec<f64> = (0..n_samples)
        .map(|i| if i < PER_GROUP { 0.0 } else { 1.0 })
        .collect();
    let rows: Vec<Vec<f64>> = (0..n_sites)
        .map(|site| {
            let effect = 0.03 * (PI * (site as f64 + 0.5) / n_sites as f64).sin();
            (0..n_samples)
                .map(|i| 0.5 + effect * group[i] + 0.5 * shared[i] + noise.sample(&mut rng))
                .collect()
        })
        .collect();
    let covariates = CovariateTable::new(n_samples)
        .with_column("group", group)
        .unwrap();
    (Cluster::from_complete_sites(&rows).unwrap(), covariates)
}

/// Same covariates with the group column negated.
pub fn flipped(covariates: &CovariateTable) -> CovariateTable {
    let group: Vec<f64> = covariates
        .column("group")
        .unwrap()
        .iter()
        .map(|g| -g)
        .collect();
    CovariateTable::new(covariates.n_samples())
        .with_column("group", group)
        .unwrap()
}
