//! Correlation-adjusted combination on synthetic clusters.

use clustersig::model::LinearModel;
use clustersig::{
    build_sigma, cluster_test, combine, Cluster, CombineAlgorithm, Config, CorrelationMethod,
    CovariateTable, Design, Error, SiteFitter,
};

use super::data::{four_site_shift, shifted_groups, COMMON_SD, OWN_SD};

fn single_site_pvalues(cluster: &Cluster, covariates: &CovariateTable) -> Vec<f64> {
    let x = Design::new(["group"]).model_matrix(covariates).unwrap();
    let fitter = LinearModel::new(x, None).unwrap().coefficient(1);
    (0..cluster.n_sites())
        .map(|s| fitter.fit_site(&cluster.site(s)).unwrap().p_value)
        .collect()
}

#[test]
fn stouffer_beats_every_single_site() {
    let (cluster, covariates) = four_site_shift();
    let singles = single_site_pvalues(&cluster, &covariates);
    let best_single = singles.iter().copied().fold(f64::INFINITY, f64::min);
    assert!(best_single > 0.01 && best_single < 0.1, "single p = {best_single}");

    let sigma = build_sigma(&cluster, CorrelationMethod::Pearson).unwrap();
    for i in 0..4 {
        for j in (i + 1)..4 {
            assert!(
                (sigma[(i, j)] - 0.23).abs() < 0.01,
                "sigma[{i},{j}] = {}",
                sigma[(i, j)]
            );
        }
    }

    // Equicorrelated at 0.23: z_comb = z · sqrt(4 / 1.69), about 0.0025 from 0.034.
    let combined = combine(&singles, &sigma, None, CombineAlgorithm::StoufferLiptak).unwrap();
    assert!(
        combined < best_single / 5.0,
        "combined {combined} vs single {best_single}"
    );
}

#[test]
fn cluster_test_matches_manual_combination() {
    let (cluster, covariates) = four_site_shift();
    let singles = single_site_pvalues(&cluster, &covariates);
    let sigma = build_sigma(&cluster, CorrelationMethod::Pearson).unwrap();
    let manual = combine(&singles, &sigma, None, CombineAlgorithm::StoufferLiptak).unwrap();

    let result = cluster_test(
        &cluster,
        &covariates,
        &Design::new(["group"]),
        "group",
        None,
        &Config::new(),
    )
    .unwrap();
    assert_eq!(result.covariate, "group");
    assert_eq!(result.p, manual);
    assert!((result.coefficient - 0.025).abs() < 1e-12);
}

#[test]
fn zscore_also_strengthens_evidence() {
    let (cluster, covariates) = four_site_shift();
    let singles = single_site_pvalues(&cluster, &covariates);
    let sigma = build_sigma(&cluster, CorrelationMethod::Pearson).unwrap();
    let combined = combine(&singles, &sigma, None, CombineAlgorithm::ZScore).unwrap();
    assert!(combined < singles[0]);
}

#[test]
fn one_site_returns_its_own_p_value() {
    let (cluster, covariates) = shifted_groups(1, 0.025, COMMON_SD, OWN_SD);
    let single = single_site_pvalues(&cluster, &covariates)[0];
    let sigma = build_sigma(&cluster, CorrelationMethod::Spearman).unwrap();
    assert_eq!(sigma.shape(), (1, 1));
    for algorithm in [CombineAlgorithm::StoufferLiptak, CombineAlgorithm::ZScore] {
        assert_eq!(combine(&[single], &sigma, None, algorithm).unwrap(), single);
    }
}

#[test]
fn constant_site_is_reported_not_masked() {
    let (cluster, _) = four_site_shift();
    let mut rows: Vec<Vec<f64>> = (0..cluster.n_sites()).map(|s| cluster.site(s)).collect();
    rows[2] = vec![0.5; cluster.n_samples()];
    let cluster = Cluster::from_complete_sites(&rows).unwrap();
    for method in [CorrelationMethod::Pearson, CorrelationMethod::Spearman] {
        assert_eq!(
            build_sigma(&cluster, method),
            Err(Error::DegenerateSite { site: 2 })
        );
    }
}
