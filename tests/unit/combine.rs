//! P-value combination through the public API.

use clustersig::{combine, CombineAlgorithm, Combiner, Error, Sigma, SingularPolicy, P_FLOOR};

const BOTH: [CombineAlgorithm; 2] = [CombineAlgorithm::StoufferLiptak, CombineAlgorithm::ZScore];

fn equicorrelated(n: usize, rho: f64) -> Sigma {
    Sigma::from_fn(n, n, |i, j| if i == j { 1.0 } else { rho })
}

#[test]
fn single_p_value_is_returned_unchanged() {
    for p in [1e-9, 0.01, 0.5, 1.0] {
        for algorithm in BOTH {
            assert_eq!(combine(&[p], &Sigma::identity(1, 1), None, algorithm).unwrap(), p);
        }
    }
}

#[test]
fn zero_p_value_is_floored() {
    let p = combine(&[0.0], &Sigma::identity(1, 1), None, CombineAlgorithm::ZScore).unwrap();
    assert_eq!(p, P_FLOOR);
    let p = combine(&[0.0, 0.3], &equicorrelated(2, 0.2), None, CombineAlgorithm::StoufferLiptak)
        .unwrap();
    assert!(p > 0.0 && p.is_finite());
}

#[test]
fn smaller_input_never_raises_output() {
    let sigma = equicorrelated(4, 0.3);
    for algorithm in BOTH {
        let base = combine(&[0.2, 0.04, 0.5, 0.1], &sigma, None, algorithm).unwrap();
        let better = combine(&[0.2, 0.01, 0.5, 0.1], &sigma, None, algorithm).unwrap();
        assert!(better <= base);
    }
}

#[test]
fn stronger_correlation_weakens_evidence() {
    let pvalues = [0.02, 0.03, 0.01];
    let weak = combine(&pvalues, &equicorrelated(3, 0.1), None, CombineAlgorithm::StoufferLiptak)
        .unwrap();
    let strong = combine(&pvalues, &equicorrelated(3, 0.8), None, CombineAlgorithm::StoufferLiptak)
        .unwrap();
    assert!(weak < strong);
}

#[test]
fn weights_emphasize_precise_sites() {
    let pvalues = [0.001, 0.6];
    let sigma = equicorrelated(2, 0.2);
    let even = combine(&pvalues, &sigma, None, CombineAlgorithm::ZScore).unwrap();
    let favor_first =
        combine(&pvalues, &sigma, Some(&[4.0, 1.0]), CombineAlgorithm::ZScore).unwrap();
    assert!(favor_first < even);
}

#[test]
fn singular_policies() {
    let sigma = Sigma::from_element(3, 3, 1.0);
    let pvalues = [0.05, 0.05, 0.05];
    let strict = Combiner {
        singular_policy: SingularPolicy::Error,
        ..Combiner::default()
    };
    assert_eq!(
        strict.combine(&pvalues, &sigma, None),
        Err(Error::SingularCorrelation)
    );

    // Perfectly correlated identical sites carry the evidence of one site.
    let pinv = Combiner::default().combine(&pvalues, &sigma, None).unwrap();
    assert!((pinv - 0.05).abs() < 1e-9);
    let fallback = Combiner {
        singular_policy: SingularPolicy::ZScoreFallback,
        ..Combiner::default()
    };
    let zs = fallback.combine(&pvalues, &sigma, None).unwrap();
    assert!((zs - 0.05).abs() < 1e-9);
}

#[test]
fn invalid_inputs_are_typed_errors() {
    let sigma = equicorrelated(2, 0.0);
    let algorithm = CombineAlgorithm::StoufferLiptak;
    assert_eq!(
        combine(&[0.1, 1.5], &sigma, None, algorithm),
        Err(Error::InvalidPValue { index: 1, value: 1.5 })
    );
    assert!(matches!(
        combine(&[0.1, f64::NAN], &sigma, None, algorithm),
        Err(Error::InvalidPValue { index: 1, .. })
    ));
    assert!(matches!(
        combine(&[0.1, 0.2, 0.3], &sigma, None, algorithm),
        Err(Error::LengthMismatch { .. })
    ));
    assert_eq!(
        combine(&[0.1, 0.2], &sigma, Some(&[1.0, 0.0]), algorithm),
        Err(Error::InvalidWeight { index: 1, value: 0.0 })
    );
    assert_eq!(combine(&[], &Sigma::zeros(0, 0), None, algorithm), Err(Error::EmptyCluster));
}

#[test]
fn p_value_range_is_closed() {
    let sigma = equicorrelated(2, 0.0);
    let algorithm = CombineAlgorithm::StoufferLiptak;
    assert!(combine(&[0.0, 0.3], &sigma, None, algorithm).is_ok());
    assert!(combine(&[1.0, 0.3], &sigma, None, algorithm).is_ok());
    let err = combine(&[0.3, -0.25], &sigma, None, algorithm).unwrap_err();
    assert_eq!(err, Error::InvalidPValue { index: 1, value: -0.25 });
    assert!(err.to_string().contains("expected a value in [0, 1]"));
}
