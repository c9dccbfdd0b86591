//! Configuration threaded into every entry point.
//!
//! There is no ambient state: the seed, thread count, correlation method,
//! combination algorithm and escalation schedule all travel in [`Config`].

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_FAILED_SITE_FRACTION, DEFAULT_SCHEDULE, DEFAULT_SEED, DEFAULT_SMOOTHING_DEGREE,
    DEFAULT_SMOOTHING_SPAN, P_FLOOR,
};

/// Correlation estimator used to build Sigma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CorrelationMethod {
    /// Pearson product-moment correlation.
    #[default]
    Pearson,
    /// Spearman rank correlation (Pearson on average ranks).
    Spearman,
}

/// Algorithm used to combine correlated p-values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CombineAlgorithm {
    /// Generalized least-squares weighting of z-scores by Sigma⁻¹.
    #[default]
    StoufferLiptak,
    /// Mean z-score scaled by its correlation-inflated standard deviation.
    ZScore,
}

/// What Stouffer-Liptak does when Sigma is not positive definite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SingularPolicy {
    /// Use the SVD pseudo-inverse of Sigma.
    #[default]
    PseudoInverse,
    /// Combine with the z-score algorithm instead.
    ZScoreFallback,
    /// Return [`Error::SingularCorrelation`](crate::Error::SingularCorrelation).
    Error,
}

/// One resolution level of the adaptive permutation test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationLevel {
    /// Number of simulation trials at this level.
    pub n_trials: usize,
    /// Escalate when fewer than this many trials reach the observed statistic.
    /// Ignored on the last level.
    pub min_exceed: usize,
}

/// Configuration for combining and bump testing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Seed for all simulation randomness. Default: [`DEFAULT_SEED`].
    pub seed: u64,

    /// Worker threads for simulation trials.
    ///
    /// `None` uses the global rayon pool. Results do not depend on this value.
    pub parallelism: Option<usize>,

    /// Correlation estimator for Sigma. Default: Pearson.
    pub correlation: CorrelationMethod,

    /// Combination algorithm. Default: Stouffer-Liptak.
    pub algorithm: CombineAlgorithm,

    /// Handling of a singular Sigma under Stouffer-Liptak. Default: pseudo-inverse.
    pub singular_policy: SingularPolicy,

    /// Escalation schedule, strictly increasing in `n_trials`.
    ///
    /// Default: 20 → 100 → 2000 → 5000 → 15000.
    pub schedule: Vec<EscalationLevel>,

    /// Span of the local-regression smoother as a fraction of sites. Default: 0.2.
    pub smoothing_span: f64,

    /// Degree of the local polynomial. Default: 2.
    pub smoothing_degree: usize,

    /// A trial is discarded when more than this fraction of its site fits fail.
    /// Default: 0.5.
    pub max_failed_site_fraction: f64,

    /// Floor applied to p-values before the inverse normal CDF. Default: 1e-13.
    pub p_floor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            parallelism: None,
            correlation: CorrelationMethod::default(),
            algorithm: CombineAlgorithm::default(),
            singular_policy: SingularPolicy::default(),
            schedule: DEFAULT_SCHEDULE
                .iter()
                .map(|&(n_trials, min_exceed)| EscalationLevel {
                    n_trials,
                    min_exceed,
                })
                .collect(),
            smoothing_span: DEFAULT_SMOOTHING_SPAN,
            smoothing_degree: DEFAULT_SMOOTHING_DEGREE,
            max_failed_site_fraction: DEFAULT_MAX_FAILED_SITE_FRACTION,
            p_floor: P_FLOOR,
        }
    }
}

impl Config {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for exploratory runs and tests.
    ///
    /// The schedule stops at 100 trials.
    pub fn quick() -> Self {
        Self {
            schedule: vec![
                EscalationLevel {
                    n_trials: 20,
                    min_exceed: 2,
                },
                EscalationLevel {
                    n_trials: 100,
                    min_exceed: 0,
                },
            ],
            ..Self::default()
        }
    }

    /// Set the RNG seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of worker threads.
    pub fn parallelism(mut self, threads: usize) -> Self {
        assert!(threads > 0, "parallelism must be > 0");
        self.parallelism = Some(threads);
        self
    }

    /// Set the correlation method.
    pub fn correlation(mut self, method: CorrelationMethod) -> Self {
        self.correlation = method;
        self
    }

    /// Set the combination algorithm.
    pub fn algorithm(mut self, algorithm: CombineAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the singular-Sigma policy.
    pub fn singular_policy(mut self, policy: SingularPolicy) -> Self {
        self.singular_policy = policy;
        self
    }

    /// Replace the escalation schedule with `(n_trials, min_exceed)` levels.
    pub fn schedule(mut self, levels: &[(usize, usize)]) -> Self {
        assert!(!levels.is_empty(), "schedule must have at least one level");
        assert!(
            levels.iter().all(|&(n, _)| n > 0),
            "schedule n_trials must be > 0"
        );
        assert!(
            levels.windows(2).all(|w| w[0].0 < w[1].0),
            "schedule n_trials must be strictly increasing"
        );
        self.schedule = levels
            .iter()
            .map(|&(n_trials, min_exceed)| EscalationLevel {
                n_trials,
                min_exceed,
            })
            .collect();
        self
    }

    /// Set the smoother span.
    pub fn smoothing_span(mut self, span: f64) -> Self {
        assert!(
            span > 0.0 && span <= 1.0,
            "smoothing_span must be in (0, 1]"
        );
        self.smoothing_span = span;
        self
    }

    /// Set the smoother polynomial degree.
    pub fn smoothing_degree(mut self, degree: usize) -> Self {
        assert!(degree <= 2, "smoothing_degree must be 0, 1 or 2");
        self.smoothing_degree = degree;
        self
    }

    /// Set the failed-site tolerance per trial.
    pub fn max_failed_site_fraction(mut self, fraction: f64) -> Self {
        assert!(
            (0.0..1.0).contains(&fraction),
            "max_failed_site_fraction must be in [0, 1)"
        );
        self.max_failed_site_fraction = fraction;
        self
    }

    /// Set the p-value floor.
    pub fn p_floor(mut self, floor: f64) -> Self {
        assert!(floor > 0.0 && floor < 0.5, "p_floor must be in (0, 0.5)");
        self.p_floor = floor;
        self
    }

    /// Largest trial count in the schedule.
    pub fn max_trials(&self) -> usize {
        self.schedule.last().map_or(0, |level| level.n_trials)
    }
}
