//! Tests for configuration validation.
//!
//! These tests verify that invalid configuration values are rejected
//! by the builder methods with appropriate panic messages.

use clustersig::{CombineAlgorithm, Config, CorrelationMethod, SingularPolicy, DEFAULT_SEED};

// =============================================================================
// DEFAULTS
// =============================================================================

#[test]
fn defaults() {
    let config = Config::new();
    assert_eq!(config.seed, DEFAULT_SEED);
    assert_eq!(config.parallelism, None);
    assert_eq!(config.correlation, CorrelationMethod::Pearson);
    assert_eq!(config.algorithm, CombineAlgorithm::StoufferLiptak);
    assert_eq!(config.singular_policy, SingularPolicy::PseudoInverse);
    assert_eq!(config.smoothing_span, 0.2);
    assert_eq!(config.smoothing_degree, 2);
    let thresholds: Vec<usize> = config.schedule.iter().map(|l| l.min_exceed).collect();
    assert_eq!(&thresholds[..4], &[2, 4, 10, 10]);
}

// =============================================================================
// SCHEDULE VALIDATION
// =============================================================================

#[test]
#[should_panic(expected = "schedule must have at least one level")]
fn empty_schedule_panics() {
    let _ = Config::new().schedule(&[]);
}

#[test]
#[should_panic(expected = "schedule n_trials must be > 0")]
fn zero_trial_level_panics() {
    let _ = Config::new().schedule(&[(0, 1), (10, 0)]);
}

#[test]
#[should_panic(expected = "strictly increasing")]
fn repeated_level_panics() {
    let _ = Config::new().schedule(&[(50, 2), (50, 0)]);
}

#[test]
fn custom_schedule_valid() {
    let config = Config::new().schedule(&[(10, 1), (1_000, 0)]);
    assert_eq!(config.schedule.len(), 2);
    assert_eq!(config.max_trials(), 1_000);
}

// =============================================================================
// SMOOTHING VALIDATION
// =============================================================================

#[test]
#[should_panic(expected = "smoothing_span must be in (0, 1]")]
fn span_zero_panics() {
    let _ = Config::new().smoothing_span(0.0);
}

#[test]
#[should_panic(expected = "smoothing_span must be in (0, 1]")]
fn span_above_one_panics() {
    let _ = Config::new().smoothing_span(1.5);
}

#[test]
fn span_one_valid() {
    assert_eq!(Config::new().smoothing_span(1.0).smoothing_span, 1.0);
}

#[test]
#[should_panic(expected = "smoothing_degree must be 0, 1 or 2")]
fn cubic_smoothing_panics() {
    let _ = Config::new().smoothing_degree(3);
}

// =============================================================================
// OTHER FIELDS
// =============================================================================

#[test]
#[should_panic(expected = "max_failed_site_fraction must be in [0, 1)")]
fn failed_fraction_one_panics() {
    let _ = Config::new().max_failed_site_fraction(1.0);
}

#[test]
#[should_panic(expected = "p_floor must be in (0, 0.5)")]
fn p_floor_zero_panics() {
    let _ = Config::new().p_floor(0.0);
}

#[test]
fn parallelism_one_valid() {
    assert_eq!(Config::new().parallelism(1).parallelism, Some(1));
}

#[test]
fn builder_chains() {
    let config = Config::quick()
        .seed(99)
        .correlation(CorrelationMethod::Spearman)
        .algorithm(CombineAlgorithm::ZScore)
        .singular_policy(SingularPolicy::Error);
    assert_eq!(config.seed, 99);
    assert_eq!(config.correlation, CorrelationMethod::Spearman);
    assert_eq!(config.algorithm, CombineAlgorithm::ZScore);
    assert_eq!(config.singular_policy, SingularPolicy::Error);
    assert_eq!(config.max_trials(), 100);
}
