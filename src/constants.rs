//! Constants used throughout the crate.

/// Default deterministic seed for RNG operations.
///
/// Same seed + same data = same result, independent of the thread count.
/// The value `0x636C7573746572` is "cluster" encoded in ASCII.
pub const DEFAULT_SEED: u64 = 0x636C7573746572;

/// Smallest p-value fed to the inverse normal CDF.
///
/// A p-value of exactly 0 would map to an infinite z-score.
pub const P_FLOOR: f64 = 1e-13;

/// Largest p-value fed to the inverse normal CDF.
pub const P_CEIL: f64 = 1.0 - 1e-15;

/// Default span of the local-regression smoother, as a fraction of the sites.
pub const DEFAULT_SMOOTHING_SPAN: f64 = 0.2;

/// Default polynomial degree of the local-regression smoother.
pub const DEFAULT_SMOOTHING_DEGREE: usize = 2;

/// Below this many coefficients the summary statistic is a plain sum.
pub const MIN_SMOOTHING_SITES: usize = 3;

/// Default fraction of failed site fits above which a trial is discarded.
pub const DEFAULT_MAX_FAILED_SITE_FRACTION: f64 = 0.5;

/// Default escalation schedule: `(n_trials, min_exceed)`.
///
/// A level escalates to the next when fewer than `min_exceed` simulated
/// statistics reach the observed one. The last level is terminal.
pub const DEFAULT_SCHEDULE: [(usize, usize); 5] =
    [(20, 2), (100, 4), (2_000, 10), (5_000, 10), (15_000, 0)];

/// Relative tolerance for singular values in the pseudo-inverse.
pub const PINV_RCOND: f64 = 1e-12;
