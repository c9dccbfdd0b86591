//! Error types.
//!
//! Structural problems (degenerate sites, malformed design nesting, invalid
//! inputs) abort the whole call with an [`Error`]. Numerical trouble local to
//! one site fit is a [`SiteFitFailure`], which callers absorb by excluding the
//! site from aggregation.

use thiserror::Error;

/// Errors surfaced by the public entry points.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A site has zero variance, so its correlation with other sites is undefined.
    #[error("site {site} has zero variance; correlation is undefined")]
    DegenerateSite {
        /// Zero-based index of the offending site.
        site: usize,
    },

    /// Two sites share fewer than two complete samples.
    #[error("sites {a} and {b} share {shared} complete samples; need at least 2")]
    InsufficientOverlap {
        /// First site index.
        a: usize,
        /// Second site index.
        b: usize,
        /// Number of samples observed at both sites.
        shared: usize,
    },

    /// The correlation matrix is singular and the configured policy forbids a fallback.
    #[error("correlation matrix is singular and no regularized inverse is configured")]
    SingularCorrelation,

    /// The variance of the combined z-score is not positive.
    #[error("combined z-score variance is not positive ({variance})")]
    DegenerateVariance {
        /// The offending variance.
        variance: f64,
    },

    /// A p-value outside `[0, 1]` (or NaN) was supplied.
    #[error("p-value at index {index} is {value}; expected a value in [0, 1]")]
    InvalidPValue {
        /// Position in the input vector.
        index: usize,
        /// The rejected value.
        value: f64,
    },

    /// A weight was negative, zero or non-finite.
    #[error("weight at index {index} is {value}; expected a positive finite value")]
    InvalidWeight {
        /// Position in the input vector.
        index: usize,
        /// The rejected value.
        value: f64,
    },

    /// Two inputs that must agree in length do not.
    #[error("{what}: expected length {expected}, got {actual}")]
    LengthMismatch {
        /// Which input disagreed.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// The cluster has no sites or no samples.
    #[error("cluster is empty")]
    EmptyCluster,

    /// The reduced design is not nested in the full design with exactly one extra term.
    #[error("malformed design nesting: {0}")]
    MalformedNesting(String),

    /// A design names a column missing from the covariate table.
    #[error("unknown covariate: {0}")]
    UnknownCovariate(String),

    /// The design matrix is rank deficient.
    #[error("design matrix is singular")]
    SingularDesign,

    /// The real data could not be fit at any site.
    #[error("observed data could not be fit at any site")]
    ObservedFitFailed,

    /// Every simulation trial at a level was discarded.
    #[error("all {n_trials} simulation trials failed")]
    NoValidTrials {
        /// Number of trials attempted.
        n_trials: usize,
    },

    /// The escalation schedule is empty or not strictly increasing.
    #[error("invalid escalation schedule: {0}")]
    InvalidSchedule(String),

    /// The dedicated thread pool could not be built.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

/// Crate result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Recoverable failure of one site fit in one trial.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteFitFailure {
    /// Not enough complete samples for the residual degrees of freedom.
    #[error("not enough complete samples for the design")]
    InsufficientData,

    /// The design restricted to this site's samples is rank deficient.
    #[error("design is singular on this site's samples")]
    Singular,

    /// Residual variance is zero, so precision is unbounded.
    #[error("perfect fit; residual variance is zero")]
    PerfectFit,

    /// The fit produced NaN or infinite values.
    #[error("fit produced non-finite values")]
    NonFinite,
}
