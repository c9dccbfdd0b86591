//! # clustersig
//!
//! Significance testing for clusters of correlated measurements.
//!
//! A cluster is a `sites × samples` table (probes along a genomic region,
//! sensors along a line) where neighbouring sites are correlated. This crate
//! provides two ways to turn per-site evidence into one result:
//!
//! - **Correlated p-value combination**: build the site correlation matrix
//!   (Pearson or Spearman, pairwise-complete) and combine per-site p-values
//!   with Stouffer-Liptak or a correlation-scaled z-score.
//! - **Adaptive permutation ("bump") test**: permute reduced-model residuals
//!   jointly across sites, refit the full model, and compare a smoothed
//!   summary of the per-site coefficients against the null. Resolution
//!   escalates from 20 to 15000 trials only while the evidence looks strong.
//!
//! Every entry point takes an explicit [`Config`]; there is no global state.
//! Results are bit-identical for a fixed seed regardless of thread count.
//!
//! ## Quick Start
//!
//! ```ignore
//! use clustersig::{bump_test, Cluster, Config, CovariateTable, Design};
//!
//! let cluster = Cluster::from_complete_sites(&rows)?;
//! let covariates = CovariateTable::new(n_samples).with_column("group", group)?;
//! let result = bump_test(
//!     &cluster,
//!     &covariates,
//!     &Design::new(["group"]),
//!     &Design::intercept_only(),
//!     None,
//!     &Config::new().seed(42),
//! )?;
//! println!("{}: p = {:.4}, effect = {:.3}", result.covariate, result.p, result.coefficient);
//! ```
//!
//! Combining p-values directly:
//!
//! ```ignore
//! use clustersig::{build_sigma, combine, CombineAlgorithm, CorrelationMethod};
//!
//! let sigma = build_sigma(&cluster, CorrelationMethod::Pearson)?;
//! let p = combine(&pvalues, &sigma, None, CombineAlgorithm::StoufferLiptak)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod config;
mod constants;
mod error;
mod types;

// Functional modules
pub mod adaptive;
pub mod combine;
pub mod model;
pub mod output;
pub mod permutation;
pub mod statistics;

// Re-exports for public API
pub use adaptive::{bump_test, bump_test_detailed, BumpReport};
pub use combine::{cluster_test, combine, Combiner};
pub use config::{
    CombineAlgorithm, Config, CorrelationMethod, EscalationLevel, SingularPolicy,
};
pub use constants::{DEFAULT_SEED, P_FLOOR};
pub use error::{Error, Result, SiteFitFailure};
pub use model::SiteFitter;
pub use permutation::{simulate, SimulationBatch};
pub use statistics::{build_sigma, summarize};
pub use types::{Cluster, CombinedResult, CovariateTable, Design, SiteFit, Sigma};
