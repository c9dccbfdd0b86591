//! Statistical building blocks.
//!
//! - Site-by-site correlation with pairwise-complete observations
//! - Normal and Student's t tail functions
//! - Average ranks for Spearman correlation
//! - Tricube local regression for the bump summary statistic

mod correlation;
mod normal;
mod rank;
mod smoothing;

pub use correlation::build_sigma;
pub use normal::{normal_sf, students_t_two_sided, z_from_p};
pub use rank::average_ranks;
pub use smoothing::{summarize, summarize_at, LocalRegression, SmoothingFailure};
