//! Normal and Student's t tail functions.

use std::f64::consts::SQRT_2;

use statrs::function::beta::beta_reg;
use statrs::function::erf::{erfc, erfc_inv};

/// Upper-tail z-score of a one-sided p-value: `Φ⁻¹(1 − p)`.
///
/// Callers clamp `p` away from 0 and 1 first.
#[inline]
pub fn z_from_p(p: f64) -> f64 {
    SQRT_2 * erfc_inv(2.0 * p)
}

/// Standard normal survival function: `1 − Φ(z)`.
#[inline]
pub fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / SQRT_2)
}

/// Two-sided p-value of a t statistic with `df` degrees of freedom.
///
/// Uses `P(|T| ≥ |t|) = I_{df/(df+t²)}(df/2, 1/2)`, which stays accurate far
/// into the tails.
pub fn students_t_two_sided(t: f64, df: f64) -> f64 {
    if !t.is_finite() {
        return 0.0;
    }
    let x = df / (df + t * t);
    beta_reg(df / 2.0, 0.5, x).clamp(0.0, 1.0)
}
