//! Standard normal CDF and the triangular loss distribution.
//!
//! The normal CDF maps correlated normal draws onto uniforms (the Gaussian
//! copula step); the triangular inverse CDF then maps those uniforms onto
//! loss amounts.

use num_traits::Float;
use thiserror::Error;

/// Square root of 2.
const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// Complementary error function approximation using Horner's method.
///
/// Abramowitz and Stegun formula 7.1.26, maximum absolute error 1.5e-7.
#[inline]
fn erfc_approx<T: Float>(x: T) -> T {
    let one = T::one();
    let abs_x = x.abs();

    let a1 = T::from(0.254829592).unwrap_or_else(T::zero);
    let a2 = T::from(-0.284496736).unwrap_or_else(T::zero);
    let a3 = T::from(1.421413741).unwrap_or_else(T::zero);
    let a4 = T::from(-1.453152027).unwrap_or_else(T::zero);
    let a5 = T::from(1.061405429).unwrap_or_else(T::zero);
    let p = T::from(0.3275911).unwrap_or_else(T::zero);

    let t = one / (one + p * abs_x);
    let poly = a1 + t * (a2 + t * (a3 + t * (a4 + t * a5)));
    let erfc_abs = t * poly * (-abs_x * abs_x).exp();

    // erfc(-x) = 2 - erfc(x)
    if x < T::zero() {
        (one + one) - erfc_abs
    } else {
        erfc_abs
    }
}

/// Standard normal cumulative distribution function.
///
/// Computes Φ(x) = ½·erfc(−x/√2). Accurate to about 1e-7.
///
/// # Examples
/// ```
/// use risk_core::math::norm_cdf;
///
/// assert!((norm_cdf(0.0_f64) - 0.5).abs() < 1e-7);
/// assert!(norm_cdf(-3.0_f64) < 0.01);
/// assert!(norm_cdf(3.0_f64) > 0.99);
/// ```
#[inline]
pub fn norm_cdf<T: Float>(x: T) -> T {
    let sqrt_2 = T::from(SQRT_2).unwrap_or_else(T::one);
    let half = T::from(0.5).unwrap_or_else(T::zero);
    half * erfc_approx(-x / sqrt_2)
}

/// Invalid triangular distribution parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    /// A parameter is NaN or infinite.
    #[error("parameters must be finite")]
    NonFinite,
    /// `min > mode`.
    #[error("minimum {min} exceeds mode {mode}")]
    MinAboveMode {
        /// Lower bound.
        min: f64,
        /// Mode.
        mode: f64,
    },
    /// `mode > max`.
    #[error("mode {mode} exceeds maximum {max}")]
    ModeAboveMax {
        /// Mode.
        mode: f64,
        /// Upper bound.
        max: f64,
    },
}

/// Triangular distribution on `[min, max]` with peak at `mode`.
///
/// A degenerate distribution (`min == max`) is allowed and always yields
/// `min`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangular {
    min: f64,
    mode: f64,
    max: f64,
}

impl Triangular {
    /// Fits a triangular distribution.
    ///
    /// # Errors
    ///
    /// Returns `DistributionError` if any parameter is not finite or the
    /// parameters are not ordered `min <= mode <= max`.
    pub fn new(min: f64, mode: f64, max: f64) -> Result<Self, DistributionError> {
        if !(min.is_finite() && mode.is_finite() && max.is_finite()) {
            return Err(DistributionError::NonFinite);
        }
        if min > mode {
            return Err(DistributionError::MinAboveMode { min, mode });
        }
        if mode > max {
            return Err(DistributionError::ModeAboveMax { mode, max });
        }
        Ok(Self { min, mode, max })
    }

    /// Lower bound.
    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Mode.
    #[inline]
    pub fn mode(&self) -> f64 {
        self.mode
    }

    /// Upper bound.
    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Mean, `(min + mode + max) / 3`.
    #[inline]
    pub fn mean(&self) -> f64 {
        (self.min + self.mode + self.max) / 3.0
    }

    /// Inverse CDF. `u` is clamped to `[0, 1]`.
    ///
    /// # Examples
    /// ```
    /// use risk_core::math::Triangular;
    ///
    /// let tri = Triangular::new(0.0, 5.0, 10.0).unwrap();
    /// assert_eq!(tri.inverse_cdf(0.5), 5.0);
    /// assert_eq!(tri.inverse_cdf(0.0), 0.0);
    /// assert_eq!(tri.inverse_cdf(1.0), 10.0);
    /// ```
    pub fn inverse_cdf(&self, u: f64) -> f64 {
        let (a, c, b) = (self.min, self.mode, self.max);
        let range = b - a;
        if range <= 0.0 {
            return a;
        }
        let u = u.clamp(0.0, 1.0);
        let split = (c - a) / range;
        if u < split {
            a + (u * range * (c - a)).sqrt()
        } else {
            b - ((1.0 - u) * range * (b - c)).sqrt()
        }
    }
}
